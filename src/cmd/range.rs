use {anyhow::Context, lexopt::ValueExt};

use crate::{
    args::{self, Usage, flags, positional},
    calendar::Interval,
    datetime::DateTime,
    materialize::Materializer,
};

const USAGE: &'static str = r#"
List every occurrence of a timetable within a datetime range.

The range starts at `<start>` (inclusive) and ends at `<end>` (exclusive).
Only occurrences that lie entirely within the range are printed. So an
occurrence that is already in progress at `<start>`, or that is still in
progress at `<end>`, is not included. Occurrences are printed in ascending
order, one per line.

Large ranges are split into chunks on occurrence boundaries and the chunks are
computed in parallel. The whole computation is bounded by a time budget. When
it is exceeded, nothing is printed and this command fails.

USAGE:
    timetable range <kind> <schedule> <start> <end>

TIP:
    use -h for short docs and --help for long docs

EXAMPLES:
    List the Sundays in July 2024:

        $ timetable range weekdays sun 2024-07-01 2024-08-01
        2024-07-07T00:00:00-04:00[America/New_York]/2024-07-08T00:00:00-04:00[America/New_York]
        2024-07-14T00:00:00-04:00[America/New_York]/2024-07-15T00:00:00-04:00[America/New_York]
        2024-07-21T00:00:00-04:00[America/New_York]/2024-07-22T00:00:00-04:00[America/New_York]
        2024-07-28T00:00:00-04:00[America/New_York]/2024-07-29T00:00:00-04:00[America/New_York]

    %snip-start%

    The last day of each month in the first quarter of 2024:

        $ timetable range days last 2024-01-01 2024-04-01 -f json
        {"start":"2024-01-31T00:00:00-05:00[America/New_York]","end":"2024-02-01T00:00:00-05:00[America/New_York]"}
        {"start":"2024-02-29T00:00:00-05:00[America/New_York]","end":"2024-03-01T00:00:00-05:00[America/New_York]"}
        {"start":"2024-03-31T00:00:00-04:00[America/New_York]","end":"2024-04-01T00:00:00-04:00[America/New_York]"}

    Count the working hours in 2025 using a single thread and a generous
    time budget:

        $ timetable range hours 9..16 2025-01-01 2026-01-01 -j1 -t 10s | wc -l
        2920

    %snip-end%

REQUIRED ARGUMENTS:
%args%
OPTIONS:
%flags%
"#;

pub fn run(p: &mut lexopt::Parser) -> anyhow::Result<()> {
    let mut config = Config::default();
    let mut timetable = positional::TimetableArgs::default();
    args::configure(p, USAGE, &mut [&mut timetable, &mut config])?;

    let timetable = timetable.timetable()?;
    let start = config.start.context("a range start is required")?;
    let end = config.end.context("a range end is required")?;
    let end = end.in_tz_of(&start);
    let range = Interval::try_new(start.into_zoned(), end.into_zoned())
        .context("invalid range")?;
    let materializer =
        Materializer::new(config.budget.get()).threads(config.threads.get());
    let occurrences = timetable.occurrences_in(&range, &materializer)?;

    let mut wtr = std::io::stdout().lock();
    for occurrence in occurrences.iter() {
        config.format.write(&mut wtr, Some(occurrence))?;
    }
    Ok(())
}

#[derive(Debug, Default)]
struct Config {
    start: Option<DateTime>,
    end: Option<DateTime>,
    budget: flags::Budget,
    threads: flags::Threads,
    format: flags::Format,
}

impl args::Configurable for Config {
    fn configure(
        &mut self,
        p: &mut lexopt::Parser,
        arg: &mut lexopt::Arg,
    ) -> anyhow::Result<bool> {
        match *arg {
            lexopt::Arg::Value(ref mut v) => {
                if self.start.is_none() {
                    self.start = Some(v.parse().context("invalid start")?);
                } else if self.end.is_none() {
                    self.end = Some(v.parse().context("invalid end")?);
                } else {
                    return Ok(false);
                }
            }
            lexopt::Arg::Short('t') | lexopt::Arg::Long("timeout") => {
                self.budget = args::parse(p, "-t/--timeout")?;
            }
            lexopt::Arg::Short('j') | lexopt::Arg::Long("threads") => {
                self.threads = args::parse(p, "-j/--threads")?;
            }
            lexopt::Arg::Short('f') | lexopt::Arg::Long("format") => {
                self.format = args::parse(p, "-f/--format")?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn usage(&self) -> &[Usage] {
        &[
            DateTime::ARG_START,
            DateTime::ARG_END,
            flags::Budget::USAGE,
            flags::Threads::USAGE,
            flags::Format::USAGE,
        ]
    }
}
