use crate::{
    args::{self, Usage, flags, positional},
    generator::Direction,
};

const USAGE: &'static str = r#"
Find the occurrence of a timetable on, before or after datetimes.

For each datetime, this prints the occurrence found as its inclusive start and
exclusive end separated by a `/`. When there is no such occurrence, `none` is
printed instead.

By default, this finds the occurrence containing each datetime. That is, it
answers the question, "when does the occurrence that is happening right now
start and end?" Use `-d/--direction` to look for the nearest occurrence
before or after each datetime instead.

USAGE:
    timetable match <kind> <schedule> <datetime>...
    timetable match <kind> <schedule> < line delimited <datetime>

TIP:
    use -h for short docs and --help for long docs

EXAMPLES:
    Find the next business day:

        $ timetable match weekdays mon..fri -d after 2024-07-20
        2024-07-22T00:00:00-04:00[America/New_York]/2024-07-23T00:00:00-04:00[America/New_York]

    %snip-start%

    Find the next payday, on the 15th or the last day of the month:

        $ timetable match days 15,last -d after 2024-02-16
        2024-02-29T00:00:00-05:00[America/New_York]/2024-03-01T00:00:00-05:00[America/New_York]

    Print the previous occurrence as JSON:

        $ timetable match months jan,jul -d before -f json 2024-03-10
        {"start":"2024-01-01T00:00:00-05:00[America/New_York]","end":"2024-02-01T00:00:00-05:00[America/New_York]"}

    Datetimes may also be given on stdin, one per line:

        $ printf '2024-07-20T08:59\n2024-07-20T09:00\n' | timetable match hours 9..17
        none
        2024-07-20T09:00:00-04:00[America/New_York]/2024-07-20T10:00:00-04:00[America/New_York]

    %snip-end%

REQUIRED ARGUMENTS:
%args%
OPTIONS:
%flags%
"#;

pub fn run(p: &mut lexopt::Parser) -> anyhow::Result<()> {
    let mut config = Config::default();
    let mut timetable = positional::TimetableArgs::default();
    let mut datetimes = positional::DateTimes::default();
    args::configure(
        p,
        USAGE,
        &mut [&mut config, &mut timetable, &mut datetimes],
    )?;

    let timetable = timetable.timetable()?;
    let mut wtr = std::io::stdout().lock();
    datetimes.try_map(|dt| {
        let occurrence = timetable.matching(dt.get(), config.direction);
        config.format.write(&mut wtr, occurrence.as_ref())?;
        Ok(true)
    })
}

#[derive(Debug)]
struct Config {
    direction: Direction,
    format: flags::Format,
}

impl Default for Config {
    fn default() -> Config {
        Config { direction: Direction::On, format: flags::Format::default() }
    }
}

impl args::Configurable for Config {
    fn configure(
        &mut self,
        p: &mut lexopt::Parser,
        arg: &mut lexopt::Arg,
    ) -> anyhow::Result<bool> {
        match *arg {
            lexopt::Arg::Short('d') | lexopt::Arg::Long("direction") => {
                self.direction = args::parse(p, "-d/--direction")?;
            }
            lexopt::Arg::Short('f') | lexopt::Arg::Long("format") => {
                self.format = args::parse(p, "-f/--format")?;
            }
            _ => return Ok(false),
        }
        Ok(true)
    }

    fn usage(&self) -> &[Usage] {
        &[Direction::USAGE, flags::Format::USAGE]
    }
}
