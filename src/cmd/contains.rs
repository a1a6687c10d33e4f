use std::io::Write;

use crate::args::{self, positional};

const USAGE: &'static str = r#"
Test whether datetimes fall on a timetable.

For each datetime, this prints `true` when it falls within an occurrence of
the timetable and `false` otherwise. The test is done on the calendar of each
datetime's own time zone.

USAGE:
    timetable contains <kind> <schedule> <datetime>...
    timetable contains <kind> <schedule> < line delimited <datetime>

TIP:
    use -h for short docs and --help for long docs

EXAMPLES:
    Test whether it's currently the weekend:

        $ timetable contains weekdays sat,sun now
        true

    %snip-start%

    A day of month timetable with `last` (or `31`) contains the last day of
    every month:

        $ timetable contains days last 2023-02-28 2024-02-28 2024-02-29
        true
        false
        true

    The time zone of a datetime determines its calendar fields. Here, the
    same instant is tested in two different time zones:

        $ timetable contains hours 9..17 \
            2024-07-20T12:00+00:00[UTC] \
            2024-07-20T21:00+09:00[Asia/Tokyo]
        true
        false

    %snip-end%

REQUIRED ARGUMENTS:
%args%
OPTIONS:
%flags%
"#;

pub fn run(p: &mut lexopt::Parser) -> anyhow::Result<()> {
    let mut timetable = positional::TimetableArgs::default();
    let mut datetimes = positional::DateTimes::default();
    args::configure(p, USAGE, &mut [&mut timetable, &mut datetimes])?;

    let timetable = timetable.timetable()?;
    let mut wtr = std::io::stdout().lock();
    datetimes.try_map(|dt| {
        writeln!(wtr, "{}", timetable.contains(dt.get()))?;
        Ok(true)
    })
}
