use std::io::Write;

use crate::args::{self, positional};

const USAGE: &'static str = r#"
Print a normalized description of a timetable.

This is useful for checking how a schedule is interpreted. Values are sorted,
duplicates are removed and ranges are expanded. Weekdays and months are
printed by name, and the last day of the month is printed as `last`.

USAGE:
    timetable describe <kind> <schedule>

TIP:
    use -h for short docs and --help for long docs

EXAMPLES:
    Describe a timetable for weekends:

        $ timetable describe weekdays fri..sun
        Timetable(weekdays: Sunday, Friday, Saturday)

    %snip-start%

    Hours may be given on a 12-hour clock:

        $ timetable describe hours 9am,12pm..1pm,5pm
        Timetable(hours: 9, 12, 13, 17)

    Values outside of the kind's range are rejected:

        $ timetable describe months 0..3
        invalid schedule: schedule value `0` is out of range for months timetables, which require values in `1..=12`

    %snip-end%

REQUIRED ARGUMENTS:
%args%
OPTIONS:
%flags%
"#;

pub fn run(p: &mut lexopt::Parser) -> anyhow::Result<()> {
    let mut timetable = positional::TimetableArgs::default();
    args::configure(p, USAGE, &mut [&mut timetable])?;

    let timetable = timetable.timetable()?;
    let mut wtr = std::io::stdout().lock();
    writeln!(wtr, "{timetable}")?;
    Ok(())
}
