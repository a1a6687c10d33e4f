mod contains;
mod describe;
mod kinds;
mod matching;
mod range;

const USAGE: &'static str = "\
Compute the occurrences of calendar timetables.

A timetable is a kind (hours, weekdays, days or months) together with the
values of that kind that are on schedule, e.g., `weekdays mon..fri`.

USAGE:
    timetable <command> ...

COMMANDS:
    contains  Test whether datetimes fall on a timetable
    describe  Print a normalized description of a timetable
    kinds     List the kinds of timetables
    match     Find the occurrence on, before or after datetimes
    range     List every occurrence within a datetime range
";

pub fn run(p: &mut lexopt::Parser) -> anyhow::Result<()> {
    let cmd = crate::args::next_as_command(USAGE, p)?;
    match &*cmd {
        "contains" => contains::run(p),
        "describe" => describe::run(p),
        "kinds" => kinds::run(p),
        "match" => matching::run(p),
        "range" => range::run(p),
        unk => anyhow::bail!("unrecognized command '{}'", unk),
    }
}
