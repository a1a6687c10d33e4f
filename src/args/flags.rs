use std::{io, num::NonZero, time::Duration};

use {anyhow::Context, jiff::SignedDuration};

use crate::{
    args::Usage,
    generator::Occurrence,
    kind::Kind,
    schedule::{self, ScheduleSet},
};

/// Provides parsing for the output format of occurrences.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Format {
    /// Prints `start/end` with both ends as RFC 9557 timestamps.
    #[default]
    Text,
    /// Prints one JSON object per line.
    Json,
}

impl Format {
    pub const USAGE: Usage = Usage::flag(
        "-f, --format <kind>",
        "Print occurrences in this format: text or json.",
        r#"
Print occurrences in this format.

The legal values for this flag are `text` (default) and `json`.

In the `text` format, each occurrence is printed on its own line as its start
and end separated by a `/`. Both the start and end are printed as RFC 9557
timestamps. The start is inclusive and the end is exclusive. When there is no
occurrence, `none` is printed instead.

In the `json` format, each occurrence is printed on its own line as a JSON
object with `start` and `end` keys. When there is no occurrence, `null` is
printed instead.
"#,
    );

    /// Writes a single occurrence (or the absence of one) as a line.
    pub fn write<W: io::Write>(
        &self,
        mut wtr: W,
        occurrence: Option<&Occurrence>,
    ) -> anyhow::Result<()> {
        match *self {
            Format::Text => match occurrence {
                None => writeln!(wtr, "none")?,
                Some(occ) => writeln!(wtr, "{occ}")?,
            },
            Format::Json => {
                serde_json::to_writer(&mut wtr, &occurrence)?;
                writeln!(wtr)?;
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for Format {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Format> {
        Ok(match s {
            "text" => Format::Text,
            "json" => Format::Json,
            unk => anyhow::bail!("unrecognized format `{unk}`"),
        })
    }
}

impl std::fmt::Display for Format {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match *self {
            Format::Text => write!(f, "text"),
            Format::Json => write!(f, "json"),
        }
    }
}

/// A comma separated sequence of things.
///
/// That is, there's no support for quoting or escaping the commas.
///
/// This does not impose any requirements on the order of the sequence. It does
/// require that the sequence is not empty though.
#[derive(Clone, Debug)]
pub struct CommaSequence<T>(Vec<T>);

impl<T> CommaSequence<T> {
    /// Returns an iterator over every item in this sequence.
    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }
}

impl<T, E> std::str::FromStr for CommaSequence<T>
where
    T: std::str::FromStr<Err = E>,
    E: std::fmt::Display,
{
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<CommaSequence<T>> {
        let mut seq = vec![];
        for item in s.split(",") {
            seq.push(item.parse::<T>().map_err(|err| {
                anyhow::Error::msg(format!(
                    "failed to parse `{item}` \
                     within sequence `{s}`: {err}",
                ))
            })?);
        }
        anyhow::ensure!(!seq.is_empty(), "empty sequences are not allowed");
        Ok(CommaSequence(seq))
    }
}

/// A single item in a schedule, before it is interpreted for a kind.
///
/// The format is `value[..value]`, `all` or `none`. Values are kept as
/// strings here since what they mean depends on the kind. For example, `mar`
/// is a month but not a weekday.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ScheduleItem {
    /// Every legal value of the kind.
    All,
    /// No values at all.
    None,
    /// A single value.
    Single(String),
    /// An inclusive range of values.
    ///
    /// When `start` comes after `end`, the range wraps around, e.g.,
    /// `fri..mon` is Friday, Saturday, Sunday and Monday.
    Range { start: String, end: String },
}

impl ScheduleItem {
    /// Adds the values this item denotes for `kind` to `set`.
    ///
    /// Range endpoints are always added, even when they are outside the
    /// kind's valid range. This way, building a timetable from `set` reports
    /// them instead of silently clamping the range.
    fn insert_into(
        &self,
        kind: Kind,
        set: &mut ScheduleSet,
    ) -> anyhow::Result<()> {
        let valid = kind.valid_range();
        let last = valid.end - 1;
        match *self {
            ScheduleItem::All => set.extend(ScheduleSet::every(kind).iter()),
            ScheduleItem::None => {}
            ScheduleItem::Single(ref value) => {
                set.insert(schedule::parse_label(kind, value)?);
            }
            ScheduleItem::Range { ref start, ref end } => {
                let start = schedule::parse_label(kind, start)?;
                let end = schedule::parse_label(kind, end)?;
                set.insert(start);
                set.insert(end);
                if start <= end {
                    set.extend(start.max(valid.start)..=end.min(last));
                } else {
                    set.extend(start.max(valid.start)..=last);
                    set.extend(valid.start..=end.min(last));
                }
            }
        }
        Ok(())
    }
}

impl std::str::FromStr for ScheduleItem {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<ScheduleItem> {
        let s = s.trim();
        anyhow::ensure!(!s.is_empty(), "schedule items must not be empty");
        if s.eq_ignore_ascii_case("all") {
            return Ok(ScheduleItem::All);
        }
        if s.eq_ignore_ascii_case("none") {
            return Ok(ScheduleItem::None);
        }
        let Some((start, end)) = s.split_once("..") else {
            return Ok(ScheduleItem::Single(s.to_string()));
        };
        anyhow::ensure!(
            !start.trim().is_empty() && !end.trim().is_empty(),
            "ranges must have both a start and an end, but `{s}` does not",
        );
        Ok(ScheduleItem::Range {
            start: start.trim().to_string(),
            end: end.trim().to_string(),
        })
    }
}

/// The values of a timetable as written on the command line.
///
/// This is a comma separated sequence of `ScheduleItem`s, e.g.,
/// `mon..fri`, `9,12..13,5pm` or `1,15,last`.
#[derive(Clone, Debug)]
pub struct ScheduleValues(CommaSequence<ScheduleItem>);

impl ScheduleValues {
    pub const ARG: Usage = Usage::arg(
        "<schedule>",
        "The values that are on schedule, e.g., `mon..fri` or `1,15,last`.",
        r#"
The values that are on schedule.

This is a comma separated list of items. Each item is either a single value or
an inclusive range of values written as `start..end`. When `start` comes after
`end`, the range wraps around. For example, `fri..mon` for weekdays is Friday,
Saturday, Sunday and Monday, and `22..2` for hours is 10pm through 2am.

The special item `all` means every value of the kind and `none` means no
values at all. A timetable with no values never occurs.

Hours are written as `0` to `23`, or as 12-hour clock times like `9am` or
`5pm`.

Weekdays are written as `1` (Sunday) to `7` (Saturday), or by their English
names, either in full or abbreviated to three letters, e.g., `mon` or
`Tuesday`.

Days of the month are written as `1` to `31`. The value `31`, which may also be
written as `last`, matches the last day of every month.

Months are written as `1` to `12`, or by their English names, either in full or
abbreviated to three letters, e.g., `jan` or `March`.
"#,
    );

    /// Interprets these values for the given kind.
    pub fn to_set(&self, kind: Kind) -> anyhow::Result<ScheduleSet> {
        let mut set = ScheduleSet::new();
        for item in self.0.iter() {
            item.insert_into(kind, &mut set)?;
        }
        Ok(set)
    }
}

impl std::str::FromStr for ScheduleValues {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<ScheduleValues> {
        Ok(ScheduleValues(s.parse()?))
    }
}

/// A helper type for parsing the time budget of a command.
#[derive(Clone, Copy, Debug)]
pub struct Budget(Duration);

impl Budget {
    pub const USAGE: Usage = Usage::flag(
        "-t, --timeout <duration>",
        "Give up when computing occurrences takes longer than this.",
        r#"
Give up when computing occurrences takes longer than this.

The duration may be written in a friendly format, e.g., `2s` or
`1 minute 30 seconds`, or as an ISO 8601 duration, e.g., `PT2S`. It must be
positive. The default is `2s`.

When the time budget is exceeded, no occurrences are printed and the command
fails.
"#,
    );

    /// Return the time budget as a standard library duration.
    pub fn get(&self) -> Duration {
        self.0
    }
}

impl Default for Budget {
    fn default() -> Budget {
        Budget(Duration::from_secs(2))
    }
}

impl std::str::FromStr for Budget {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Budget> {
        let duration: SignedDuration = s
            .parse()
            .with_context(|| format!("failed to parse `{s}` as a duration"))?;
        anyhow::ensure!(
            duration.is_positive(),
            "timeout must be positive, but got `{s}`",
        );
        let duration = Duration::try_from(duration)
            .with_context(|| format!("timeout `{s}` is out of range"))?;
        Ok(Budget(duration))
    }
}

/// A helper type for parsing a flag indicating the "number of threads" to use.
///
/// This should be used in commands that support parallelism, so that users
/// can control their resource usage.
#[derive(Clone, Debug, Default)]
pub struct Threads {
    count: Option<NonZero<usize>>,
}

impl Threads {
    pub const USAGE: Usage = Usage::flag(
        "-j, --threads <number>",
        "Control the number of threads used by this command.",
        r#"
Control the number of threads used by this command.

When not set, this command will query your system to determine the number of
available cores to use.
"#,
    );

    /// Return the number of threads this command should use.
    ///
    /// If no flag was given, then the number of cores is queried here. If that
    /// fails, then a WARN-level log message is emitted and `1` is returned.
    pub fn get(&self) -> NonZero<usize> {
        if let Some(threads) = self.count {
            return threads;
        }
        match std::thread::available_parallelism() {
            Ok(available) => available,
            Err(err) => {
                log::warn!(
                    "failed to query available parallelism, \
                     falling back to single threaded mode: {err}",
                );
                NonZero::<usize>::MIN
            }
        }
    }
}

impl std::str::FromStr for Threads {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Threads> {
        let count: usize = s
            .parse()
            .with_context(|| format!("failed to parse `{s}` as an integer"))?;
        // I suppose we could make `0` mean "not given." But I was a little
        // unsure and so decided to be conservative.
        let count = NonZero::new(count).ok_or_else(|| {
            anyhow::anyhow!("number of threads must be greater than 0")
        })?;
        Ok(Threads { count: Some(count) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(kind: Kind, s: &str) -> Vec<i16> {
        let values: ScheduleValues = s.parse().unwrap();
        values.to_set(kind).unwrap().iter().collect()
    }

    #[test]
    fn schedule_values() {
        assert_eq!(set(Kind::Weekday, "mon..fri"), vec![2, 3, 4, 5, 6]);
        assert_eq!(set(Kind::Weekday, "fri..mon"), vec![1, 2, 6, 7]);
        assert_eq!(set(Kind::Weekday, "sun,sat"), vec![1, 7]);
        assert_eq!(
            set(Kind::HourOfDay, "9,12..13,5pm"),
            vec![9, 12, 13, 17],
        );
        assert_eq!(set(Kind::HourOfDay, "22..1"), vec![0, 1, 22, 23]);
        assert_eq!(set(Kind::DayOfMonth, "1, 15, last"), vec![1, 15, 31]);
        assert_eq!(set(Kind::DayOfMonth, "29..2"), vec![1, 2, 29, 30, 31]);
        assert_eq!(set(Kind::MonthOfYear, "nov..feb"), vec![1, 2, 11, 12]);
        assert_eq!(set(Kind::MonthOfYear, "all").len(), 12);
        for &kind in Kind::ALL {
            let every: Vec<i16> = ScheduleSet::every(kind).iter().collect();
            assert_eq!(set(kind, "all"), every, "{kind}");
            assert_eq!(set(kind, "none,all"), every, "{kind}");
        }
        assert_eq!(set(Kind::MonthOfYear, "none"), Vec::<i16>::new());
    }

    #[test]
    fn schedule_values_keep_out_of_range_endpoints() {
        assert_eq!(set(Kind::Weekday, "0..2"), vec![0, 1, 2]);
        assert_eq!(
            set(Kind::HourOfDay, "20..30"),
            vec![20, 21, 22, 23, 30],
        );
        assert_eq!(set(Kind::MonthOfYear, "13"), vec![13]);
    }

    #[test]
    fn schedule_values_errors() {
        let err = "mon..".parse::<ScheduleValues>().unwrap_err();
        insta::assert_snapshot!(
            err,
            @"failed to parse `mon..` within sequence `mon..`: ranges must have both a start and an end, but `mon..` does not",
        );
        let err = "1,,2".parse::<ScheduleValues>().unwrap_err();
        insta::assert_snapshot!(
            err,
            @"failed to parse `` within sequence `1,,2`: schedule items must not be empty",
        );
        let values: ScheduleValues = "mon".parse().unwrap();
        let err = values.to_set(Kind::MonthOfYear).unwrap_err();
        insta::assert_snapshot!(
            err,
            @"unrecognized value `mon` for months timetables",
        );
    }

    #[test]
    fn budget() {
        assert_eq!(
            "2s".parse::<Budget>().unwrap().get(),
            Duration::from_secs(2),
        );
        assert_eq!(
            "PT0.5S".parse::<Budget>().unwrap().get(),
            Duration::from_millis(500),
        );
        assert_eq!(
            "1m 30s".parse::<Budget>().unwrap().get(),
            Duration::from_secs(90),
        );
        assert!("0s".parse::<Budget>().is_err());
        assert!("-5s".parse::<Budget>().is_err());
        assert!("soon".parse::<Budget>().is_err());
    }

    #[test]
    fn format_writes_lines() {
        use crate::calendar::{Interval, zoned};

        let occ = Interval::new(
            zoned("2024-07-21T00:00[America/New_York]"),
            zoned("2024-07-22T00:00[America/New_York]"),
        );
        let mut out = vec![];
        Format::Text.write(&mut out, Some(&occ)).unwrap();
        Format::Text.write(&mut out, None).unwrap();
        Format::Json.write(&mut out, Some(&occ)).unwrap();
        Format::Json.write(&mut out, None).unwrap();
        insta::assert_snapshot!(String::from_utf8(out).unwrap(), @r#"
        2024-07-21T00:00:00-04:00[America/New_York]/2024-07-22T00:00:00-04:00[America/New_York]
        none
        {"start":"2024-07-21T00:00:00-04:00[America/New_York]","end":"2024-07-22T00:00:00-04:00[America/New_York]"}
        null
        "#);
    }
}
