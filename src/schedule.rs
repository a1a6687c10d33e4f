use std::{collections::BTreeSet, ops::Range};

use crate::kind::Kind;

/// The day of month value that doubles as "the last day of the month."
///
/// In months shorter than 31 days, a day of month timetable containing this
/// value also matches the month's actual last day.
pub const LAST_DAY_OF_MONTH: i16 = 31;

/// The set of match field values that are "on schedule" for a timetable.
///
/// A set on its own isn't tied to any kind. It is checked against one when
/// a `Generator` is built from it. An empty set is a timetable that never
/// occurs.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ScheduleSet {
    values: BTreeSet<i16>,
}

impl ScheduleSet {
    /// Create a new empty set.
    pub fn new() -> ScheduleSet {
        ScheduleSet::default()
    }

    /// Create the set of every legal value for the given kind.
    pub fn every(kind: Kind) -> ScheduleSet {
        kind.valid_range().collect()
    }

    pub fn insert(&mut self, value: i16) -> bool {
        self.values.insert(value)
    }

    pub fn contains(&self, value: i16) -> bool {
        self.values.contains(&value)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns the values in this set in ascending order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = i16> + '_ {
        self.values.iter().copied()
    }

    /// Returns the smallest value in this set strictly greater than `value`.
    pub fn first_above(&self, value: i16) -> Option<i16> {
        self.values.range(value.saturating_add(1)..).next().copied()
    }

    /// Returns the largest value in this set strictly less than `value`.
    pub fn last_below(&self, value: i16) -> Option<i16> {
        self.values.range(..value).next_back().copied()
    }

    /// Returns an error if any value in this set is outside the valid range
    /// of the given kind.
    pub fn validate(&self, kind: Kind) -> Result<(), ScheduleValueOutOfRange> {
        let range = kind.valid_range();
        match self.iter().find(|v| !range.contains(v)) {
            None => Ok(()),
            Some(value) => Err(ScheduleValueOutOfRange { kind, value }),
        }
    }
}

impl FromIterator<i16> for ScheduleSet {
    fn from_iter<I: IntoIterator<Item = i16>>(it: I) -> ScheduleSet {
        ScheduleSet { values: it.into_iter().collect() }
    }
}

impl Extend<i16> for ScheduleSet {
    fn extend<I: IntoIterator<Item = i16>>(&mut self, it: I) {
        self.values.extend(it);
    }
}

impl<const N: usize> From<[i16; N]> for ScheduleSet {
    fn from(values: [i16; N]) -> ScheduleSet {
        values.into_iter().collect()
    }
}

/// The error returned when a schedule set contains a value that its kind
/// can never match.
///
/// This is only ever reported when building a timetable. Callers can
/// recover it from an `anyhow::Error` via `downcast_ref`.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ScheduleValueOutOfRange {
    kind: Kind,
    value: i16,
}

impl std::fmt::Display for ScheduleValueOutOfRange {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let Range { start, end } = self.kind.valid_range();
        write!(
            f,
            "schedule value `{value}` is out of range for {kind} \
             timetables, which require values in `{start}..={last}`",
            value = self.value,
            kind = self.kind,
            last = end - 1,
        )
    }
}

impl std::error::Error for ScheduleValueOutOfRange {}

const WEEKDAY_NAMES: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Returns a human readable label for a schedule value of the given kind.
///
/// Weekdays and months get their English names. The last day of month
/// sentinel is labeled `last`. Everything else is just the number.
pub fn label(kind: Kind, value: i16) -> String {
    let name = |names: &[&str], first: i16| {
        usize::try_from(value - first)
            .ok()
            .and_then(|i| names.get(i))
            .map(|name| name.to_string())
    };
    let named = match kind {
        Kind::Weekday => name(&WEEKDAY_NAMES, 1),
        Kind::MonthOfYear => name(&MONTH_NAMES, 1),
        Kind::DayOfMonth if value == LAST_DAY_OF_MONTH => {
            Some("last".to_string())
        }
        Kind::DayOfMonth | Kind::HourOfDay => None,
    };
    named.unwrap_or_else(|| value.to_string())
}

/// Parses a single schedule value of the given kind.
///
/// Every kind accepts a plain integer. Weekdays and months also accept their
/// English names, either in full or abbreviated to their first three
/// letters. Days of the month accept `last` for the last day of the month,
/// and hours accept 12-hour clock times like `9am` or `12pm`. Matching is
/// case insensitive.
///
/// Integers are not checked against the kind's valid range here. That
/// happens when a timetable is built from the values.
pub fn parse_label(kind: Kind, s: &str) -> anyhow::Result<i16> {
    let lower = s.trim().to_lowercase();
    if let Ok(value) = lower.parse::<i16>() {
        return Ok(value);
    }
    let find = |names: &[&str], first: i16| -> Option<i16> {
        let i = names.iter().position(|name| {
            let name = name.to_lowercase();
            lower == name || (lower.len() == 3 && name.starts_with(&lower))
        })?;
        i16::try_from(i).ok().map(|i| first + i)
    };
    let value = match kind {
        Kind::Weekday => find(&WEEKDAY_NAMES, 1),
        Kind::MonthOfYear => find(&MONTH_NAMES, 1),
        Kind::DayOfMonth if lower == "last" => Some(LAST_DAY_OF_MONTH),
        Kind::DayOfMonth => None,
        Kind::HourOfDay => return parse_twelve_hour(&lower),
    };
    value.ok_or_else(|| {
        anyhow::anyhow!("unrecognized value `{s}` for {kind} timetables")
    })
}

/// Parses `1am..12am` and `1pm..12pm` into an hour of the day.
fn parse_twelve_hour(s: &str) -> anyhow::Result<i16> {
    let (hour, pm) = if let Some(hour) = s.strip_suffix("am") {
        (hour, false)
    } else if let Some(hour) = s.strip_suffix("pm") {
        (hour, true)
    } else {
        anyhow::bail!("unrecognized value `{s}` for hours timetables");
    };
    let hour: i16 = hour.trim().parse().map_err(|_| {
        anyhow::anyhow!("unrecognized value `{s}` for hours timetables")
    })?;
    anyhow::ensure!(
        (1..=12).contains(&hour),
        "invalid 12-hour clock time `{s}`, the hour must be in `1..=12`",
    );
    Ok((hour % 12) + if pm { 12 } else { 0 })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neighbors() {
        let set = ScheduleSet::from([1, 15, 31]);
        assert_eq!(set.first_above(0), Some(1));
        assert_eq!(set.first_above(1), Some(15));
        assert_eq!(set.first_above(20), Some(31));
        assert_eq!(set.first_above(31), None);
        assert_eq!(set.last_below(1), None);
        assert_eq!(set.last_below(15), Some(1));
        assert_eq!(set.last_below(32), Some(31));
    }

    #[test]
    fn validation() {
        assert!(ScheduleSet::from([0, 23]).validate(Kind::HourOfDay).is_ok());
        assert!(ScheduleSet::new().validate(Kind::Weekday).is_ok());
        assert!(ScheduleSet::every(Kind::DayOfMonth)
            .validate(Kind::DayOfMonth)
            .is_ok());

        let err =
            ScheduleSet::from([3, 24]).validate(Kind::HourOfDay).unwrap_err();
        assert_eq!(
            err,
            ScheduleValueOutOfRange { kind: Kind::HourOfDay, value: 24 },
        );
        insta::assert_snapshot!(
            err,
            @"schedule value `24` is out of range for hours timetables, which require values in `0..=23`",
        );

        let err =
            ScheduleSet::from([0, 1]).validate(Kind::Weekday).unwrap_err();
        assert_eq!(err.value, 0);
        let err =
            ScheduleSet::from([13]).validate(Kind::MonthOfYear).unwrap_err();
        assert_eq!(err.value, 13);
        let err =
            ScheduleSet::from([32]).validate(Kind::DayOfMonth).unwrap_err();
        assert_eq!(err.value, 32);
    }

    #[test]
    fn every() {
        assert_eq!(ScheduleSet::every(Kind::HourOfDay).len(), 24);
        assert_eq!(ScheduleSet::every(Kind::Weekday).len(), 7);
        assert_eq!(ScheduleSet::every(Kind::DayOfMonth).len(), 31);
        assert_eq!(ScheduleSet::every(Kind::MonthOfYear).len(), 12);
    }

    #[test]
    fn labels() {
        assert_eq!(label(Kind::Weekday, 1), "Sunday");
        assert_eq!(label(Kind::Weekday, 7), "Saturday");
        assert_eq!(label(Kind::MonthOfYear, 2), "February");
        assert_eq!(label(Kind::DayOfMonth, 15), "15");
        assert_eq!(label(Kind::DayOfMonth, 31), "last");
        assert_eq!(label(Kind::HourOfDay, 0), "0");
        // Not a legal value, but labeling it shouldn't fail.
        assert_eq!(label(Kind::Weekday, 9), "9");
    }

    #[test]
    fn parse_labels() {
        assert_eq!(parse_label(Kind::Weekday, "sun").unwrap(), 1);
        assert_eq!(parse_label(Kind::Weekday, "Monday").unwrap(), 2);
        assert_eq!(parse_label(Kind::Weekday, "SAT").unwrap(), 7);
        assert_eq!(parse_label(Kind::Weekday, "4").unwrap(), 4);
        assert_eq!(parse_label(Kind::MonthOfYear, "feb").unwrap(), 2);
        assert_eq!(parse_label(Kind::MonthOfYear, "December").unwrap(), 12);
        assert_eq!(parse_label(Kind::DayOfMonth, "last").unwrap(), 31);
        assert_eq!(parse_label(Kind::DayOfMonth, "15").unwrap(), 15);
        assert_eq!(parse_label(Kind::HourOfDay, "12am").unwrap(), 0);
        assert_eq!(parse_label(Kind::HourOfDay, "9am").unwrap(), 9);
        assert_eq!(parse_label(Kind::HourOfDay, "12pm").unwrap(), 12);
        assert_eq!(parse_label(Kind::HourOfDay, "11PM").unwrap(), 23);
        // Out of range integers are left for validation to reject.
        assert_eq!(parse_label(Kind::HourOfDay, "24").unwrap(), 24);

        insta::assert_snapshot!(
            parse_label(Kind::Weekday, "mo").unwrap_err(),
            @"unrecognized value `mo` for weekdays timetables",
        );
        insta::assert_snapshot!(
            parse_label(Kind::MonthOfYear, "last").unwrap_err(),
            @"unrecognized value `last` for months timetables",
        );
        insta::assert_snapshot!(
            parse_label(Kind::HourOfDay, "13pm").unwrap_err(),
            @"invalid 12-hour clock time `13pm`, the hour must be in `1..=12`",
        );
    }
}
