use std::ops::Range;

use crate::{args::Usage, calendar::Field};

/// The calendar granularity a timetable is defined over.
///
/// Each kind is a small static record: which field of an instant is matched
/// against a timetable's values, which field defines how long a single
/// occurrence lasts, the legal values of the matched field and which coarser
/// fields are used to measure distances when splitting ranges into chunks.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Kind {
    HourOfDay,
    Weekday,
    DayOfMonth,
    MonthOfYear,
}

impl Kind {
    pub const ALL: &'static [Kind] =
        &[Kind::HourOfDay, Kind::Weekday, Kind::DayOfMonth, Kind::MonthOfYear];

    pub const ARG: Usage = Usage::arg(
        "<kind>",
        "The kind of timetable: hours, weekdays, days or months.",
        r#"
The kind of timetable.

A timetable matches exactly one calendar field of a datetime. The kind selects
which one:

hours, hour, hour-of-day: the hour of the day, from 0 to 23. Each occurrence
lasts one hour.

weekdays, weekday: the day of the week, from 1 (Sunday) to 7 (Saturday). Each
occurrence lasts one day.

days, day, day-of-month: the day of the month, from 1 to 31. Each occurrence
lasts one day. The value 31 also matches the last day of months that are
shorter than 31 days.

months, month, month-of-year: the month of the year, from 1 to 12. Each
occurrence lasts one month.
"#,
    );

    /// The field of an instant that is tested for membership in a timetable.
    pub fn match_field(self) -> Field {
        match self {
            Kind::HourOfDay => Field::Hour,
            Kind::Weekday => Field::Weekday,
            Kind::DayOfMonth => Field::Day,
            Kind::MonthOfYear => Field::Month,
        }
    }

    /// The field whose unit is the length of a single occurrence.
    ///
    /// A weekday occurrence lasts a day. Every other kind lasts one unit of
    /// the field it matches on.
    pub fn duration_field(self) -> Field {
        match self {
            Kind::Weekday => Field::Day,
            _ => self.match_field(),
        }
    }

    /// The legal values of this kind's match field. The upper bound is
    /// exclusive.
    pub fn valid_range(self) -> Range<i16> {
        self.match_field().maximum_range()
    }

    /// The fields used to measure the distance between two instants, from
    /// coarsest to finest.
    pub fn distance_fields(self) -> &'static [Field] {
        match self {
            Kind::HourOfDay => {
                &[Field::Year, Field::Month, Field::WeekOfYear, Field::Day]
            }
            Kind::Weekday => &[Field::Year, Field::Month, Field::WeekOfYear],
            Kind::DayOfMonth => &[Field::Year, Field::Month],
            Kind::MonthOfYear => &[Field::Year],
        }
    }

    /// A short name for this kind, suitable for display.
    pub fn name(self) -> &'static str {
        match self {
            Kind::HourOfDay => "hours",
            Kind::Weekday => "weekdays",
            Kind::DayOfMonth => "days",
            Kind::MonthOfYear => "months",
        }
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl std::str::FromStr for Kind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Kind> {
        let kind = match &*s.to_lowercase() {
            "hours" | "hour" | "hour-of-day" => Kind::HourOfDay,
            "weekdays" | "weekday" => Kind::Weekday,
            "days" | "day" | "day-of-month" => Kind::DayOfMonth,
            "months" | "month" | "month-of-year" => Kind::MonthOfYear,
            unk => anyhow::bail!("unrecognized timetable kind: `{unk}`"),
        };
        Ok(kind)
    }
}
