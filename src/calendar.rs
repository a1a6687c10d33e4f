/*!
Gregorian calendar primitives used by the rest of timetable.

Everything here is a thin layer over Jiff's `Zoned` type. The point of this
module is to give names to the handful of calendar "fields" that timetables
care about, and to answer the same five questions for each of them: what is
the value of a field for an instant, what instant do you get by adding some
amount of a field, what interval does a field's unit cover, what values can a
field legally take and how many whole units of a field lie between two
instants.
*/

use std::ops::Range;

use {
    anyhow::Context,
    jiff::{Span, Unit, Zoned, civil},
};

/// A calendar field.
///
/// These correspond to the fields a timetable can match on (hour, weekday,
/// day, month) plus the coarser fields used to measure distances between
/// instants (year, week of year).
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Field {
    Year,
    Month,
    WeekOfYear,
    Day,
    Weekday,
    Hour,
}

impl Field {
    /// Returns a short human readable name for this field.
    pub fn name(self) -> &'static str {
        match self {
            Field::Year => "year",
            Field::Month => "month",
            Field::WeekOfYear => "week-of-year",
            Field::Day => "day",
            Field::Weekday => "weekday",
            Field::Hour => "hour",
        }
    }

    /// Returns the integer value of this field for the given instant.
    ///
    /// Weekdays are numbered from `1` (Sunday) to `7` (Saturday). Weeks of
    /// the year follow ISO 8601 week numbering.
    pub fn component(self, zdt: &Zoned) -> i16 {
        match self {
            Field::Year => zdt.year(),
            Field::Month => i16::from(zdt.month()),
            Field::WeekOfYear => {
                i16::from(zdt.date().iso_week_date().week())
            }
            Field::Day => i16::from(zdt.day()),
            Field::Weekday => {
                i16::from(zdt.weekday().to_sunday_one_offset())
            }
            Field::Hour => i16::from(zdt.hour()),
        }
    }

    /// Adds `amount` units of this field to the given instant.
    ///
    /// Adding weekdays is the same as adding days. Calendar units respect
    /// month lengths and leap years, so adding one month to January 31
    /// lands on the last day of February.
    ///
    /// Hours are physical. So adding one hour at the start of a wall clock
    /// hour that repeats at a daylight saving time transition lands on the
    /// start of its repetition.
    pub fn add(self, amount: i64, zdt: &Zoned) -> anyhow::Result<Zoned> {
        zdt.checked_add(self.span(amount)?).with_context(|| {
            format!(
                "failed to add {amount} {field} unit(s) to `{zdt}`",
                field = self.name(),
            )
        })
    }

    /// Returns the half-open interval covered by the unit of this field that
    /// contains the given instant.
    ///
    /// For example, the `Day` interval of `2024-03-10T14:00` is
    /// `[2024-03-10T00:00, 2024-03-11T00:00)`. Weeks start on Monday.
    ///
    /// An hour interval is always exactly one hour long. When a wall clock
    /// hour repeats, the interval is the repetition containing `zdt`.
    pub fn interval(self, zdt: &Zoned) -> anyhow::Result<Interval> {
        let context = || {
            format!(
                "failed to find {field} interval containing `{zdt}`",
                field = self.name(),
            )
        };
        let start = match self {
            Field::Year => zdt.first_of_year().and_then(|z| z.start_of_day()),
            Field::Month => {
                zdt.first_of_month().and_then(|z| z.start_of_day())
            }
            Field::WeekOfYear => zdt
                .tomorrow()
                .and_then(|z| z.nth_weekday(-1, civil::Weekday::Monday))
                .and_then(|z| z.start_of_day()),
            Field::Day | Field::Weekday => zdt.start_of_day(),
            // This keeps the offset of `zdt` when the truncated wall clock
            // time is ambiguous.
            Field::Hour => {
                zdt.with().minute(0).second(0).subsec_nanosecond(0).build()
            }
        }
        .with_context(context)?;
        let end = self.add(1, &start).with_context(context)?;
        // Adding a calendar unit to the start of a day can land somewhere
        // other than the start of a day when time zone transitions are
        // involved. So we snap back to the start of the day.
        let end = match self {
            Field::Hour => end,
            _ => end.start_of_day().with_context(context)?,
        };
        Ok(Interval::new(start, end))
    }

    /// Returns the maximum legal range of values for this field.
    ///
    /// The upper bound is exclusive. For example, hours are in `0..24` and
    /// days of the month are in `1..32`, even though not every month has 31
    /// days.
    ///
    /// Years are bounded by what Jiff supports.
    pub fn maximum_range(self) -> Range<i16> {
        match self {
            Field::Year => -9999..10000,
            Field::Month => 1..13,
            Field::WeekOfYear => 1..54,
            Field::Day => 1..32,
            Field::Weekday => 1..8,
            Field::Hour => 0..24,
        }
    }

    /// Returns the number of whole units of this field from `start` until
    /// `end`.
    ///
    /// The result is truncated toward zero and is negative when `end` comes
    /// before `start`. Like `Field::add`, hours are physical.
    pub fn difference(
        self,
        start: &Zoned,
        end: &Zoned,
    ) -> anyhow::Result<i64> {
        let span = start.until((self.unit(), end)).with_context(|| {
            format!(
                "failed to compute {field} difference between \
                 `{start}` and `{end}`",
                field = self.name(),
            )
        })?;
        let amount = match self {
            Field::Year => i64::from(span.get_years()),
            Field::Month => i64::from(span.get_months()),
            Field::WeekOfYear => i64::from(span.get_weeks()),
            Field::Day | Field::Weekday => i64::from(span.get_days()),
            Field::Hour => i64::from(span.get_hours()),
        };
        Ok(amount)
    }

    fn unit(self) -> Unit {
        match self {
            Field::Year => Unit::Year,
            Field::Month => Unit::Month,
            Field::WeekOfYear => Unit::Week,
            Field::Day | Field::Weekday => Unit::Day,
            Field::Hour => Unit::Hour,
        }
    }

    fn span(self, amount: i64) -> anyhow::Result<Span> {
        let span = match self {
            Field::Year => Span::new().try_years(amount),
            Field::Month => Span::new().try_months(amount),
            Field::WeekOfYear => Span::new().try_weeks(amount),
            Field::Day | Field::Weekday => Span::new().try_days(amount),
            Field::Hour => Span::new().try_hours(amount),
        };
        span.with_context(|| {
            format!(
                "{amount} is out of range for a span of {field} units",
                field = self.name(),
            )
        })
    }
}

impl std::fmt::Display for Field {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Returns the range of days in the month containing the given date.
///
/// Like `Field::maximum_range`, the upper bound is exclusive. So for
/// February in a leap year, this returns `1..30`.
pub fn days_of_month(date: civil::Date) -> Range<i16> {
    1..i16::from(date.days_in_month()) + 1
}

/// A half-open interval of time, `[start, end)`.
///
/// This is the shape of every timetable occurrence, and also of the ranges
/// that occurrences are materialized within.
#[derive(Clone, Debug, Eq, PartialEq, serde::Serialize)]
pub struct Interval {
    start: Zoned,
    end: Zoned,
}

impl Interval {
    /// Create a new interval from `start` (inclusive) to `end` (exclusive).
    ///
    /// Callers must ensure `start <= end`.
    pub fn new(start: Zoned, end: Zoned) -> Interval {
        debug_assert!(start <= end, "interval start must precede its end");
        Interval { start, end }
    }

    /// Create a new interval, returning an error if `end` comes before
    /// `start`.
    pub fn try_new(start: Zoned, end: Zoned) -> anyhow::Result<Interval> {
        anyhow::ensure!(
            start <= end,
            "the end of an interval (`{end}`) must not come before \
             its start (`{start}`)",
        );
        Ok(Interval { start, end })
    }

    pub fn start(&self) -> &Zoned {
        &self.start
    }

    pub fn end(&self) -> &Zoned {
        &self.end
    }

    /// Returns true when the given interval lies entirely within this one.
    pub fn encloses(&self, other: &Interval) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

impl std::fmt::Display for Interval {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{}/{}", self.start, self.end)
    }
}

#[cfg(test)]
pub(crate) fn zoned(s: &str) -> Zoned {
    s.parse().unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn components() {
        // A Tuesday.
        let zdt = zoned("2024-02-13T17:45[America/New_York]");
        assert_eq!(Field::Hour.component(&zdt), 17);
        assert_eq!(Field::Weekday.component(&zdt), 3);
        assert_eq!(Field::Day.component(&zdt), 13);
        assert_eq!(Field::Month.component(&zdt), 2);
        assert_eq!(Field::WeekOfYear.component(&zdt), 7);

        let sunday = zoned("2024-02-11T00:00[America/New_York]");
        assert_eq!(Field::Weekday.component(&sunday), 1);
        let saturday = zoned("2024-02-17T00:00[America/New_York]");
        assert_eq!(Field::Weekday.component(&saturday), 7);
    }

    #[test]
    fn add_respects_month_lengths() {
        let zdt = zoned("2024-01-31T09:00[UTC]");
        let got = Field::Month.add(1, &zdt).unwrap();
        assert_eq!(got, zoned("2024-02-29T09:00[UTC]"));

        let got = Field::Year.add(1, &zoned("2024-02-29T09:00[UTC]")).unwrap();
        assert_eq!(got, zoned("2025-02-28T09:00[UTC]"));

        let got = Field::Weekday.add(-3, &zdt).unwrap();
        assert_eq!(got, zoned("2024-01-28T09:00[UTC]"));
    }

    #[test]
    fn intervals() {
        let zdt = zoned("2024-02-13T17:45:10.5[UTC]");
        let hour = Field::Hour.interval(&zdt).unwrap();
        assert_eq!(hour.start(), &zoned("2024-02-13T17:00[UTC]"));
        assert_eq!(hour.end(), &zoned("2024-02-13T18:00[UTC]"));

        let day = Field::Weekday.interval(&zdt).unwrap();
        assert_eq!(day.start(), &zoned("2024-02-13T00:00[UTC]"));
        assert_eq!(day.end(), &zoned("2024-02-14T00:00[UTC]"));

        let week = Field::WeekOfYear.interval(&zdt).unwrap();
        assert_eq!(week.start(), &zoned("2024-02-12T00:00[UTC]"));
        assert_eq!(week.end(), &zoned("2024-02-19T00:00[UTC]"));

        let month = Field::Month.interval(&zdt).unwrap();
        assert_eq!(month.start(), &zoned("2024-02-01T00:00[UTC]"));
        assert_eq!(month.end(), &zoned("2024-03-01T00:00[UTC]"));

        let year = Field::Year.interval(&zdt).unwrap();
        assert_eq!(year.start(), &zoned("2024-01-01T00:00[UTC]"));
        assert_eq!(year.end(), &zoned("2025-01-01T00:00[UTC]"));
    }

    // The day containing a "spring forward" transition is only 23 hours
    // long, but its interval should still go from midnight to midnight.
    #[test]
    fn day_interval_across_dst() {
        let zdt = zoned("2024-03-10T12:00[America/New_York]");
        let day = Field::Day.interval(&zdt).unwrap();
        assert_eq!(day.start(), &zoned("2024-03-10T00:00[America/New_York]"));
        assert_eq!(day.end(), &zoned("2024-03-11T00:00[America/New_York]"));
    }

    // New York repeats the 1am hour when it "falls back". Each repetition
    // is its own hour.
    #[test]
    fn hour_interval_across_dst() {
        let edt = zoned("2024-11-03T01:30-04:00[America/New_York]");
        let hour = Field::Hour.interval(&edt).unwrap();
        assert_eq!(
            hour.to_string(),
            "2024-11-03T01:00:00-04:00[America/New_York]\
             /2024-11-03T01:00:00-05:00[America/New_York]",
        );
        let len = Field::Hour.difference(hour.start(), hour.end()).unwrap();
        assert_eq!(len, 1);

        let est = zoned("2024-11-03T01:30-05:00[America/New_York]");
        let hour = Field::Hour.interval(&est).unwrap();
        assert_eq!(
            hour.to_string(),
            "2024-11-03T01:00:00-05:00[America/New_York]\
             /2024-11-03T02:00:00-05:00[America/New_York]",
        );

        let midnight = zoned("2024-11-03T00:00[America/New_York]");
        let three = zoned("2024-11-03T03:00[America/New_York]");
        assert_eq!(Field::Hour.difference(&midnight, &three).unwrap(), 4);
        assert_eq!(
            Field::Hour.add(2, &midnight).unwrap().to_string(),
            "2024-11-03T01:00:00-05:00[America/New_York]",
        );
    }

    #[test]
    fn differences() {
        let start = zoned("2023-01-15T00:00[UTC]");
        let end = zoned("2024-03-14T00:00[UTC]");
        assert_eq!(Field::Year.difference(&start, &end).unwrap(), 1);
        assert_eq!(Field::Month.difference(&start, &end).unwrap(), 13);
        assert_eq!(Field::WeekOfYear.difference(&start, &end).unwrap(), 60);
        assert_eq!(Field::Day.difference(&start, &end).unwrap(), 424);
        assert_eq!(Field::Year.difference(&end, &start).unwrap(), -1);
    }

    #[test]
    fn month_day_ranges() {
        assert_eq!(days_of_month(civil::date(2024, 2, 10)), 1..30);
        assert_eq!(days_of_month(civil::date(2023, 2, 10)), 1..29);
        assert_eq!(days_of_month(civil::date(2023, 4, 30)), 1..31);
        assert_eq!(days_of_month(civil::date(2023, 12, 1)), 1..32);
    }
}
