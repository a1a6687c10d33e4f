/*!
The nearest match generator.

Given a kind and a set of on-schedule values, a generator answers one
question: what is the occurrence on, immediately before or immediately after a
particular instant? Everything else (range materialization, containment
tests) is built on top of that question.

For weekdays and months, the search is simple modular arithmetic over the
kind's valid range. Hours are searched one physical hour at a time instead,
since daylight saving time transitions skip or repeat wall clock hours. Day of
month timetables get their own month-by-month search, since months have
different lengths and the value `31` doubles as "the last day of the month."
*/

use jiff::{ToSpan, Zoned, civil};

use crate::{
    args::Usage,
    calendar::{Field, Interval, days_of_month},
    kind::Kind,
    schedule::{LAST_DAY_OF_MONTH, ScheduleSet},
};

/// A single concrete activation of a timetable.
///
/// Its span is exactly one unit of its kind's duration field.
pub type Occurrence = Interval;

/// The most months the day of month search will look through before giving
/// up. Any non-empty day of month set has a match well within this bound.
const MAX_MONTHS_SEARCHED: i64 = 12;

/// The most hours the hour of day search will look through before giving up.
/// Every wall clock hour occurs at least once in any two consecutive days.
const MAX_HOURS_SEARCHED: i64 = 48;

/// Where to look for an occurrence relative to an instant.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum Direction {
    /// The occurrence containing the instant.
    On,
    /// The nearest occurrence strictly before the unit containing the
    /// instant.
    FirstBefore,
    /// The nearest occurrence strictly after the unit containing the instant.
    FirstAfter,
}

impl Direction {
    pub const USAGE: Usage = Usage::flag(
        "-d, --direction <direction>",
        "Where to look for an occurrence: on, before or after.",
        r#"
Where to look for an occurrence relative to each datetime.

on: the occurrence containing the datetime, if the datetime is on schedule.
This is the default.

before: the nearest occurrence that ends before the calendar unit containing
the datetime. Also spelled first-before or prev.

after: the nearest occurrence that starts after the calendar unit containing
the datetime. Also spelled first-after or next.
"#,
    );
}

impl std::str::FromStr for Direction {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Direction> {
        let direction = match &*s.to_lowercase() {
            "on" => Direction::On,
            "before" | "first-before" | "prev" => Direction::FirstBefore,
            "after" | "first-after" | "next" => Direction::FirstAfter,
            unk => anyhow::bail!("unrecognized direction: `{unk}`"),
        };
        Ok(direction)
    }
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let label = match *self {
            Direction::On => "on",
            Direction::FirstBefore => "before",
            Direction::FirstAfter => "after",
        };
        f.write_str(label)
    }
}

/// Anything that can find the occurrence nearest to an instant.
///
/// Implementations must be pure: the same instant and direction always
/// produce the same answer, no matter which thread asks. The range
/// materializer relies on this to compute chunks of a range concurrently.
pub trait Schedule: Send + Sync {
    /// Returns the occurrence in the given direction from `at`, or `None`
    /// when there is no such occurrence.
    fn matching(&self, at: &Zoned, direction: Direction) -> Option<Occurrence>;
}

impl<S: Schedule + ?Sized> Schedule for &S {
    fn matching(
        &self,
        at: &Zoned,
        direction: Direction,
    ) -> Option<Occurrence> {
        (**self).matching(at, direction)
    }
}

impl<S: Schedule + ?Sized> Schedule for std::sync::Arc<S> {
    fn matching(
        &self,
        at: &Zoned,
        direction: Direction,
    ) -> Option<Occurrence> {
        (**self).matching(at, direction)
    }
}

/// A nearest match generator for one kind and one set of on-schedule values.
///
/// A generator is immutable once built. Building a new one is the only way
/// to change its values.
#[derive(Clone, Debug)]
pub struct Generator {
    kind: Kind,
    values: ScheduleSet,
}

impl Generator {
    /// Build a generator for the given kind and values.
    ///
    /// This returns a `ScheduleValueOutOfRange` error (wrapped in an
    /// `anyhow::Error`) when any value is outside the kind's valid range.
    /// An empty set of values is fine: the resulting generator never
    /// matches anything.
    pub fn new(kind: Kind, values: ScheduleSet) -> anyhow::Result<Generator> {
        values.validate(kind)?;
        if values.is_empty() {
            log::debug!("{kind} timetable has no values, it will never match");
        }
        Ok(Generator { kind, values })
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn values(&self) -> &ScheduleSet {
        &self.values
    }

    /// Returns true when this generator can never produce an occurrence.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Returns the occurrence in the given direction from `at`.
    ///
    /// `None` is returned when the set of values is empty, or when there is
    /// no datetime for the occurrence that Jiff can represent (which can only
    /// happen at the very edges of its supported range).
    pub fn matching(
        &self,
        at: &Zoned,
        direction: Direction,
    ) -> Option<Occurrence> {
        let result = if self.kind == Kind::HourOfDay {
            self.hour_matching(at, direction)
        } else {
            let shift = self.shift(at, direction)?;
            let field = self.kind.duration_field();
            if shift == 0 {
                field.interval(at).map(Some)
            } else {
                field
                    .add(shift, at)
                    .and_then(|zdt| field.interval(&zdt))
                    .map(Some)
            }
        };
        match result {
            Ok(occurrence) => occurrence,
            Err(err) => {
                log::debug!(
                    "no occurrence {direction} `{at}` for {kind} \
                     timetable: {err:#}",
                    kind = self.kind,
                );
                None
            }
        }
    }

    /// The hour of day version of `matching`.
    ///
    /// Candidates are found by stepping whole physical hours away from the
    /// hour containing `at`. So a wall clock hour that repeats occurs twice
    /// and one that is skipped doesn't occur at all.
    fn hour_matching(
        &self,
        at: &Zoned,
        direction: Direction,
    ) -> anyhow::Result<Option<Occurrence>> {
        if self.values.is_empty() {
            return Ok(None);
        }
        let on = |hour: &Interval| {
            self.values.contains(Field::Hour.component(hour.start()))
        };
        let current = Field::Hour.interval(at)?;
        let step = match direction {
            Direction::On => return Ok(on(&current).then_some(current)),
            Direction::FirstBefore => -1,
            Direction::FirstAfter => 1,
        };
        for n in 1..=MAX_HOURS_SEARCHED {
            let zdt = Field::Hour.add(step * n, current.start())?;
            let hour = Field::Hour.interval(&zdt)?;
            // Truncating to the hour can land back inside the current hour
            // in time zones with transitions of less than an hour.
            let beyond = match direction {
                Direction::FirstBefore => hour.end() <= current.start(),
                _ => hour.start() >= current.end(),
            };
            if beyond && on(&hour) {
                return Ok(Some(hour));
            }
        }
        log::debug!(
            "no hour {direction} `{at}` found within \
             {MAX_HOURS_SEARCHED} hours",
        );
        Ok(None)
    }

    /// Returns the number of duration field units between `at` and the
    /// occurrence in the given direction.
    fn shift(&self, at: &Zoned, direction: Direction) -> Option<i64> {
        if self.values.is_empty() {
            return None;
        }
        if self.kind == Kind::DayOfMonth {
            return self.day_shift(at.date(), direction);
        }
        let value = self.kind.match_field().component(at);
        let step = match direction {
            Direction::On => return self.values.contains(value).then_some(0),
            Direction::FirstBefore => -1,
            Direction::FirstAfter => 1,
        };
        let range = self.kind.valid_range();
        let (lo, len) =
            (i64::from(range.start), i64::from(range.end - range.start));
        // A full cycle comes back around to `value` itself, which is the
        // answer when it's the only value in the set.
        (1..=len).map(|n| step * n).find(|&shift| {
            let candidate =
                (i64::from(value) - lo + shift).rem_euclid(len) + lo;
            // OK because `candidate` is always within `range`.
            self.values.contains(candidate as i16)
        })
    }

    /// The day of month version of `shift`, in days.
    fn day_shift(
        &self,
        date: civil::Date,
        direction: Direction,
    ) -> Option<i64> {
        let day = i16::from(date.day());
        let last = days_of_month(date).end - 1;
        let has_last = self.values.contains(LAST_DAY_OF_MONTH);
        match direction {
            Direction::On => {
                let on =
                    self.values.contains(day) || (has_last && day == last);
                on.then_some(0)
            }
            Direction::FirstBefore => {
                if let Some(before) = self.values.last_below(day) {
                    return Some(i64::from(before - day));
                }
                if has_last {
                    // The last day of the previous month.
                    return Some(-i64::from(day));
                }
                self.adjacent_month_shift(date, direction)
            }
            Direction::FirstAfter => {
                if let Some(after) = self.values.first_above(day) {
                    if after <= last {
                        return Some(i64::from(after - day));
                    }
                    if has_last && day < last {
                        return Some(i64::from(last - day));
                    }
                }
                self.adjacent_month_shift(date, direction)
            }
        }
    }

    /// Looks for the nearest on-schedule day in the months before or after
    /// the month containing `date`, returning the shift in days.
    ///
    /// Each month is searched for days within that month's length, and for
    /// the month's last day when the set contains the last day sentinel.
    fn adjacent_month_shift(
        &self,
        date: civil::Date,
        direction: Direction,
    ) -> Option<i64> {
        let day = i16::from(date.day());
        let last = days_of_month(date).end - 1;
        let has_last = self.values.contains(LAST_DAY_OF_MONTH);
        let (step, mut shift) = match direction {
            Direction::On => return None,
            // Start from the last day of the previous month...
            Direction::FirstBefore => (-1, -i64::from(day)),
            // ... or from the last day of this month.
            Direction::FirstAfter => (1, i64::from(last - day)),
        };
        let first_of_month = date.first_of_month();
        for n in 1..=MAX_MONTHS_SEARCHED {
            let month = match first_of_month.checked_add((step * n).months()) {
                Ok(month) => month,
                Err(err) => {
                    log::debug!(
                        "stopped searching for a day of month {direction} \
                         `{date}`: {err}",
                    );
                    return None;
                }
            };
            let days = days_of_month(month);
            let month_last = days.end - 1;
            let candidates = self
                .values
                .iter()
                .filter(|v| days.contains(v))
                .chain(has_last.then_some(month_last));
            let found = match direction {
                Direction::FirstBefore => candidates.max(),
                _ => candidates.min(),
            };
            if let Some(found) = found {
                shift += match direction {
                    // Back from the month's last day to the found day.
                    Direction::FirstBefore => -i64::from(month_last - found),
                    // Forward from the previous month's last day.
                    _ => i64::from(found),
                };
                return Some(shift);
            }
            shift += step * i64::from(month_last);
        }
        log::debug!(
            "no day of month {direction} `{date}` found \
             within {MAX_MONTHS_SEARCHED} months",
        );
        None
    }
}

impl Schedule for Generator {
    fn matching(
        &self,
        at: &Zoned,
        direction: Direction,
    ) -> Option<Occurrence> {
        Generator::matching(self, at, direction)
    }
}

/// An iterator over the occurrences of a schedule fully contained within a
/// range, in ascending order.
///
/// This is a plain serial walk: the occurrence on the start of the range (if
/// it starts there), then the first occurrence after that one, and so on,
/// until an occurrence ends after the range does.
#[derive(Debug)]
pub struct Occurrences<S> {
    schedule: S,
    range: Interval,
    last: Option<Occurrence>,
    done: bool,
}

impl<S: Schedule> Occurrences<S> {
    pub fn new(schedule: S, range: Interval) -> Occurrences<S> {
        Occurrences { schedule, range, last: None, done: false }
    }
}

impl<S: Schedule> Iterator for Occurrences<S> {
    type Item = Occurrence;

    fn next(&mut self) -> Option<Occurrence> {
        if self.done {
            return None;
        }
        let candidate = match self.last {
            None => {
                let start = self.range.start();
                self.schedule
                    .matching(start, Direction::On)
                    .filter(|occ| occ.start() >= start)
                    .or_else(|| {
                        self.schedule.matching(start, Direction::FirstAfter)
                    })
            }
            Some(ref last) => {
                self.schedule.matching(last.start(), Direction::FirstAfter)
            }
        };
        let next = candidate.filter(|occ| {
            // The progress check guards against a schedule that doesn't
            // move forward, which would otherwise loop forever.
            occ.end() <= self.range.end()
                && self.last.as_ref().map_or(true, |last| {
                    occ.start() >= last.end()
                })
        });
        match next {
            None => {
                self.done = true;
                None
            }
            Some(occ) => {
                self.last = Some(occ.clone());
                Some(occ)
            }
        }
    }
}

impl<S: Schedule> std::iter::FusedIterator for Occurrences<S> {}
