use std::sync::Arc;

use jiff::Zoned;

use crate::{
    calendar::Interval,
    generator::{Direction, Generator, Occurrence},
    kind::Kind,
    materialize::Materializer,
    schedule::{self, ScheduleSet},
};

/// A recurring calendar schedule: a kind plus the values of that kind that
/// are on schedule.
///
/// This is the user facing value. It owns a shared generator, so cloning a
/// timetable is cheap and a timetable can be handed to the materializer
/// without copying its values.
#[derive(Clone, Debug)]
pub struct Timetable {
    generator: Arc<Generator>,
}

impl Timetable {
    /// Build a timetable, failing with a `ScheduleValueOutOfRange` error when
    /// any value is not legal for `kind`.
    pub fn new(kind: Kind, values: ScheduleSet) -> anyhow::Result<Timetable> {
        let generator = Generator::new(kind, values)?;
        Ok(Timetable { generator: Arc::new(generator) })
    }

    pub fn kind(&self) -> Kind {
        self.generator.kind()
    }

    pub fn values(&self) -> &ScheduleSet {
        self.generator.values()
    }

    /// Returns true when this timetable never occurs.
    pub fn is_empty(&self) -> bool {
        self.generator.is_empty()
    }

    /// Returns true when `zdt` falls within one of this timetable's
    /// occurrences.
    ///
    /// For day of month timetables containing `31`, this includes the last
    /// day of every month.
    pub fn contains(&self, zdt: &Zoned) -> bool {
        self.generator.matching(zdt, Direction::On).is_some()
    }

    /// Returns the occurrence in the given direction from `zdt`.
    pub fn matching(
        &self,
        zdt: &Zoned,
        direction: Direction,
    ) -> Option<Occurrence> {
        self.generator.matching(zdt, direction)
    }

    /// Returns every occurrence lying entirely within `range`, in ascending
    /// order.
    pub fn occurrences_in(
        &self,
        range: &Interval,
        materializer: &Materializer,
    ) -> anyhow::Result<Vec<Occurrence>> {
        materializer.materialize(
            Arc::clone(&self.generator),
            self.kind(),
            range,
        )
    }
}

impl std::fmt::Display for Timetable {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "Timetable({kind}: ", kind = self.kind())?;
        if self.is_empty() {
            f.write_str("none")?;
        }
        for (i, value) in self.values().iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            f.write_str(&schedule::label(self.kind(), value))?;
        }
        f.write_str(")")
    }
}
