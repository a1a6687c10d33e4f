/*!
Splitting datetime ranges into chunks that can be materialized independently.

A range is first clipped to its "effective" range: the part of it that starts
at the start of its first occurrence and ends at the end of its last one. The
effective range is then cut in two at an occurrence boundary chosen from the
coarsest calendar field that the range spans at least one unit of. Since the
cut is always on an occurrence boundary, no occurrence ever straddles two
chunks, and the occurrences of a range are exactly the occurrences of its
first chunk followed by the occurrences of its second chunk.
*/

use jiff::Zoned;

use crate::{
    calendar::{Field, Interval},
    generator::{Direction, Schedule},
    kind::Kind,
};

/// The result of chopping a range.
///
/// When `first` is present, so is `second`, and `first` ends exactly where
/// `second` begins. When only `second` is present, it is an indivisible range
/// that should be walked serially. When neither is present, the range has no
/// occurrences at all.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Chunks {
    pub first: Option<Interval>,
    pub second: Option<Interval>,
}

/// Clips `range` to the span covered by the occurrences fully inside it.
///
/// The start is the start of the occurrence on `range.start()` when that
/// occurrence starts no earlier than the range, or otherwise the start of the
/// first occurrence after it. The end is the end of the first occurrence
/// before the unit containing `range.end()`. Both anchoring occurrences have
/// to lie within `range`.
///
/// `None` is returned when no occurrence fits within `range`. This covers an
/// empty schedule, a range too small to hold a single occurrence and a range
/// that sits entirely between two occurrences.
pub fn effective_range<S: Schedule + ?Sized>(
    range: &Interval,
    schedule: &S,
) -> Option<Interval> {
    let first = schedule
        .matching(range.start(), Direction::On)
        .filter(|occ| range.encloses(occ))
        .or_else(|| schedule.matching(range.start(), Direction::FirstAfter))
        .filter(|occ| range.encloses(occ))?;
    // The occurrence on `range.end()` always extends past the range (it
    // contains `range.end()` and the range is half-open), so only the one
    // before it can anchor the end.
    let last = schedule
        .matching(range.end(), Direction::FirstBefore)
        .filter(|occ| range.encloses(occ))?;
    if first.start() >= last.end() {
        return None;
    }
    Some(Interval::new(first.start().clone(), last.end().clone()))
}

/// Returns the coarsest distance field of `kind` for which `range` spans at
/// least one whole unit, along with the number of whole units it spans.
///
/// `None` means the range is shorter than one unit of even the finest
/// distance field.
pub fn largest_distance(range: &Interval, kind: Kind) -> Option<(Field, i64)> {
    for &field in kind.distance_fields() {
        match field.difference(range.start(), range.end()) {
            Ok(amount) if amount > 0 => return Some((field, amount)),
            Ok(_) => {}
            Err(err) => {
                log::debug!(
                    "treating `{range}` as indivisible since its \
                     {field} distance could not be computed: {err:#}",
                );
                return None;
            }
        }
    }
    None
}

/// Splits `range` into at most two consecutive chunks on an occurrence
/// boundary of `kind`.
pub fn chop<S: Schedule + ?Sized>(
    range: &Interval,
    schedule: &S,
    kind: Kind,
) -> Chunks {
    let Some(effective) = effective_range(range, schedule) else {
        log::trace!("no occurrences within `{range}`");
        return Chunks::default();
    };
    let Some((field, amount)) = largest_distance(&effective, kind) else {
        log::trace!("`{effective}` is indivisible");
        return Chunks { first: None, second: Some(effective) };
    };
    let split = match split_point(&effective, kind, field, amount) {
        Ok(split) => split,
        Err(err) => {
            log::debug!(
                "treating `{effective}` as indivisible since it \
                 could not be split: {err:#}",
            );
            return Chunks { first: None, second: Some(effective) };
        }
    };
    if split <= *effective.start() || split >= *effective.end() {
        log::trace!(
            "split point `{split}` is not strictly inside `{effective}`, \
             treating it as indivisible",
        );
        return Chunks { first: None, second: Some(effective) };
    }
    log::trace!("splitting `{effective}` at `{split}` ({amount} {field})");
    let first = Interval::new(effective.start().clone(), split.clone());
    let second = Interval::new(split, effective.end().clone());
    Chunks { first: Some(first), second: Some(second) }
}

/// Adds `amount` units of `field` to the start of `range` and steps back one
/// duration unit, snapping the result to the start of that unit.
fn split_point(
    range: &Interval,
    kind: Kind,
    field: Field,
    amount: i64,
) -> anyhow::Result<Zoned> {
    let duration = kind.duration_field();
    let split = field.add(amount, range.start())?;
    let split = duration.add(-1, &split)?;
    Ok(duration.interval(&split)?.start().clone())
}
