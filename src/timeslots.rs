//! Timeslot discretization.
//!
//! Solvers work on a discrete time grid. This module cuts the event (or the
//! declared default slots) into fixed-width timeslots and groups gap-free
//! runs of them into blocks.
//!
//! # Algorithm
//! 1. Step through the span from its start in `width` increments; a trailing
//!    step that would pass the span end is dropped.
//! 2. Keep a timeslot only if the rooms' availabilities cover it.
//! 3. Start a new block whenever a timeslot does not begin where the previous
//!    one ended.
//! 4. With default slots, each is discretized on its own with category
//!    labels, then all blocks are merged: identical timeslots union their
//!    labels, partial overlaps are rejected.
//!
//! # Example
//!
//! ```
//! use ak_planner::models::{Event, EventId};
//! use ak_planner::timeslots::Discretizer;
//! use chrono::{TimeZone, Utc};
//!
//! let start = Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap();
//! let end = Utc.with_ymd_and_hms(2024, 5, 10, 11, 0, 0).unwrap();
//! let event = Event::new(EventId(1), "KoMa", start, end);
//!
//! let blocks = Discretizer::new(1.0).discretize(&event, &[], &[], &[]).unwrap();
//! assert_eq!(blocks.len(), 1);
//! assert_eq!(blocks[0].len(), 2);
//! ```

use chrono::{DateTime, Duration, Utc};
use std::collections::BTreeSet;

use crate::models::{hours, Availability, Category, CategoryId, DefaultSlot, Event, EventId};
use crate::solver::labels;

/// Discretization failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DiscretizeError {
    /// Width is below one millisecond, not finite, or wider than the event.
    #[error("timeslot width must be between one millisecond and the event length, got {0}h")]
    InvalidWidth(f64),
    /// Two default slots produce timeslots that overlap without coinciding.
    #[error("default slots must not partially overlap: {first} and {second}")]
    PartialOverlap { first: String, second: String },
}

/// One grid cell.
#[derive(Debug, Clone, PartialEq)]
pub struct Timeslot {
    /// Position in the merged grid, increasing with time.
    pub index: usize,
    /// Covered interval.
    pub interval: Availability,
    /// Labels this timeslot fulfills by construction (category labels).
    pub constraints: BTreeSet<String>,
}

/// A gap-free run of timeslots.
pub type TimeslotBlock = Vec<Timeslot>;

/// Number of timeslots of `width` hours needed for `duration` hours.
///
/// `epsilon` keeps an exact multiple from being pushed up by floating point
/// noise.
pub fn slot_count(duration: f64, width: f64, epsilon: f64) -> u32 {
    (duration / width - epsilon).ceil().max(0.0) as u32
}

/// Fixed-width discretizer.
#[derive(Debug, Clone, Copy)]
pub struct Discretizer {
    width: f64,
}

impl Discretizer {
    /// Creates a discretizer with timeslots of `width` hours.
    pub fn new(width: f64) -> Self {
        Self { width }
    }

    /// Timeslot width (hours).
    pub fn width(&self) -> f64 {
        self.width
    }

    /// Grid step, `None` unless the width rounds to at least one millisecond.
    pub fn step(&self) -> Option<Duration> {
        hours(self.width).filter(|step| *step >= Duration::milliseconds(1))
    }

    /// Grid step for an event of length `span`.
    ///
    /// # Errors
    /// [`DiscretizeError::InvalidWidth`] if there is no step or it exceeds
    /// `span`.
    pub fn step_within(&self, span: Duration) -> Result<Duration, DiscretizeError> {
        self.step()
            .filter(|step| *step <= span)
            .ok_or(DiscretizeError::InvalidWidth(self.width))
    }

    /// Discretizes the event.
    ///
    /// `room_availabilities` holds one list per room; an empty list means the
    /// room is available for the whole event. Without any rooms every
    /// timeslot is kept.
    ///
    /// Without default slots the whole event is discretized and every
    /// timeslot carries the labels of all `categories`.
    pub fn discretize(
        &self,
        event: &Event,
        room_availabilities: &[Vec<Availability>],
        default_slots: &[DefaultSlot],
        categories: &[Category],
    ) -> Result<Vec<TimeslotBlock>, DiscretizeError> {
        let step = self.step_within(event.end - event.start)?;
        let coverage = room_coverage(event, room_availabilities);
        let blocks = if default_slots.is_empty() {
            let all: BTreeSet<String> = categories
                .iter()
                .map(|c| labels::category(&c.name))
                .collect();
            blocks_in(event.id, event.start, event.end, step, &all, coverage.as_deref())
        } else {
            let mut per_slot = Vec::new();
            for default_slot in default_slots {
                let tags = category_labels(&default_slot.primary_categories, categories);
                per_slot.extend(blocks_in(
                    event.id,
                    default_slot.start,
                    default_slot.end,
                    step,
                    &tags,
                    coverage.as_deref(),
                ));
            }
            merge_blocks(per_slot)?
        };

        Ok(reindex(blocks))
    }

}

fn blocks_in(
    event: EventId,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    step: Duration,
    tags: &BTreeSet<String>,
    coverage: Option<&[Availability]>,
) -> Vec<TimeslotBlock> {
    let mut blocks: Vec<TimeslotBlock> = Vec::new();
    let mut current: TimeslotBlock = Vec::new();
    let mut cursor = start;

    while let Some(next) = cursor.checked_add_signed(step).filter(|next| *next <= end) {
        let interval = Availability::new(event, cursor, next);
        cursor = next;

        if coverage.is_some_and(|c| !interval.is_covered(c)) {
            continue;
        }
        if current.last().is_some_and(|last| last.interval.end != interval.start) {
            blocks.push(std::mem::take(&mut current));
        }
        current.push(Timeslot {
            index: 0,
            interval,
            constraints: tags.clone(),
        });
    }
    if !current.is_empty() {
        blocks.push(current);
    }
    blocks
}

/// Union of all room availabilities, `None` when nothing restricts.
fn room_coverage(event: &Event, rooms: &[Vec<Availability>]) -> Option<Vec<Availability>> {
    if rooms.is_empty() || rooms.iter().any(|r| r.is_empty()) {
        return None;
    }
    let all: Vec<Availability> = rooms.iter().flatten().cloned().collect();
    let merged = crate::models::union(&all);
    if Availability::is_event_covered(event, &merged) {
        None
    } else {
        Some(merged)
    }
}

fn category_labels(ids: &[CategoryId], categories: &[Category]) -> BTreeSet<String> {
    categories
        .iter()
        .filter(|c| ids.contains(&c.id))
        .map(|c| labels::category(&c.name))
        .collect()
}

/// Merges independently discretized blocks into one chronological grid.
///
/// Timeslots with identical bounds collapse into one carrying the union of
/// their labels. Adjacent timeslots share a block.
pub fn merge_blocks(blocks: Vec<TimeslotBlock>) -> Result<Vec<TimeslotBlock>, DiscretizeError> {
    let mut all: Vec<Timeslot> = blocks.into_iter().flatten().collect();
    all.sort_by_key(|t| (t.interval.start, t.interval.end));

    let mut merged: Vec<Timeslot> = Vec::with_capacity(all.len());
    for timeslot in all {
        match merged.last_mut() {
            Some(last)
                if last.interval.start == timeslot.interval.start
                    && last.interval.end == timeslot.interval.end =>
            {
                last.constraints.extend(timeslot.constraints);
            }
            Some(last) if last.interval.overlaps(&timeslot.interval, true) => {
                return Err(DiscretizeError::PartialOverlap {
                    first: last.interval.to_string(),
                    second: timeslot.interval.to_string(),
                });
            }
            _ => merged.push(timeslot),
        }
    }

    let mut result: Vec<TimeslotBlock> = Vec::new();
    for timeslot in merged {
        match result.last_mut() {
            Some(block)
                if block
                    .last()
                    .is_some_and(|last| last.interval.end == timeslot.interval.start) =>
            {
                block.push(timeslot);
            }
            _ => result.push(vec![timeslot]),
        }
    }
    Ok(result)
}

fn reindex(mut blocks: Vec<TimeslotBlock>) -> Vec<TimeslotBlock> {
    let mut index = 0;
    for timeslot in blocks.iter_mut().flatten() {
        timeslot.index = index;
        index += 1;
    }
    blocks
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AvailabilityOwner, DefaultSlotId, RoomId};
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, hour, minute, 0).unwrap()
    }

    fn event(start: DateTime<Utc>, end: DateTime<Utc>) -> Event {
        Event::new(EventId(1), "T", start, end)
    }

    fn room(start: DateTime<Utc>, end: DateTime<Utc>) -> Availability {
        Availability::new(EventId(1), start, end).with_owner(AvailabilityOwner::Room(RoomId(1)))
    }

    #[test]
    fn test_two_hours_one_hour_width() {
        let blocks = Discretizer::new(1.0)
            .discretize(&event(at(9, 0), at(11, 0)), &[], &[], &[])
            .unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].len(), 2);
        assert_eq!(blocks[0][0].interval.start, at(9, 0));
        assert_eq!(blocks[0][1].interval.end, at(11, 0));
        assert_eq!((blocks[0][0].index, blocks[0][1].index), (0, 1));
    }

    #[test]
    fn test_partial_tail_is_dropped() {
        let blocks = Discretizer::new(1.5)
            .discretize(&event(at(9, 0), at(11, 0)), &[], &[], &[])
            .unwrap();
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].len(), 1);
        assert_eq!(blocks[0][0].interval.end, at(10, 30));
    }

    #[test]
    fn test_invalid_width() {
        let result = Discretizer::new(0.0).discretize(&event(at(9, 0), at(11, 0)), &[], &[], &[]);
        assert_eq!(result, Err(DiscretizeError::InvalidWidth(0.0)));
    }

    #[test]
    fn test_width_below_one_millisecond() {
        let span = event(at(9, 0), at(11, 0));
        let result = Discretizer::new(1e-7).discretize(&span, &[], &[], &[]);
        assert_eq!(result, Err(DiscretizeError::InvalidWidth(1e-7)));

        // 0.36 ms rounds to nothing, 1 ms is the smallest usable step.
        let millisecond = 1.0 / 3_600_000.0;
        assert_eq!(Discretizer::new(1e-7).step(), None);
        assert_eq!(
            Discretizer::new(millisecond).step(),
            Some(Duration::milliseconds(1))
        );
    }

    #[test]
    fn test_width_wider_than_event() {
        let span = event(at(9, 0), at(11, 0));
        for width in [2.5, 1e12, f64::INFINITY, f64::NAN] {
            let result = Discretizer::new(width).discretize(&span, &[], &[], &[]);
            assert!(
                matches!(result, Err(DiscretizeError::InvalidWidth(_))),
                "{width}"
            );
        }

        let whole = Discretizer::new(2.0).discretize(&span, &[], &[], &[]).unwrap();
        assert_eq!(whole.len(), 1);
        assert_eq!(whole[0].len(), 1);
    }

    #[test]
    fn test_step_near_calendar_end() {
        let end = DateTime::<Utc>::MAX_UTC;
        let span = event(end - Duration::hours(2), end);
        let blocks = Discretizer::new(1.0).discretize(&span, &[], &[], &[]).unwrap();
        assert_eq!(blocks[0].len(), 2);
    }

    #[test]
    fn test_room_gap_splits_blocks() {
        let rooms = vec![vec![room(at(9, 0), at(11, 0)), room(at(12, 0), at(14, 0))]];
        let blocks = Discretizer::new(1.0)
            .discretize(&event(at(9, 0), at(14, 0)), &rooms, &[], &[])
            .unwrap();
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].len(), 2);
        assert_eq!(blocks[1].len(), 2);
        assert_eq!(blocks[1][0].index, 2);
    }

    #[test]
    fn test_unrestricted_room_covers_event() {
        let rooms = vec![vec![room(at(9, 0), at(10, 0))], vec![]];
        let blocks = Discretizer::new(1.0)
            .discretize(&event(at(9, 0), at(12, 0)), &rooms, &[], &[])
            .unwrap();
        assert_eq!(blocks[0].len(), 3);
    }

    #[test]
    fn test_categories_without_default_slots() {
        let categories = vec![
            Category::new(CategoryId(1), "Inhalt"),
            Category::new(CategoryId(2), "Spaß"),
        ];
        let blocks = Discretizer::new(1.0)
            .discretize(&event(at(9, 0), at(11, 0)), &[], &[], &categories)
            .unwrap();
        for timeslot in blocks.iter().flatten() {
            assert!(timeslot.constraints.contains("availability-cat-Inhalt"));
            assert!(timeslot.constraints.contains("availability-cat-Spaß"));
        }
    }

    #[test]
    fn test_default_slots_merge_labels() {
        let categories = vec![
            Category::new(CategoryId(1), "A"),
            Category::new(CategoryId(2), "B"),
        ];
        let default_slots = vec![
            DefaultSlot::new(DefaultSlotId(1), at(9, 0), at(11, 0)).with_category(CategoryId(1)),
            DefaultSlot::new(DefaultSlotId(2), at(10, 0), at(12, 0)).with_category(CategoryId(2)),
            DefaultSlot::new(DefaultSlotId(3), at(14, 0), at(15, 0)),
        ];
        let blocks = Discretizer::new(1.0)
            .discretize(&event(at(9, 0), at(18, 0)), &[], &default_slots, &categories)
            .unwrap();

        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[0].len(), 3);
        let labels: Vec<Vec<&str>> = blocks[0]
            .iter()
            .map(|t| t.constraints.iter().map(String::as_str).collect())
            .collect();
        assert_eq!(
            labels,
            vec![
                vec!["availability-cat-A"],
                vec!["availability-cat-A", "availability-cat-B"],
                vec!["availability-cat-B"],
            ]
        );
        assert!(blocks[1][0].constraints.is_empty());
        let indices: Vec<usize> = blocks.iter().flatten().map(|t| t.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_partially_overlapping_default_slots_fail() {
        let default_slots = vec![
            DefaultSlot::new(DefaultSlotId(1), at(9, 0), at(11, 0)),
            DefaultSlot::new(DefaultSlotId(2), at(9, 30), at(11, 30)),
        ];
        let result = Discretizer::new(1.0).discretize(
            &event(at(9, 0), at(18, 0)),
            &[],
            &default_slots,
            &[],
        );
        assert!(matches!(result, Err(DiscretizeError::PartialOverlap { .. })));
    }

    #[test]
    fn test_slot_count() {
        assert_eq!(slot_count(2.0, 1.0, 1e-4), 2);
        assert_eq!(slot_count(1.5, 1.0, 1e-4), 2);
        assert_eq!(slot_count(1.0, 0.5, 1e-4), 2);
        assert_eq!(slot_count(0.1 + 0.2, 0.1, 1e-4), 3);
        assert_eq!(slot_count(0.0, 1.0, 1e-4), 0);
    }
}
