//! Availability intervals and their algebra.
//!
//! An [`Availability`] restricts when something may happen: a person, a room,
//! an activity, a category or a participant. Most availabilities are computed
//! on the fly (slot positions, timeslots, unions); the persisted ones are
//! owned by the entity they restrict.
//!
//! # Time Model
//! Bounds are UTC instants. Intervals are treated as closed for the
//! non-strict overlap test (touching endpoints overlap) and as open for the
//! strict one.
//!
//! # Operations
//! - [`Availability::overlaps`], [`Availability::contains`]
//! - [`Availability::merge_with`], [`Availability::intersect_with`] (fail with
//!   [`AvailabilityError`] when their precondition does not hold)
//! - [`union`], [`intersection`], [`Availability::is_covered`]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::{AkId, CategoryId, Event, EventId, OwnerId, ParticipantId, RoomId};

/// Domain errors of the interval algebra.
///
/// These indicate a caller defect and are never recovered from.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AvailabilityError {
    /// `merge_with` was called on intervals that neither overlap nor touch.
    #[error("only overlapping availabilities can be merged: {first} and {second}")]
    MergeDisjoint { first: String, second: String },
    /// `intersect_with` was called on intervals without a real overlap.
    #[error("only overlapping availabilities can be intersected: {first} and {second}")]
    IntersectDisjoint { first: String, second: String },
}

/// The entity an availability belongs to, besides its event.
///
/// At most one of these references is set, which the enum makes structural.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AvailabilityOwner {
    /// Plain event-level interval (computed values, timeslots).
    Event,
    /// Activity owner.
    Person(OwnerId),
    /// Room.
    Room(RoomId),
    /// Activity.
    Activity(AkId),
    /// Category.
    Category(CategoryId),
    /// Event participant.
    Participant(ParticipantId),
}

impl fmt::Display for AvailabilityOwner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Event => write!(f, "event"),
            Self::Person(id) => write!(f, "person {id}"),
            Self::Room(id) => write!(f, "room {id}"),
            Self::Activity(id) => write!(f, "ak {id}"),
            Self::Category(id) => write!(f, "category {id}"),
            Self::Participant(id) => write!(f, "participant {id}"),
        }
    }
}

/// A time interval owned by an event and optionally one further entity.
///
/// Equality and hashing are value based over all fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Availability {
    /// Event this interval belongs to.
    pub event: EventId,
    /// Restricted entity.
    pub owner: AvailabilityOwner,
    /// Interval start.
    pub start: DateTime<Utc>,
    /// Interval end.
    pub end: DateTime<Utc>,
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Availability(event={}, {}, {} – {})",
            self.event,
            self.owner,
            self.start.format("%Y-%m-%d %H:%M"),
            self.end.format("%Y-%m-%d %H:%M")
        )
    }
}

impl Availability {
    /// Creates an event-level interval.
    pub fn new(event: EventId, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            event,
            owner: AvailabilityOwner::Event,
            start,
            end,
        }
    }

    /// Sets the restricted entity.
    pub fn with_owner(mut self, owner: AvailabilityOwner) -> Self {
        self.owner = owner;
        self
    }

    /// Interval covering exactly the event span.
    pub fn for_event(event: &Event) -> Self {
        Self::new(event.id, event.start, event.end)
    }

    /// Length in hours.
    pub fn duration_hours(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 3_600_000.0
    }

    /// Whether two intervals overlap.
    ///
    /// With `strict`, intervals that only share an endpoint do not count as
    /// overlapping; without it they do.
    pub fn overlaps(&self, other: &Self, strict: bool) -> bool {
        if strict {
            (self.start <= other.start && other.start < self.end)
                || (self.start < other.end && other.end <= self.end)
                || (other.start <= self.start && self.start < other.end)
                || (other.start < self.end && self.end <= other.end)
        } else {
            (self.start <= other.start && other.start <= self.end)
                || (self.start <= other.end && other.end <= self.end)
                || (other.start <= self.start && self.start <= other.end)
                || (other.start <= self.end && self.end <= other.end)
        }
    }

    /// Whether this interval starts no later and ends no earlier than `other`.
    #[inline]
    pub fn contains(&self, other: &Self) -> bool {
        self.start <= other.start && self.end >= other.end
    }

    /// Interval spanning both inputs.
    ///
    /// # Errors
    /// [`AvailabilityError::MergeDisjoint`] unless the intervals overlap or touch.
    pub fn merge_with(&self, other: &Self) -> Result<Self, AvailabilityError> {
        if !other.overlaps(self, false) {
            return Err(AvailabilityError::MergeDisjoint {
                first: self.to_string(),
                second: other.to_string(),
            });
        }
        Ok(self.span(other))
    }

    /// Interval covered by both inputs.
    ///
    /// # Errors
    /// [`AvailabilityError::IntersectDisjoint`] unless the intervals strictly overlap.
    pub fn intersect_with(&self, other: &Self) -> Result<Self, AvailabilityError> {
        if !other.overlaps(self, true) {
            return Err(AvailabilityError::IntersectDisjoint {
                first: self.to_string(),
                second: other.to_string(),
            });
        }
        Ok(self.common(other))
    }

    /// Whether some interval of `union(availabilities)` contains this one.
    pub fn is_covered(&self, availabilities: &[Availability]) -> bool {
        union(availabilities).iter().any(|a| a.contains(self))
    }

    /// Whether `availabilities` cover the complete event span.
    pub fn is_event_covered(event: &Event, availabilities: &[Availability]) -> bool {
        Self::for_event(event).is_covered(availabilities)
    }

    fn derived(&self, other: &Self, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        let owner = if self.owner == other.owner {
            self.owner
        } else {
            AvailabilityOwner::Event
        };
        Self {
            event: self.event,
            owner,
            start,
            end,
        }
    }

    fn span(&self, other: &Self) -> Self {
        self.derived(other, self.start.min(other.start), self.end.max(other.end))
    }

    fn common(&self, other: &Self) -> Self {
        self.derived(other, self.start.max(other.start), self.end.min(other.end))
    }
}

/// Minimal list of intervals covering the same time as `availabilities`.
///
/// Sorts by start and sweeps once, merging into the last accumulated interval
/// whenever the next one overlaps or touches it.
pub fn union(availabilities: &[Availability]) -> Vec<Availability> {
    let mut sorted: Vec<&Availability> = availabilities.iter().collect();
    sorted.sort_by_key(|a| a.start);

    let mut result: Vec<Availability> = Vec::with_capacity(sorted.len());
    for avail in sorted {
        match result.last_mut() {
            Some(last) if avail.overlaps(last, false) => *last = last.span(avail),
            _ => result.push(avail.clone()),
        }
    }
    result
}

/// Intervals covered by every one of the given sets.
///
/// Each set is unioned first, then the sets are folded left to right with a
/// pairwise intersection. The pairwise step is quadratic, which is fine for
/// the handful of intervals a single entity carries.
pub fn intersection(sets: &[Vec<Availability>]) -> Vec<Availability> {
    let unioned: Vec<Vec<Availability>> = sets.iter().map(|set| union(set)).collect();
    if unioned.is_empty() || unioned.iter().any(|set| set.is_empty()) {
        return Vec::new();
    }

    let mut iter = unioned.into_iter();
    let first = iter.next().unwrap_or_default();
    iter.fold(first, |acc, set| pair_intersection(&acc, &set))
}

fn pair_intersection(a: &[Availability], b: &[Availability]) -> Vec<Availability> {
    let mut result = Vec::new();
    for x in a {
        for y in b {
            if x.overlaps(y, true) {
                result.push(x.common(y));
            }
        }
    }
    result
}
