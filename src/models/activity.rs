//! Activity ("AK") and slot models.
//!
//! An activity is what participants sign up for: a session, a workshop, a
//! plenary. It is scheduled through one or more slots, each a concrete
//! occurrence with a room, a start and a duration.
//!
//! # Duration Model
//! Slot durations are fractional hours. A slot without a start is
//! unscheduled and takes part in no time-based rule.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::hours;
use super::{AkId, Availability, AvailabilityOwner, CategoryId, EventId, OwnerId, RequirementId};
use super::{RoomId, SlotId, TrackId};

/// An activity to be scheduled.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Activity {
    /// Unique activity identifier.
    pub id: AkId,
    /// Event the activity belongs to.
    pub event: EventId,
    /// Human-readable name.
    pub name: String,
    /// Free-text description.
    pub description: String,
    /// People hosting the activity.
    pub owners: Vec<OwnerId>,
    /// Room properties the activity needs.
    pub requirements: Vec<RequirementId>,
    /// Activities that must not run at the same time.
    pub conflicts: Vec<AkId>,
    /// Activities that must be over before this one starts.
    pub prerequisites: Vec<AkId>,
    /// Category.
    pub category: Option<CategoryId>,
    /// Track.
    pub track: Option<TrackId>,
    /// Type labels (e.g. "Workshop", "Diskussion").
    pub types: Vec<String>,
    /// Whether the activity intends to pass a resolution.
    pub reso: bool,
    /// Expected number of attendees. `None` = unknown.
    pub interest: Option<u32>,
}

impl Activity {
    /// Creates a new activity.
    pub fn new(id: AkId, event: EventId, name: impl Into<String>) -> Self {
        Self {
            id,
            event,
            name: name.into(),
            description: String::new(),
            owners: Vec::new(),
            requirements: Vec::new(),
            conflicts: Vec::new(),
            prerequisites: Vec::new(),
            category: None,
            track: None,
            types: Vec::new(),
            reso: false,
            interest: None,
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Adds an owner.
    pub fn with_owner(mut self, owner: OwnerId) -> Self {
        self.owners.push(owner);
        self
    }

    /// Adds a required room property.
    pub fn with_requirement(mut self, requirement: RequirementId) -> Self {
        self.requirements.push(requirement);
        self
    }

    /// Adds a conflicting activity.
    pub fn with_conflict(mut self, other: AkId) -> Self {
        self.conflicts.push(other);
        self
    }

    /// Adds a prerequisite activity.
    pub fn with_prerequisite(mut self, other: AkId) -> Self {
        self.prerequisites.push(other);
        self
    }

    /// Sets the category.
    pub fn with_category(mut self, category: CategoryId) -> Self {
        self.category = Some(category);
        self
    }

    /// Sets the track.
    pub fn with_track(mut self, track: TrackId) -> Self {
        self.track = Some(track);
        self
    }

    /// Adds a type label.
    pub fn with_type(mut self, type_name: impl Into<String>) -> Self {
        self.types.push(type_name.into());
        self
    }

    /// Marks the activity as intending a resolution.
    pub fn with_reso(mut self, reso: bool) -> Self {
        self.reso = reso;
        self
    }

    /// Sets the expected attendance.
    pub fn with_interest(mut self, interest: u32) -> Self {
        self.interest = Some(interest);
        self
    }

    /// Whether `other` is listed as conflicting.
    pub fn conflicts_with(&self, other: AkId) -> bool {
        self.conflicts.contains(&other)
    }

    /// Whether `other` is listed as prerequisite.
    pub fn requires(&self, other: AkId) -> bool {
        self.prerequisites.contains(&other)
    }
}

/// One concrete occurrence of an activity.
///
/// A fixed slot's room and start are authoritative: neither the solver nor
/// an import may move it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Slot {
    /// Unique slot identifier.
    pub id: SlotId,
    /// Activity this slot belongs to.
    pub activity: AkId,
    /// Event the slot belongs to.
    pub event: EventId,
    /// Assigned room.
    pub room: Option<RoomId>,
    /// Assigned start. `None` = not scheduled yet.
    pub start: Option<DateTime<Utc>>,
    /// Length (hours).
    pub duration: f64,
    /// Whether room and start are pinned.
    pub fixed: bool,
}

impl Slot {
    /// Creates an unscheduled slot.
    pub fn new(id: SlotId, activity: AkId, event: EventId, duration: f64) -> Self {
        Self {
            id,
            activity,
            event,
            room: None,
            start: None,
            duration,
            fixed: false,
        }
    }

    /// Sets the start.
    pub fn at(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    /// Sets the room.
    pub fn in_room(mut self, room: RoomId) -> Self {
        self.room = Some(room);
        self
    }

    /// Pins room and start.
    pub fn pinned(mut self) -> Self {
        self.fixed = true;
        self
    }

    /// Whether the slot has a start.
    #[inline]
    pub fn is_scheduled(&self) -> bool {
        self.start.is_some()
    }

    /// End instant (start + duration).
    ///
    /// `None` when unscheduled or when the duration does not fit the
    /// calendar range.
    pub fn end(&self) -> Option<DateTime<Utc>> {
        self.start?.checked_add_signed(hours(self.duration)?)
    }

    /// The occupied interval, owned by the slot's activity.
    pub fn interval(&self) -> Option<Availability> {
        Some(
            Availability::new(self.event, self.start?, self.end()?)
                .with_owner(AvailabilityOwner::Activity(self.activity)),
        )
    }

    /// Whether both slots are scheduled and share time beyond an endpoint.
    pub fn overlaps(&self, other: &Slot) -> bool {
        match (self.interval(), other.interval()) {
            (Some(a), Some(b)) => a.overlaps(&b, true),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, hour, minute, 0).unwrap()
    }

    #[test]
    fn test_activity_builder() {
        let ak = Activity::new(AkId(1), EventId(1), "Sitzung")
            .with_owner(OwnerId(3))
            .with_requirement(RequirementId(2))
            .with_conflict(AkId(4))
            .with_prerequisite(AkId(5))
            .with_category(CategoryId(1))
            .with_reso(true)
            .with_interest(25);

        assert_eq!(ak.owners, vec![OwnerId(3)]);
        assert!(ak.conflicts_with(AkId(4)));
        assert!(ak.requires(AkId(5)));
        assert!(!ak.requires(AkId(4)));
        assert!(ak.reso);
        assert_eq!(ak.interest, Some(25));
    }

    #[test]
    fn test_slot_end_and_interval() {
        let slot = Slot::new(SlotId(1), AkId(1), EventId(1), 1.5).at(at(10, 0));
        assert_eq!(slot.end(), Some(at(11, 30)));
        let interval = slot.interval().unwrap();
        assert_eq!(interval.owner, AvailabilityOwner::Activity(AkId(1)));
        assert_eq!(interval.end, at(11, 30));

        let unscheduled = Slot::new(SlotId(2), AkId(1), EventId(1), 1.0);
        assert!(!unscheduled.is_scheduled());
        assert!(unscheduled.end().is_none());
    }

    #[test]
    fn test_oversized_duration_has_no_end() {
        let slot = Slot::new(SlotId(1), AkId(1), EventId(1), 1e12).at(at(10, 0));
        assert_eq!(slot.end(), None);
        assert_eq!(slot.interval(), None);
        assert!(!slot.overlaps(&slot.clone()));
    }

    #[test]
    fn test_slot_overlap_is_strict() {
        let a = Slot::new(SlotId(1), AkId(1), EventId(1), 1.0).at(at(10, 0));
        let b = Slot::new(SlotId(2), AkId(2), EventId(1), 1.0).at(at(10, 30));
        let c = Slot::new(SlotId(3), AkId(3), EventId(1), 1.0).at(at(11, 0));
        let unscheduled = Slot::new(SlotId(4), AkId(4), EventId(1), 1.0);

        assert!(a.overlaps(&b));
        assert!(!a.overlaps(&c));
        assert!(!a.overlaps(&unscheduled));
    }
}
