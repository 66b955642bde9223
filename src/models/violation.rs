//! Constraint violation model.
//!
//! A violation records that the current schedule breaks a rule: two slots of
//! one owner overlap, a room is too small, and so on. Violations are
//! persisted so organizers can mark them as manually resolved; the
//! reconciliation step therefore has to keep existing rows alive whenever
//! the same violation is detected again.
//!
//! # Identity
//! Two violations are "the same" when their [`ViolationIdentity`] is equal:
//! kind, referenced activities and slots (as sets), and the scalar
//! references. Primary key, timestamp, level, comment and the resolved flag
//! do not take part.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

use super::{AkId, CategoryId, EventId, OwnerId, RequirementId, RoomId, SlotId, ViolationId};

/// Violation kinds, one per rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ViolationKind {
    /// Two slots of one owner overlap.
    OwnerTwoSlots,
    /// A slot lies outside its activity's availability.
    SlotOutsideAvailability,
    /// Two slots share a room and overlap.
    RoomTwoSlots,
    /// The slot's room lacks a property the activity requires.
    RequirementNotGiven,
    /// Slots of two conflicting activities overlap.
    AkConflictCollision,
    /// A slot starts before a prerequisite's slot ends.
    AkBeforePrerequisite,
    /// A resolution slot ends after the resolution deadline.
    AkAfterResoDeadline,
    /// A slot lies outside the default slots of its category.
    AkCategoryMismatch,
    /// Two slots of the same activity overlap.
    AkSlotCollision,
    /// The room is (nearly) too small for the expected interest.
    RoomCapacityExceeded,
    /// A slot lies outside the event.
    SlotOutsideEvent,
}

impl ViolationKind {
    /// All kinds in a stable order.
    pub const ALL: [ViolationKind; 11] = [
        Self::OwnerTwoSlots,
        Self::SlotOutsideAvailability,
        Self::RoomTwoSlots,
        Self::RequirementNotGiven,
        Self::AkConflictCollision,
        Self::AkBeforePrerequisite,
        Self::AkAfterResoDeadline,
        Self::AkCategoryMismatch,
        Self::AkSlotCollision,
        Self::RoomCapacityExceeded,
        Self::SlotOutsideEvent,
    ];

    /// Severity a freshly detected violation of this kind gets.
    ///
    /// Capacity is the exception: its rule decides per case.
    pub fn default_level(self) -> ViolationLevel {
        match self {
            Self::RoomTwoSlots | Self::AkSlotCollision | Self::AkCategoryMismatch => {
                ViolationLevel::Warning
            }
            _ => ViolationLevel::Violation,
        }
    }

    /// Short human-readable description.
    pub fn description(self) -> &'static str {
        match self {
            Self::OwnerTwoSlots => "Owner has two parallel slots",
            Self::SlotOutsideAvailability => "AK Slot was scheduled outside the AK's availabilities",
            Self::RoomTwoSlots => "Room has two AK slots scheduled at the same time",
            Self::RequirementNotGiven => "Room does not satisfy the requirement of the scheduled AK",
            Self::AkConflictCollision => "AK Slot is scheduled at the same time as an AK listed as a conflict",
            Self::AkBeforePrerequisite => "AK Slot is scheduled before an AK listed as a prerequisite",
            Self::AkAfterResoDeadline => "AK Slot for AK with intention to submit a resolution is scheduled after resolution deadline",
            Self::AkCategoryMismatch => "AK Slot in a category is outside that categories availabilities",
            Self::AkSlotCollision => "Two AK Slots for the same AK scheduled at the same time",
            Self::RoomCapacityExceeded => "Room does not have enough space for interest in scheduled AK Slot",
            Self::SlotOutsideEvent => "AK Slot is scheduled outside the event's availabilities",
        }
    }
}

impl fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// Severity of a violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ViolationLevel {
    /// Should be looked at.
    Warning,
    /// Must be fixed.
    Violation,
}

/// A detected, not yet persisted violation.
///
/// Rules accumulate plain references here; the repository associates them
/// in one step when the draft is inserted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViolationDraft {
    /// Kind.
    pub kind: ViolationKind,
    /// Severity.
    pub level: ViolationLevel,
    /// Referenced room.
    pub room: Option<RoomId>,
    /// Referenced owner.
    pub owner: Option<OwnerId>,
    /// Referenced requirement.
    pub requirement: Option<RequirementId>,
    /// Referenced category.
    pub category: Option<CategoryId>,
    /// Free-text detail.
    pub comment: String,
    /// Referenced activities.
    pub activities: BTreeSet<AkId>,
    /// Referenced slots.
    pub slots: BTreeSet<SlotId>,
}

impl ViolationDraft {
    /// Creates a draft with the kind's default level and no references.
    pub fn new(kind: ViolationKind) -> Self {
        Self {
            kind,
            level: kind.default_level(),
            room: None,
            owner: None,
            requirement: None,
            category: None,
            comment: String::new(),
            activities: BTreeSet::new(),
            slots: BTreeSet::new(),
        }
    }

    /// Overrides the level.
    pub fn with_level(mut self, level: ViolationLevel) -> Self {
        self.level = level;
        self
    }

    /// References a room.
    pub fn with_room(mut self, room: RoomId) -> Self {
        self.room = Some(room);
        self
    }

    /// References an owner.
    pub fn with_owner(mut self, owner: OwnerId) -> Self {
        self.owner = Some(owner);
        self
    }

    /// References a requirement.
    pub fn with_requirement(mut self, requirement: RequirementId) -> Self {
        self.requirement = Some(requirement);
        self
    }

    /// References a category.
    pub fn with_category(mut self, category: CategoryId) -> Self {
        self.category = Some(category);
        self
    }

    /// Sets the comment.
    pub fn with_comment(mut self, comment: impl Into<String>) -> Self {
        self.comment = comment.into();
        self
    }

    /// References an activity.
    pub fn with_activity(mut self, activity: AkId) -> Self {
        self.activities.insert(activity);
        self
    }

    /// References a slot.
    pub fn with_slot(mut self, slot: SlotId) -> Self {
        self.slots.insert(slot);
        self
    }

    /// Matching key.
    pub fn identity(&self) -> ViolationIdentity {
        ViolationIdentity {
            kind: self.kind,
            activities: self.activities.clone(),
            slots: self.slots.clone(),
            room: self.room,
            owner: self.owner,
            requirement: self.requirement,
            category: self.category,
        }
    }
}

/// A persisted violation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConstraintViolation {
    /// Primary key.
    pub id: ViolationId,
    /// Event the violation belongs to.
    pub event: EventId,
    /// Detected content.
    #[serde(flatten)]
    pub draft: ViolationDraft,
    /// Time of first detection.
    pub timestamp: DateTime<Utc>,
    /// Set by organizers who accept the violation.
    pub manually_resolved: bool,
}

impl ConstraintViolation {
    /// Kind shortcut.
    #[inline]
    pub fn kind(&self) -> ViolationKind {
        self.draft.kind
    }

    /// Matching key.
    pub fn identity(&self) -> ViolationIdentity {
        self.draft.identity()
    }

    /// Whether the violation references `slot`.
    pub fn references_slot(&self, slot: SlotId) -> bool {
        self.draft.slots.contains(&slot)
    }

    /// Whether the violation references `room`.
    pub fn references_room(&self, room: RoomId) -> bool {
        self.draft.room == Some(room)
    }

    /// Whether the violation references any of `slots`.
    pub fn references_any_slot(&self, slots: &BTreeSet<SlotId>) -> bool {
        !self.draft.slots.is_disjoint(slots)
    }
}

impl fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.draft.level, self.draft.kind)?;
        if !self.draft.comment.is_empty() {
            write!(f, " ({})", self.draft.comment)?;
        }
        Ok(())
    }
}

/// Reconciliation key of a violation.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViolationIdentity {
    pub kind: ViolationKind,
    pub activities: BTreeSet<AkId>,
    pub slots: BTreeSet<SlotId>,
    pub room: Option<RoomId>,
    pub owner: Option<OwnerId>,
    pub requirement: Option<RequirementId>,
    pub category: Option<CategoryId>,
}
