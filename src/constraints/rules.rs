//! Built-in violation rules, one per [`ViolationKind`].
//!
//! # Categories
//!
//! - **Parallel slots**: owner, room, same activity, conflicting activities
//! - **Ordering**: prerequisites, resolution deadline
//! - **Placement**: activity availability, event span, category default slots
//! - **Room fit**: requirements, capacity
//!
//! Unscheduled slots never take part in time-based rules. Rules that only
//! need the room (requirements, capacity) also apply to unscheduled slots
//! that already have one.

use super::{RuleContext, ViolationRule};
use crate::config::PlannerConfig;
use crate::models::{
    Activity, Availability, AvailabilityOwner, Slot, ViolationDraft, ViolationKind,
    ViolationLevel,
};
use crate::repository::RepositoryResult;

fn pair(kind: ViolationKind, slot: &Slot, other: &Slot) -> ViolationDraft {
    ViolationDraft::new(kind)
        .with_activity(slot.activity)
        .with_activity(other.activity)
        .with_slot(slot.id)
        .with_slot(other.id)
}

fn single(kind: ViolationKind, slot: &Slot) -> ViolationDraft {
    ViolationDraft::new(kind)
        .with_activity(slot.activity)
        .with_slot(slot.id)
}

fn activity_of<'c>(slot: &Slot, ctx: &'c RuleContext<'_>) -> Option<&'c Activity> {
    ctx.activity(slot.activity)
}

// ======================== Parallel slots ========================

/// Two slots of different activities sharing an owner overlap.
///
/// One violation per shared owner and slot pair.
#[derive(Debug, Clone, Copy)]
pub struct OwnerTwoSlots;

impl ViolationRule for OwnerTwoSlots {
    fn kind(&self) -> ViolationKind {
        ViolationKind::OwnerTwoSlots
    }

    fn detect(&self, slot: &Slot, ctx: &RuleContext<'_>) -> RepositoryResult<Vec<ViolationDraft>> {
        let Some(activity) = activity_of(slot, ctx).filter(|_| slot.is_scheduled()) else {
            return Ok(Vec::new());
        };

        let mut found = Vec::new();
        for &owner in &activity.owners {
            for other in ctx.slots() {
                if other.activity == slot.activity || !slot.overlaps(other) {
                    continue;
                }
                let shares_owner = ctx
                    .activity(other.activity)
                    .is_some_and(|a| a.owners.contains(&owner));
                if shares_owner {
                    found.push(pair(self.kind(), slot, other).with_owner(owner));
                }
            }
        }
        Ok(found)
    }
}

/// Two slots in the same room overlap (warning).
#[derive(Debug, Clone, Copy)]
pub struct RoomTwoSlots;

impl ViolationRule for RoomTwoSlots {
    fn kind(&self) -> ViolationKind {
        ViolationKind::RoomTwoSlots
    }

    fn detect(&self, slot: &Slot, ctx: &RuleContext<'_>) -> RepositoryResult<Vec<ViolationDraft>> {
        let Some(room) = slot.room else {
            return Ok(Vec::new());
        };
        Ok(ctx
            .slots()
            .iter()
            .filter(|other| other.id != slot.id && other.room == Some(room))
            .filter(|other| slot.overlaps(other))
            .map(|other| pair(self.kind(), slot, other).with_room(room))
            .collect())
    }
}

/// Two slots of the same activity overlap (warning).
#[derive(Debug, Clone, Copy)]
pub struct AkSlotCollision;

impl ViolationRule for AkSlotCollision {
    fn kind(&self) -> ViolationKind {
        ViolationKind::AkSlotCollision
    }

    fn detect(&self, slot: &Slot, ctx: &RuleContext<'_>) -> RepositoryResult<Vec<ViolationDraft>> {
        Ok(ctx
            .scheduled_slots_of(slot.activity)
            .filter(|other| other.id != slot.id && slot.overlaps(other))
            .map(|other| pair(self.kind(), slot, other))
            .collect())
    }
}

/// Slots of conflicting activities overlap.
///
/// A conflict declared on either activity counts.
#[derive(Debug, Clone, Copy)]
pub struct AkConflictCollision;

impl ViolationRule for AkConflictCollision {
    fn kind(&self) -> ViolationKind {
        ViolationKind::AkConflictCollision
    }

    fn detect(&self, slot: &Slot, ctx: &RuleContext<'_>) -> RepositoryResult<Vec<ViolationDraft>> {
        let Some(activity) = activity_of(slot, ctx).filter(|_| slot.is_scheduled()) else {
            return Ok(Vec::new());
        };

        let mut conflicting: Vec<_> = activity.conflicts.clone();
        conflicting.extend(
            ctx.activities()
                .filter(|other| other.conflicts_with(activity.id))
                .map(|other| other.id),
        );
        conflicting.sort();
        conflicting.dedup();
        conflicting.retain(|id| *id != activity.id);

        let mut found = Vec::new();
        for other_ak in conflicting {
            for other in ctx.scheduled_slots_of(other_ak) {
                if slot.overlaps(other) {
                    found.push(pair(self.kind(), slot, other));
                }
            }
        }
        Ok(found)
    }
}

// ======================== Ordering ========================

/// A slot starts before a slot of one of its prerequisites has ended.
///
/// Checked from both ends: as the dependent slot and as the prerequisite.
#[derive(Debug, Clone, Copy)]
pub struct AkBeforePrerequisite;

impl ViolationRule for AkBeforePrerequisite {
    fn kind(&self) -> ViolationKind {
        ViolationKind::AkBeforePrerequisite
    }

    fn detect(&self, slot: &Slot, ctx: &RuleContext<'_>) -> RepositoryResult<Vec<ViolationDraft>> {
        let (Some(activity), Some(start), Some(end)) =
            (activity_of(slot, ctx), slot.start, slot.end())
        else {
            return Ok(Vec::new());
        };

        let mut found = Vec::new();
        for &prerequisite in activity.prerequisites.iter().filter(|p| **p != activity.id) {
            for other in ctx.scheduled_slots_of(prerequisite) {
                if other.end().is_some_and(|other_end| other_end > start) {
                    found.push(pair(self.kind(), slot, other));
                }
            }
        }
        for dependent in ctx
            .activities()
            .filter(|a| a.id != activity.id && a.requires(activity.id))
        {
            for other in ctx.scheduled_slots_of(dependent.id) {
                if other.start.is_some_and(|other_start| end > other_start) {
                    found.push(pair(self.kind(), other, slot));
                }
            }
        }
        Ok(found)
    }
}

/// A slot of an activity with resolution intent ends after the deadline.
#[derive(Debug, Clone, Copy)]
pub struct AkAfterResoDeadline;

impl ViolationRule for AkAfterResoDeadline {
    fn kind(&self) -> ViolationKind {
        ViolationKind::AkAfterResoDeadline
    }

    fn detect(&self, slot: &Slot, ctx: &RuleContext<'_>) -> RepositoryResult<Vec<ViolationDraft>> {
        let reso = activity_of(slot, ctx).is_some_and(|a| a.reso);
        let late = match (ctx.event().reso_deadline, slot.end()) {
            (Some(deadline), Some(end)) => end > deadline,
            _ => false,
        };
        Ok(if reso && late {
            vec![single(self.kind(), slot)]
        } else {
            Vec::new()
        })
    }
}

// ======================== Placement ========================

/// A slot is not covered by its activity's availabilities.
///
/// Activities without availabilities are unrestricted.
#[derive(Debug, Clone, Copy)]
pub struct SlotOutsideAvailability;

impl ViolationRule for SlotOutsideAvailability {
    fn kind(&self) -> ViolationKind {
        ViolationKind::SlotOutsideAvailability
    }

    fn detect(&self, slot: &Slot, ctx: &RuleContext<'_>) -> RepositoryResult<Vec<ViolationDraft>> {
        let Some(interval) = slot.interval() else {
            return Ok(Vec::new());
        };
        let availabilities = ctx.availabilities(AvailabilityOwner::Activity(slot.activity))?;
        if availabilities.is_empty() || interval.is_covered(&availabilities) {
            return Ok(Vec::new());
        }
        Ok(vec![single(self.kind(), slot)])
    }
}

/// A slot reaches outside the event.
#[derive(Debug, Clone, Copy)]
pub struct SlotOutsideEvent;

impl ViolationRule for SlotOutsideEvent {
    fn kind(&self) -> ViolationKind {
        ViolationKind::SlotOutsideEvent
    }

    fn detect(&self, slot: &Slot, ctx: &RuleContext<'_>) -> RepositoryResult<Vec<ViolationDraft>> {
        let Some(interval) = slot.interval() else {
            return Ok(Vec::new());
        };
        if Availability::for_event(ctx.event()).contains(&interval) {
            return Ok(Vec::new());
        }
        Ok(vec![single(self.kind(), slot)])
    }
}

/// A slot is outside the default slots dedicated to its category (warning).
///
/// Only applies once the event declares default slots.
#[derive(Debug, Clone, Copy)]
pub struct AkCategoryMismatch;

impl ViolationRule for AkCategoryMismatch {
    fn kind(&self) -> ViolationKind {
        ViolationKind::AkCategoryMismatch
    }

    fn detect(&self, slot: &Slot, ctx: &RuleContext<'_>) -> RepositoryResult<Vec<ViolationDraft>> {
        let (Some(interval), Some(category)) = (
            slot.interval(),
            activity_of(slot, ctx).and_then(|a| a.category),
        ) else {
            return Ok(Vec::new());
        };
        let default_slots = ctx.default_slots()?;
        if default_slots.is_empty() {
            return Ok(Vec::new());
        }

        let event = ctx.event().id;
        let dedicated: Vec<Availability> = default_slots
            .iter()
            .filter(|d| d.primary_categories.contains(&category))
            .map(|d| {
                Availability::new(event, d.start, d.end)
                    .with_owner(AvailabilityOwner::Category(category))
            })
            .collect();
        if interval.is_covered(&dedicated) {
            return Ok(Vec::new());
        }
        Ok(vec![single(self.kind(), slot).with_category(category)])
    }
}

// ======================== Room fit ========================

/// The slot's room lacks a requirement of the activity.
///
/// One violation per missing requirement.
#[derive(Debug, Clone, Copy)]
pub struct RequirementNotGiven;

impl ViolationRule for RequirementNotGiven {
    fn kind(&self) -> ViolationKind {
        ViolationKind::RequirementNotGiven
    }

    fn detect(&self, slot: &Slot, ctx: &RuleContext<'_>) -> RepositoryResult<Vec<ViolationDraft>> {
        let (Some(room), Some(activity)) = (
            slot.room.and_then(|id| ctx.room(id)),
            activity_of(slot, ctx),
        ) else {
            return Ok(Vec::new());
        };
        Ok(activity
            .requirements
            .iter()
            .filter(|r| !room.has_property(**r))
            .map(|&r| {
                single(self.kind(), slot)
                    .with_requirement(r)
                    .with_room(room.id)
            })
            .collect())
    }
}

/// The slot's room is too small, or nearly so, for the activity's interest.
///
/// - `capacity < interest` → violation
/// - `capacity < interest + margin` or `capacity < interest * ratio` → warning
///
/// Unknown capacity or interest never triggers.
///
/// The comment quotes interest and capacity at detection time. Reconcile
/// keeps a matching row's comment, so after either number changes the stored
/// comment shows the old values until the row is deleted and found again.
#[derive(Debug, Clone, Copy)]
pub struct RoomCapacityExceeded {
    /// Absolute seat margin.
    pub margin: u32,
    /// Relative seat margin.
    pub ratio: f64,
}

impl Default for RoomCapacityExceeded {
    fn default() -> Self {
        Self::from_config(&PlannerConfig::default())
    }
}

impl RoomCapacityExceeded {
    /// Takes the thresholds from `config`.
    pub fn from_config(config: &PlannerConfig) -> Self {
        Self {
            margin: config.capacity_warning_margin,
            ratio: config.capacity_warning_ratio,
        }
    }

    /// Level for a room of `capacity` seats and `interest` attendees.
    pub fn classify(&self, capacity: u32, interest: u32) -> Option<ViolationLevel> {
        if capacity < interest {
            Some(ViolationLevel::Violation)
        } else if u64::from(capacity) < u64::from(interest) + u64::from(self.margin)
            || f64::from(capacity) < f64::from(interest) * self.ratio
        {
            Some(ViolationLevel::Warning)
        } else {
            None
        }
    }
}

impl ViolationRule for RoomCapacityExceeded {
    fn kind(&self) -> ViolationKind {
        ViolationKind::RoomCapacityExceeded
    }

    fn detect(&self, slot: &Slot, ctx: &RuleContext<'_>) -> RepositoryResult<Vec<ViolationDraft>> {
        let Some(room) = slot.room.and_then(|id| ctx.room(id)) else {
            return Ok(Vec::new());
        };
        let (Some(capacity), Some(interest)) =
            (room.capacity, activity_of(slot, ctx).and_then(|a| a.interest))
        else {
            return Ok(Vec::new());
        };

        let Some(level) = self.classify(capacity, interest) else {
            return Ok(Vec::new());
        };
        let comment = match level {
            ViolationLevel::Violation => format!(
                "Not enough space for AK interest (Interest: {interest}, Capacity: {capacity})"
            ),
            ViolationLevel::Warning => format!(
                "Space is too close to AK interest (Interest: {interest}, Capacity: {capacity})"
            ),
        };
        Ok(vec![single(self.kind(), slot)
            .with_room(room.id)
            .with_level(level)
            .with_comment(comment)])
    }
}
