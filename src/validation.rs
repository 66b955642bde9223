//! Integrity checks for planning data.
//!
//! Run before every export. Detects:
//! - References to entities that do not exist
//! - Non-positive or unrepresentable slot durations
//! - Empty event or default slot spans and unusable timeslot widths
//! - Circular prerequisite chains (DAG validation)
//!
//! All problems are collected; the check never stops at the first one.
//!
//! # Reference
//! Cormen et al. (2009), "Introduction to Algorithms", Ch. 22.4 (Topological Sort)

use chrono::Duration;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::{hours, AkId};
use crate::repository::{PlanningStore, RepositoryError};
use crate::timeslots::Discretizer;

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// An entity references another one that doesn't exist.
    DanglingReference,
    /// A slot has zero or negative duration.
    NonPositiveDuration,
    /// A slot's duration does not fit the calendar from its start.
    DurationOutOfRange,
    /// The event ends before it starts or has an unusable timeslot width.
    InvalidEventSpan,
    /// A default slot ends before it starts.
    EmptyDefaultSlot,
    /// Prerequisite graph contains a cycle.
    CyclicPrerequisite,
    /// The store could not be read.
    Unreadable,
}

impl ValidationError {
    pub(crate) fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }
}

impl From<RepositoryError> for ValidationError {
    fn from(err: RepositoryError) -> Self {
        Self::new(ValidationErrorKind::Unreadable, err.to_string())
    }
}

/// Validates the planning data in `store`.
///
/// Checks:
/// 1. Event span is positive, timeslot width is between one millisecond and
///    the event length
/// 2. Slots point to existing activities and rooms, have a positive duration
///    whose end is representable
/// 3. Activities point to existing owners, categories, requirements,
///    conflicting and prerequisite activities
/// 4. Rooms point to existing requirements
/// 5. Preferences point to existing participants and activities
/// 6. Default slots are non-empty
/// 7. No circular prerequisite chains
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_planning(store: &dyn PlanningStore) -> ValidationResult {
    let mut errors = Vec::new();
    if let Err(err) = collect(store, &mut errors) {
        errors.push(err.into());
    }
    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn collect(store: &dyn PlanningStore, errors: &mut Vec<ValidationError>) -> Result<(), RepositoryError> {
    let dangling = |message: String| ValidationError::new(ValidationErrorKind::DanglingReference, message);

    let event = store.event()?;
    if event.end <= event.start {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidEventSpan,
            format!("Event '{}' ends before it starts", event.slug),
        ));
    }
    let span = event.end - event.start;
    let width = Discretizer::new(event.export_slot);
    let width_ok = if span > Duration::zero() {
        width.step_within(span).is_ok()
    } else {
        width.step().is_some()
    };
    if !width_ok {
        errors.push(ValidationError::new(
            ValidationErrorKind::InvalidEventSpan,
            format!(
                "Event '{}' has invalid timeslot width {}",
                event.slug, event.export_slot
            ),
        ));
    }

    let activities = store.activities()?;
    let activity_ids: BTreeSet<AkId> = activities.iter().map(|a| a.id).collect();
    let room_ids: BTreeSet<_> = store.rooms()?.iter().map(|r| r.id).collect();
    let owner_ids: BTreeSet<_> = store.owners()?.iter().map(|o| o.id).collect();
    let category_ids: BTreeSet<_> = store.categories()?.iter().map(|c| c.id).collect();
    let requirement_ids: BTreeSet<_> = store.requirements()?.iter().map(|r| r.id).collect();
    let participant_ids: BTreeSet<_> = store.participants()?.iter().map(|p| p.id).collect();

    // Slots
    for slot in store.slots()? {
        if !activity_ids.contains(&slot.activity) {
            errors.push(dangling(format!(
                "Slot {} references unknown AK {}",
                slot.id, slot.activity
            )));
        }
        if let Some(room) = slot.room.filter(|r| !room_ids.contains(r)) {
            errors.push(dangling(format!(
                "Slot {} references unknown room {}",
                slot.id, room
            )));
        }
        if slot.duration.is_nan() || slot.duration <= 0.0 {
            errors.push(ValidationError::new(
                ValidationErrorKind::NonPositiveDuration,
                format!("Slot {} has non-positive duration {}", slot.id, slot.duration),
            ));
        } else if hours(slot.duration).is_none() || (slot.is_scheduled() && slot.end().is_none())
        {
            errors.push(ValidationError::new(
                ValidationErrorKind::DurationOutOfRange,
                format!("Slot {} has out-of-range duration {}", slot.id, slot.duration),
            ));
        }
    }

    // Activities
    for activity in &activities {
        for owner in activity.owners.iter().filter(|o| !owner_ids.contains(o)) {
            errors.push(dangling(format!(
                "AK {} references unknown owner {}",
                activity.id, owner
            )));
        }
        if let Some(category) = activity.category.filter(|c| !category_ids.contains(c)) {
            errors.push(dangling(format!(
                "AK {} references unknown category {}",
                activity.id, category
            )));
        }
        for requirement in activity
            .requirements
            .iter()
            .filter(|r| !requirement_ids.contains(r))
        {
            errors.push(dangling(format!(
                "AK {} references unknown requirement {}",
                activity.id, requirement
            )));
        }
        for other in activity.conflicts.iter().filter(|a| !activity_ids.contains(a)) {
            errors.push(dangling(format!(
                "AK {} conflicts with unknown AK {}",
                activity.id, other
            )));
        }
        for other in activity
            .prerequisites
            .iter()
            .filter(|a| !activity_ids.contains(a))
        {
            errors.push(dangling(format!(
                "AK {} requires unknown AK {}",
                activity.id, other
            )));
        }
    }

    // Rooms
    for room in store.rooms()? {
        for requirement in room.properties.iter().filter(|r| !requirement_ids.contains(r)) {
            errors.push(dangling(format!(
                "Room {} references unknown requirement {}",
                room.id, requirement
            )));
        }
    }

    // Preferences
    for preference in store.preferences()? {
        if !participant_ids.contains(&preference.participant) {
            errors.push(dangling(format!(
                "Preference references unknown participant {}",
                preference.participant
            )));
        }
        if !activity_ids.contains(&preference.activity) {
            errors.push(dangling(format!(
                "Preference of participant {} references unknown AK {}",
                preference.participant, preference.activity
            )));
        }
    }

    for default_slot in store.default_slots()? {
        if default_slot.end <= default_slot.start {
            errors.push(ValidationError::new(
                ValidationErrorKind::EmptyDefaultSlot,
                format!("Default slot {} ends before it starts", default_slot.id),
            ));
        }
    }

    let prerequisites: BTreeMap<AkId, Vec<AkId>> = activities
        .iter()
        .map(|a| (a.id, a.prerequisites.clone()))
        .collect();
    if let Some(cycle_err) = detect_cycles(&prerequisites) {
        errors.push(cycle_err);
    }

    Ok(())
}

/// Detects cycles in the prerequisite graph using DFS.
///
/// # Algorithm
/// Topological sort via DFS. If a back-edge is found (visiting a node
/// currently in the recursion stack), a cycle exists.
fn detect_cycles(prerequisites: &BTreeMap<AkId, Vec<AkId>>) -> Option<ValidationError> {
    let mut visited = BTreeSet::new();
    let mut in_stack = BTreeSet::new();

    for &node in prerequisites.keys() {
        if !visited.contains(&node) && has_cycle_dfs(node, prerequisites, &mut visited, &mut in_stack)
        {
            return Some(ValidationError::new(
                ValidationErrorKind::CyclicPrerequisite,
                format!("Circular prerequisites detected involving AK {node}"),
            ));
        }
    }

    None
}

fn has_cycle_dfs(
    node: AkId,
    adj: &BTreeMap<AkId, Vec<AkId>>,
    visited: &mut BTreeSet<AkId>,
    in_stack: &mut BTreeSet<AkId>,
) -> bool {
    visited.insert(node);
    in_stack.insert(node);

    if let Some(neighbors) = adj.get(&node) {
        for &next in neighbors {
            if in_stack.contains(&next) {
                return true; // Back edge
            }
            if !visited.contains(&next) && has_cycle_dfs(next, adj, visited, in_stack) {
                return true;
            }
        }
    }

    in_stack.remove(&node);
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Activity, DefaultSlot, DefaultSlotId, Event, EventId, OwnerId, ParticipantId, Preference,
        PreferenceLevel, Room, RoomId, Slot, SlotId,
    };
    use crate::repository::PlanningData;
    use chrono::{TimeZone, Utc};

    fn data() -> PlanningData {
        let start = Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 10, 18, 0, 0).unwrap();
        let mut data = PlanningData::new(Event::new(EventId(1), "T", start, end));
        data.save_room(Room::new(RoomId(1), "HS 1")).unwrap();
        data.save_activity(Activity::new(AkId(1), EventId(1), "A")).unwrap();
        data.save_activity(Activity::new(AkId(2), EventId(1), "B").with_prerequisite(AkId(1)))
            .unwrap();
        data.save_slot(Slot::new(SlotId(1), AkId(1), EventId(1), 1.0).in_room(RoomId(1)))
            .unwrap();
        data
    }

    fn kinds(data: &PlanningData) -> Vec<ValidationErrorKind> {
        validate_planning(data)
            .unwrap_err()
            .into_iter()
            .map(|e| e.kind)
            .collect()
    }

    #[test]
    fn test_valid_data() {
        assert!(validate_planning(&data()).is_ok());
    }

    #[test]
    fn test_dangling_slot_references() {
        let mut data = data();
        data.save_slot(Slot::new(SlotId(2), AkId(9), EventId(1), 1.0).in_room(RoomId(7)))
            .unwrap();
        let errors = validate_planning(&data).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors
            .iter()
            .all(|e| e.kind == ValidationErrorKind::DanglingReference));
        assert!(errors[0].message.contains("unknown AK 9"));
    }

    #[test]
    fn test_dangling_activity_and_preference_references() {
        let mut data = data();
        data.save_activity(
            Activity::new(AkId(3), EventId(1), "C")
                .with_owner(OwnerId(5))
                .with_conflict(AkId(8)),
        )
        .unwrap();
        data.save_preference(Preference::new(ParticipantId(1), AkId(3), PreferenceLevel::Prefer))
            .unwrap();
        assert_eq!(kinds(&data).len(), 3);
    }

    #[test]
    fn test_non_positive_duration() {
        let mut data = data();
        data.save_slot(Slot::new(SlotId(2), AkId(1), EventId(1), 0.0)).unwrap();
        assert_eq!(kinds(&data), vec![ValidationErrorKind::NonPositiveDuration]);
    }

    #[test]
    fn test_out_of_range_duration() {
        let mut data = data();
        let start = data.event().unwrap().start;
        data.save_slot(Slot::new(SlotId(2), AkId(1), EventId(1), 1e12).at(start)).unwrap();
        data.save_slot(Slot::new(SlotId(3), AkId(1), EventId(1), f64::INFINITY)).unwrap();
        assert_eq!(
            kinds(&data),
            vec![
                ValidationErrorKind::DurationOutOfRange,
                ValidationErrorKind::DurationOutOfRange
            ]
        );
    }

    #[test]
    fn test_unusable_export_width() {
        for width in [1e-7, 1e12, 9.5] {
            let mut data = data();
            let event = data.event().unwrap().with_export_slot(width);
            data.save_event(event).unwrap();
            assert_eq!(kinds(&data), vec![ValidationErrorKind::InvalidEventSpan], "{width}");
        }

        let mut data = data();
        let event = data.event().unwrap().with_export_slot(9.0);
        data.save_event(event).unwrap();
        assert!(validate_planning(&data).is_ok());
    }

    #[test]
    fn test_inverted_spans() {
        let mut data = data();
        let mut event = data.event().unwrap();
        event.end = event.start - chrono::Duration::hours(1);
        let start = event.start;
        data.save_event(event).unwrap();
        data.save_default_slot(DefaultSlot::new(DefaultSlotId(1), start, start)).unwrap();
        assert_eq!(
            kinds(&data),
            vec![
                ValidationErrorKind::InvalidEventSpan,
                ValidationErrorKind::EmptyDefaultSlot
            ]
        );
    }

    #[test]
    fn test_cyclic_prerequisites() {
        // 1 → 2 → 3 → 1
        let mut data = data();
        data.save_activity(
            Activity::new(AkId(1), EventId(1), "A").with_prerequisite(AkId(3)),
        )
        .unwrap();
        data.save_activity(Activity::new(AkId(3), EventId(1), "C").with_prerequisite(AkId(2)))
            .unwrap();
        assert_eq!(kinds(&data), vec![ValidationErrorKind::CyclicPrerequisite]);
    }

    #[test]
    fn test_self_prerequisite_is_a_cycle() {
        let mut data = data();
        data.save_activity(Activity::new(AkId(1), EventId(1), "A").with_prerequisite(AkId(1)))
            .unwrap();
        assert_eq!(kinds(&data), vec![ValidationErrorKind::CyclicPrerequisite]);
    }

    #[test]
    fn test_no_cycle_in_chain() {
        let mut data = data();
        data.save_activity(Activity::new(AkId(3), EventId(1), "C").with_prerequisite(AkId(2)))
            .unwrap();
        assert!(validate_planning(&data).is_ok());
    }
}
