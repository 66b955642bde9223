//! In-memory repository.
//!
//! Holds the complete planning state of one event behind a `RwLock`.
//! Transactions work on a clone and swap it in on success, which gives the
//! same all-or-nothing behavior a database transaction would.

use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::RwLock;

use super::{PlanningStore, RepositoryError, RepositoryResult, Transactional};
use crate::models::{
    Activity, AkId, Availability, AvailabilityOwner, Category, CategoryId, ConstraintViolation,
    DefaultSlot, DefaultSlotId, Event, Owner, OwnerId, Participant, ParticipantId, Preference,
    Requirement, RequirementId, Room, RoomId, Slot, SlotId, ViolationDraft, ViolationId,
    ViolationKind, ViolationLevel,
};

/// Planning state of one event.
#[derive(Debug, Clone)]
pub struct PlanningData {
    event: Event,
    rooms: BTreeMap<RoomId, Room>,
    activities: BTreeMap<AkId, Activity>,
    slots: BTreeMap<SlotId, Slot>,
    owners: BTreeMap<OwnerId, Owner>,
    categories: BTreeMap<CategoryId, Category>,
    requirements: BTreeMap<RequirementId, Requirement>,
    participants: BTreeMap<ParticipantId, Participant>,
    preferences: BTreeMap<(ParticipantId, AkId), Preference>,
    default_slots: BTreeMap<DefaultSlotId, DefaultSlot>,
    availabilities: Vec<Availability>,
    violations: BTreeMap<ViolationId, ConstraintViolation>,
    next_violation_id: i64,
}

impl PlanningData {
    /// Creates an empty planning state for `event`.
    pub fn new(event: Event) -> Self {
        Self {
            event,
            rooms: BTreeMap::new(),
            activities: BTreeMap::new(),
            slots: BTreeMap::new(),
            owners: BTreeMap::new(),
            categories: BTreeMap::new(),
            requirements: BTreeMap::new(),
            participants: BTreeMap::new(),
            preferences: BTreeMap::new(),
            default_slots: BTreeMap::new(),
            availabilities: Vec::new(),
            violations: BTreeMap::new(),
            next_violation_id: 1,
        }
    }
}

fn found<T: Clone>(value: Option<&T>, entity: &'static str, id: impl Into<i64>) -> RepositoryResult<T> {
    value.cloned().ok_or_else(|| RepositoryError::not_found(entity, id))
}

impl PlanningStore for PlanningData {
    fn event(&self) -> RepositoryResult<Event> {
        Ok(self.event.clone())
    }

    fn rooms(&self) -> RepositoryResult<Vec<Room>> {
        Ok(self.rooms.values().cloned().collect())
    }

    fn room(&self, id: RoomId) -> RepositoryResult<Room> {
        found(self.rooms.get(&id), "room", id)
    }

    fn activities(&self) -> RepositoryResult<Vec<Activity>> {
        Ok(self.activities.values().cloned().collect())
    }

    fn activity(&self, id: AkId) -> RepositoryResult<Activity> {
        found(self.activities.get(&id), "AK", id)
    }

    fn slots(&self) -> RepositoryResult<Vec<Slot>> {
        Ok(self.slots.values().cloned().collect())
    }

    fn slot(&self, id: SlotId) -> RepositoryResult<Slot> {
        found(self.slots.get(&id), "slot", id)
    }

    fn slots_of(&self, activity: AkId) -> RepositoryResult<Vec<Slot>> {
        Ok(self
            .slots
            .values()
            .filter(|s| s.activity == activity)
            .cloned()
            .collect())
    }

    fn owners(&self) -> RepositoryResult<Vec<Owner>> {
        Ok(self.owners.values().cloned().collect())
    }

    fn categories(&self) -> RepositoryResult<Vec<Category>> {
        Ok(self.categories.values().cloned().collect())
    }

    fn requirements(&self) -> RepositoryResult<Vec<Requirement>> {
        Ok(self.requirements.values().cloned().collect())
    }

    fn participants(&self) -> RepositoryResult<Vec<Participant>> {
        Ok(self.participants.values().cloned().collect())
    }

    fn preferences(&self) -> RepositoryResult<Vec<Preference>> {
        Ok(self.preferences.values().cloned().collect())
    }

    fn default_slots(&self) -> RepositoryResult<Vec<DefaultSlot>> {
        let mut result: Vec<DefaultSlot> = self.default_slots.values().cloned().collect();
        result.sort_by_key(|d| (d.start, d.end));
        Ok(result)
    }

    fn availabilities(&self, owner: AvailabilityOwner) -> RepositoryResult<Vec<Availability>> {
        Ok(self
            .availabilities
            .iter()
            .filter(|a| a.owner == owner)
            .cloned()
            .collect())
    }

    fn violations(&self, kind: ViolationKind) -> RepositoryResult<Vec<ConstraintViolation>> {
        Ok(self
            .violations
            .values()
            .filter(|v| v.kind() == kind)
            .cloned()
            .collect())
    }

    fn all_violations(&self) -> RepositoryResult<Vec<ConstraintViolation>> {
        Ok(self.violations.values().cloned().collect())
    }

    fn save_event(&mut self, event: Event) -> RepositoryResult<()> {
        self.event = event;
        Ok(())
    }

    fn save_room(&mut self, room: Room) -> RepositoryResult<()> {
        self.rooms.insert(room.id, room);
        Ok(())
    }

    fn delete_room(&mut self, id: RoomId) -> RepositoryResult<()> {
        self.rooms
            .remove(&id)
            .ok_or_else(|| RepositoryError::not_found("room", id))?;
        self.availabilities
            .retain(|a| a.owner != AvailabilityOwner::Room(id));
        for slot in self.slots.values_mut().filter(|s| s.room == Some(id)) {
            slot.room = None;
        }
        Ok(())
    }

    fn save_activity(&mut self, activity: Activity) -> RepositoryResult<()> {
        self.activities.insert(activity.id, activity);
        Ok(())
    }

    fn delete_activity(&mut self, id: AkId) -> RepositoryResult<()> {
        self.activities
            .remove(&id)
            .ok_or_else(|| RepositoryError::not_found("AK", id))?;
        self.slots.retain(|_, s| s.activity != id);
        self.preferences.retain(|(_, ak), _| *ak != id);
        self.availabilities
            .retain(|a| a.owner != AvailabilityOwner::Activity(id));
        Ok(())
    }

    fn save_slot(&mut self, slot: Slot) -> RepositoryResult<()> {
        self.slots.insert(slot.id, slot);
        Ok(())
    }

    fn delete_slot(&mut self, id: SlotId) -> RepositoryResult<()> {
        self.slots
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::not_found("slot", id))
    }

    fn save_owner(&mut self, owner: Owner) -> RepositoryResult<()> {
        self.owners.insert(owner.id, owner);
        Ok(())
    }

    fn delete_owner(&mut self, id: OwnerId) -> RepositoryResult<()> {
        self.owners
            .remove(&id)
            .ok_or_else(|| RepositoryError::not_found("owner", id))?;
        self.availabilities
            .retain(|a| a.owner != AvailabilityOwner::Person(id));
        for activity in self.activities.values_mut() {
            activity.owners.retain(|o| *o != id);
        }
        Ok(())
    }

    fn save_category(&mut self, category: Category) -> RepositoryResult<()> {
        self.categories.insert(category.id, category);
        Ok(())
    }

    fn save_requirement(&mut self, requirement: Requirement) -> RepositoryResult<()> {
        self.requirements.insert(requirement.id, requirement);
        Ok(())
    }

    fn save_participant(&mut self, participant: Participant) -> RepositoryResult<()> {
        self.participants.insert(participant.id, participant);
        Ok(())
    }

    fn save_preference(&mut self, preference: Preference) -> RepositoryResult<()> {
        self.preferences
            .insert((preference.participant, preference.activity), preference);
        Ok(())
    }

    fn save_default_slot(&mut self, default_slot: DefaultSlot) -> RepositoryResult<()> {
        self.default_slots.insert(default_slot.id, default_slot);
        Ok(())
    }

    fn delete_default_slot(&mut self, id: DefaultSlotId) -> RepositoryResult<()> {
        self.default_slots
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::not_found("default slot", id))
    }

    fn add_availability(&mut self, availability: Availability) -> RepositoryResult<()> {
        self.availabilities.push(availability);
        Ok(())
    }

    fn clear_availabilities(&mut self, owner: AvailabilityOwner) -> RepositoryResult<usize> {
        let before = self.availabilities.len();
        self.availabilities.retain(|a| a.owner != owner);
        Ok(before - self.availabilities.len())
    }

    fn insert_violation(&mut self, draft: ViolationDraft) -> RepositoryResult<ViolationId> {
        let id = ViolationId(self.next_violation_id);
        self.next_violation_id += 1;
        self.violations.insert(
            id,
            ConstraintViolation {
                id,
                event: self.event.id,
                draft,
                timestamp: Utc::now(),
                manually_resolved: false,
            },
        );
        Ok(id)
    }

    fn update_violation_level(
        &mut self,
        id: ViolationId,
        level: ViolationLevel,
    ) -> RepositoryResult<()> {
        let violation = self
            .violations
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::not_found("violation", id))?;
        violation.draft.level = level;
        Ok(())
    }

    fn set_violation_resolved(&mut self, id: ViolationId, resolved: bool) -> RepositoryResult<()> {
        let violation = self
            .violations
            .get_mut(&id)
            .ok_or_else(|| RepositoryError::not_found("violation", id))?;
        violation.manually_resolved = resolved;
        Ok(())
    }

    fn delete_violation(&mut self, id: ViolationId) -> RepositoryResult<()> {
        self.violations
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::not_found("violation", id))
    }
}

/// Thread-safe in-memory [`Transactional`] store.
#[derive(Debug)]
pub struct LocalRepository {
    data: RwLock<PlanningData>,
}

impl LocalRepository {
    /// Creates a repository holding an empty planning state for `event`.
    pub fn new(event: Event) -> Self {
        Self::with_data(PlanningData::new(event))
    }

    /// Creates a repository from prepared data.
    pub fn with_data(data: PlanningData) -> Self {
        Self {
            data: RwLock::new(data),
        }
    }
}

impl Transactional for LocalRepository {
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn PlanningStore) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut guard = self
            .data
            .write()
            .map_err(|e| RepositoryError::internal(format!("lock poisoned: {e}")))?;
        let mut working = guard.clone();
        let result = f(&mut working)?;
        *guard = working;
        Ok(result)
    }

    fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn PlanningStore) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let guard = self
            .data
            .read()
            .map_err(|e| RepositoryError::internal(format!("lock poisoned: {e}")))?;
        f(&*guard)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, hour, 0, 0).unwrap()
    }

    fn repo() -> LocalRepository {
        let event = Event::new(crate::models::EventId(1), "Test", at(9), at(18));
        LocalRepository::new(event)
    }

    #[test]
    fn test_transaction_commits_on_ok() {
        let repo = repo();
        repo.transaction(|store| -> RepositoryResult<()> {
            store.save_room(Room::new(RoomId(1), "A"))
        })
        .unwrap();
        let rooms = repo
            .read(|store| -> RepositoryResult<_> { store.rooms() })
            .unwrap();
        assert_eq!(rooms.len(), 1);
    }

    #[test]
    fn test_transaction_rolls_back_on_err() {
        let repo = repo();
        let result = repo.transaction(|store| -> RepositoryResult<()> {
            store.save_room(Room::new(RoomId(1), "A"))?;
            store.delete_slot(SlotId(99))
        });
        assert_eq!(result, Err(RepositoryError::not_found("slot", 99)));
        let rooms = repo
            .read(|store| -> RepositoryResult<_> { store.rooms() })
            .unwrap();
        assert!(rooms.is_empty());
    }

    #[test]
    fn test_delete_owner_cascades_availabilities() {
        let mut data = PlanningData::new(Event::new(crate::models::EventId(1), "T", at(9), at(18)));
        data.save_owner(Owner::new(OwnerId(1), "Alex")).unwrap();
        let event = data.event().unwrap();
        data.add_availability(
            Availability::new(event.id, at(9), at(12)).with_owner(AvailabilityOwner::Person(OwnerId(1))),
        )
        .unwrap();
        data.add_availability(
            Availability::new(event.id, at(9), at(12)).with_owner(AvailabilityOwner::Room(RoomId(1))),
        )
        .unwrap();

        data.delete_owner(OwnerId(1)).unwrap();
        assert!(data
            .availabilities(AvailabilityOwner::Person(OwnerId(1)))
            .unwrap()
            .is_empty());
        assert_eq!(
            data.availabilities(AvailabilityOwner::Room(RoomId(1))).unwrap().len(),
            1
        );
    }

    #[test]
    fn test_delete_activity_cascades_slots() {
        let mut data = PlanningData::new(Event::new(crate::models::EventId(1), "T", at(9), at(18)));
        let event = data.event().unwrap();
        data.save_activity(Activity::new(AkId(1), event.id, "A")).unwrap();
        data.save_slot(Slot::new(SlotId(1), AkId(1), event.id, 1.0)).unwrap();
        data.save_slot(Slot::new(SlotId(2), AkId(2), event.id, 1.0)).unwrap();

        data.delete_activity(AkId(1)).unwrap();
        let slots = data.slots().unwrap();
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].id, SlotId(2));
    }

    #[test]
    fn test_violation_lifecycle() {
        let mut data = PlanningData::new(Event::new(crate::models::EventId(1), "T", at(9), at(18)));
        let id = data
            .insert_violation(ViolationDraft::new(ViolationKind::RoomTwoSlots).with_room(RoomId(1)))
            .unwrap();
        data.set_violation_resolved(id, true).unwrap();
        data.update_violation_level(id, ViolationLevel::Violation).unwrap();

        let stored = data.violations(ViolationKind::RoomTwoSlots).unwrap();
        assert_eq!(stored.len(), 1);
        assert!(stored[0].manually_resolved);
        assert_eq!(stored[0].draft.level, ViolationLevel::Violation);
        assert!(data.violations(ViolationKind::OwnerTwoSlots).unwrap().is_empty());

        data.delete_violation(id).unwrap();
        assert!(data.all_violations().unwrap().is_empty());
        assert!(data.delete_violation(id).is_err());
    }
}
