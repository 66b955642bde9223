//! Storage abstraction.
//!
//! The planning core does not own persistence. It reads the planning state of
//! one event through [`PlanningStore`] and writes slots and violations back
//! through the same trait. [`Transactional`] gives the all-or-nothing
//! semantics the constraint engine and the solver import rely on: an error
//! inside a transaction discards every write made in it.
//!
//! ```text
//! ┌──────────────────────────────┐
//! │          Planner             │
//! └──────────────┬───────────────┘
//!                │ transaction / read
//! ┌──────────────▼───────────────┐
//! │  Transactional (repository)  │
//! └──────────────┬───────────────┘
//!                │ &mut dyn PlanningStore
//! ┌──────────────▼───────────────┐
//! │  PlanningData / DB session   │
//! └──────────────────────────────┘
//! ```

mod local;

pub use local::{LocalRepository, PlanningData};

use crate::models::{
    Activity, AkId, Availability, AvailabilityOwner, Category, ConstraintViolation, DefaultSlot,
    DefaultSlotId, Event, Owner, OwnerId, Participant, Preference, Requirement, Room, RoomId,
    Slot, SlotId, ViolationDraft, ViolationId, ViolationKind, ViolationLevel,
};

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

/// Storage failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    /// Requested entity does not exist.
    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: i64 },

    /// Backend state is unusable (poisoned lock, broken connection).
    #[error("internal repository error: {0}")]
    Internal(String),
}

impl RepositoryError {
    /// Creates a not found error.
    pub fn not_found(entity: &'static str, id: impl Into<i64>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Read and write access to the planning state of one event.
///
/// Listing methods return entities ordered by primary key.
pub trait PlanningStore {
    // Reads

    /// The event.
    fn event(&self) -> RepositoryResult<Event>;
    /// All rooms.
    fn rooms(&self) -> RepositoryResult<Vec<Room>>;
    /// One room.
    fn room(&self, id: RoomId) -> RepositoryResult<Room>;
    /// All activities.
    fn activities(&self) -> RepositoryResult<Vec<Activity>>;
    /// One activity.
    fn activity(&self, id: AkId) -> RepositoryResult<Activity>;
    /// All slots.
    fn slots(&self) -> RepositoryResult<Vec<Slot>>;
    /// One slot.
    fn slot(&self, id: SlotId) -> RepositoryResult<Slot>;
    /// Slots of one activity.
    fn slots_of(&self, activity: AkId) -> RepositoryResult<Vec<Slot>>;
    /// All owners.
    fn owners(&self) -> RepositoryResult<Vec<Owner>>;
    /// All categories.
    fn categories(&self) -> RepositoryResult<Vec<Category>>;
    /// All requirements.
    fn requirements(&self) -> RepositoryResult<Vec<Requirement>>;
    /// All participants.
    fn participants(&self) -> RepositoryResult<Vec<Participant>>;
    /// All preferences.
    fn preferences(&self) -> RepositoryResult<Vec<Preference>>;
    /// Default slots ordered by start.
    fn default_slots(&self) -> RepositoryResult<Vec<DefaultSlot>>;
    /// Persisted availabilities of one owner.
    fn availabilities(&self, owner: AvailabilityOwner) -> RepositoryResult<Vec<Availability>>;
    /// Persisted violations of one kind.
    fn violations(&self, kind: ViolationKind) -> RepositoryResult<Vec<ConstraintViolation>>;
    /// All persisted violations.
    fn all_violations(&self) -> RepositoryResult<Vec<ConstraintViolation>>;

    // Writes

    /// Replaces the event.
    fn save_event(&mut self, event: Event) -> RepositoryResult<()>;
    /// Inserts or replaces a room.
    fn save_room(&mut self, room: Room) -> RepositoryResult<()>;
    /// Deletes a room and its availabilities. Slots in it become roomless.
    fn delete_room(&mut self, id: RoomId) -> RepositoryResult<()>;
    /// Inserts or replaces an activity.
    fn save_activity(&mut self, activity: Activity) -> RepositoryResult<()>;
    /// Deletes an activity with its slots and availabilities.
    fn delete_activity(&mut self, id: AkId) -> RepositoryResult<()>;
    /// Inserts or replaces a slot.
    fn save_slot(&mut self, slot: Slot) -> RepositoryResult<()>;
    /// Deletes a slot.
    fn delete_slot(&mut self, id: SlotId) -> RepositoryResult<()>;
    /// Inserts or replaces an owner.
    fn save_owner(&mut self, owner: Owner) -> RepositoryResult<()>;
    /// Deletes an owner and their availabilities.
    fn delete_owner(&mut self, id: OwnerId) -> RepositoryResult<()>;
    /// Inserts or replaces a category.
    fn save_category(&mut self, category: Category) -> RepositoryResult<()>;
    /// Inserts or replaces a requirement.
    fn save_requirement(&mut self, requirement: Requirement) -> RepositoryResult<()>;
    /// Inserts or replaces a participant.
    fn save_participant(&mut self, participant: Participant) -> RepositoryResult<()>;
    /// Inserts or replaces the preference of a participant for an activity.
    fn save_preference(&mut self, preference: Preference) -> RepositoryResult<()>;
    /// Inserts or replaces a default slot.
    fn save_default_slot(&mut self, default_slot: DefaultSlot) -> RepositoryResult<()>;
    /// Deletes a default slot.
    fn delete_default_slot(&mut self, id: DefaultSlotId) -> RepositoryResult<()>;
    /// Stores an availability.
    fn add_availability(&mut self, availability: Availability) -> RepositoryResult<()>;
    /// Removes all availabilities of an owner; returns how many were removed.
    fn clear_availabilities(&mut self, owner: AvailabilityOwner) -> RepositoryResult<usize>;
    /// Persists a detected violation with the current timestamp.
    fn insert_violation(&mut self, draft: ViolationDraft) -> RepositoryResult<ViolationId>;
    /// Changes the level of a persisted violation.
    fn update_violation_level(
        &mut self,
        id: ViolationId,
        level: ViolationLevel,
    ) -> RepositoryResult<()>;
    /// Sets the manual-resolution flag.
    fn set_violation_resolved(&mut self, id: ViolationId, resolved: bool) -> RepositoryResult<()>;
    /// Deletes a persisted violation.
    fn delete_violation(&mut self, id: ViolationId) -> RepositoryResult<()>;
}

/// Transaction boundary over a [`PlanningStore`].
pub trait Transactional {
    /// Runs `f` with write access. Writes become visible only if `f`
    /// returns `Ok`; on `Err` nothing is applied.
    fn transaction<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn PlanningStore) -> Result<T, E>,
        E: From<RepositoryError>;

    /// Runs `f` with read access.
    fn read<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&dyn PlanningStore) -> Result<T, E>,
        E: From<RepositoryError>;
}
