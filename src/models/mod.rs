//! Planning domain models.
//!
//! Plain data types for events, activities and their slots, rooms, people,
//! availabilities and persisted constraint violations. Behavior beyond
//! simple accessors lives in the algorithmic modules.
//!
//! # Domain Mappings
//!
//! | ak-planner | Conference | Timetabling |
//! |------------|------------|-------------|
//! | Event | Conference | Term |
//! | Activity | Session / Workshop | Course |
//! | Slot | Session occurrence | Lecture |
//! | Room | Room | Room |
//! | Owner | Speaker / Host | Lecturer |
//! | Participant | Attendee | Student |

mod activity;
mod availability;
mod event;
mod ids;
mod resource;
mod violation;

pub use activity::{Activity, Slot};
pub use availability::{intersection, union, Availability, AvailabilityError, AvailabilityOwner};
pub use event::{hours, Category, DefaultSlot, Event};
pub use ids::{
    AkId, CategoryId, DefaultSlotId, EventId, OwnerId, ParticipantId, RequirementId, RoomId,
    SlotId, TrackId, ViolationId,
};
pub use resource::{Owner, Participant, Preference, PreferenceLevel, Requirement, Room};
pub use violation::{
    ConstraintViolation, ViolationDraft, ViolationIdentity, ViolationKind, ViolationLevel,
};
