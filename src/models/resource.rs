//! People and place models.
//!
//! Rooms host slots, owners host activities, participants attend them.
//! Requirements connect activities (and participants) to rooms: an activity
//! needing a projector can only run in a room that has one.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{AkId, OwnerId, ParticipantId, RequirementId, RoomId};

/// A room slots can be placed in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    /// Unique room identifier.
    pub id: RoomId,
    /// Human-readable name.
    pub name: String,
    /// Seats. `None` = unknown, never triggers capacity checks.
    pub capacity: Option<u32>,
    /// Requirements this room fulfills.
    pub properties: Vec<RequirementId>,
}

impl Room {
    /// Creates a room without known capacity.
    pub fn new(id: RoomId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            capacity: None,
            properties: Vec::new(),
        }
    }

    /// Sets the capacity.
    pub fn with_capacity(mut self, capacity: u32) -> Self {
        self.capacity = Some(capacity);
        self
    }

    /// Adds a fulfilled requirement.
    pub fn with_property(mut self, requirement: RequirementId) -> Self {
        self.properties.push(requirement);
        self
    }

    /// Whether the room fulfills `requirement`.
    #[inline]
    pub fn has_property(&self, requirement: RequirementId) -> bool {
        self.properties.contains(&requirement)
    }
}

/// A room property activities may require (e.g. "Beamer", "Tafel").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Requirement {
    /// Unique requirement identifier.
    pub id: RequirementId,
    /// Name; used verbatim as a room constraint label.
    pub name: String,
}

impl Requirement {
    /// Creates a requirement.
    pub fn new(id: RequirementId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A person hosting activities.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Owner {
    /// Unique owner identifier.
    pub id: OwnerId,
    /// Display name.
    pub name: String,
}

impl Owner {
    /// Creates an owner.
    pub fn new(id: OwnerId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// An event attendee with activity preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    /// Unique participant identifier.
    pub id: ParticipantId,
    /// Nickname. Empty = anonymous.
    pub name: String,
    /// Institution (university etc.).
    pub institution: Option<String>,
    /// Room properties the participant needs.
    pub requirements: Vec<RequirementId>,
}

impl Participant {
    /// Creates an anonymous participant.
    pub fn new(id: ParticipantId) -> Self {
        Self {
            id,
            name: String::new(),
            institution: None,
            requirements: Vec::new(),
        }
    }

    /// Sets the nickname.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Sets the institution.
    pub fn with_institution(mut self, institution: impl Into<String>) -> Self {
        self.institution = Some(institution.into());
        self
    }

    /// Adds a requirement.
    pub fn with_requirement(mut self, requirement: RequirementId) -> Self {
        self.requirements.push(requirement);
        self
    }
}

impl fmt::Display for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name.is_empty() {
            write!(f, "Anonymous {}", self.id)?;
        } else {
            write!(f, "{}", self.name)?;
        }
        if let Some(institution) = &self.institution {
            write!(f, " ({institution})")?;
        }
        Ok(())
    }
}

/// How much a participant wants to attend an activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PreferenceLevel {
    /// No interest; never exported.
    Ignore,
    /// Interested.
    Prefer,
    /// Great interest.
    StrongPrefer,
    /// Must attend.
    Required,
}

impl PreferenceLevel {
    /// Numeric level (0..=3).
    pub fn value(self) -> i32 {
        match self {
            Self::Ignore => 0,
            Self::Prefer => 1,
            Self::StrongPrefer => 2,
            Self::Required => 3,
        }
    }
}

/// A participant's preference for one activity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preference {
    /// Who.
    pub participant: ParticipantId,
    /// For which activity.
    pub activity: AkId,
    /// How much.
    pub level: PreferenceLevel,
}

impl Preference {
    /// Creates a preference.
    pub fn new(participant: ParticipantId, activity: AkId, level: PreferenceLevel) -> Self {
        Self {
            participant,
            activity,
            level,
        }
    }

    /// Whether attendance is mandatory.
    #[inline]
    pub fn required(&self) -> bool {
        self.level == PreferenceLevel::Required
    }

    /// Solver score: the level itself, `-1` for required preferences.
    pub fn score(&self) -> i32 {
        if self.required() {
            -1
        } else {
            self.level.value()
        }
    }
}
