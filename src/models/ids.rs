//! Strongly typed entity identifiers.
//!
//! Every persisted entity is addressed by an integer primary key. Wrapping
//! them keeps a room id from being passed where a slot id is expected; the
//! wire format still sees plain integers (`#[serde(transparent)]`).

use serde::{Deserialize, Serialize};
use std::fmt;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            /// Raw primary key.
            #[inline]
            pub fn value(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl From<$name> for i64 {
            fn from(id: $name) -> Self {
                id.0
            }
        }
    };
}

entity_id!(
    /// Event primary key.
    EventId
);
entity_id!(
    /// Activity ("AK") primary key.
    AkId
);
entity_id!(
    /// Slot primary key. Also the `id` of an activity entry in solver documents.
    SlotId
);
entity_id!(
    /// Room primary key.
    RoomId
);
entity_id!(
    /// Activity owner primary key.
    OwnerId
);
entity_id!(
    /// Category primary key.
    CategoryId
);
entity_id!(
    /// Track primary key.
    TrackId
);
entity_id!(
    /// Requirement (room property) primary key.
    RequirementId
);
entity_id!(
    /// Participant primary key.
    ParticipantId
);
entity_id!(
    /// Default slot primary key.
    DefaultSlotId
);
entity_id!(
    /// Persisted constraint violation primary key.
    ViolationId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_id_serializes_as_plain_integer() {
        let json = serde_json::to_string(&SlotId(42)).unwrap();
        assert_eq!(json, "42");
        let back: RoomId = serde_json::from_str("7").unwrap();
        assert_eq!(back, RoomId(7));
        assert_eq!(back.to_string(), "7");
    }
}
