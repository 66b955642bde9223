//! Exchange with an external schedule optimizer.
//!
//! The optimizer itself is opaque: it receives a [`SolverInput`] JSON
//! document and answers with an [`ImportDocument`] placing each slot in a
//! room and a set of timeslots.
//!
//! # Constraint Labels
//! Both directions share one label namespace (see [`labels`]). Activities and
//! participants list labels they *require*; rooms and timeslots list labels
//! they *fulfill*.
//!
//! | Label | Required by | Fulfilled by |
//! |-------|-------------|--------------|
//! | `availability-room-<id>` | restricted room | timeslots inside its availability |
//! | `availability-ak-<id>` | restricted activity | timeslots inside its availability |
//! | `availability-person-<id>` | activity of a restricted owner | timeslots inside the owner's availability |
//! | `availability-participant-<id>` | restricted participant with a required preference | timeslots inside the participant's availability |
//! | `availability-cat-<name>` | activity of the category | timeslots of default slots of the category |
//! | `fixed-akslot-<id>` | fixed slot | timeslots overlapping the fixed position |
//! | `fixed-room-<id>` | fixed slot with a room | that room |
//! | `notblock<N>` | (solver internal) | timeslots outside block `N` |
//! | `resolution` | resolution activity | timeslots ending before the deadline |
//! | `no-proxy` | everything without a proxy label | everything without a proxy label |

mod export;
mod import;
pub mod labels;

pub use export::{
    build_export, AkEntry, AkInfo, AkProperties, EventInfo, ExportOptions, ParticipantEntry,
    ParticipantInfo, PreferenceEntry, RoomEntry, RoomInfo, SolverInput, TimeslotEntry,
    TimeslotInfo, TimeslotSection, TimeslotSpan,
};
pub(crate) use export::timeslot_grid;
pub use import::{apply_import, ImportDocument, ImportError, ScheduledAk};
