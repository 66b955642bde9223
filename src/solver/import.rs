//! Solver result import.
//!
//! A result maps slots to a room and a set of timeslot ids. Everything is
//! checked before the first write; the caller runs the import inside one
//! transaction, so a rejected result never leaves a partial schedule.

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::export::{build_export, timeslot_grid, ExportOptions, SolverInput};
use crate::config::PlannerConfig;
use crate::error::Result;
use crate::models::{Activity, Availability, RoomId, Slot, SlotId};
use crate::repository::PlanningStore;

/// Solver output document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportDocument {
    /// The input the solver worked on, echoed back.
    pub input: serde_json::Value,
    /// One assignment per placed slot.
    pub scheduled_aks: Vec<ScheduledAk>,
}

/// Placement of one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledAk {
    /// Slot id (the `id` of the exported AK entry).
    pub ak_id: SlotId,
    /// Assigned room.
    pub room_id: RoomId,
    /// Assigned timeslots; their hull is the slot's new span.
    pub timeslot_ids: Vec<usize>,
}

/// Reasons a solver result is rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ImportError {
    /// The embedded input cannot be read as a solver input.
    #[error("embedded solver input is malformed: {0}")]
    MalformedInput(String),
    /// The embedded input differs from a fresh export.
    #[error("solver input is stale: planning data changed since the export")]
    StaleInput,
    /// Assignment for a slot that was not exported.
    #[error("unknown slot {0}")]
    UnknownSlot(SlotId),
    /// Assignment to a room that doesn't exist.
    #[error("slot {slot} assigned to unknown room {room}")]
    UnknownRoom { slot: SlotId, room: RoomId },
    /// Assignment to a timeslot id outside the grid.
    #[error("slot {slot} assigned to unknown timeslot {timeslot}")]
    UnknownTimeslot { slot: SlotId, timeslot: usize },
    /// The same slot is assigned more than once.
    #[error("slot {0} is assigned more than once")]
    DuplicateAssignment(SlotId),
    /// The assigned timeslots span less than the slot's duration.
    #[error("AK '{activity}' (slot {slot}): assigned {assigned}h, needs {required}h")]
    InsufficientDuration {
        activity: String,
        slot: SlotId,
        assigned: f64,
        required: f64,
    },
    /// A fixed slot was moved.
    #[error("AK '{activity}' (slot {slot}) is fixed but was assigned another room or start")]
    FixedSlotMismatch { activity: String, slot: SlotId },
    /// A movable slot has no assignment.
    #[error("AK '{activity}' (slot {slot}) was not scheduled")]
    MissingAssignment { activity: String, slot: SlotId },
}

/// Validates `document` and writes the new slot positions.
///
/// Returns the ids of slots whose room or start changed. Fixed slots keep
/// their room and start; only the parts they lack are filled in.
///
/// # Errors
/// [`ImportError`] for every rejected result, plus storage, validation
/// and discretization errors of the fresh export.
pub fn apply_import(
    store: &mut dyn PlanningStore,
    config: &PlannerConfig,
    options: &ExportOptions,
    document: &ImportDocument,
) -> Result<Vec<SlotId>> {
    let fresh = build_export(store, config, options)?;
    if config.reject_stale_input {
        let echoed: SolverInput = serde_json::from_value(document.input.clone())
            .map_err(|e| ImportError::MalformedInput(e.to_string()))?;
        if echoed != fresh {
            return Err(ImportError::StaleInput.into());
        }
    }

    let event = store.event()?;
    let timeslots: BTreeMap<usize, Availability> = timeslot_grid(store, event.export_slot)?
        .into_iter()
        .flatten()
        .map(|t| (t.index, t.interval))
        .collect();
    let exported: BTreeSet<SlotId> = fresh.aks.iter().map(|a| a.id).collect();
    let slots: BTreeMap<SlotId, Slot> = store
        .slots()?
        .into_iter()
        .filter(|s| exported.contains(&s.id))
        .map(|s| (s.id, s))
        .collect();
    let activities: BTreeMap<_, Activity> =
        store.activities()?.into_iter().map(|a| (a.id, a)).collect();
    let rooms: BTreeSet<RoomId> = store.rooms()?.iter().map(|r| r.id).collect();
    let name_of = |slot: &Slot| {
        activities
            .get(&slot.activity)
            .map_or_else(|| slot.activity.to_string(), |a| a.name.clone())
    };

    let mut assigned = BTreeSet::new();
    let mut updates = Vec::new();
    for scheduled in &document.scheduled_aks {
        let slot = slots
            .get(&scheduled.ak_id)
            .ok_or(ImportError::UnknownSlot(scheduled.ak_id))?;
        if !assigned.insert(slot.id) {
            return Err(ImportError::DuplicateAssignment(slot.id).into());
        }
        if !rooms.contains(&scheduled.room_id) {
            return Err(ImportError::UnknownRoom {
                slot: slot.id,
                room: scheduled.room_id,
            }
            .into());
        }

        let span = assigned_span(slot.id, &scheduled.timeslot_ids, &timeslots)?;
        let hours = span.as_ref().map_or(0.0, Availability::duration_hours);
        if hours + config.duration_epsilon < slot.duration {
            return Err(ImportError::InsufficientDuration {
                activity: name_of(slot),
                slot: slot.id,
                assigned: hours,
                required: slot.duration,
            }
            .into());
        }
        let start = span.map(|s| s.start);

        // A fixed slot pins what it has; a missing room or start is the solver's to pick.
        if options.is_fixed(slot) {
            let room_moved = slot.room.is_some_and(|room| room != scheduled.room_id);
            let start_moved = slot.start.is_some() && slot.start != start;
            if room_moved || start_moved {
                return Err(ImportError::FixedSlotMismatch {
                    activity: name_of(slot),
                    slot: slot.id,
                }
                .into());
            }
        }

        if slot.room != Some(scheduled.room_id) || slot.start != start {
            let mut moved = slot.clone();
            moved.room = Some(scheduled.room_id);
            moved.start = start;
            updates.push(moved);
        }
    }

    if let Some(slot) = slots
        .values()
        .find(|s| !options.is_fixed(s) && !assigned.contains(&s.id))
    {
        return Err(ImportError::MissingAssignment {
            activity: name_of(slot),
            slot: slot.id,
        }
        .into());
    }

    let mut changed = Vec::with_capacity(updates.len());
    for slot in updates {
        debug!("slot {} moved to room {:?} at {:?}", slot.id, slot.room, slot.start);
        changed.push(slot.id);
        store.save_slot(slot)?;
    }
    info!(
        "imported {} assignment(s), {} slot(s) changed",
        document.scheduled_aks.len(),
        changed.len()
    );
    Ok(changed)
}

/// Hull of the assigned timeslots, `None` for an empty assignment.
fn assigned_span(
    slot: SlotId,
    ids: &[usize],
    timeslots: &BTreeMap<usize, Availability>,
) -> std::result::Result<Option<Availability>, ImportError> {
    let mut bounds: Option<(DateTime<Utc>, DateTime<Utc>, &Availability)> = None;
    for &id in ids {
        let timeslot = timeslots
            .get(&id)
            .ok_or(ImportError::UnknownTimeslot { slot, timeslot: id })?;
        bounds = Some(match bounds {
            None => (timeslot.start, timeslot.end, timeslot),
            Some((start, end, first)) => {
                (start.min(timeslot.start), end.max(timeslot.end), first)
            }
        });
    }
    Ok(bounds.map(|(start, end, first)| Availability::new(first.event, start, end)))
}
