//! Entity mutation service.
//!
//! [`Planner`] is the single entry point for the CRUD layer. Every change to
//! planning data goes through [`Planner::apply`] together with the
//! [`Mutation`]s it represents; the planner then recomputes the affected
//! violation kinds in the same transaction.
//!
//! # Cascade Table
//!
//! | Mutation | Kinds | Scope |
//! |----------|-------|-------|
//! | `ActivitySaved` | capacity, reso deadline, category mismatch | activity |
//! | `SlotSaved` | all | slot |
//! | `OwnersChanged` | owner two slots | activity |
//! | `ConflictsChanged` | conflict collision | activity |
//! | `PrerequisitesChanged` | before prerequisite | activity |
//! | `RequirementsChanged` | requirement not given | activity |
//! | `AvailabilitySaved` (activity) | outside availability | activity |
//! | `RoomSaved` | capacity | room |
//! | `RoomPropertiesChanged` | requirement not given | room |
//! | `EventSaved` | reso deadline, outside event, category mismatch | event |
//! | `DefaultSlotsChanged` | category mismatch | event |
//!
//! Deletions go through [`Planner::delete_slot`] and [`Planner::delete_room`],
//! which drop the violations naming the deleted entity.

use log::{info, warn};

use crate::config::PlannerConfig;
use crate::constraints::{ConstraintEngine, ReconcileStats, Scope};
use crate::error::Result;
use crate::models::{AkId, AvailabilityOwner, RoomId, Slot, SlotId, ViolationKind};
use crate::repository::{PlanningStore, Transactional};
use crate::solver::{
    apply_import, build_export, timeslot_grid, ExportOptions, ImportDocument, SolverInput,
};
use crate::timeslots::TimeslotBlock;

/// A change to planning data that may affect violations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Activity fields (interest, reso flag, category) changed.
    ActivitySaved(AkId),
    /// A slot was created or moved.
    SlotSaved(SlotId),
    /// The activity's owner list changed.
    OwnersChanged(AkId),
    /// The activity's conflict list changed.
    ConflictsChanged(AkId),
    /// The activity's prerequisite list changed.
    PrerequisitesChanged(AkId),
    /// The activity's requirement list changed.
    RequirementsChanged(AkId),
    /// An availability of `owner` was added or removed.
    AvailabilitySaved(AvailabilityOwner),
    /// Room fields (capacity) changed.
    RoomSaved(RoomId),
    /// The room's property list changed.
    RoomPropertiesChanged(RoomId),
    /// Event span or deadline changed.
    EventSaved,
    /// Default slots were added, changed or removed.
    DefaultSlotsChanged,
}

const ACTIVITY_FIELDS: &[ViolationKind] = &[
    ViolationKind::RoomCapacityExceeded,
    ViolationKind::AkAfterResoDeadline,
    ViolationKind::AkCategoryMismatch,
];
const EVENT_FIELDS: &[ViolationKind] = &[
    ViolationKind::AkAfterResoDeadline,
    ViolationKind::SlotOutsideEvent,
    ViolationKind::AkCategoryMismatch,
];
const EVERY: &[ViolationKind] = &ViolationKind::ALL;
const OWNERS: &[ViolationKind] = &[ViolationKind::OwnerTwoSlots];
const CONFLICTS: &[ViolationKind] = &[ViolationKind::AkConflictCollision];
const PREREQUISITES: &[ViolationKind] = &[ViolationKind::AkBeforePrerequisite];
const AVAILABILITY: &[ViolationKind] = &[ViolationKind::SlotOutsideAvailability];
const CAPACITY: &[ViolationKind] = &[ViolationKind::RoomCapacityExceeded];
const REQUIREMENTS: &[ViolationKind] = &[ViolationKind::RequirementNotGiven];
const CATEGORY: &[ViolationKind] = &[ViolationKind::AkCategoryMismatch];

impl Mutation {
    /// Scope and kinds to recompute, `None` if nothing depends on it.
    pub fn cascade(&self) -> Option<(Scope, &'static [ViolationKind])> {
        let (scope, kinds) = match *self {
            Self::ActivitySaved(ak) => (Scope::Activity(ak), ACTIVITY_FIELDS),
            Self::SlotSaved(slot) => (Scope::Slot(slot), EVERY),
            Self::OwnersChanged(ak) => (Scope::Activity(ak), OWNERS),
            Self::ConflictsChanged(ak) => (Scope::Activity(ak), CONFLICTS),
            Self::PrerequisitesChanged(ak) => (Scope::Activity(ak), PREREQUISITES),
            Self::RequirementsChanged(ak) => (Scope::Activity(ak), REQUIREMENTS),
            Self::AvailabilitySaved(AvailabilityOwner::Activity(ak)) => {
                (Scope::Activity(ak), AVAILABILITY)
            }
            Self::AvailabilitySaved(_) => return None,
            Self::RoomSaved(room) => (Scope::Room(room), CAPACITY),
            Self::RoomPropertiesChanged(room) => (Scope::Room(room), REQUIREMENTS),
            Self::EventSaved => (Scope::Event, EVENT_FIELDS),
            Self::DefaultSlotsChanged => (Scope::Event, CATEGORY),
        };
        Some((scope, kinds))
    }
}

/// Facade over a transactional store.
#[derive(Debug)]
pub struct Planner<R: Transactional> {
    repo: R,
    config: PlannerConfig,
    engine: ConstraintEngine,
}

impl<R: Transactional> Planner<R> {
    /// Creates a planner with the standard rule set.
    ///
    /// # Errors
    /// Invalid configuration.
    pub fn new(repo: R, config: PlannerConfig) -> Result<Self> {
        config.validate()?;
        let engine = ConstraintEngine::standard(&config);
        Ok(Self {
            repo,
            config,
            engine,
        })
    }

    /// Replaces the rule set.
    pub fn with_engine(mut self, engine: ConstraintEngine) -> Self {
        self.engine = engine;
        self
    }

    /// The underlying repository.
    pub fn repository(&self) -> &R {
        &self.repo
    }

    /// Active configuration.
    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    /// Runs `change` and the cascade of `mutations` in one transaction.
    ///
    /// If `change` or any recomputation fails, neither the change nor any
    /// violation update is applied.
    pub fn apply<F>(&self, mutations: &[Mutation], change: F) -> Result<ReconcileStats>
    where
        F: FnOnce(&mut dyn PlanningStore) -> Result<()>,
    {
        self.repo.transaction(|store| {
            change(store)?;
            let mut total = ReconcileStats::default();
            for mutation in mutations {
                match mutation.cascade() {
                    Some((scope, kinds)) => {
                        total += self.engine.detect_and_reconcile_all(store, scope, kinds)?;
                    }
                    None => warn!("{mutation:?} affects no violation kind, skipping"),
                }
            }
            Ok(total)
        })
    }

    /// Recomputes one kind within one scope.
    pub fn detect_and_reconcile(&self, scope: Scope, kind: ViolationKind) -> Result<ReconcileStats> {
        self.repo.transaction(|store| {
            Ok(self.engine.detect_and_reconcile(store, scope, kind)?)
        })
    }

    /// Discretizes the event into timeslots of `width` hours.
    pub fn discretize(&self, width: f64) -> Result<Vec<TimeslotBlock>> {
        self.repo.read(|store| timeslot_grid(store, width))
    }

    /// Builds the solver input.
    pub fn export(&self, options: &ExportOptions) -> Result<SolverInput> {
        self.repo
            .read(|store| build_export(store, &self.config, options))
    }

    /// Builds the solver input as pretty-printed JSON.
    pub fn export_json(&self, options: &ExportOptions) -> Result<String> {
        Ok(serde_json::to_string_pretty(&self.export(options)?)?)
    }

    /// Applies a solver result with the configured default export options.
    ///
    /// Returns the number of slots that moved.
    pub fn import(&self, document: &ImportDocument) -> Result<usize> {
        self.import_with(document, &ExportOptions::from_config(&self.config))
    }

    /// Parses and applies a solver result given as JSON.
    pub fn import_json(&self, json: &str) -> Result<usize> {
        let document: ImportDocument = serde_json::from_str(json)?;
        self.import(&document)
    }

    /// Applies a solver result exported with `options`.
    ///
    /// All-or-nothing: on any error no slot is changed.
    pub fn import_with(&self, document: &ImportDocument, options: &ExportOptions) -> Result<usize> {
        let result = self.repo.transaction(|store| {
            let changed = apply_import(store, &self.config, options, document)?;
            for slot in &changed {
                self.engine
                    .detect_and_reconcile_all(store, Scope::Slot(*slot), &ViolationKind::ALL)?;
            }
            Ok(changed.len())
        });
        match &result {
            Ok(moved) => info!("solver result applied, {moved} slot(s) moved"),
            Err(err) => warn!("solver result rejected: {err}"),
        }
        result
    }

    /// Saves slot positions decided elsewhere and recomputes their violations.
    pub fn commit_schedule_changes(&self, changes: Vec<Slot>) -> Result<ReconcileStats> {
        let mutations: Vec<Mutation> = changes.iter().map(|s| Mutation::SlotSaved(s.id)).collect();
        self.apply(&mutations, move |store| {
            for slot in changes {
                store.save_slot(slot)?;
            }
            Ok(())
        })
    }

    /// Deletes a slot together with every violation referencing it.
    ///
    /// Returns the number of purged violations.
    pub fn delete_slot(&self, id: SlotId) -> Result<usize> {
        self.repo.transaction(|store| {
            let purged = ConstraintEngine::purge_slot(store, id)?;
            store.delete_slot(id)?;
            Ok(purged)
        })
    }

    /// Deletes a room, unassigns its slots and drops every violation
    /// referencing it.
    ///
    /// The unassigned slots are rechecked. Returns the number of purged
    /// violations.
    pub fn delete_room(&self, id: RoomId) -> Result<usize> {
        self.repo.transaction(|store| {
            let unassigned: Vec<SlotId> = store
                .slots()?
                .into_iter()
                .filter(|s| s.room == Some(id))
                .map(|s| s.id)
                .collect();
            let purged = ConstraintEngine::purge_room(store, id)?;
            store.delete_room(id)?;
            for slot in unassigned {
                self.engine
                    .detect_and_reconcile_all(store, Scope::Slot(slot), &ViolationKind::ALL)?;
            }
            Ok(purged)
        })
    }
}
