//! Incremental constraint violation engine.
//!
//! Every violation kind has one [`ViolationRule`] that inspects a single slot
//! against the current planning state and reports the violations that slot
//! takes part in. A recomputation is always limited to one kind and one
//! [`Scope`]:
//!
//! 1. **Detect**: run the rule for every slot in the scope, deduplicating
//!    by [`ViolationIdentity`](crate::models::ViolationIdentity).
//! 2. **Reconcile**: match the candidates against the persisted violations
//!    of that kind referencing a slot in the scope (see [`reconcile`]).
//! 3. **Persist**: insert new rows, keep matches, delete the rest.
//!
//! # Usage
//!
//! ```
//! use ak_planner::config::PlannerConfig;
//! use ak_planner::constraints::ConstraintEngine;
//! use ak_planner::models::ViolationKind;
//!
//! let engine = ConstraintEngine::standard(&PlannerConfig::default());
//! assert!(engine.has_rule(ViolationKind::OwnerTwoSlots));
//! ```

mod reconcile;
pub mod rules;

pub use reconcile::{reconcile, ReconcileStats};

use log::{debug, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Debug;
use std::sync::Arc;

use crate::config::PlannerConfig;
use crate::models::{
    Activity, AkId, Availability, AvailabilityOwner, ConstraintViolation, DefaultSlot, Event,
    Room, RoomId, Slot, SlotId, ViolationDraft, ViolationKind,
};
use crate::repository::{PlanningStore, RepositoryResult};

/// Part of the schedule a recomputation looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scope {
    /// One slot.
    Slot(SlotId),
    /// All slots of one activity.
    Activity(AkId),
    /// All slots placed in one room.
    Room(RoomId),
    /// Every slot of the event.
    Event,
}

/// Snapshot of the planning state shared by all rules of one detection run.
pub struct RuleContext<'a> {
    store: &'a dyn PlanningStore,
    event: Event,
    slots: Vec<Slot>,
    activities: BTreeMap<AkId, Activity>,
    rooms: BTreeMap<RoomId, Room>,
}

impl<'a> RuleContext<'a> {
    /// Loads event, slots, activities and rooms from `store`.
    pub fn load(store: &'a dyn PlanningStore) -> RepositoryResult<Self> {
        Ok(Self {
            event: store.event()?,
            slots: store.slots()?,
            activities: store.activities()?.into_iter().map(|a| (a.id, a)).collect(),
            rooms: store.rooms()?.into_iter().map(|r| (r.id, r)).collect(),
            store,
        })
    }

    /// The event.
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// All slots.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Scheduled slots of `activity`.
    pub fn scheduled_slots_of(&self, activity: AkId) -> impl Iterator<Item = &Slot> {
        self.slots
            .iter()
            .filter(move |s| s.activity == activity && s.is_scheduled())
    }

    /// Activity by id.
    pub fn activity(&self, id: AkId) -> Option<&Activity> {
        self.activities.get(&id)
    }

    /// All activities.
    pub fn activities(&self) -> impl Iterator<Item = &Activity> {
        self.activities.values()
    }

    /// Room by id.
    pub fn room(&self, id: RoomId) -> Option<&Room> {
        self.rooms.get(&id)
    }

    /// Persisted availabilities of `owner`.
    pub fn availabilities(&self, owner: AvailabilityOwner) -> RepositoryResult<Vec<Availability>> {
        self.store.availabilities(owner)
    }

    /// Default slots of the event.
    pub fn default_slots(&self) -> RepositoryResult<Vec<DefaultSlot>> {
        self.store.default_slots()
    }

    /// Slots covered by `scope`.
    pub fn focus(&self, scope: Scope) -> Vec<&Slot> {
        self.slots
            .iter()
            .filter(|s| match scope {
                Scope::Slot(id) => s.id == id,
                Scope::Activity(ak) => s.activity == ak,
                Scope::Room(room) => s.room == Some(room),
                Scope::Event => true,
            })
            .collect()
    }
}

/// Detection logic of one violation kind.
///
/// `detect` reports every violation of the rule's kind that `slot` takes part
/// in. Rules relating two slots report the pair from either side with the
/// same references, so the result does not depend on which slot triggered.
pub trait ViolationRule: Send + Sync + Debug {
    /// Kind this rule produces.
    fn kind(&self) -> ViolationKind;

    /// Violations involving `slot`.
    fn detect(&self, slot: &Slot, ctx: &RuleContext<'_>) -> RepositoryResult<Vec<ViolationDraft>>;
}

/// Registry of rules plus the detect/reconcile cycle.
#[derive(Clone, Default)]
pub struct ConstraintEngine {
    rules: BTreeMap<ViolationKind, Arc<dyn ViolationRule>>,
}

impl ConstraintEngine {
    /// Creates an engine without rules.
    pub fn new() -> Self {
        Self::default()
    }

    /// Engine with one rule for every [`ViolationKind`].
    pub fn standard(config: &PlannerConfig) -> Self {
        Self::new()
            .with_rule(rules::OwnerTwoSlots)
            .with_rule(rules::SlotOutsideAvailability)
            .with_rule(rules::RoomTwoSlots)
            .with_rule(rules::RequirementNotGiven)
            .with_rule(rules::AkConflictCollision)
            .with_rule(rules::AkBeforePrerequisite)
            .with_rule(rules::AkAfterResoDeadline)
            .with_rule(rules::AkCategoryMismatch)
            .with_rule(rules::AkSlotCollision)
            .with_rule(rules::RoomCapacityExceeded::from_config(config))
            .with_rule(rules::SlotOutsideEvent)
    }

    /// Registers a rule, replacing any rule of the same kind.
    pub fn with_rule<R: ViolationRule + 'static>(mut self, rule: R) -> Self {
        self.rules.insert(rule.kind(), Arc::new(rule));
        self
    }

    /// Whether a rule for `kind` is registered.
    pub fn has_rule(&self, kind: ViolationKind) -> bool {
        self.rules.contains_key(&kind)
    }

    /// Violations of `kind` that should exist in `scope` right now.
    pub fn detect(
        &self,
        store: &dyn PlanningStore,
        scope: Scope,
        kind: ViolationKind,
    ) -> RepositoryResult<Vec<ViolationDraft>> {
        Ok(self.detect_with_focus(store, scope, kind)?.0)
    }

    fn detect_with_focus(
        &self,
        store: &dyn PlanningStore,
        scope: Scope,
        kind: ViolationKind,
    ) -> RepositoryResult<(Vec<ViolationDraft>, BTreeSet<SlotId>)> {
        let ctx = RuleContext::load(store)?;
        let focus = ctx.focus(scope);
        let focus_ids: BTreeSet<SlotId> = focus.iter().map(|s| s.id).collect();

        let Some(rule) = self.rules.get(&kind) else {
            return Ok((Vec::new(), focus_ids));
        };

        let mut seen = BTreeSet::new();
        let mut candidates = Vec::new();
        for slot in focus {
            for draft in rule.detect(slot, &ctx)? {
                if seen.insert(draft.identity()) {
                    candidates.push(draft);
                }
            }
        }
        debug!(
            "{:?} in {:?}: {} candidate(s) from {} slot(s)",
            kind,
            scope,
            candidates.len(),
            focus_ids.len()
        );
        Ok((candidates, focus_ids))
    }

    /// Recomputes `kind` within `scope` and brings the persisted violations
    /// in line.
    ///
    /// Running this twice without a data change in between performs no
    /// writes the second time.
    pub fn detect_and_reconcile(
        &self,
        store: &mut dyn PlanningStore,
        scope: Scope,
        kind: ViolationKind,
    ) -> RepositoryResult<ReconcileStats> {
        if !self.has_rule(kind) {
            warn!("no rule registered for {kind:?}, skipping");
            return Ok(ReconcileStats::default());
        }

        let (candidates, focus) = self.detect_with_focus(&*store, scope, kind)?;
        let existing = store
            .violations(kind)?
            .into_iter()
            .filter(|v| scope == Scope::Event || v.references_any_slot(&focus))
            .collect();

        let stats = reconcile(store, existing, candidates)?;
        if stats.writes() > 0 {
            info!("{kind:?} in {scope:?}: {stats}");
        }
        Ok(stats)
    }

    /// Runs [`detect_and_reconcile`](Self::detect_and_reconcile) for several
    /// kinds and sums the statistics.
    pub fn detect_and_reconcile_all(
        &self,
        store: &mut dyn PlanningStore,
        scope: Scope,
        kinds: &[ViolationKind],
    ) -> RepositoryResult<ReconcileStats> {
        let mut total = ReconcileStats::default();
        for &kind in kinds {
            total += self.detect_and_reconcile(store, scope, kind)?;
        }
        Ok(total)
    }

    /// Deletes every violation referencing `slot`; returns how many.
    pub fn purge_slot(store: &mut dyn PlanningStore, slot: SlotId) -> RepositoryResult<usize> {
        let purged = purge(store, |v| v.references_slot(slot))?;
        if purged > 0 {
            debug!("purged {purged} violation(s) of slot {slot}");
        }
        Ok(purged)
    }

    /// Deletes every violation referencing `room`; returns how many.
    pub fn purge_room(store: &mut dyn PlanningStore, room: RoomId) -> RepositoryResult<usize> {
        let purged = purge(store, |v| v.references_room(room))?;
        if purged > 0 {
            debug!("purged {purged} violation(s) of room {room}");
        }
        Ok(purged)
    }
}

fn purge<F>(store: &mut dyn PlanningStore, stale: F) -> RepositoryResult<usize>
where
    F: Fn(&ConstraintViolation) -> bool,
{
    let ids: Vec<_> = store
        .all_violations()?
        .into_iter()
        .filter(|v| stale(v))
        .map(|v| v.id)
        .collect();
    for id in &ids {
        store.delete_violation(*id)?;
    }
    Ok(ids.len())
}

impl Debug for ConstraintEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConstraintEngine")
            .field("rules", &self.rules.keys().collect::<Vec<_>>())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventId, OwnerId};
    use crate::repository::PlanningData;
    use chrono::{DateTime, TimeZone, Utc};

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 10, hour, minute, 0).unwrap()
    }

    fn owner_setup() -> PlanningData {
        let mut data = PlanningData::new(Event::new(EventId(1), "T", at(9, 0), at(18, 0)));
        for (ak, slot, start) in [(1, 1, at(10, 0)), (2, 2, at(10, 30))] {
            data.save_activity(Activity::new(AkId(ak), EventId(1), "A").with_owner(OwnerId(1)))
                .unwrap();
            data.save_slot(Slot::new(SlotId(slot), AkId(ak), EventId(1), 1.0).at(start))
                .unwrap();
        }
        data
    }

    #[test]
    fn test_standard_engine_covers_all_kinds() {
        let engine = ConstraintEngine::standard(&PlannerConfig::default());
        for kind in ViolationKind::ALL {
            assert!(engine.has_rule(kind), "{kind:?}");
        }
    }

    #[test]
    fn test_focus_by_scope() {
        let data = owner_setup();
        let ctx = RuleContext::load(&data).unwrap();
        assert_eq!(ctx.focus(Scope::Event).len(), 2);
        assert_eq!(ctx.focus(Scope::Activity(AkId(2))).len(), 1);
        assert_eq!(ctx.focus(Scope::Slot(SlotId(9))).len(), 0);
        assert_eq!(ctx.focus(Scope::Room(RoomId(1))).len(), 0);
    }

    #[test]
    fn test_detect_deduplicates_pairs() {
        let data = owner_setup();
        let engine = ConstraintEngine::standard(&PlannerConfig::default());
        let drafts = engine
            .detect(&data, Scope::Event, ViolationKind::OwnerTwoSlots)
            .unwrap();
        assert_eq!(drafts.len(), 1);
        assert_eq!(drafts[0].slots, BTreeSet::from([SlotId(1), SlotId(2)]));
    }

    #[test]
    fn test_detect_and_reconcile_is_idempotent() {
        let mut data = owner_setup();
        let engine = ConstraintEngine::standard(&PlannerConfig::default());

        let first = engine
            .detect_and_reconcile(&mut data, Scope::Slot(SlotId(2)), ViolationKind::OwnerTwoSlots)
            .unwrap();
        assert_eq!(first.inserted, 1);

        let second = engine
            .detect_and_reconcile(&mut data, Scope::Event, ViolationKind::OwnerTwoSlots)
            .unwrap();
        assert_eq!(second.writes(), 0);
        assert_eq!(second.kept, 1);
    }

    #[test]
    fn test_missing_rule_leaves_violations_alone() {
        let mut data = owner_setup();
        ConstraintEngine::standard(&PlannerConfig::default())
            .detect_and_reconcile(&mut data, Scope::Event, ViolationKind::OwnerTwoSlots)
            .unwrap();

        let stats = ConstraintEngine::new()
            .detect_and_reconcile(&mut data, Scope::Event, ViolationKind::OwnerTwoSlots)
            .unwrap();
        assert_eq!(stats, ReconcileStats::default());
        assert_eq!(data.all_violations().unwrap().len(), 1);
    }

    #[test]
    fn test_purge_slot() {
        let mut data = owner_setup();
        ConstraintEngine::standard(&PlannerConfig::default())
            .detect_and_reconcile(&mut data, Scope::Event, ViolationKind::OwnerTwoSlots)
            .unwrap();
        assert_eq!(ConstraintEngine::purge_slot(&mut data, SlotId(1)).unwrap(), 1);
        assert!(data.all_violations().unwrap().is_empty());
    }

    #[test]
    fn test_purge_room() {
        let mut data = owner_setup();
        data.save_room(Room::new(RoomId(1), "HS 1")).unwrap();
        for id in [1, 2] {
            let slot = data.slot(SlotId(id)).unwrap().in_room(RoomId(1));
            data.save_slot(slot).unwrap();
        }
        let engine = ConstraintEngine::standard(&PlannerConfig::default());
        for kind in [ViolationKind::OwnerTwoSlots, ViolationKind::RoomTwoSlots] {
            engine.detect_and_reconcile(&mut data, Scope::Event, kind).unwrap();
        }

        assert_eq!(ConstraintEngine::purge_room(&mut data, RoomId(2)).unwrap(), 0);
        assert_eq!(ConstraintEngine::purge_room(&mut data, RoomId(1)).unwrap(), 1);
        let left = data.all_violations().unwrap();
        assert_eq!(left.len(), 1);
        assert_eq!(left[0].draft.kind, ViolationKind::OwnerTwoSlots);
    }
}
