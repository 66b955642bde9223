//! Match freshly detected violations against persisted ones.

use std::fmt;
use std::ops::AddAssign;

use crate::models::{ConstraintViolation, ViolationDraft, ViolationIdentity};
use crate::repository::{PlanningStore, RepositoryResult};

/// Write counts of one reconciliation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// New rows.
    pub inserted: usize,
    /// Matched rows left untouched.
    pub kept: usize,
    /// Matched rows whose level changed.
    pub updated: usize,
    /// Rows without a matching candidate.
    pub deleted: usize,
}

impl ReconcileStats {
    /// Number of writes performed.
    pub fn writes(&self) -> usize {
        self.inserted + self.updated + self.deleted
    }
}

impl AddAssign for ReconcileStats {
    fn add_assign(&mut self, other: Self) {
        self.inserted += other.inserted;
        self.kept += other.kept;
        self.updated += other.updated;
        self.deleted += other.deleted;
    }
}

impl fmt::Display for ReconcileStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} inserted, {} kept, {} updated, {} deleted",
            self.inserted, self.kept, self.updated, self.deleted
        )
    }
}

/// Brings `existing` in line with `candidates`.
///
/// For each candidate the first existing row with the same identity is kept
/// (primary key, timestamp and resolved flag survive) and leaves the pool;
/// candidates without a match are inserted; whatever remains in the pool
/// afterwards is deleted.
///
/// The comment is not part of the identity. A kept row keeps its old comment
/// even if the candidate carries a different one. The level is not part of
/// the identity either, but a changed level is written to the kept row so a
/// capacity warning that became a violation is not reported with stale
/// severity.
pub fn reconcile(
    store: &mut dyn PlanningStore,
    existing: Vec<ConstraintViolation>,
    candidates: Vec<ViolationDraft>,
) -> RepositoryResult<ReconcileStats> {
    let mut pool: Vec<(ViolationIdentity, ConstraintViolation)> = existing
        .into_iter()
        .map(|v| (v.identity(), v))
        .collect();
    let mut stats = ReconcileStats::default();

    for candidate in candidates {
        let identity = candidate.identity();
        match pool.iter().position(|(id, _)| *id == identity) {
            Some(index) => {
                let (_, row) = pool.swap_remove(index);
                if row.draft.level != candidate.level {
                    store.update_violation_level(row.id, candidate.level)?;
                    stats.updated += 1;
                } else {
                    stats.kept += 1;
                }
            }
            None => {
                store.insert_violation(candidate)?;
                stats.inserted += 1;
            }
        }
    }

    for (_, stale) in pool {
        store.delete_violation(stale.id)?;
        stats.deleted += 1;
    }

    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Event, EventId, RoomId, SlotId, ViolationKind, ViolationLevel,
    };
    use crate::repository::PlanningData;
    use chrono::{TimeZone, Utc};

    fn store() -> PlanningData {
        let start = Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 10, 18, 0, 0).unwrap();
        PlanningData::new(Event::new(EventId(1), "T", start, end))
    }

    fn room_clash(a: i64, b: i64) -> ViolationDraft {
        ViolationDraft::new(ViolationKind::RoomTwoSlots)
            .with_room(RoomId(1))
            .with_slot(SlotId(a))
            .with_slot(SlotId(b))
    }

    fn existing(store: &PlanningData) -> Vec<ConstraintViolation> {
        store.violations(ViolationKind::RoomTwoSlots).unwrap()
    }

    #[test]
    fn test_inserts_into_empty_pool() {
        let mut store = store();
        let stats = reconcile(&mut store, Vec::new(), vec![room_clash(1, 2)]).unwrap();
        assert_eq!(stats.inserted, 1);
        assert_eq!(existing(&store).len(), 1);
    }

    #[test]
    fn test_keeps_matching_row_with_its_state() {
        let mut store = store();
        let id = store.insert_violation(room_clash(1, 2)).unwrap();
        store.set_violation_resolved(id, true).unwrap();

        let pool = existing(&store);
        let stats = reconcile(&mut store, pool, vec![room_clash(2, 1).with_comment("new")]).unwrap();

        assert_eq!(stats.kept, 1);
        assert_eq!(stats.writes(), 0);
        let rows = existing(&store);
        assert_eq!(rows[0].id, id);
        assert!(rows[0].manually_resolved);
        assert_eq!(rows[0].draft.comment, "");
    }

    #[test]
    fn test_deletes_unmatched_rows() {
        let mut store = store();
        store.insert_violation(room_clash(1, 2)).unwrap();
        store.insert_violation(room_clash(3, 4)).unwrap();

        let pool = existing(&store);
        let stats = reconcile(&mut store, pool, vec![room_clash(3, 4)]).unwrap();

        assert_eq!(stats.deleted, 1);
        assert_eq!(stats.kept, 1);
        let rows = existing(&store);
        assert_eq!(rows.len(), 1);
        assert!(rows[0].references_slot(SlotId(3)));
    }

    #[test]
    fn test_duplicate_rows_collapse_to_one() {
        let mut store = store();
        store.insert_violation(room_clash(1, 2)).unwrap();
        store.insert_violation(room_clash(1, 2)).unwrap();

        let pool = existing(&store);
        let stats = reconcile(&mut store, pool, vec![room_clash(1, 2)]).unwrap();
        assert_eq!((stats.kept, stats.deleted), (1, 1));
    }

    #[test]
    fn test_level_change_updates_in_place() {
        let mut store = store();
        let id = store.insert_violation(room_clash(1, 2)).unwrap();

        let pool = existing(&store);
        let stats = reconcile(
            &mut store,
            pool,
            vec![room_clash(1, 2).with_level(ViolationLevel::Violation)],
        )
        .unwrap();

        assert_eq!(stats.updated, 1);
        let rows = existing(&store);
        assert_eq!(rows[0].id, id);
        assert_eq!(rows[0].draft.level, ViolationLevel::Violation);
    }

    #[test]
    fn test_stats_accumulate() {
        let mut total = ReconcileStats::default();
        total += ReconcileStats {
            inserted: 1,
            kept: 2,
            updated: 0,
            deleted: 3,
        };
        total += ReconcileStats {
            inserted: 1,
            ..Default::default()
        };
        assert_eq!(total.writes(), 5);
        assert_eq!(total.to_string(), "2 inserted, 2 kept, 0 updated, 3 deleted");
    }
}
