//! Solver input document.
//!
//! Serializes the event's rooms, activity slots, participants and the
//! discretized timeslot grid. Every list is ordered by id and every label
//! list is sorted, so exporting unchanged data yields an identical document;
//! the import relies on that for its stale-input check.

use chrono::{DateTime, FixedOffset, Utc};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::labels;
use crate::config::PlannerConfig;
use crate::error::Result;
use crate::models::{
    union, Activity, AkId, Availability, AvailabilityOwner, CategoryId, Event, OwnerId,
    ParticipantId, PreferenceLevel, RoomId, Slot, SlotId, TrackId,
};
use crate::repository::PlanningStore;
use crate::timeslots::{slot_count, Discretizer, TimeslotBlock};
use crate::validation::validate_planning;

/// Selection of what gets exported.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportOptions {
    /// Treat every scheduled slot as fixed.
    pub scheduled_as_fixed: bool,
    /// Only export activities of these categories (plus uncategorized ones).
    pub categories: Option<BTreeSet<CategoryId>>,
    /// Only export activities of these tracks (plus those without a track).
    pub tracks: Option<BTreeSet<TrackId>>,
    /// Only export activities with one of these types (plus untyped ones).
    pub types: Option<BTreeSet<String>>,
}

impl ExportOptions {
    /// Options with the configured defaults and no filters.
    pub fn from_config(config: &PlannerConfig) -> Self {
        Self {
            scheduled_as_fixed: config.export_scheduled_as_fixed,
            ..Default::default()
        }
    }

    /// Restricts the export to `categories`.
    pub fn with_categories(mut self, categories: impl IntoIterator<Item = CategoryId>) -> Self {
        self.categories = Some(categories.into_iter().collect());
        self
    }

    /// Restricts the export to `tracks`.
    pub fn with_tracks(mut self, tracks: impl IntoIterator<Item = TrackId>) -> Self {
        self.tracks = Some(tracks.into_iter().collect());
        self
    }

    /// Restricts the export to `types`.
    pub fn with_types<S: Into<String>>(mut self, types: impl IntoIterator<Item = S>) -> Self {
        self.types = Some(types.into_iter().map(Into::into).collect());
        self
    }

    /// Sets whether scheduled slots count as fixed.
    pub fn with_scheduled_as_fixed(mut self, fixed: bool) -> Self {
        self.scheduled_as_fixed = fixed;
        self
    }

    fn includes(&self, activity: &Activity) -> bool {
        let by_category = match (&self.categories, activity.category) {
            (Some(allowed), Some(category)) => allowed.contains(&category),
            _ => true,
        };
        let by_track = match (&self.tracks, activity.track) {
            (Some(allowed), Some(track)) => allowed.contains(&track),
            _ => true,
        };
        let by_type = match &self.types {
            Some(allowed) if !activity.types.is_empty() => {
                activity.types.iter().any(|t| allowed.contains(t))
            }
            _ => true,
        };
        by_category && by_track && by_type
    }

    pub(crate) fn is_fixed(&self, slot: &Slot) -> bool {
        slot.fixed || (self.scheduled_as_fixed && slot.is_scheduled())
    }
}

// ======================== Document ========================

/// Complete solver input.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolverInput {
    /// Event metadata.
    pub info: EventInfo,
    /// Rooms ordered by id.
    pub rooms: Vec<RoomEntry>,
    /// One entry per exported slot, ordered by slot id.
    pub aks: Vec<AkEntry>,
    /// Participants, then one dummy per owner.
    pub participants: Vec<ParticipantEntry>,
    /// Discretized timeslot grid.
    pub timeslots: TimeslotSection,
}

/// Event metadata.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventInfo {
    /// Event name.
    pub title: String,
    /// URL slug.
    pub slug: String,
    /// Organizer contact, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact_email: Option<String>,
    /// Venue, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
}

/// One exported room.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomEntry {
    /// Room id.
    pub id: RoomId,
    /// Seats, `-1` if unknown.
    pub capacity: i64,
    /// Labels restricting when the room can be used.
    pub time_constraints: Vec<String>,
    /// Requirement labels the room satisfies.
    pub fulfilled_room_constraints: Vec<String>,
    /// Display data.
    pub info: RoomInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomInfo {
    /// Room name.
    pub name: String,
}

/// One exported slot. `id` is the slot id, not the activity id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AkEntry {
    /// Slot id.
    pub id: SlotId,
    /// Length in timeslots.
    pub duration: u32,
    /// Conflicts and dependencies.
    pub properties: AkProperties,
    /// Labels the assigned room must fulfill.
    pub room_constraints: Vec<String>,
    /// Labels the assigned timeslots must fulfill.
    pub time_constraints: Vec<String>,
    /// Display data.
    pub info: AkInfo,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AkProperties {
    /// Slots that must not run in parallel.
    pub conflicts: Vec<SlotId>,
    /// Slots that must be over before this one starts.
    pub dependencies: Vec<SlotId>,
}

/// Display data of an exported slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AkInfo {
    /// Activity name.
    pub name: String,
    /// Owner names, comma separated.
    pub head: String,
    /// Free-text description.
    pub description: String,
    /// Whether a resolution is intended.
    pub reso: bool,
    /// Slot length in hours.
    pub duration_in_hours: f64,
    /// Id of the activity the slot belongs to.
    pub django_ak_id: AkId,
    /// Activity types.
    pub types: Vec<String>,
}

/// One participant or owner dummy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantEntry {
    /// Participant id, or a dummy id for owners.
    pub id: ParticipantId,
    /// Display data.
    pub info: ParticipantInfo,
    /// Labels every room of this participant must fulfill.
    pub room_constraints: Vec<String>,
    /// Labels restricting when the participant is present.
    pub time_constraints: Vec<String>,
    /// Preferences ordered by slot id.
    pub preferences: Vec<PreferenceEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantInfo {
    /// Participant name.
    pub name: String,
}

/// Preference of a participant for one slot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreferenceEntry {
    /// Preferred slot.
    pub ak_id: SlotId,
    /// Whether attendance is mandatory.
    pub required: bool,
    /// Solver weight, `-1` for required.
    pub preference_score: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeslotSection {
    /// Grid metadata.
    pub info: TimeslotInfo,
    /// Gap-free runs of timeslots.
    pub blocks: Vec<Vec<TimeslotEntry>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeslotInfo {
    /// Timeslot width in hours.
    pub duration: f64,
    /// `[day, time range]` per block.
    pub blocknames: Vec<[String; 2]>,
}

/// One timeslot of the grid.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeslotEntry {
    /// Position in the grid, 0-based.
    pub id: usize,
    /// Local start and end.
    pub info: TimeslotSpan,
    /// Labels the timeslot satisfies.
    pub fulfilled_time_constraints: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeslotSpan {
    /// Local start, `YYYY-MM-DD HH:MM`.
    pub start: String,
    /// Local end, `YYYY-MM-DD HH:MM`.
    pub end: String,
}

// ======================== Building ========================

/// Availabilities per entity, unioned, restricted ones only.
///
/// An entity is restricted when it has availabilities that do not cover the
/// whole event. Entities without any are unrestricted.
struct Restrictions<K: Ord> {
    by_entity: BTreeMap<K, Vec<Availability>>,
}

impl<K: Ord + Copy> Restrictions<K> {
    fn load(
        store: &dyn PlanningStore,
        event: &Event,
        ids: impl IntoIterator<Item = K>,
        owner: impl Fn(K) -> AvailabilityOwner,
    ) -> Result<Self> {
        let mut by_entity = BTreeMap::new();
        for id in ids {
            let availabilities = union(&store.availabilities(owner(id))?);
            if !availabilities.is_empty() && !Availability::is_event_covered(event, &availabilities)
            {
                by_entity.insert(id, availabilities);
            }
        }
        Ok(Self { by_entity })
    }

    fn is_restricted(&self, id: K) -> bool {
        self.by_entity.contains_key(&id)
    }

    fn covering(&self, interval: &Availability) -> impl Iterator<Item = K> + '_ {
        let interval = interval.clone();
        self.by_entity
            .iter()
            .filter(move |(_, availabilities)| interval.is_covered(availabilities))
            .map(|(id, _)| *id)
    }
}

/// Builds the solver input for the event in `store`.
///
/// # Errors
/// Validation errors of the planning data, discretization and storage
/// failures.
pub fn build_export(
    store: &dyn PlanningStore,
    config: &PlannerConfig,
    options: &ExportOptions,
) -> Result<SolverInput> {
    validate_planning(store)?;

    let event = store.event()?;
    let rooms = store.rooms()?;
    let activities: BTreeMap<AkId, Activity> =
        store.activities()?.into_iter().map(|a| (a.id, a)).collect();
    let owners = store.owners()?;
    let participants = store.participants()?;
    let categories = store.categories()?;
    let requirement_names: BTreeMap<_, _> = store
        .requirements()?
        .into_iter()
        .map(|r| (r.id, r.name))
        .collect();

    let slots: Vec<Slot> = store
        .slots()?
        .into_iter()
        .filter(|s| activities.get(&s.activity).is_some_and(|a| options.includes(a)))
        .collect();
    if slots.is_empty() {
        warn!("no slots are exported for event {}", event.slug);
    }

    let room_restrictions =
        Restrictions::load(store, &event, rooms.iter().map(|r| r.id), AvailabilityOwner::Room)?;
    let activity_restrictions = Restrictions::load(
        store,
        &event,
        activities.keys().copied(),
        AvailabilityOwner::Activity,
    )?;
    let person_restrictions =
        Restrictions::load(store, &event, owners.iter().map(|o| o.id), AvailabilityOwner::Person)?;
    let participant_restrictions = Restrictions::load(
        store,
        &event,
        participants.iter().map(|p| p.id),
        AvailabilityOwner::Participant,
    )?;

    let blocks = timeslot_grid(store, event.export_slot)?;

    let names = |ids: &[crate::models::RequirementId]| -> Vec<String> {
        ids.iter()
            .filter_map(|id| requirement_names.get(id).cloned())
            .collect()
    };
    let category_names: BTreeMap<CategoryId, String> =
        categories.iter().map(|c| (c.id, c.name.clone())).collect();
    let owner_names: BTreeMap<OwnerId, String> =
        owners.iter().map(|o| (o.id, o.name.clone())).collect();

    // Slot ids per activity, restricted to exported slots.
    let mut slots_of: BTreeMap<AkId, Vec<SlotId>> = BTreeMap::new();
    for slot in &slots {
        slots_of.entry(slot.activity).or_default().push(slot.id);
    }
    let slot_ids_of = |ak: AkId| slots_of.get(&ak).cloned().unwrap_or_default();

    // Rooms
    let room_entries = rooms
        .iter()
        .map(|room| {
            let mut fulfilled = names(&room.properties);
            labels::add_no_proxy(&mut fulfilled);
            fulfilled.push(labels::fixed_room(room.id));
            let time_constraints = if room_restrictions.is_restricted(room.id) {
                vec![labels::room(room.id)]
            } else {
                Vec::new()
            };
            RoomEntry {
                id: room.id,
                capacity: room.capacity.map_or(-1, i64::from),
                time_constraints,
                fulfilled_room_constraints: labels::normalize(fulfilled),
                info: RoomInfo {
                    name: room.name.clone(),
                },
            }
        })
        .collect();

    // Activities, one entry per slot
    let mut ak_entries = Vec::with_capacity(slots.len());
    for slot in &slots {
        let Some(activity) = activities.get(&slot.activity) else {
            continue;
        };
        let fixed = options.is_fixed(slot);

        let mut conflicts: Vec<SlotId> = activity
            .conflicts
            .iter()
            .flat_map(|ak| slot_ids_of(*ak))
            .chain(slot_ids_of(activity.id).into_iter().filter(|id| *id != slot.id))
            .collect();
        conflicts.sort();
        conflicts.dedup();
        let mut dependencies: Vec<SlotId> = activity
            .prerequisites
            .iter()
            .flat_map(|ak| slot_ids_of(*ak))
            .collect();
        dependencies.sort();
        dependencies.dedup();

        let mut room_constraints = names(&activity.requirements);
        labels::add_no_proxy(&mut room_constraints);
        if let (true, Some(room)) = (fixed, slot.room) {
            room_constraints.push(labels::fixed_room(room));
        }

        let mut time_constraints = Vec::new();
        if let Some(name) = activity.category.and_then(|c| category_names.get(&c)) {
            time_constraints.push(labels::category(name));
        }
        if fixed && slot.is_scheduled() {
            time_constraints.push(labels::fixed_slot(slot.id));
        } else if activity_restrictions.is_restricted(activity.id) {
            time_constraints.push(labels::activity(activity.id));
        }
        for owner in &activity.owners {
            if person_restrictions.is_restricted(*owner) {
                time_constraints.push(labels::person(owner));
            }
        }
        if activity.reso {
            time_constraints.push(labels::RESOLUTION.to_string());
        }

        let head = activity
            .owners
            .iter()
            .filter_map(|o| owner_names.get(o).cloned())
            .collect::<Vec<_>>()
            .join(", ");

        ak_entries.push(AkEntry {
            id: slot.id,
            duration: slot_count(slot.duration, event.export_slot, config.duration_epsilon),
            properties: AkProperties {
                conflicts,
                dependencies,
            },
            room_constraints: labels::normalize(room_constraints),
            time_constraints: labels::normalize(time_constraints),
            info: AkInfo {
                name: activity.name.clone(),
                head,
                description: activity.description.clone(),
                reso: activity.reso,
                duration_in_hours: slot.duration,
                django_ak_id: activity.id,
                types: activity.types.clone(),
            },
        });
    }

    // Participants, then one dummy per owner
    let preferences = store.preferences()?;
    let mut participant_entries = Vec::with_capacity(participants.len() + owners.len());
    for participant in &participants {
        let own: Vec<_> = preferences
            .iter()
            .filter(|p| p.participant == participant.id && p.level > PreferenceLevel::Ignore)
            .collect();
        let mut entries: Vec<PreferenceEntry> = own
            .iter()
            .flat_map(|p| {
                slot_ids_of(p.activity).into_iter().map(move |slot| PreferenceEntry {
                    ak_id: slot,
                    required: p.required(),
                    preference_score: p.score(),
                })
            })
            .collect();
        entries.sort_by_key(|e| e.ak_id);

        let has_required = own.iter().any(|p| p.required());
        let time_constraints = if has_required && participant_restrictions.is_restricted(participant.id)
        {
            vec![labels::participant(participant.id)]
        } else {
            Vec::new()
        };
        participant_entries.push(ParticipantEntry {
            id: participant.id,
            info: ParticipantInfo {
                name: participant.to_string(),
            },
            room_constraints: labels::normalize(names(&participant.requirements)),
            time_constraints,
            preferences: entries,
        });
    }

    let first_dummy = participants.iter().map(|p| p.id.value()).max().unwrap_or(0) + 1;
    for (offset, owner) in owners.iter().enumerate() {
        let owned: Vec<SlotId> = slots
            .iter()
            .filter(|s| {
                activities
                    .get(&s.activity)
                    .is_some_and(|a| a.owners.contains(&owner.id))
            })
            .map(|s| s.id)
            .collect();
        if owned.is_empty() {
            continue;
        }
        participant_entries.push(ParticipantEntry {
            id: ParticipantId(first_dummy + offset as i64),
            info: ParticipantInfo {
                name: format!("{} [AKOwner]", owner.name),
            },
            room_constraints: Vec::new(),
            time_constraints: Vec::new(),
            preferences: owned
                .into_iter()
                .map(|slot| PreferenceEntry {
                    ak_id: slot,
                    required: true,
                    preference_score: -1,
                })
                .collect(),
        });
    }

    // Timeslots
    let fixed_intervals: Vec<(SlotId, Availability)> = slots
        .iter()
        .filter(|s| options.is_fixed(s))
        .filter_map(|s| s.interval().map(|i| (s.id, i)))
        .collect();
    let offset = event.offset();
    let mut block_entries = Vec::with_capacity(blocks.len());
    for (block_index, block) in blocks.iter().enumerate() {
        let mut entries = Vec::with_capacity(block.len());
        for timeslot in block {
            let interval = &timeslot.interval;
            let mut fulfilled: Vec<String> = timeslot.constraints.iter().cloned().collect();
            if event.reso_deadline.map_or(true, |deadline| interval.end < deadline) {
                fulfilled.push(labels::RESOLUTION.to_string());
            }
            fulfilled.extend(activity_restrictions.covering(interval).map(labels::activity));
            fulfilled.extend(person_restrictions.covering(interval).map(labels::person));
            fulfilled.extend(room_restrictions.covering(interval).map(labels::room));
            fulfilled.extend(
                participant_restrictions
                    .covering(interval)
                    .map(labels::participant),
            );
            fulfilled.extend(
                fixed_intervals
                    .iter()
                    .filter(|(_, fixed)| fixed.overlaps(interval, true))
                    .map(|(id, _)| labels::fixed_slot(id)),
            );
            fulfilled.extend(
                (0..blocks.len())
                    .filter(|i| *i != block_index)
                    .map(labels::not_block),
            );

            entries.push(TimeslotEntry {
                id: timeslot.index,
                info: TimeslotSpan {
                    start: local(interval.start, offset),
                    end: local(interval.end, offset),
                },
                fulfilled_time_constraints: labels::normalize(fulfilled),
            });
        }
        block_entries.push(entries);
    }

    info!(
        "exported {} slot(s), {} room(s), {} participant(s), {} block(s) for {}",
        ak_entries.len(),
        rooms.len(),
        participant_entries.len(),
        block_entries.len(),
        event.slug
    );

    Ok(SolverInput {
        info: EventInfo {
            title: event.name.clone(),
            slug: event.slug.clone(),
            contact_email: event.contact_email.clone(),
            place: event.place.clone(),
        },
        rooms: room_entries,
        aks: ak_entries,
        participants: participant_entries,
        timeslots: TimeslotSection {
            info: TimeslotInfo {
                duration: event.export_slot,
                blocknames: block_names(&blocks, offset),
            },
            blocks: block_entries,
        },
    })
}

/// Discretizes the stored event into timeslots of `width` hours, honoring
/// room availabilities, default slots and categories.
pub(crate) fn timeslot_grid(store: &dyn PlanningStore, width: f64) -> Result<Vec<TimeslotBlock>> {
    let event = store.event()?;
    let rooms = store.rooms()?;
    let mut room_availabilities = Vec::with_capacity(rooms.len());
    for room in &rooms {
        room_availabilities.push(store.availabilities(AvailabilityOwner::Room(room.id))?);
    }
    let blocks = Discretizer::new(width).discretize(
        &event,
        &room_availabilities,
        &store.default_slots()?,
        &store.categories()?,
    )?;
    Ok(blocks)
}

fn local(instant: DateTime<Utc>, offset: FixedOffset) -> String {
    instant.with_timezone(&offset).format("%Y-%m-%d %H:%M").to_string()
}

fn block_names(blocks: &[TimeslotBlock], offset: FixedOffset) -> Vec<[String; 2]> {
    blocks
        .iter()
        .filter_map(|block| {
            let start = block.first()?.interval.start.with_timezone(&offset);
            let end = block.last()?.interval.end.with_timezone(&offset);
            let day = start.format("%A, %d. %b").to_string();
            let range = if start.date_naive() == end.date_naive() {
                format!("{} - {}", start.format("%H:%M"), end.format("%H:%M"))
            } else {
                format!("{} - {}", start.format("%a %H:%M"), end.format("%a %H:%M"))
            };
            Some([day, range])
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Category, EventId, Owner, Participant, Preference, Requirement, RequirementId, Room,
    };
    use crate::repository::PlanningData;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, day, hour, 0, 0).unwrap()
    }

    fn base() -> PlanningData {
        let event = Event::new(EventId(1), "KoMa 90", at(10, 9), at(10, 13))
            .with_place("Aachen")
            .with_reso_deadline(at(10, 12));
        let mut data = PlanningData::new(event);
        data.save_requirement(Requirement::new(RequirementId(1), "Beamer")).unwrap();
        data.save_category(Category::new(CategoryId(1), "Inhalt")).unwrap();
        data.save_room(
            Room::new(RoomId(1), "HS 1")
                .with_capacity(50)
                .with_property(RequirementId(1)),
        )
        .unwrap();
        data.save_room(Room::new(RoomId(2), "Seminar")).unwrap();
        data.save_owner(Owner::new(OwnerId(1), "Alex")).unwrap();
        data.save_activity(
            Activity::new(AkId(1), EventId(1), "Sitzung")
                .with_owner(OwnerId(1))
                .with_requirement(RequirementId(1))
                .with_category(CategoryId(1))
                .with_conflict(AkId(2))
                .with_reso(true),
        )
        .unwrap();
        data.save_activity(Activity::new(AkId(2), EventId(1), "Spiel").with_prerequisite(AkId(1)))
            .unwrap();
        data.save_slot(Slot::new(SlotId(1), AkId(1), EventId(1), 1.5)).unwrap();
        data.save_slot(Slot::new(SlotId(2), AkId(1), EventId(1), 1.0)).unwrap();
        data.save_slot(
            Slot::new(SlotId(3), AkId(2), EventId(1), 1.0)
                .at(at(10, 10))
                .in_room(RoomId(2))
                .pinned(),
        )
        .unwrap();
        data
    }

    fn export(data: &PlanningData) -> SolverInput {
        build_export(data, &PlannerConfig::default(), &ExportOptions::default()).unwrap()
    }

    fn ak(doc: &SolverInput, id: i64) -> &AkEntry {
        doc.aks.iter().find(|a| a.id == SlotId(id)).unwrap()
    }

    #[test]
    fn test_info_skips_missing_fields() {
        let doc = export(&base());
        let json = serde_json::to_value(&doc.info).unwrap();
        assert_eq!(json["title"], "KoMa 90");
        assert_eq!(json["place"], "Aachen");
        assert!(json.get("contact_email").is_none());
    }

    #[test]
    fn test_rooms() {
        let doc = export(&base());
        assert_eq!(doc.rooms.len(), 2);
        assert_eq!(doc.rooms[0].capacity, 50);
        assert_eq!(doc.rooms[1].capacity, -1);
        assert_eq!(
            doc.rooms[0].fulfilled_room_constraints,
            vec!["Beamer", "fixed-room-1", "no-proxy"]
        );
        assert!(doc.rooms[0].time_constraints.is_empty());
    }

    #[test]
    fn test_ak_entries() {
        let doc = export(&base());
        let first = ak(&doc, 1);
        assert_eq!(first.duration, 2);
        assert_eq!(first.properties.conflicts, vec![SlotId(2), SlotId(3)]);
        assert!(first.properties.dependencies.is_empty());
        assert_eq!(first.room_constraints, vec!["Beamer", "no-proxy"]);
        assert_eq!(
            first.time_constraints,
            vec!["availability-cat-Inhalt", "resolution"]
        );
        assert_eq!(first.info.head, "Alex");
        assert_eq!(first.info.django_ak_id, AkId(1));

        let fixed = ak(&doc, 3);
        assert_eq!(fixed.properties.dependencies, vec![SlotId(1), SlotId(2)]);
        assert_eq!(fixed.room_constraints, vec!["fixed-room-2", "no-proxy"]);
        assert_eq!(fixed.time_constraints, vec!["fixed-akslot-3"]);
    }

    #[test]
    fn test_timeslots() {
        let doc = export(&base());
        assert_eq!(doc.timeslots.blocks.len(), 1);
        let block = &doc.timeslots.blocks[0];
        assert_eq!(block.len(), 4);
        assert_eq!(block[0].info.start, "2024-05-10 09:00");
        assert_eq!(
            block[0].fulfilled_time_constraints,
            vec!["availability-cat-Inhalt", "resolution"]
        );
        // Ends exactly at the deadline: not before it.
        assert!(!block[2]
            .fulfilled_time_constraints
            .contains(&"resolution".to_string()));
        assert!(block[1]
            .fulfilled_time_constraints
            .contains(&"fixed-akslot-3".to_string()));
        assert_eq!(
            doc.timeslots.info.blocknames,
            vec![["Friday, 10. May".to_string(), "09:00 - 13:00".to_string()]]
        );
    }

    #[test]
    fn test_restricted_room_labels() {
        let mut data = base();
        data.add_availability(
            Availability::new(EventId(1), at(10, 9), at(10, 11))
                .with_owner(AvailabilityOwner::Room(RoomId(2))),
        )
        .unwrap();
        let doc = export(&data);
        assert_eq!(doc.rooms[1].time_constraints, vec!["availability-room-2"]);
        let block = &doc.timeslots.blocks[0];
        let has = |i: usize| {
            block[i]
                .fulfilled_time_constraints
                .contains(&"availability-room-2".to_string())
        };
        assert!(has(0) && has(1));
        assert!(!has(2));
    }

    #[test]
    fn test_participants_and_owner_dummy() {
        let mut data = base();
        data.save_participant(Participant::new(ParticipantId(4)).with_name("Kim")).unwrap();
        data.save_preference(Preference::new(ParticipantId(4), AkId(1), PreferenceLevel::Required))
            .unwrap();
        data.save_preference(Preference::new(ParticipantId(4), AkId(2), PreferenceLevel::Ignore))
            .unwrap();

        let doc = export(&data);
        assert_eq!(doc.participants.len(), 2);
        let kim = &doc.participants[0];
        assert_eq!(kim.info.name, "Kim");
        assert_eq!(kim.preferences.len(), 2);
        assert!(kim.preferences.iter().all(|p| p.required && p.preference_score == -1));

        let dummy = &doc.participants[1];
        assert_eq!(dummy.id, ParticipantId(5));
        assert_eq!(dummy.info.name, "Alex [AKOwner]");
        let slots: Vec<SlotId> = dummy.preferences.iter().map(|p| p.ak_id).collect();
        assert_eq!(slots, vec![SlotId(1), SlotId(2)]);
    }

    #[test]
    fn test_category_filter_and_scheduled_as_fixed() {
        let data = base();
        let options = ExportOptions::default()
            .with_categories([CategoryId(9)])
            .with_scheduled_as_fixed(true);
        let doc = build_export(&data, &PlannerConfig::default(), &options).unwrap();
        // AK 1 is in another category; AK 2 has none and stays.
        let ids: Vec<SlotId> = doc.aks.iter().map(|a| a.id).collect();
        assert_eq!(ids, vec![SlotId(3)]);
        assert!(doc.aks[0].properties.dependencies.is_empty());
    }

    #[test]
    fn test_export_is_deterministic() {
        let data = base();
        let first = serde_json::to_value(export(&data)).unwrap();
        let second = serde_json::to_value(export(&data)).unwrap();
        assert_eq!(first, second);
    }
}
