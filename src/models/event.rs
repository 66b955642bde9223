//! Event model.
//!
//! An event supplies the frame for all activities: its span bounds every
//! slot, its resolution deadline bounds activities with resolution intent,
//! and its default slots (if any) define when each category is expected to
//! take place.

use chrono::{DateTime, Duration, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use super::{CategoryId, DefaultSlotId, EventId};

/// An event (conference, workshop weekend).
///
/// # Time Representation
/// All instants are UTC. `utc_offset_seconds` is only used to render local
/// times in solver documents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Unique event identifier.
    pub id: EventId,
    /// Human-readable name.
    pub name: String,
    /// Short URL-safe name.
    pub slug: String,
    /// Location (city etc.).
    pub place: Option<String>,
    /// Organizer contact.
    pub contact_email: Option<String>,
    /// Time the event begins.
    pub start: DateTime<Utc>,
    /// Time the event ends.
    pub end: DateTime<Utc>,
    /// Activities with resolution intent must end before this instant.
    pub reso_deadline: Option<DateTime<Utc>>,
    /// Offset of the event's local time zone.
    pub utc_offset_seconds: i32,
    /// Timeslot width used for solver exchange (hours).
    pub export_slot: f64,
}

impl Event {
    /// Creates an event spanning `[start, end]` with one-hour export slots.
    pub fn new(
        id: EventId,
        name: impl Into<String>,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Self {
        let name = name.into();
        Self {
            id,
            slug: slugify(&name),
            name,
            place: None,
            contact_email: None,
            start,
            end,
            reso_deadline: None,
            utc_offset_seconds: 0,
            export_slot: 1.0,
        }
    }

    /// Sets the slug.
    pub fn with_slug(mut self, slug: impl Into<String>) -> Self {
        self.slug = slug.into();
        self
    }

    /// Sets the place.
    pub fn with_place(mut self, place: impl Into<String>) -> Self {
        self.place = Some(place.into());
        self
    }

    /// Sets the contact email.
    pub fn with_contact_email(mut self, email: impl Into<String>) -> Self {
        self.contact_email = Some(email.into());
        self
    }

    /// Sets the resolution deadline.
    pub fn with_reso_deadline(mut self, deadline: DateTime<Utc>) -> Self {
        self.reso_deadline = Some(deadline);
        self
    }

    /// Sets the local UTC offset (seconds east of UTC).
    pub fn with_utc_offset(mut self, seconds: i32) -> Self {
        self.utc_offset_seconds = seconds;
        self
    }

    /// Sets the export timeslot width (hours).
    pub fn with_export_slot(mut self, hours: f64) -> Self {
        self.export_slot = hours;
        self
    }

    /// The event's local offset, falling back to UTC for out-of-range values.
    pub fn offset(&self) -> FixedOffset {
        FixedOffset::east_opt(self.utc_offset_seconds).unwrap_or_else(|| Utc.fix())
    }

    /// Length of the event in hours.
    pub fn duration_hours(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 3_600_000.0
    }
}

fn slugify(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '-'
            }
        })
        .collect()
}

/// Converts fractional hours to a duration with millisecond precision.
///
/// `None` for non-finite values and values outside the range of [`Duration`].
pub fn hours(value: f64) -> Option<Duration> {
    let millis = (value * 3_600_000.0).round();
    if !millis.is_finite() || millis.abs() >= i64::MAX as f64 {
        return None;
    }
    Duration::try_milliseconds(millis as i64)
}

/// A category activities are grouped in (e.g. "Inhaltliche AKs", "Spaß").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    /// Unique category identifier.
    pub id: CategoryId,
    /// Category name; used verbatim in constraint labels.
    pub name: String,
}

impl Category {
    /// Creates a category.
    pub fn new(id: CategoryId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// A declared preferred time range, optionally dedicated to categories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultSlot {
    /// Unique default slot identifier.
    pub id: DefaultSlotId,
    /// Range start.
    pub start: DateTime<Utc>,
    /// Range end.
    pub end: DateTime<Utc>,
    /// Categories primarily scheduled in this range.
    pub primary_categories: Vec<CategoryId>,
}

impl DefaultSlot {
    /// Creates a default slot without primary categories.
    pub fn new(id: DefaultSlotId, start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self {
            id,
            start,
            end,
            primary_categories: Vec::new(),
        }
    }

    /// Adds a primary category.
    pub fn with_category(mut self, category: CategoryId) -> Self {
        self.primary_categories.push(category);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_event_builder() {
        let start = Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2024, 5, 12, 18, 0, 0).unwrap();
        let event = Event::new(EventId(1), "KoMa 90", start, end)
            .with_place("Aachen")
            .with_utc_offset(7200)
            .with_export_slot(0.5);

        assert_eq!(event.slug, "koma-90");
        assert_eq!(event.place.as_deref(), Some("Aachen"));
        assert_eq!(event.offset().local_minus_utc(), 7200);
        assert!((event.duration_hours() - 57.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_offset_falls_back_to_utc() {
        let start = Utc.with_ymd_and_hms(2024, 5, 10, 9, 0, 0).unwrap();
        let event = Event::new(EventId(1), "e", start, start).with_utc_offset(i32::MAX);
        assert_eq!(event.offset().local_minus_utc(), 0);
    }

    #[test]
    fn test_hours_conversion() {
        assert_eq!(hours(1.5), Some(Duration::minutes(90)));
        assert_eq!(hours(0.25), Some(Duration::minutes(15)));
        assert_eq!(hours(1e-7), Some(Duration::zero()));
    }

    #[test]
    fn test_hours_out_of_range() {
        assert_eq!(hours(f64::NAN), None);
        assert_eq!(hours(f64::INFINITY), None);
        assert_eq!(hours(1e300), None);
    }
}
