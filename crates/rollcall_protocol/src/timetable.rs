//! Timetable slots.

use crate::entity::{present, EntityKey, EntityKind, SyncEntity};
use crate::messages::RecordBatch;
use crate::record::Record;
use serde::{Deserialize, Serialize};

/// Composite identity of a timetable slot.
///
/// Field order is the comparison order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey {
    /// Department code.
    pub department: String,
    /// Semester label.
    pub semester: String,
    /// Section label.
    pub section: String,
    /// Weekday name as entered, e.g. `Monday`.
    pub day: String,
    /// Period number within the day.
    pub period_no: u32,
}

impl EntityKey for SlotKey {
    fn components(&self) -> Vec<String> {
        vec![
            self.department.clone(),
            self.semester.clone(),
            self.section.clone(),
            self.day.clone(),
            self.period_no.to_string(),
        ]
    }

    fn from_components(parts: Vec<String>) -> Option<Self> {
        let [department, semester, section, day, period] = <[String; 5]>::try_from(parts).ok()?;
        Some(SlotKey {
            department: present(&department)?,
            semester: present(&semester)?,
            section: present(&section)?,
            day: present(&day)?,
            period_no: period.parse().ok()?,
        })
    }
}

/// One period of a section's weekly timetable.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TimetableSlot {
    /// Department code (identity).
    #[serde(default)]
    pub department: String,
    /// Semester label (identity).
    #[serde(default)]
    pub semester: String,
    /// Section label (identity).
    #[serde(default)]
    pub section: String,
    /// Weekday name (identity).
    #[serde(default)]
    pub day: String,
    /// Period number (identity).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_no: Option<u32>,
    /// Number of consecutive periods the class occupies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period_len: Option<u32>,
    /// Class type such as `theory` or `lab`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub slot_type: Option<String>,
    /// Subject taught in this slot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject_id: Option<String>,
    /// Teaching faculty member.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub faculty_id: Option<String>,
    /// Room.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub room: Option<String>,
}

impl TimetableSlot {
    /// Creates a slot teaching `subject_id`.
    pub fn new(
        department: impl Into<String>,
        semester: impl Into<String>,
        section: impl Into<String>,
        day: impl Into<String>,
        period_no: u32,
        subject_id: impl Into<String>,
    ) -> Self {
        Self {
            department: department.into(),
            semester: semester.into(),
            section: section.into(),
            day: day.into(),
            period_no: Some(period_no),
            period_len: Some(1),
            subject_id: Some(subject_id.into()),
            ..Self::default()
        }
    }

    /// Sets the room.
    #[must_use]
    pub fn in_room(mut self, room: impl Into<String>) -> Self {
        self.room = Some(room.into());
        self
    }

    /// Sets the class type.
    #[must_use]
    pub fn of_type(mut self, slot_type: impl Into<String>) -> Self {
        self.slot_type = Some(slot_type.into());
        self
    }

    /// The subject taught, if one is set and non-blank.
    pub fn subject(&self) -> Option<&str> {
        self.subject_id
            .as_deref()
            .filter(|subject| !subject.trim().is_empty())
    }
}

impl SyncEntity for TimetableSlot {
    type Key = SlotKey;

    const KIND: EntityKind = EntityKind::TimetableSlot;
    const FIELDS: &'static [&'static str] = &[
        "department",
        "semester",
        "section",
        "day",
        "period_no",
        "period_len",
        "type",
        "subject_id",
        "faculty_id",
        "room",
    ];
    const SUPPORTS_SOFT_DELETE: bool = true;

    fn key(&self) -> Option<SlotKey> {
        Some(SlotKey {
            department: present(&self.department)?,
            semester: present(&self.semester)?,
            section: present(&self.section)?,
            day: present(&self.day)?,
            period_no: self.period_no?,
        })
    }

    fn into_batch(records: Vec<Record<Self>>) -> RecordBatch {
        RecordBatch::TimetableSlots(records)
    }

    fn from_batch(batch: RecordBatch) -> Option<Vec<Record<Self>>> {
        match batch {
            RecordBatch::TimetableSlots(records) => Some(records),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_needs_all_five_fields() {
        let slot = TimetableSlot::new("CSE", "3", "A", "Monday", 2, "CS301");
        let key = slot.key().unwrap();
        assert_eq!(key.period_no, 2);

        let mut no_period = slot.clone();
        no_period.period_no = None;
        assert!(no_period.key().is_none());

        let mut no_day = slot;
        no_day.day = String::new();
        assert!(no_day.key().is_none());
    }

    #[test]
    fn keys_order_by_component() {
        let a = TimetableSlot::new("CSE", "3", "A", "Monday", 1, "X").key().unwrap();
        let b = TimetableSlot::new("CSE", "3", "A", "Monday", 2, "X").key().unwrap();
        let c = TimetableSlot::new("CSE", "3", "B", "Monday", 1, "X").key().unwrap();
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn token_round_trips() {
        let key = TimetableSlot::new("E&C", "3", "A 1", "Friday", 7, "X")
            .key()
            .unwrap();
        assert_eq!(SlotKey::from_token(&key.to_token()), Some(key));
        assert!(SlotKey::from_token("CSE/3/A/Monday/first").is_none());
    }

    #[test]
    fn type_field_uses_wire_name() {
        let slot = TimetableSlot::new("CSE", "3", "A", "Monday", 1, "CS301").of_type("lab");
        let json = serde_json::to_value(&slot).unwrap();
        assert_eq!(json["type"], "lab");
    }

    #[test]
    fn blank_subject_is_absent() {
        let mut slot = TimetableSlot::new("CSE", "3", "A", "Monday", 1, " ");
        assert!(slot.subject().is_none());
        slot.subject_id = Some("CS301".into());
        assert_eq!(slot.subject(), Some("CS301"));
    }
}
