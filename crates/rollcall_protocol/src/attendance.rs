//! Daily attendance marks.

use crate::entity::{present, EntityKey, EntityKind, SyncEntity};
use crate::messages::RecordBatch;
use crate::record::Record;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Section value meaning "this mark is not tied to one section".
///
/// It is an ordinary key component: `"all"` and `"A"` are different keys and
/// the value is never rewritten to empty or absent.
pub const ALL_SECTIONS: &str = "all";

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Identity of an attendance mark.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AttendanceKey {
    /// Student roll number.
    pub sbrn: String,
    /// Subject.
    pub subject_id: String,
    /// Semester label.
    pub semester: String,
    /// Section label, possibly [`ALL_SECTIONS`].
    pub section: String,
    /// Class date.
    pub class_date: NaiveDate,
}

impl AttendanceKey {
    /// True when the mark carries the all-sections sentinel.
    pub fn spans_all_sections(&self) -> bool {
        self.section == ALL_SECTIONS
    }
}

impl EntityKey for AttendanceKey {
    fn components(&self) -> Vec<String> {
        vec![
            self.sbrn.clone(),
            self.subject_id.clone(),
            self.semester.clone(),
            self.section.clone(),
            self.class_date.format(DATE_FORMAT).to_string(),
        ]
    }

    fn from_components(parts: Vec<String>) -> Option<Self> {
        let [sbrn, subject_id, semester, section, date] = <[String; 5]>::try_from(parts).ok()?;
        Some(AttendanceKey {
            sbrn: present(&sbrn)?,
            subject_id: present(&subject_id)?,
            semester: present(&semester)?,
            section: present(&section)?,
            class_date: NaiveDate::parse_from_str(&date, DATE_FORMAT).ok()?,
        })
    }
}

/// Whether one student attended one class on one date.
///
/// `class_date` travels as `YYYY-MM-DD` text; an unparsable date leaves the
/// record without a key, so it is dropped from its batch instead of failing the
/// whole request.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AttendanceRecord {
    /// Student roll number (identity).
    #[serde(default)]
    pub sbrn: String,
    /// Subject (identity).
    #[serde(default)]
    pub subject_id: String,
    /// Semester label (identity).
    #[serde(default)]
    pub semester: String,
    /// Section label (identity), possibly [`ALL_SECTIONS`].
    #[serde(default)]
    pub section: String,
    /// Class date as `YYYY-MM-DD` (identity).
    #[serde(default)]
    pub class_date: String,
    /// Present or absent.
    #[serde(default)]
    pub attended: bool,
}

impl AttendanceRecord {
    /// Creates a mark.
    pub fn new(
        sbrn: impl Into<String>,
        subject_id: impl Into<String>,
        semester: impl Into<String>,
        section: impl Into<String>,
        class_date: NaiveDate,
        attended: bool,
    ) -> Self {
        Self {
            sbrn: sbrn.into(),
            subject_id: subject_id.into(),
            semester: semester.into(),
            section: section.into(),
            class_date: class_date.format(DATE_FORMAT).to_string(),
            attended,
        }
    }

    /// Parsed class date.
    pub fn date(&self) -> Option<NaiveDate> {
        NaiveDate::parse_from_str(self.class_date.trim(), DATE_FORMAT).ok()
    }
}

impl SyncEntity for AttendanceRecord {
    type Key = AttendanceKey;

    const KIND: EntityKind = EntityKind::Attendance;
    const FIELDS: &'static [&'static str] = &[
        "sbrn",
        "subject_id",
        "semester",
        "section",
        "class_date",
        "attended",
    ];
    const SUPPORTS_SOFT_DELETE: bool = false;

    fn key(&self) -> Option<AttendanceKey> {
        Some(AttendanceKey {
            sbrn: present(&self.sbrn)?,
            subject_id: present(&self.subject_id)?,
            semester: present(&self.semester)?,
            section: present(&self.section)?,
            class_date: self.date()?,
        })
    }

    fn into_batch(records: Vec<Record<Self>>) -> RecordBatch {
        RecordBatch::Attendance(records)
    }

    fn from_batch(batch: RecordBatch) -> Option<Vec<Record<Self>>> {
        match batch {
            RecordBatch::Attendance(records) => Some(records),
            _ => None,
        }
    }
}
