//! Student records.

use crate::entity::{present, EntityKey, EntityKind, SyncEntity};
use crate::messages::RecordBatch;
use crate::record::Record;
use serde::{Deserialize, Serialize};

/// Roll number identifying a student.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StudentKey(pub String);

impl EntityKey for StudentKey {
    fn components(&self) -> Vec<String> {
        vec![self.0.clone()]
    }

    fn from_components(parts: Vec<String>) -> Option<Self> {
        match <[String; 1]>::try_from(parts) {
            Ok([sbrn]) => present(&sbrn).map(StudentKey),
            Err(_) => None,
        }
    }
}

/// A student enrolled in a department, semester and section.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Student {
    /// Roll number (identity).
    #[serde(default)]
    pub sbrn: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Department code, e.g. `CSE`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    /// Semester label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semester: Option<String>,
    /// Section label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
}

impl Student {
    /// Creates a student with only roll number and name.
    pub fn new(sbrn: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            sbrn: sbrn.into(),
            name: name.into(),
            ..Self::default()
        }
    }

    /// Places the student in a department, semester and section.
    #[must_use]
    pub fn enrolled(
        mut self,
        department: impl Into<String>,
        semester: impl Into<String>,
        section: impl Into<String>,
    ) -> Self {
        self.department = Some(department.into());
        self.semester = Some(semester.into());
        self.section = Some(section.into());
        self
    }
}

impl SyncEntity for Student {
    type Key = StudentKey;

    const KIND: EntityKind = EntityKind::Student;
    const FIELDS: &'static [&'static str] = &["sbrn", "name", "department", "semester", "section"];
    const SUPPORTS_SOFT_DELETE: bool = true;

    fn key(&self) -> Option<StudentKey> {
        present(&self.sbrn).map(StudentKey)
    }

    fn into_batch(records: Vec<Record<Self>>) -> RecordBatch {
        RecordBatch::Students(records)
    }

    fn from_batch(batch: RecordBatch) -> Option<Vec<Record<Self>>> {
        match batch {
            RecordBatch::Students(records) => Some(records),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_roll_number_has_no_key() {
        assert!(Student::new("  ", "Ghost").key().is_none());
        assert_eq!(
            Student::new("S001", "Alice").key(),
            Some(StudentKey("S001".into()))
        );
    }

    #[test]
    fn token_escapes_separators() {
        let key = StudentKey("2024/CSE/001".into());
        let token = key.to_token();
        assert!(!token.contains('/'));
        assert_eq!(StudentKey::from_token(&token), Some(key));
    }

    #[test]
    fn token_with_wrong_arity_is_rejected() {
        assert!(StudentKey::from_token("a/b").is_none());
        assert!(StudentKey::from_token("").is_none());
    }
}
