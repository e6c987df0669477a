//! Versioned record envelope.

use crate::entity::SyncEntity;
use crate::time::Timestamp;
use serde::{Deserialize, Serialize};

/// An entity together with its sync metadata.
///
/// On the wire the entity's own fields sit next to the metadata:
///
/// ```json
/// {"sbrn": "S001", "name": "Alice", "version": 1, "is_deleted": false}
/// ```
///
/// In a push, `last_modified` is the client's own advisory stamp. In a pull it
/// is the authority's stamp and the client's value comes back as
/// `client_modified`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(bound(serialize = "E: Serialize", deserialize = "E: serde::de::DeserializeOwned"))]
pub struct Record<E> {
    /// Entity payload including its identity fields.
    #[serde(flatten)]
    pub entity: E,
    /// Whole-record version; 0 means "missing" and fails validation.
    #[serde(default)]
    pub version: u64,
    /// Modification stamp (see type docs for direction-dependent meaning).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,
    /// The pushing client's stamp, recorded verbatim by the authority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_modified: Option<Timestamp>,
    /// Tombstone flag.
    #[serde(default)]
    pub is_deleted: bool,
    /// When the tombstone was first written at the authority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<Timestamp>,
}

impl<E: SyncEntity> Record<E> {
    /// A live record at `version`.
    pub fn new(entity: E, version: u64) -> Self {
        Self {
            entity,
            version,
            last_modified: None,
            client_modified: None,
            is_deleted: false,
            deleted_at: None,
        }
    }

    /// A tombstone for `entity` at `version`.
    pub fn tombstone(entity: E, version: u64) -> Self {
        Self {
            is_deleted: true,
            ..Self::new(entity, version)
        }
    }

    /// Sets the advisory modification stamp.
    #[must_use]
    pub fn modified_at(mut self, at: Timestamp) -> Self {
        self.last_modified = Some(at);
        self
    }

    /// Identity key, if the identity fields are present.
    pub fn key(&self) -> Option<E::Key> {
        self.entity.key()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Student;

    #[test]
    fn wire_form_is_flat() {
        let record = Record::new(Student::new("S001", "Alice"), 1);
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["sbrn"], "S001");
        assert_eq!(json["name"], "Alice");
        assert_eq!(json["version"], 1);
        assert_eq!(json["is_deleted"], false);
        assert!(json.get("last_modified").is_none());
    }

    #[test]
    fn missing_metadata_defaults() {
        let record: Record<Student> =
            serde_json::from_str(r#"{"name": "No Roll Number"}"#).unwrap();
        assert_eq!(record.version, 0);
        assert!(!record.is_deleted);
        assert!(record.key().is_none());
    }

    #[test]
    fn tombstone_sets_flag() {
        let record = Record::tombstone(Student::new("S002", "Bob"), 4);
        assert!(record.is_deleted);
        assert_eq!(record.version, 4);
        assert!(record.deleted_at.is_none());
    }
}
