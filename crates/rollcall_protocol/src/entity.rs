//! The entity adapter contract.

use crate::error::ProtocolError;
use crate::messages::RecordBatch;
use crate::record::Record;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::hash::Hash;
use std::str::FromStr;

/// The synchronized collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Student records keyed by roll number.
    Student,
    /// Timetable slots keyed by department, semester, section, day and period.
    TimetableSlot,
    /// Daily attendance marks.
    Attendance,
}

impl EntityKind {
    /// Every kind, in the order a client syncs them.
    pub const ALL: [EntityKind; 3] = [
        EntityKind::Student,
        EntityKind::TimetableSlot,
        EntityKind::Attendance,
    ];

    /// Stable collection name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            EntityKind::Student => "students",
            EntityKind::TimetableSlot => "timetable_slots",
            EntityKind::Attendance => "attendance",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" | "students" => Ok(EntityKind::Student),
            "slot" | "slots" | "timetable" | "timetable_slot" | "timetable_slots" => {
                Ok(EntityKind::TimetableSlot)
            }
            "attendance" | "attendance_daily" => Ok(EntityKind::Attendance),
            other => Err(ProtocolError::UnknownKind(other.to_string())),
        }
    }
}

/// Identity of a record within its collection.
///
/// Keys order deterministically; that order breaks ties between records
/// sharing a `last_modified` stamp. Every key also has a text token, used in
/// composite watermarks, made of its percent-encoded components joined by `/`.
pub trait EntityKey: Clone + Ord + Hash + fmt::Debug + Send + Sync + 'static {
    /// Components in comparison order.
    fn components(&self) -> Vec<String>;

    /// Rebuilds a key from its components, or `None` if they don't fit.
    fn from_components(parts: Vec<String>) -> Option<Self>;

    /// Text token of this key.
    fn to_token(&self) -> String {
        self.components()
            .iter()
            .map(|part| urlencoding::encode(part).into_owned())
            .collect::<Vec<_>>()
            .join("/")
    }

    /// Parses a token produced by [`EntityKey::to_token`].
    fn from_token(token: &str) -> Option<Self> {
        let parts = token
            .split('/')
            .map(|part| urlencoding::decode(part).ok().map(|p| p.into_owned()))
            .collect::<Option<Vec<_>>>()?;
        Self::from_components(parts)
    }
}

/// Per-type sync configuration.
///
/// Implementations are pure configuration: how to find a record's identity,
/// which fields a whole-record upsert replaces, whether tombstones are allowed,
/// and which version wins. Stores, reconcilers and the client replica are all
/// generic over this trait.
pub trait SyncEntity:
    Clone + fmt::Debug + PartialEq + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Identity key type.
    type Key: EntityKey;

    /// Collection this type lives in.
    const KIND: EntityKind;

    /// Upserted payload fields, in storage order. Identity fields come first.
    const FIELDS: &'static [&'static str];

    /// Whether records of this type may carry a tombstone.
    const SUPPORTS_SOFT_DELETE: bool;

    /// Extracts the identity key, or `None` when a mandatory identity field is
    /// missing or blank.
    fn key(&self) -> Option<Self::Key>;

    /// Whether an incoming version replaces the stored one.
    ///
    /// An absent key counts as stored version 0. Equal versions never win, so
    /// redelivering a batch is a no-op.
    fn supersedes(incoming: u64, stored: Option<u64>) -> bool {
        incoming > stored.unwrap_or(0)
    }

    /// Wraps records of this type into a wire batch.
    fn into_batch(records: Vec<Record<Self>>) -> RecordBatch;

    /// Extracts records of this type from a wire batch.
    fn from_batch(batch: RecordBatch) -> Option<Vec<Record<Self>>>;
}

/// Returns the value when it has non-whitespace content.
pub(crate) fn present(value: &str) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
