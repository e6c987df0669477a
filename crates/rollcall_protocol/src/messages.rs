//! Push and pull messages.

use crate::attendance::AttendanceRecord;
use crate::entity::EntityKind;
use crate::error::{ProtocolError, ProtocolResult};
use crate::record::Record;
use crate::student::Student;
use crate::timetable::TimetableSlot;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// Encodes any message to CBOR.
fn to_cbor<T: Serialize>(value: &T) -> ProtocolResult<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::into_writer(value, &mut bytes).map_err(ProtocolError::codec)?;
    Ok(bytes)
}

/// Decodes any message from CBOR.
fn from_cbor<T: DeserializeOwned>(bytes: &[u8]) -> ProtocolResult<T> {
    ciborium::from_reader(bytes).map_err(ProtocolError::codec)
}

macro_rules! cbor_message {
    ($ty:ty) => {
        impl $ty {
            /// Encodes to CBOR.
            pub fn encode(&self) -> ProtocolResult<Vec<u8>> {
                to_cbor(self)
            }

            /// Decodes from CBOR.
            pub fn decode(bytes: &[u8]) -> ProtocolResult<Self> {
                from_cbor(bytes)
            }
        }
    };
}

/// Records of a single collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "records", rename_all = "snake_case")]
pub enum RecordBatch {
    /// Student records.
    Students(Vec<Record<Student>>),
    /// Timetable slot records.
    TimetableSlots(Vec<Record<TimetableSlot>>),
    /// Attendance records.
    Attendance(Vec<Record<AttendanceRecord>>),
}

impl RecordBatch {
    /// An empty batch of `kind`.
    #[must_use]
    pub fn empty(kind: EntityKind) -> Self {
        match kind {
            EntityKind::Student => RecordBatch::Students(Vec::new()),
            EntityKind::TimetableSlot => RecordBatch::TimetableSlots(Vec::new()),
            EntityKind::Attendance => RecordBatch::Attendance(Vec::new()),
        }
    }

    /// Collection the batch belongs to.
    #[must_use]
    pub fn kind(&self) -> EntityKind {
        match self {
            RecordBatch::Students(_) => EntityKind::Student,
            RecordBatch::TimetableSlots(_) => EntityKind::TimetableSlot,
            RecordBatch::Attendance(_) => EntityKind::Attendance,
        }
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            RecordBatch::Students(records) => records.len(),
            RecordBatch::TimetableSlots(records) => records.len(),
            RecordBatch::Attendance(records) => records.len(),
        }
    }

    /// True when the batch holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A client's local changes for one collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushRequest {
    /// Changes in the order the client made them.
    pub batch: RecordBatch,
}

impl PushRequest {
    /// Creates a push request.
    #[must_use]
    pub fn new(batch: RecordBatch) -> Self {
        Self { batch }
    }
}

cbor_message!(PushRequest);

/// Outcome counts of a push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PushResponse {
    /// Records that replaced the stored version.
    pub accepted: u32,
    /// Records skipped because the authority already held that version or newer.
    pub stale: u32,
    /// Records removed by validation.
    pub dropped: u32,
}

impl PushResponse {
    /// Accepted plus stale: every record the authority has now dealt with.
    #[must_use]
    pub fn processed(&self) -> u32 {
        self.accepted + self.stale
    }
}

cbor_message!(PushResponse);

/// Request for changes to one collection since a watermark.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PullRequest {
    /// Collection to read.
    pub kind: EntityKind,
    /// Last watermark the client stored; absent for a full sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub watermark: Option<String>,
    /// Page size; absent for the server default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
}

impl PullRequest {
    /// A full pull of `kind`.
    #[must_use]
    pub fn full(kind: EntityKind) -> Self {
        Self {
            kind,
            watermark: None,
            limit: None,
        }
    }

    /// A pull of `kind` after `watermark`.
    #[must_use]
    pub fn since(kind: EntityKind, watermark: Option<String>) -> Self {
        Self {
            kind,
            watermark,
            limit: None,
        }
    }

    /// Sets the page size.
    #[must_use]
    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = Some(limit);
        self
    }
}

cbor_message!(PullRequest);

/// Changed records plus the watermark to resume from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullResponse {
    /// Changed records, tombstones included, in watermark order.
    pub batch: RecordBatch,
    /// Watermark after the last returned record; the request's watermark when
    /// nothing changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_watermark: Option<String>,
    /// True when the page limit cut the result short.
    #[serde(default)]
    pub has_more: bool,
}

cbor_message!(PullResponse);

/// Classification of a failed request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCode {
    /// Malformed or empty request; do not retry unchanged.
    Validation,
    /// Durability failure; resend the identical request.
    Storage,
    /// Unparsable watermark; do not retry with the same value.
    MalformedWatermark,
    /// Anything else.
    Internal,
}

/// Error reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Classification.
    pub code: ErrorCode,
    /// Human-readable detail.
    pub message: String,
    /// Whether resending the identical request may succeed.
    pub retryable: bool,
}

cbor_message!(ErrorResponse);

/// Any protocol message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncMessage {
    /// Push request.
    PushRequest(PushRequest),
    /// Push response.
    PushResponse(PushResponse),
    /// Pull request.
    PullRequest(PullRequest),
    /// Pull response.
    PullResponse(PullResponse),
    /// Error reply.
    Error(ErrorResponse),
}

cbor_message!(SyncMessage);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Timestamp;
    use chrono::NaiveDate;

    #[test]
    fn push_request_cbor_keeps_metadata() {
        let record = Record::tombstone(Student::new("S001", "Alice"), 3)
            .modified_at(Timestamp::from_micros(1_700_000_000_000_000));
        let request = PushRequest::new(RecordBatch::Students(vec![record.clone()]));

        let decoded = PushRequest::decode(&request.encode().unwrap()).unwrap();
        assert_eq!(decoded.batch.kind(), EntityKind::Student);
        match decoded.batch {
            RecordBatch::Students(records) => assert_eq!(records, vec![record]),
            other => panic!("unexpected batch {other:?}"),
        }
    }

    #[test]
    fn attendance_batch_cbor() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 5).unwrap();
        let batch = RecordBatch::Attendance(vec![Record::new(
            AttendanceRecord::new("S001", "CS301", "3", "all", date, true),
            1,
        )]);
        let response = PullResponse {
            batch,
            next_watermark: Some("2024-02-05T10:00:00.000000Z@x".into()),
            has_more: true,
        };
        assert_eq!(
            PullResponse::decode(&response.encode().unwrap()).unwrap(),
            response
        );
    }

    #[test]
    fn message_envelope_is_tagged() {
        let message = SyncMessage::PullRequest(PullRequest::full(EntityKind::TimetableSlot));
        let json = serde_json::to_value(&message).unwrap();
        assert_eq!(json["type"], "pull_request");
        assert_eq!(json["kind"], "timetable_slot");
        assert_eq!(SyncMessage::decode(&message.encode().unwrap()).unwrap(), message);
    }

    #[test]
    fn json_batch_uses_kind_tag() {
        let batch: RecordBatch = serde_json::from_str(
            r#"{"kind": "students", "records": [{"sbrn": "S9", "name": "Zed", "version": 2}]}"#,
        )
        .unwrap();
        assert_eq!(batch.kind(), EntityKind::Student);
        assert_eq!(batch.len(), 1);
    }

    #[test]
    fn garbage_fails_to_decode() {
        assert!(matches!(
            PushRequest::decode(&[0xff, 0x00, 0x13]),
            Err(ProtocolError::Codec(_))
        ));
    }

    #[test]
    fn processed_counts_stale() {
        let response = PushResponse {
            accepted: 2,
            stale: 3,
            dropped: 1,
        };
        assert_eq!(response.processed(), 5);
    }
}
