//! # Rollcall Sync Protocol
//!
//! Shared vocabulary of the Rollcall sync engine.
//!
//! This crate provides:
//! - the three synchronizable entities ([`Student`], [`TimetableSlot`],
//!   [`AttendanceRecord`]) and their identity keys
//! - the [`SyncEntity`] adapter contract every other component is generic over
//! - [`Record`], the versioned envelope records travel in
//! - [`Watermark`], the `(timestamp, key)` cursor bounding incremental pulls
//! - push/pull messages with CBOR encoding
//!
//! This is a pure protocol crate with no I/O.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod attendance;
mod entity;
mod error;
mod messages;
mod record;
mod student;
mod time;
mod timetable;
mod watermark;

pub use attendance::{AttendanceKey, AttendanceRecord, ALL_SECTIONS};
pub use entity::{EntityKey, EntityKind, SyncEntity};
pub use error::{ProtocolError, ProtocolResult};
pub use messages::{
    ErrorCode, ErrorResponse, PullRequest, PullResponse, PushRequest, PushResponse, RecordBatch,
    SyncMessage,
};
pub use record::Record;
pub use student::{Student, StudentKey};
pub use time::Timestamp;
pub use timetable::{SlotKey, TimetableSlot};
pub use watermark::Watermark;
