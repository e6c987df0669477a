//! # Rollcall Core
//!
//! The authority side of Rollcall sync.
//!
//! This crate provides:
//! - [`AuthorityStore`], with a volatile [`MemoryStore`] and a durable,
//!   journaled [`JournalStore`]
//! - version-gated last-writer-wins resolution ([`resolver`])
//! - the push and pull reconcilers and the [`SyncEntity`](rollcall_protocol::SyncEntity)
//!   adapter glue that binds each entity type to its table
//! - the subject catalog derived from the timetable
//! - [`SyncEngine`], the facade a transport layer calls
//!
//! ## Guarantees
//!
//! - redelivering a batch changes nothing
//! - a stored version never decreases
//! - a pull resumed from any returned watermark sees every later change
//!   exactly once, tombstones included

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

mod adapter;
mod catalog;
mod clock;
mod config;
mod cursor;
mod engine;
mod error;
mod journal;
pub mod pull;
pub mod push;
pub mod resolver;
mod store;
mod table;

pub use adapter::{StoredEntity, Tables};
pub use catalog::{Catalog, CatalogEntry, CatalogKey};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{EngineConfig, StoreConfig};
pub use cursor::Cursor;
pub use engine::SyncEngine;
pub use error::{CoreError, CoreResult};
pub use journal::{
    compute_crc32, encode_frame, scan_frames, verify_journal, CommitFrame, FrameScan, JournalReport,
    JournalStore, JOURNAL_MAGIC, JOURNAL_VERSION,
};
pub use pull::PullPage;
pub use push::{DropReason, PushReport};
pub use resolver::{Acceptance, Candidate, Resolution};
pub use store::{
    AuthorityStore, CollectionStats, CommitOutcome, MemoryStore, StoreState, StoreStats,
};
pub use table::Table;

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
