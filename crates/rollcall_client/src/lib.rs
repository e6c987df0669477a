//! # Rollcall Sync Client
//!
//! The device side of Rollcall sync.
//!
//! This crate provides:
//! - [`LocalReplica`], the offline copy of every collection with its queue of
//!   pending local changes and the last watermark pulled per collection
//! - a sync state machine (idle → pulling → pushing → synced)
//! - retry with exponential backoff on retryable failures
//! - a transport abstraction with an in-process [`LoopbackTransport`]
//!
//! ## Architecture
//!
//! The client implements a **pull-then-push** model:
//! 1. Pull remote changes after the stored watermark, page by page
//! 2. Apply them locally under the version rule
//! 3. Push pending local changes; clear them once the server has answered
//!
//! ## Key Invariants
//!
//! - The server is authoritative
//! - Pull always happens before push
//! - Pushing the same change twice is harmless
//! - A pending change leaves the queue only after a successful push

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

mod config;
mod error;
mod replica;
mod state;
mod transport;

pub use config::{ClientConfig, RetryConfig};
pub use error::{SyncError, SyncResult};
pub use replica::{Collection, LocalReplica, ReplicaEntity, ReplicaSnapshot, ReplicaTables};
pub use state::{SyncClient, SyncCycleResult, SyncState, SyncStats};
pub use transport::{LoopbackTransport, SyncTransport};
