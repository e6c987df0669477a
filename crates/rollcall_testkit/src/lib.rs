//! # Rollcall Testkit
//!
//! Test utilities for Rollcall.
//!
//! This crate provides:
//! - sample students, timetable slots and attendance marks
//! - [`TestStore`], an engine over a journal in a temporary directory
//! - proptest strategies for records and batches
//! - [`CrashableBackend`], a storage wrapper that fails or tears writes
//!
//! ## Usage
//!
//! ```rust
//! use rollcall_testkit::prelude::*;
//!
//! let store = TestStore::journal();
//! let engine = store.engine();
//! let report = engine.push_records(sample_students()).unwrap();
//! assert_eq!(report.accepted, sample_students().len());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod crash;
pub mod fixtures;
pub mod generators;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::crash::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
}

pub use crash::*;
pub use fixtures::*;
pub use generators::*;
