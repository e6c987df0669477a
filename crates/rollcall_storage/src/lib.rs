//! # Rollcall Storage
//!
//! Byte-level storage backends underneath the Rollcall authority journal.
//!
//! Backends are **opaque append-only byte stores**. They know nothing about
//! commit frames, entity rows or watermarks; `rollcall_core` owns the journal
//! format and replays it on open.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - tests and ephemeral authority stores
//! - [`FileBackend`] - a single journal file on the local file system
//!
//! ## Example
//!
//! ```rust
//! use rollcall_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"frame").unwrap();
//! assert_eq!(backend.read_at(offset, 5).unwrap(), b"frame");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
