//! CLI command implementations.

pub mod catalog;
pub mod inspect;
pub mod pull;
pub mod push;
pub mod verify;

use rollcall_core::{JournalStore, StoreConfig, SyncEngine};
use rollcall_storage::FileBackend;
use std::path::Path;

/// Engine over the journal at `path`, creating it when missing.
pub fn open_engine(
    path: &Path,
) -> Result<SyncEngine<JournalStore<FileBackend>>, Box<dyn std::error::Error>> {
    let store = JournalStore::open_file(path, StoreConfig::default())?;
    Ok(SyncEngine::new(store))
}

/// Fails unless a journal exists at `path`.
pub fn require_journal(path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    if path.is_file() {
        Ok(())
    } else {
        Err(format!("No journal found at {:?}", path).into())
    }
}
