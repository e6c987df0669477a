//! In-memory storage backend.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// An in-memory append-only store.
///
/// Clones made with [`InMemoryBackend::handle`] share the same buffer, which
/// lets a test hand one handle to a journal and keep another to reopen the
/// journal later (simulating a process restart) or to take the volume
/// offline.
///
/// # Example
///
/// ```rust
/// use rollcall_storage::{InMemoryBackend, StorageBackend};
///
/// let mut backend = InMemoryBackend::new();
/// let observer = backend.handle();
/// backend.append(b"abc").unwrap();
/// assert_eq!(observer.size().unwrap(), 3);
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    data: Arc<RwLock<Vec<u8>>>,
    offline: Arc<AtomicBool>,
}

impl InMemoryBackend {
    /// Creates an empty backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a backend preloaded with `data`.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        Self {
            data: Arc::new(RwLock::new(data)),
            offline: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Returns another handle onto the same buffer and offline switch.
    #[must_use]
    pub fn handle(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
            offline: Arc::clone(&self.offline),
        }
    }

    /// Returns a copy of the stored bytes.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.data.read().clone()
    }

    /// Makes every subsequent write fail with [`StorageError::Unavailable`]
    /// until switched back.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check_online(&self) -> StorageResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            Err(StorageError::Unavailable("in-memory volume is offline".into()))
        } else {
            Ok(())
        }
    }
}

impl StorageBackend for InMemoryBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let data = self.data.read();
        let size = data.len() as u64;
        let start = offset as usize;
        let end = start.saturating_add(len);

        if offset > size || end > data.len() {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        Ok(data[start..end].to_vec())
    }

    fn append(&mut self, bytes: &[u8]) -> StorageResult<u64> {
        self.check_online()?;
        let mut data = self.data.write();
        let offset = data.len() as u64;
        data.extend_from_slice(bytes);
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.check_online()
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.data.read().len() as u64)
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.check_online()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        self.check_online()?;
        let mut data = self.data.write();
        let size = data.len() as u64;
        if new_size > size {
            return Err(StorageError::TruncatePastEnd {
                requested: new_size,
                size,
            });
        }
        data.truncate(new_size as usize);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_returns_offsets() {
        let mut backend = InMemoryBackend::new();
        assert_eq!(backend.append(b"hello").unwrap(), 0);
        assert_eq!(backend.append(b" world").unwrap(), 5);
        assert_eq!(backend.size().unwrap(), 11);
        assert_eq!(backend.read_at(6, 5).unwrap(), b"world");
    }

    #[test]
    fn read_past_end_fails() {
        let mut backend = InMemoryBackend::new();
        backend.append(b"hello").unwrap();
        assert!(matches!(
            backend.read_at(3, 10),
            Err(StorageError::ReadPastEnd { .. })
        ));
    }

    #[test]
    fn handles_share_buffer() {
        let mut writer = InMemoryBackend::new();
        let reader = writer.handle();
        writer.append(b"frame").unwrap();
        assert_eq!(reader.data(), b"frame");
    }

    #[test]
    fn offline_rejects_writes_but_allows_reads() {
        let mut backend = InMemoryBackend::with_data(b"kept".to_vec());
        backend.set_offline(true);

        assert!(matches!(
            backend.append(b"lost"),
            Err(StorageError::Unavailable(_))
        ));
        assert!(backend.sync().is_err());
        assert_eq!(backend.read_at(0, 4).unwrap(), b"kept");

        backend.set_offline(false);
        assert_eq!(backend.append(b"!").unwrap(), 4);
    }

    #[test]
    fn truncate_drops_tail() {
        let mut backend = InMemoryBackend::new();
        backend.append(b"hello world").unwrap();
        backend.truncate(5).unwrap();
        assert_eq!(backend.data(), b"hello");
        assert!(matches!(
            backend.truncate(50),
            Err(StorageError::TruncatePastEnd { .. })
        ));
    }
}
