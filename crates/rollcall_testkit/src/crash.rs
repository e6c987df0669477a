//! Crash simulation for journal recovery tests.
//!
//! [`CrashableBackend`] wraps any backend and, once armed, lets only a
//! prefix of the next writes reach it before failing. A crashed backend also
//! refuses to truncate, so the store cannot roll the torn bytes back; the
//! tail is left for the next open to cut. A single torn append and refused
//! truncates can also be injected without crashing, for stores that keep
//! running after a failed rollback.
//!
//! ## Usage
//!
//! ```rust
//! use rollcall_core::{JournalStore, StoreConfig, SyncEngine};
//! use rollcall_protocol::{Record, Student};
//! use rollcall_storage::InMemoryBackend;
//! use rollcall_testkit::CrashableBackend;
//!
//! let disk = InMemoryBackend::new();
//! let backend = CrashableBackend::new(disk.handle());
//! let switch = backend.switch();
//! let engine = SyncEngine::new(JournalStore::open(backend, StoreConfig::default()).unwrap());
//!
//! switch.crash_after(4);
//! assert!(engine.push_records(vec![Record::new(Student::new("S001", "Alice"), 1)]).is_err());
//! drop(engine);
//!
//! let reopened = JournalStore::open(disk, StoreConfig::default()).unwrap();
//! assert_eq!(reopened.frames(), 0);
//! ```

use rollcall_storage::{StorageBackend, StorageError, StorageResult};
use std::io;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

#[derive(Debug)]
struct CrashState {
    budget: AtomicUsize,
    crashed: AtomicBool,
    fail_on_sync: AtomicBool,
    tear_at: AtomicUsize,
    refused_truncates: AtomicUsize,
}

/// Remote control for a [`CrashableBackend`] that has been moved into a store.
#[derive(Debug, Clone)]
pub struct CrashSwitch {
    state: Arc<CrashState>,
}

impl CrashSwitch {
    /// Lets `bytes` more bytes through, then crashes mid-write.
    pub fn crash_after(&self, bytes: usize) {
        self.state.budget.store(bytes, Ordering::SeqCst);
    }

    /// Writes only the first `keep` bytes of the next append and fails it,
    /// without crashing the backend.
    pub fn tear_next_append(&self, keep: usize) {
        self.state.tear_at.store(keep, Ordering::SeqCst);
    }

    /// Fails the next `count` truncates.
    pub fn refuse_truncates(&self, count: usize) {
        self.state.refused_truncates.store(count, Ordering::SeqCst);
    }

    /// Makes `flush` and `sync` fail without losing written bytes.
    pub fn set_fail_on_sync(&self, fail: bool) {
        self.state.fail_on_sync.store(fail, Ordering::SeqCst);
    }

    /// True once a write has been torn.
    pub fn crashed(&self) -> bool {
        self.state.crashed.load(Ordering::SeqCst)
    }

    /// Disarms the switch and clears the crashed flag.
    pub fn reset(&self) {
        self.state.budget.store(usize::MAX, Ordering::SeqCst);
        self.state.crashed.store(false, Ordering::SeqCst);
        self.state.fail_on_sync.store(false, Ordering::SeqCst);
        self.state.tear_at.store(usize::MAX, Ordering::SeqCst);
        self.state.refused_truncates.store(0, Ordering::SeqCst);
    }
}

/// A storage backend wrapper that can simulate crashes.
#[derive(Debug)]
pub struct CrashableBackend<B> {
    inner: B,
    state: Arc<CrashState>,
}

impl<B: StorageBackend> CrashableBackend<B> {
    /// Wraps `inner`, initially disarmed.
    pub fn new(inner: B) -> Self {
        Self {
            inner,
            state: Arc::new(CrashState {
                budget: AtomicUsize::new(usize::MAX),
                crashed: AtomicBool::new(false),
                fail_on_sync: AtomicBool::new(false),
                tear_at: AtomicUsize::new(usize::MAX),
                refused_truncates: AtomicUsize::new(0),
            }),
        }
    }

    /// Returns a switch that stays usable after the backend is moved.
    pub fn switch(&self) -> CrashSwitch {
        CrashSwitch {
            state: Arc::clone(&self.state),
        }
    }

    fn crash_error() -> StorageError {
        StorageError::Io(io::Error::other("simulated crash"))
    }
}

impl<B: StorageBackend> StorageBackend for CrashableBackend<B> {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        self.inner.read_at(offset, len)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        if self.state.crashed.load(Ordering::SeqCst) {
            return Err(Self::crash_error());
        }
        let tear_at = self.state.tear_at.swap(usize::MAX, Ordering::SeqCst);
        if tear_at < data.len() {
            if tear_at > 0 {
                self.inner.append(&data[..tear_at])?;
            }
            return Err(Self::crash_error());
        }
        let budget = self.state.budget.load(Ordering::SeqCst);
        if data.len() <= budget {
            self.state.budget.store(budget.saturating_sub(data.len()), Ordering::SeqCst);
            return self.inner.append(data);
        }

        if budget > 0 {
            self.inner.append(&data[..budget])?;
        }
        self.state.budget.store(0, Ordering::SeqCst);
        self.state.crashed.store(true, Ordering::SeqCst);
        Err(Self::crash_error())
    }

    fn flush(&mut self) -> StorageResult<()> {
        if self.state.fail_on_sync.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("simulated flush failure".into()));
        }
        self.inner.flush()
    }

    fn size(&self) -> StorageResult<u64> {
        self.inner.size()
    }

    fn sync(&mut self) -> StorageResult<()> {
        if self.state.fail_on_sync.load(Ordering::SeqCst) {
            return Err(StorageError::Unavailable("simulated sync failure".into()));
        }
        self.inner.sync()
    }

    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        let refused = self
            .state
            .refused_truncates
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if refused || self.state.crashed.load(Ordering::SeqCst) {
            return Err(Self::crash_error());
        }
        self.inner.truncate(new_size)
    }
}
