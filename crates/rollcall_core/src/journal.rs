//! The durable authority store.
//!
//! Every commit is one frame appended to a [`StorageBackend`]; opening the
//! store replays the frames into memory.
//!
//! ## Frame Format
//!
//! ```text
//! | magic (4) | version (2) | type (1) | length (4) | payload (N) | crc32 (4) |
//! ```
//!
//! The payload is a CBOR [`CommitFrame`]: the accepted rows of one push, with
//! their authority stamps, plus the catalog entries written alongside them.
//! The CRC covers everything before it.
//!
//! ## Recovery Policy
//!
//! - **Torn tail** (incomplete header or payload at the end): a crash during
//!   an append. The partial frame is cut off and the commit it carried was
//!   never acknowledged.
//! - **CRC mismatch, bad magic, unknown version or type, sequence gap,
//!   undecodable payload**: the store refuses to open.
//!
//! ## Invariants
//!
//! - a frame is durable before its rows become visible in memory
//! - a failed append is rolled back, so a later frame never follows garbage
//! - replay is deterministic: the same journal always yields the same state

use crate::adapter::StoredEntity;
use crate::catalog::CatalogEntry;
use crate::clock::Clock;
use crate::config::StoreConfig;
use crate::cursor::Cursor;
use crate::error::{CoreError, CoreResult};
use crate::resolver::Candidate;
use crate::store::{AuthorityStore, CommitOutcome, StoreState, StoreStats};
use parking_lot::RwLock;
use rollcall_protocol::{Record, RecordBatch};
use rollcall_storage::{FileBackend, StorageBackend};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Magic bytes opening every frame.
pub const JOURNAL_MAGIC: [u8; 4] = *b"RCJL";

/// Current frame format version.
pub const JOURNAL_VERSION: u16 = 1;

/// magic (4) + version (2) + type (1) + length (4) = 11 bytes
const HEADER_SIZE: usize = 11;

const CRC_SIZE: usize = 4;

const FRAME_COMMIT: u8 = 1;

/// Payload of one journal frame.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitFrame {
    /// Position in the journal, starting at 1.
    pub sequence: u64,
    /// Stamped rows, in the order they were applied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<RecordBatch>,
    /// Catalog entries written in the same commit.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub catalog: Vec<CatalogEntry>,
}

/// Encodes a frame with its envelope.
///
/// # Errors
///
/// Fails if the payload cannot be encoded or exceeds 4 GiB.
pub fn encode_frame(frame: &CommitFrame) -> CoreResult<Vec<u8>> {
    let mut payload = Vec::new();
    ciborium::into_writer(frame, &mut payload).map_err(CoreError::codec)?;
    let len = u32::try_from(payload.len())
        .map_err(|_| CoreError::validation("journal frame payload too large"))?;

    let mut data = Vec::with_capacity(HEADER_SIZE + payload.len() + CRC_SIZE);
    data.extend_from_slice(&JOURNAL_MAGIC);
    data.extend_from_slice(&JOURNAL_VERSION.to_le_bytes());
    data.push(FRAME_COMMIT);
    data.extend_from_slice(&len.to_le_bytes());
    data.extend_from_slice(&payload);

    let crc = compute_crc32(&data);
    data.extend_from_slice(&crc.to_le_bytes());
    Ok(data)
}

/// Frames read from a journal image.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameScan {
    /// Complete frames in order.
    pub frames: Vec<CommitFrame>,
    /// Bytes covered by complete frames.
    pub valid_len: u64,
    /// Bytes of an incomplete trailing frame.
    pub torn_bytes: u64,
}

/// Parses every complete frame in `bytes`.
///
/// # Errors
///
/// Fails on any fatal condition of the recovery policy.
pub fn scan_frames(bytes: &[u8]) -> CoreResult<FrameScan> {
    let mut frames = Vec::new();
    let mut offset = 0usize;

    while offset < bytes.len() {
        let rest = &bytes[offset..];
        if rest.len() < HEADER_SIZE {
            break;
        }

        if rest[0..4] != JOURNAL_MAGIC {
            return Err(CoreError::journal_corruption(format!(
                "invalid magic at offset {offset}"
            )));
        }
        let version = u16::from_le_bytes([rest[4], rest[5]]);
        if version > JOURNAL_VERSION {
            return Err(CoreError::journal_corruption(format!(
                "unsupported version {version} at offset {offset}"
            )));
        }
        if rest[6] != FRAME_COMMIT {
            return Err(CoreError::journal_corruption(format!(
                "unknown frame type {} at offset {offset}",
                rest[6]
            )));
        }

        let len = u32::from_le_bytes([rest[7], rest[8], rest[9], rest[10]]) as usize;
        let total = HEADER_SIZE + len + CRC_SIZE;
        if rest.len() < total {
            break;
        }

        let body_end = HEADER_SIZE + len;
        let expected = u32::from_le_bytes([
            rest[body_end],
            rest[body_end + 1],
            rest[body_end + 2],
            rest[body_end + 3],
        ]);
        let actual = compute_crc32(&rest[..body_end]);
        if expected != actual {
            return Err(CoreError::ChecksumMismatch { expected, actual });
        }

        let frame: CommitFrame = ciborium::from_reader(&rest[HEADER_SIZE..body_end])
            .map_err(|e| {
                CoreError::journal_corruption(format!("undecodable frame at offset {offset}: {e}"))
            })?;
        let wanted = frames.len() as u64 + 1;
        if frame.sequence != wanted {
            return Err(CoreError::journal_corruption(format!(
                "frame at offset {offset} has sequence {}, expected {wanted}",
                frame.sequence
            )));
        }

        frames.push(frame);
        offset += total;
    }

    Ok(FrameScan {
        frames,
        valid_len: offset as u64,
        torn_bytes: (bytes.len() - offset) as u64,
    })
}

/// Summary of a read-only journal check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct JournalReport {
    /// Complete frames.
    pub frames: u64,
    /// Bytes covered by complete frames.
    pub valid_bytes: u64,
    /// Bytes of a torn trailing frame, which opening the store would cut.
    pub torn_bytes: u64,
    /// Counters of the state the frames replay to.
    pub stats: StoreStats,
}

/// Reads and replays a journal without changing it.
///
/// # Errors
///
/// Fails on I/O errors or any fatal corruption.
pub fn verify_journal<B: StorageBackend>(backend: &B) -> CoreResult<JournalReport> {
    let scan = scan_frames(&read_all(backend)?)?;
    let frames = scan.frames.len() as u64;
    let mut state = StoreState::default();
    for frame in scan.frames {
        replay(&mut state, frame)?;
    }
    Ok(JournalReport {
        frames,
        valid_bytes: scan.valid_len,
        torn_bytes: scan.torn_bytes,
        stats: state.stats(),
    })
}

fn read_all<B: StorageBackend>(backend: &B) -> CoreResult<Vec<u8>> {
    let size = backend.size()?;
    if size == 0 {
        return Ok(Vec::new());
    }
    let len = usize::try_from(size)
        .map_err(|_| CoreError::journal_corruption("journal larger than address space"))?;
    Ok(backend.read_at(0, len)?)
}

fn replay(state: &mut StoreState, frame: CommitFrame) -> CoreResult<()> {
    if let Some(rows) = frame.rows {
        state.restore(rows)?;
    }
    state.put_catalog(frame.catalog);
    Ok(())
}

/// Append side of the journal.
struct Journal<B> {
    backend: B,
    sync_on_commit: bool,
    frames: u64,
    /// Offset of bytes left behind by a failed append whose rollback failed.
    dirty_from: Option<u64>,
}

impl<B: StorageBackend> Journal<B> {
    /// Appends a frame, rolling the backend back if any step fails.
    ///
    /// A frame is never written behind unrolled garbage: while a rollback is
    /// outstanding every append retries it first and fails as unavailable
    /// until it succeeds.
    fn append(
        &mut self,
        rows: Option<RecordBatch>,
        catalog: Vec<CatalogEntry>,
    ) -> CoreResult<u64> {
        self.clear_dirty_tail()?;

        let frame = CommitFrame {
            sequence: self.frames + 1,
            rows,
            catalog,
        };
        let data = encode_frame(&frame)?;
        let start = self.backend.size()?;

        if let Err(e) = self.write_durably(&data) {
            if let Err(rollback) = self.backend.truncate(start) {
                warn!(
                    error = %rollback,
                    offset = start,
                    "could not roll back failed journal append"
                );
                self.dirty_from = Some(start);
            }
            return Err(e);
        }

        self.frames = frame.sequence;
        debug!(
            sequence = frame.sequence,
            offset = start,
            bytes = data.len(),
            "journal frame written"
        );
        Ok(start)
    }

    fn clear_dirty_tail(&mut self) -> CoreResult<()> {
        let Some(offset) = self.dirty_from else {
            return Ok(());
        };
        self.backend.truncate(offset).map_err(|e| {
            CoreError::unavailable(format!(
                "journal holds an unrolled tail at offset {offset}: {e}"
            ))
        })?;
        self.dirty_from = None;
        debug!(offset, "unrolled journal tail cut");
        Ok(())
    }

    fn write_durably(&mut self, data: &[u8]) -> CoreResult<()> {
        self.backend.append(data)?;
        if self.sync_on_commit {
            self.backend.sync()?;
        } else {
            self.backend.flush()?;
        }
        Ok(())
    }
}

struct Inner<B> {
    state: StoreState,
    journal: Journal<B>,
}

/// An authority store persisted as a journal of commit frames.
///
/// # Example
///
/// ```rust
/// use rollcall_core::{JournalStore, StoreConfig};
/// use rollcall_storage::InMemoryBackend;
///
/// let backend = InMemoryBackend::new();
/// let store = JournalStore::open(backend.handle(), StoreConfig::default()).unwrap();
/// drop(store);
/// let reopened = JournalStore::open(backend, StoreConfig::default()).unwrap();
/// assert_eq!(reopened.frames(), 0);
/// ```
pub struct JournalStore<B: StorageBackend> {
    inner: RwLock<Inner<B>>,
}

impl JournalStore<FileBackend> {
    /// Opens (or creates) a journal file.
    ///
    /// # Errors
    ///
    /// Fails if the file cannot be opened or the journal is corrupt.
    pub fn open_file(path: &Path, config: StoreConfig) -> CoreResult<Self> {
        let backend = FileBackend::open_with_create_dirs(path)?;
        Self::open(backend, config)
    }
}

impl<B: StorageBackend> JournalStore<B> {
    /// Opens a store over `backend`, replaying its journal.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors, on fatal corruption, and on a torn tail when
    /// [`StoreConfig::repair_torn_tail`] is off.
    pub fn open(mut backend: B, config: StoreConfig) -> CoreResult<Self> {
        let bytes = read_all(&backend)?;
        let scan = scan_frames(&bytes)?;

        if scan.torn_bytes > 0 {
            if !config.repair_torn_tail {
                return Err(CoreError::journal_corruption(format!(
                    "torn frame of {} bytes at offset {}",
                    scan.torn_bytes, scan.valid_len
                )));
            }
            warn!(
                offset = scan.valid_len,
                bytes = scan.torn_bytes,
                "discarding torn journal tail"
            );
            backend.truncate(scan.valid_len)?;
        }

        let frames = scan.frames.len() as u64;
        let mut state = StoreState::default();
        for frame in scan.frames {
            replay(&mut state, frame)?;
        }
        info!(frames, bytes = scan.valid_len, "journal replayed");

        Ok(Self {
            inner: RwLock::new(Inner {
                state,
                journal: Journal {
                    backend,
                    sync_on_commit: config.sync_on_commit,
                    frames,
                    dirty_from: None,
                },
            }),
        })
    }

    /// Number of frames in the journal.
    pub fn frames(&self) -> u64 {
        self.inner.read().journal.frames
    }

    /// A copy of the in-memory state.
    pub fn snapshot(&self) -> StoreState {
        self.inner.read().state.clone()
    }
}

impl<B: StorageBackend> AuthorityStore for JournalStore<B> {
    fn commit<E: StoredEntity>(
        &self,
        candidates: Vec<Candidate<E>>,
        clock: &dyn Clock,
    ) -> CoreResult<CommitOutcome> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        let plan = inner.state.plan_commit(candidates, clock);
        if !plan.is_noop() {
            inner.journal.append(plan.batch(), plan.catalog.clone())?;
        }
        Ok(inner.state.apply(plan))
    }

    fn fetch<E: StoredEntity>(&self, key: &E::Key) -> CoreResult<Option<Record<E>>> {
        Ok(self.inner.read().state.fetch::<E>(key))
    }

    fn scan<E: StoredEntity>(
        &self,
        after: Option<&Cursor<E::Key>>,
        limit: usize,
    ) -> CoreResult<Vec<Record<E>>> {
        Ok(self.inner.read().state.scan::<E>(after, limit))
    }

    fn catalog(&self) -> CoreResult<Vec<CatalogEntry>> {
        Ok(self.inner.read().state.catalog())
    }

    fn refresh_catalog(&self) -> CoreResult<Vec<CatalogEntry>> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        let added = inner.state.plan_refresh();
        if !added.is_empty() {
            inner.journal.append(None, added.clone())?;
            inner.state.put_catalog(added.clone());
        }
        Ok(added)
    }

    fn upsert_catalog_metadata(&self, entry: CatalogEntry) -> CoreResult<CatalogEntry> {
        let mut guard = self.inner.write();
        let inner = &mut *guard;
        let merged = inner.state.plan_metadata(entry);
        inner.journal.append(None, vec![merged.clone()])?;
        inner.state.put_catalog(vec![merged.clone()]);
        Ok(merged)
    }

    fn stats(&self) -> CoreResult<StoreStats> {
        let inner = self.inner.read();
        let mut stats = inner.state.stats();
        stats.journal_bytes = Some(inner.journal.backend.size()?);
        stats.journal_frames = Some(inner.journal.frames);
        Ok(stats)
    }
}

/// CRC32 (IEEE polynomial).
pub fn compute_crc32(data: &[u8]) -> u32 {
    const CRC32_TABLE: [u32; 256] = {
        let mut table = [0u32; 256];
        let mut i = 0;
        while i < 256 {
            let mut crc = i as u32;
            let mut j = 0;
            while j < 8 {
                if crc & 1 != 0 {
                    crc = (crc >> 1) ^ 0xEDB8_8320;
                } else {
                    crc >>= 1;
                }
                j += 1;
            }
            table[i] = crc;
            i += 1;
        }
        table
    };

    let mut crc = 0xFFFF_FFFF_u32;
    for &byte in data {
        let index = ((crc ^ u32::from(byte)) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC32_TABLE[index];
    }
    !crc
}
