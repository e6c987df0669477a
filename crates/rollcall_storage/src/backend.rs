//! The backend trait the journal writes through.

use crate::error::StorageResult;

/// An append-only byte store.
///
/// The authority journal appends one self-delimiting commit frame per push
/// batch and reads the whole log back when a store is opened. Backends never
/// interpret those bytes.
///
/// # Invariants
///
/// - `append` returns the offset at which the data begins
/// - `read_at` returns exactly the bytes previously appended at that offset
/// - after `sync` returns, every appended byte survives process termination
/// - implementations are `Send + Sync` so one store can serve many requests
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Fails with [`crate::StorageError::ReadPastEnd`] when the range exceeds
    /// the current size, or with an I/O error.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends `data` and returns the offset where it was written.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Pushes buffered writes to the operating system.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Returns the current size in bytes, which is where the next append lands.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Makes all appended data and its metadata durable.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Cuts the store back to `new_size` bytes.
    ///
    /// The journal uses this to discard a torn trailing frame left by a crash
    /// in the middle of an append.
    ///
    /// # Errors
    ///
    /// Fails if `new_size` is larger than the current size or the I/O fails.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;
}
