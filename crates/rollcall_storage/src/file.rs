//! File-backed storage for the authority journal.

use crate::backend::StorageBackend;
use crate::error::{StorageError, StorageResult};
use parking_lot::Mutex;
use std::fs::{File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::Path;

#[derive(Debug)]
struct JournalFile {
    file: File,
    /// Logical end of the journal; writes always land here.
    len: u64,
}

/// A journal file on the local file system.
///
/// The authority store opens it writable and relies on `sync`
/// (`File::sync_all`) before acknowledging a push. Inspection tools open it
/// with [`FileBackend::open_read_only`], which never creates or modifies the
/// file.
///
/// ```no_run
/// use rollcall_storage::{FileBackend, StorageBackend};
/// use std::path::Path;
///
/// let mut backend = FileBackend::open(Path::new("authority.journal")).unwrap();
/// backend.append(b"frame").unwrap();
/// backend.sync().unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    journal: Mutex<JournalFile>,
    writable: bool,
}

impl FileBackend {
    /// Opens the journal at `path` for appending, creating it when missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or created.
    pub fn open(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(path)?;
        Self::wrap(file, true)
    }

    /// Like [`FileBackend::open`], creating missing parent directories first.
    ///
    /// # Errors
    ///
    /// Returns an error if the directories or the file cannot be created.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    /// Opens an existing journal for reading only.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or cannot be read.
    pub fn open_read_only(path: &Path) -> StorageResult<Self> {
        let file = OpenOptions::new().read(true).open(path)?;
        Self::wrap(file, false)
    }

    fn wrap(file: File, writable: bool) -> StorageResult<Self> {
        let len = file.metadata()?.len();
        Ok(Self {
            journal: Mutex::new(JournalFile { file, len }),
            writable,
        })
    }

    fn check_writable(&self) -> StorageResult<()> {
        if self.writable {
            Ok(())
        } else {
            Err(StorageError::Unavailable("journal opened read-only".into()))
        }
    }
}

impl StorageBackend for FileBackend {
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
        let mut journal = self.journal.lock();
        let size = journal.len;
        if offset.saturating_add(len as u64) > size {
            return Err(StorageError::ReadPastEnd { offset, len, size });
        }

        let mut buffer = vec![0u8; len];
        if len > 0 {
            journal.file.seek(SeekFrom::Start(offset))?;
            journal.file.read_exact(&mut buffer)?;
        }
        Ok(buffer)
    }

    fn append(&mut self, data: &[u8]) -> StorageResult<u64> {
        self.check_writable()?;
        let journal = self.journal.get_mut();
        let offset = journal.len;
        journal.file.seek(SeekFrom::Start(offset))?;
        journal.file.write_all(data)?;
        journal.len += data.len() as u64;
        Ok(offset)
    }

    fn flush(&mut self) -> StorageResult<()> {
        self.journal.get_mut().file.flush()?;
        Ok(())
    }

    fn size(&self) -> StorageResult<u64> {
        Ok(self.journal.lock().len)
    }

    fn sync(&mut self) -> StorageResult<()> {
        self.journal.get_mut().file.sync_all()?;
        Ok(())
    }

    /// Cuts the journal back to `new_size` and syncs, so a torn frame cannot
    /// reappear after a restart.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
        self.check_writable()?;
        let journal = self.journal.get_mut();
        if new_size > journal.len {
            return Err(StorageError::TruncatePastEnd {
                requested: new_size,
                size: journal.len,
            });
        }

        journal.file.set_len(new_size)?;
        journal.file.sync_all()?;
        journal.len = new_size;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_append_read() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("authority.journal");

        let mut backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.size().unwrap(), 0);
        assert_eq!(backend.append(b"hello").unwrap(), 0);
        assert_eq!(backend.append(b" world").unwrap(), 5);
        assert_eq!(backend.read_at(0, 11).unwrap(), b"hello world");
    }

    #[test]
    fn survives_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("authority.journal");
        {
            let mut backend = FileBackend::open(&path).unwrap();
            backend.append(b"durable").unwrap();
            backend.sync().unwrap();
        }

        let backend = FileBackend::open(&path).unwrap();
        assert_eq!(backend.size().unwrap(), 7);
        assert_eq!(backend.read_at(0, 7).unwrap(), b"durable");
    }

    #[test]
    fn truncate_then_append() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("authority.journal");
        let mut backend = FileBackend::open(&path).unwrap();
        backend.append(b"goodtorn").unwrap();

        backend.truncate(4).unwrap();
        assert_eq!(backend.append(b"!").unwrap(), 4);
        assert_eq!(backend.read_at(0, 5).unwrap(), b"good!");
        assert!(backend.truncate(100).is_err());
    }

    #[test]
    fn nested_directories_are_created() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("srv").join("rollcall").join("authority.journal");
        let backend = FileBackend::open_with_create_dirs(&path).unwrap();
        assert!(path.exists());
        assert_eq!(backend.size().unwrap(), 0);
    }

    #[test]
    fn read_only_never_creates_or_writes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("authority.journal");
        assert!(FileBackend::open_read_only(&path).is_err());
        assert!(!path.exists());

        {
            let mut backend = FileBackend::open(&path).unwrap();
            backend.append(b"frame").unwrap();
        }
        let mut reader = FileBackend::open_read_only(&path).unwrap();
        assert_eq!(reader.read_at(0, 5).unwrap(), b"frame");
        assert!(matches!(reader.append(b"x"), Err(StorageError::Unavailable(_))));
        assert!(reader.truncate(0).is_err());
        assert_eq!(std::fs::read(&path).unwrap(), b"frame");
    }
}
