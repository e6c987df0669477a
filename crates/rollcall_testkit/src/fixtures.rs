//! Sample data and store helpers.

use chrono::NaiveDate;
use rollcall_core::{JournalStore, MemoryStore, StoreConfig, SyncEngine};
use rollcall_protocol::{AttendanceRecord, Record, Student, Timestamp, TimetableSlot};
use rollcall_storage::FileBackend;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

pub use rollcall_core::ManualClock;

/// The instant every fixture clock starts at.
pub const FIXTURE_START: &str = "2024-02-05T09:00:00Z";

/// Monday of the fixture week.
pub fn fixture_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 2, 5).unwrap_or_default()
}

/// A manual clock parked at [`FIXTURE_START`].
pub fn fixture_clock() -> Arc<ManualClock> {
    let start = Timestamp::parse(FIXTURE_START).unwrap_or(Timestamp::EPOCH);
    Arc::new(ManualClock::new(start))
}

/// Five CSE semester-3 students split across sections A and B, at version 1.
pub fn sample_students() -> Vec<Record<Student>> {
    [
        ("S001", "Alice", "A"),
        ("S002", "Bob", "A"),
        ("S003", "Chen", "A"),
        ("S004", "Dana", "B"),
        ("S005", "Eli", "B"),
    ]
    .into_iter()
    .map(|(sbrn, name, section)| {
        Record::new(Student::new(sbrn, name).enrolled("CSE", "3", section), 1)
    })
    .collect()
}

/// Monday timetable for CSE-3-A: two theory periods and a lab, at version 1.
pub fn sample_slots() -> Vec<Record<TimetableSlot>> {
    vec![
        Record::new(
            TimetableSlot::new("CSE", "3", "A", "Monday", 1, "CS301")
                .of_type("theory")
                .in_room("R101"),
            1,
        ),
        Record::new(
            TimetableSlot::new("CSE", "3", "A", "Monday", 2, "CS303").of_type("theory"),
            1,
        ),
        Record::new(
            TimetableSlot::new("CSE", "3", "A", "Monday", 3, "CS302L").of_type("lab"),
            1,
        ),
    ]
}

/// One CS301 mark for each section-A student on [`fixture_date`].
///
/// `absent` lists roll numbers marked absent.
pub fn sample_attendance(absent: &[&str]) -> Vec<Record<AttendanceRecord>> {
    ["S001", "S002", "S003"]
        .into_iter()
        .map(|sbrn| {
            let attended = !absent.contains(&sbrn);
            Record::new(
                AttendanceRecord::new(sbrn, "CS301", "3", "A", fixture_date(), attended),
                1,
            )
        })
        .collect()
}

/// An engine over a fresh [`MemoryStore`] with the fixture clock.
pub fn memory_engine() -> SyncEngine<MemoryStore> {
    SyncEngine::with_clock(MemoryStore::new(), fixture_clock())
}

/// A journal file in a temporary directory that can be reopened.
///
/// The directory lives as long as the `TestStore`.
pub struct TestStore {
    path: PathBuf,
    clock: Arc<ManualClock>,
    _temp_dir: TempDir,
}

impl TestStore {
    /// Creates an empty journal location.
    pub fn journal() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        Self {
            path: temp_dir.path().join("authority.journal"),
            clock: fixture_clock(),
            _temp_dir: temp_dir,
        }
    }

    /// Path of the journal file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The clock shared by every engine this store opens.
    pub fn clock(&self) -> &Arc<ManualClock> {
        &self.clock
    }

    /// Opens the journal, replaying whatever is on disk.
    pub fn open(&self) -> JournalStore<FileBackend> {
        JournalStore::open_file(&self.path, StoreConfig::default()).expect("Failed to open journal")
    }

    /// Opens an engine over the journal.
    ///
    /// Drop the engine before calling this again to simulate a restart.
    pub fn engine(&self) -> SyncEngine<JournalStore<FileBackend>> {
        SyncEngine::with_clock(self.open(), self.clock.clone())
    }

    /// Raw journal bytes.
    pub fn bytes(&self) -> Vec<u8> {
        std::fs::read(&self.path).unwrap_or_default()
    }

    /// Replaces the journal bytes, e.g. to plant a torn tail.
    pub fn write_bytes(&self, bytes: &[u8]) {
        std::fs::write(&self.path, bytes).expect("Failed to write journal");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_are_valid_and_distinct() {
        let engine = memory_engine();
        let report = engine.push_records(sample_students()).unwrap();
        assert_eq!((report.accepted, report.dropped), (5, 0));

        let report = engine.push_records(sample_slots()).unwrap();
        assert_eq!(report.accepted, 3);
        assert_eq!(report.catalog_added, 3);

        let report = engine.push_records(sample_attendance(&["S002"])).unwrap();
        assert_eq!(report.accepted, 3);
    }

    #[test]
    fn test_store_survives_reopen() {
        let store = TestStore::journal();
        store.engine().push_records(sample_students()).unwrap();

        let reopened = store.engine();
        assert_eq!(reopened.stats().unwrap().collections[0].rows, 5);
        assert!(!store.bytes().is_empty());
    }
}
