//! The authority store interface and its in-memory implementation.

use crate::adapter::{StoredEntity, Tables};
use crate::catalog::CatalogEntry;
use crate::clock::Clock;
use crate::cursor::Cursor;
use crate::error::{CoreError, CoreResult};
use crate::resolver::{self, Candidate, Resolution};
use parking_lot::RwLock;
use rollcall_protocol::{
    AttendanceRecord, EntityKind, Record, RecordBatch, Student, SyncEntity, TimetableSlot,
    Timestamp,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};

/// Authoritative state shared by every client.
///
/// # Invariants
///
/// - `commit` decides and writes a whole batch under one exclusive lock, so
///   no write can slip between a version check and its write
/// - stamps are assigned under that lock and strictly increase per store,
///   so commit order equals `last_modified` order
/// - a failed commit leaves no trace
pub trait AuthorityStore: Send + Sync {
    /// Conditionally upserts `candidates` in order, each against the state
    /// left by the ones before it, and adds the catalog entries accepted rows
    /// imply.
    ///
    /// # Errors
    ///
    /// Fails with a retryable error when the write cannot be made durable;
    /// nothing from the batch is applied in that case.
    fn commit<E: StoredEntity>(
        &self,
        candidates: Vec<Candidate<E>>,
        clock: &dyn Clock,
    ) -> CoreResult<CommitOutcome>;

    /// Row stored under `key`, tombstones included.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn fetch<E: StoredEntity>(&self, key: &E::Key) -> CoreResult<Option<Record<E>>>;

    /// Up to `limit` rows positioned strictly after `after`, ascending by
    /// `(last_modified, key)`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn scan<E: StoredEntity>(
        &self,
        after: Option<&Cursor<E::Key>>,
        limit: usize,
    ) -> CoreResult<Vec<Record<E>>>;

    /// All catalog entries in key order.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn catalog(&self) -> CoreResult<Vec<CatalogEntry>>;

    /// Derives catalog entries from the whole timetable and returns the ones
    /// added.
    ///
    /// # Errors
    ///
    /// Fails when the additions cannot be made durable.
    fn refresh_catalog(&self) -> CoreResult<Vec<CatalogEntry>>;

    /// Sets the display name (and type, when given) of a catalog entry,
    /// creating it if needed. Returns the stored entry.
    ///
    /// # Errors
    ///
    /// Fails when the change cannot be made durable.
    fn upsert_catalog_metadata(&self, entry: CatalogEntry) -> CoreResult<CatalogEntry>;

    /// Counts and stamps for inspection.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn stats(&self) -> CoreResult<StoreStats>;
}

/// Result of a committed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommitOutcome {
    /// One resolution per candidate, in input order.
    pub resolutions: Vec<Resolution>,
    /// Catalog entries added alongside the rows.
    pub catalog_added: usize,
}

/// Per-collection counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CollectionStats {
    /// Collection.
    pub kind: EntityKind,
    /// Rows, tombstones included.
    pub rows: usize,
    /// Tombstones.
    pub tombstones: usize,
    /// Highest stamp in the collection.
    pub latest_stamp: Option<Timestamp>,
}

/// Store-wide counters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoreStats {
    /// One entry per collection.
    pub collections: Vec<CollectionStats>,
    /// Catalog entries.
    pub catalog_entries: usize,
    /// Highest stamp the store has handed out.
    pub last_stamp: Timestamp,
    /// Journal size in bytes, for journaled stores.
    pub journal_bytes: Option<u64>,
    /// Commit frames in the journal, for journaled stores.
    pub journal_frames: Option<u64>,
}

/// Rows and catalog changes a commit will write, decided but not applied.
#[derive(Debug, Clone)]
pub(crate) struct CommitPlan<E: SyncEntity> {
    pub(crate) resolutions: Vec<Resolution>,
    pub(crate) rows: Vec<(E::Key, Record<E>)>,
    pub(crate) catalog: Vec<CatalogEntry>,
    pub(crate) last_stamp: Timestamp,
}

impl<E: SyncEntity> CommitPlan<E> {
    /// True when applying the plan changes nothing.
    pub(crate) fn is_noop(&self) -> bool {
        self.rows.is_empty() && self.catalog.is_empty()
    }

    /// Accepted rows as a wire batch.
    pub(crate) fn batch(&self) -> Option<RecordBatch> {
        if self.rows.is_empty() {
            return None;
        }
        Some(E::into_batch(
            self.rows.iter().map(|(_, row)| row.clone()).collect(),
        ))
    }
}

/// In-memory tables plus the stamp high-water mark.
///
/// Both store implementations keep one of these behind their lock. Commits
/// are split into a pure planning step and an infallible apply step so a
/// durable store can write its journal in between.
#[derive(Debug, Clone)]
pub struct StoreState {
    tables: Tables,
    last_stamp: Timestamp,
}

impl Default for StoreState {
    fn default() -> Self {
        Self {
            tables: Tables::default(),
            last_stamp: Timestamp::EPOCH,
        }
    }
}

impl StoreState {
    /// The tables.
    pub fn tables(&self) -> &Tables {
        &self.tables
    }

    /// Highest stamp handed out.
    pub fn last_stamp(&self) -> Timestamp {
        self.last_stamp
    }

    pub(crate) fn plan_commit<E: StoredEntity>(
        &self,
        candidates: Vec<Candidate<E>>,
        clock: &dyn Clock,
    ) -> CommitPlan<E> {
        let table = E::table(&self.tables);
        let mut staged: BTreeMap<E::Key, Record<E>> = BTreeMap::new();
        let mut last_stamp = self.last_stamp;
        let mut resolutions = Vec::with_capacity(candidates.len());
        let mut rows = Vec::new();

        for Candidate { key, record } in candidates {
            let stored = staged.get(&key).or_else(|| table.get(&key));
            let resolution = resolver::resolve(&record, stored);
            if resolution.is_accepted() {
                let at = clock.now().max(last_stamp.successor());
                last_stamp = at;
                let row = resolver::stamp(record, stored, at);
                staged.insert(key.clone(), row.clone());
                rows.push((key, row));
            }
            resolutions.push(resolution);
        }

        let catalog = E::derive_catalog(rows.iter().map(|(_, row)| row), &self.tables.catalog);
        CommitPlan {
            resolutions,
            rows,
            catalog,
            last_stamp,
        }
    }

    pub(crate) fn apply<E: StoredEntity>(&mut self, plan: CommitPlan<E>) -> CommitOutcome {
        let table = E::table_mut(&mut self.tables);
        for (key, row) in plan.rows {
            table.put(key, row);
        }
        self.last_stamp = self.last_stamp.max(plan.last_stamp);

        let catalog_added = plan.catalog.len();
        self.put_catalog(plan.catalog);
        CommitOutcome {
            resolutions: plan.resolutions,
            catalog_added,
        }
    }

    pub(crate) fn plan_refresh(&self) -> Vec<CatalogEntry> {
        self.tables
            .catalog
            .missing_for(self.tables.slots.iter().map(|(_, row)| row))
    }

    pub(crate) fn plan_metadata(&self, entry: CatalogEntry) -> CatalogEntry {
        self.tables.catalog.merged(entry)
    }

    pub(crate) fn put_catalog(&mut self, entries: Vec<CatalogEntry>) {
        for entry in entries {
            self.tables.catalog.put(entry);
        }
    }

    /// Writes already-stamped rows back, as read from a journal.
    pub(crate) fn restore(&mut self, batch: RecordBatch) -> CoreResult<()> {
        match batch {
            RecordBatch::Students(rows) => self.restore_rows::<Student>(rows),
            RecordBatch::TimetableSlots(rows) => self.restore_rows::<TimetableSlot>(rows),
            RecordBatch::Attendance(rows) => self.restore_rows::<AttendanceRecord>(rows),
        }
    }

    fn restore_rows<E: StoredEntity>(&mut self, rows: Vec<Record<E>>) -> CoreResult<()> {
        for row in rows {
            let key = row.key().ok_or_else(|| {
                CoreError::journal_corruption(format!("{} row without identity", E::KIND))
            })?;
            if let Some(at) = row.last_modified {
                self.last_stamp = self.last_stamp.max(at);
            }
            E::table_mut(&mut self.tables).put(key, row);
        }
        Ok(())
    }

    pub(crate) fn fetch<E: StoredEntity>(&self, key: &E::Key) -> Option<Record<E>> {
        E::table(&self.tables).get(key).cloned()
    }

    pub(crate) fn scan<E: StoredEntity>(
        &self,
        after: Option<&Cursor<E::Key>>,
        limit: usize,
    ) -> Vec<Record<E>> {
        E::table(&self.tables).scan_after(after, limit)
    }

    pub(crate) fn catalog(&self) -> Vec<CatalogEntry> {
        self.tables.catalog.entries().cloned().collect()
    }

    /// Counters without journal figures.
    pub fn stats(&self) -> StoreStats {
        StoreStats {
            collections: vec![
                collection_stats(&self.tables, EntityKind::Student),
                collection_stats(&self.tables, EntityKind::TimetableSlot),
                collection_stats(&self.tables, EntityKind::Attendance),
            ],
            catalog_entries: self.tables.catalog.len(),
            last_stamp: self.last_stamp,
            journal_bytes: None,
            journal_frames: None,
        }
    }
}

fn collection_stats(tables: &Tables, kind: EntityKind) -> CollectionStats {
    fn of<E: StoredEntity>(tables: &Tables) -> CollectionStats {
        let table = tables.table::<E>();
        CollectionStats {
            kind: E::KIND,
            rows: table.len(),
            tombstones: table.tombstones(),
            latest_stamp: table.latest_stamp(),
        }
    }

    match kind {
        EntityKind::Student => of::<Student>(tables),
        EntityKind::TimetableSlot => of::<TimetableSlot>(tables),
        EntityKind::Attendance => of::<AttendanceRecord>(tables),
    }
}

/// A volatile authority store.
///
/// Used by tests and as the reference the journaled store is checked
/// against. [`MemoryStore::set_unavailable`] makes every write fail with a
/// retryable error, which is how tests exercise the no-partial-state rule.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
    unavailable: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes writes fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> StoreState {
        self.state.read().clone()
    }

    fn check_available(&self) -> CoreResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            Err(CoreError::unavailable("memory store is switched off"))
        } else {
            Ok(())
        }
    }
}

impl AuthorityStore for MemoryStore {
    fn commit<E: StoredEntity>(
        &self,
        candidates: Vec<Candidate<E>>,
        clock: &dyn Clock,
    ) -> CoreResult<CommitOutcome> {
        let mut state = self.state.write();
        self.check_available()?;
        let plan = state.plan_commit(candidates, clock);
        Ok(state.apply(plan))
    }

    fn fetch<E: StoredEntity>(&self, key: &E::Key) -> CoreResult<Option<Record<E>>> {
        Ok(self.state.read().fetch::<E>(key))
    }

    fn scan<E: StoredEntity>(
        &self,
        after: Option<&Cursor<E::Key>>,
        limit: usize,
    ) -> CoreResult<Vec<Record<E>>> {
        Ok(self.state.read().scan::<E>(after, limit))
    }

    fn catalog(&self) -> CoreResult<Vec<CatalogEntry>> {
        Ok(self.state.read().catalog())
    }

    fn refresh_catalog(&self) -> CoreResult<Vec<CatalogEntry>> {
        let mut state = self.state.write();
        self.check_available()?;
        let added = state.plan_refresh();
        state.put_catalog(added.clone());
        Ok(added)
    }

    fn upsert_catalog_metadata(&self, entry: CatalogEntry) -> CoreResult<CatalogEntry> {
        let mut state = self.state.write();
        self.check_available()?;
        let merged = state.plan_metadata(entry);
        state.put_catalog(vec![merged.clone()]);
        Ok(merged)
    }

    fn stats(&self) -> CoreResult<StoreStats> {
        Ok(self.state.read().stats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::resolver::Acceptance;
    use rollcall_protocol::StudentKey;

    fn candidate(sbrn: &str, name: &str, version: u64) -> Candidate<Student> {
        Candidate::new(Record::new(Student::new(sbrn, name), version)).unwrap()
    }

    #[test]
    fn stamps_strictly_increase_even_if_clock_stalls() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(Timestamp::from_micros(1_000));
        store
            .commit(vec![candidate("A", "a", 1), candidate("B", "b", 1)], &clock)
            .unwrap();
        clock.set(Timestamp::from_micros(10));
        store.commit(vec![candidate("C", "c", 1)], &clock).unwrap();

        let rows = store.scan::<Student>(None, 10).unwrap();
        let stamps: Vec<_> = rows.iter().map(|r| r.last_modified.unwrap()).collect();
        assert_eq!(
            stamps,
            [1_000, 1_001, 1_002].map(Timestamp::from_micros).to_vec()
        );
    }

    #[test]
    fn later_candidate_in_batch_sees_earlier_one() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(Timestamp::from_micros(1));
        let outcome = store
            .commit(
                vec![
                    candidate("A", "v2", 2),
                    candidate("A", "v1", 1),
                    candidate("A", "v3", 3),
                ],
                &clock,
            )
            .unwrap();
        assert_eq!(
            outcome.resolutions,
            vec![
                Resolution::Accepted(Acceptance::Created),
                Resolution::Stale { stored_version: 2 },
                Resolution::Accepted(Acceptance::Updated),
            ]
        );
        let row = store.fetch::<Student>(&StudentKey("A".into())).unwrap().unwrap();
        assert_eq!(row.entity.name, "v3");
        assert_eq!(store.scan::<Student>(None, 10).unwrap().len(), 1);
    }

    #[test]
    fn unavailable_store_writes_nothing() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(Timestamp::from_micros(1));
        store.set_unavailable(true);
        let err = store.commit(vec![candidate("A", "a", 1)], &clock).unwrap_err();
        assert!(err.is_retryable());
        assert!(store.scan::<Student>(None, 10).unwrap().is_empty());
        assert_eq!(store.stats().unwrap().last_stamp, Timestamp::EPOCH);

        store.set_unavailable(false);
        store.commit(vec![candidate("A", "a", 1)], &clock).unwrap();
        assert_eq!(store.scan::<Student>(None, 10).unwrap().len(), 1);
    }

    #[test]
    fn slot_commit_derives_catalog() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(Timestamp::from_micros(1));
        let slot = TimetableSlot::new("CSE", "3", "A", "Monday", 1, "CS301");
        let outcome = store
            .commit(vec![Candidate::new(Record::new(slot, 1)).unwrap()], &clock)
            .unwrap();
        assert_eq!(outcome.catalog_added, 1);
        assert_eq!(store.catalog().unwrap()[0].subject_id, "CS301");
        assert!(store.refresh_catalog().unwrap().is_empty());
    }

    #[test]
    fn stats_count_rows_and_tombstones() {
        let store = MemoryStore::new();
        let clock = ManualClock::new(Timestamp::from_micros(1));
        store.commit(vec![candidate("A", "a", 1)], &clock).unwrap();
        let tomb = Candidate::new(Record::tombstone(Student::new("A", "a"), 2)).unwrap();
        store.commit(vec![tomb], &clock).unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.collections[0].rows, 1);
        assert_eq!(stats.collections[0].tombstones, 1);
        assert_eq!(stats.collections[1].rows, 0);
        assert_eq!(stats.journal_bytes, None);
    }
}
