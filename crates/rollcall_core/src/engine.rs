//! The sync engine facade.

use crate::adapter::StoredEntity;
use crate::catalog::CatalogEntry;
use crate::clock::{Clock, SystemClock};
use crate::config::EngineConfig;
use crate::error::CoreResult;
use crate::pull::{self, PullPage};
use crate::push::{self, PushReport};
use crate::store::{AuthorityStore, StoreStats};
use rollcall_protocol::{
    AttendanceRecord, EntityKind, PullRequest, PullResponse, Record, RecordBatch, Student,
    TimetableSlot,
};
use std::sync::Arc;
use tracing::info;

/// Push and pull over one authority store.
///
/// The engine holds no state between calls; everything lives in the store,
/// so one engine can serve any number of concurrent requests.
///
/// # Example
///
/// ```rust
/// use rollcall_core::{MemoryStore, SyncEngine};
/// use rollcall_protocol::{Record, RecordBatch, Student};
///
/// let engine = SyncEngine::new(MemoryStore::new());
/// let batch = RecordBatch::Students(vec![Record::new(Student::new("S001", "Alice"), 1)]);
/// assert_eq!(engine.push(batch).unwrap().accepted, 1);
///
/// let page = engine.pull_records::<Student>(None, None).unwrap();
/// assert_eq!(page.records.len(), 1);
/// ```
pub struct SyncEngine<S: AuthorityStore> {
    store: S,
    clock: Arc<dyn Clock>,
    config: EngineConfig,
}

impl<S: AuthorityStore> SyncEngine<S> {
    /// Creates an engine stamping with the system clock.
    pub fn new(store: S) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    /// Creates an engine stamping with `clock`.
    pub fn with_clock(store: S, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            clock,
            config: EngineConfig::default(),
        }
    }

    /// Replaces the limits.
    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// The underlying store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// The limits in force.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Merges a wire batch.
    ///
    /// # Errors
    ///
    /// See [`push::reconcile`].
    pub fn push(&self, batch: RecordBatch) -> CoreResult<PushReport> {
        match batch {
            RecordBatch::Students(records) => self.push_records::<Student>(records),
            RecordBatch::TimetableSlots(records) => self.push_records::<TimetableSlot>(records),
            RecordBatch::Attendance(records) => self.push_records::<AttendanceRecord>(records),
        }
    }

    /// Merges records of one type.
    ///
    /// # Errors
    ///
    /// See [`push::reconcile`].
    pub fn push_records<E: StoredEntity>(&self, records: Vec<Record<E>>) -> CoreResult<PushReport> {
        push::reconcile(&self.store, self.clock.as_ref(), &self.config, records)
    }

    /// Serves a wire pull request.
    ///
    /// # Errors
    ///
    /// See [`pull::reconcile`].
    pub fn pull(&self, request: &PullRequest) -> CoreResult<PullResponse> {
        let watermark = request.watermark.as_deref();
        let limit = request.limit.map(|n| n as usize);
        match request.kind {
            EntityKind::Student => Ok(self
                .pull_records::<Student>(watermark, limit)?
                .into_response()),
            EntityKind::TimetableSlot => Ok(self
                .pull_records::<TimetableSlot>(watermark, limit)?
                .into_response()),
            EntityKind::Attendance => Ok(self
                .pull_records::<AttendanceRecord>(watermark, limit)?
                .into_response()),
        }
    }

    /// Changes of one type after `watermark`.
    ///
    /// # Errors
    ///
    /// See [`pull::reconcile`].
    pub fn pull_records<E: StoredEntity>(
        &self,
        watermark: Option<&str>,
        limit: Option<usize>,
    ) -> CoreResult<PullPage<E>> {
        pull::reconcile(&self.store, &self.config, watermark, limit)
    }

    /// Derives catalog entries from the whole timetable. Running it twice in
    /// a row adds nothing the second time.
    ///
    /// # Errors
    ///
    /// Fails when the additions cannot be made durable.
    pub fn refresh_catalog(&self) -> CoreResult<Vec<CatalogEntry>> {
        let added = self.store.refresh_catalog()?;
        info!(added = added.len(), "subject catalog refreshed");
        Ok(added)
    }

    /// Sets a catalog entry's display name and type.
    ///
    /// # Errors
    ///
    /// Fails when the change cannot be made durable.
    pub fn upsert_catalog_metadata(&self, entry: CatalogEntry) -> CoreResult<CatalogEntry> {
        self.store.upsert_catalog_metadata(entry)
    }

    /// The subject catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn catalog(&self) -> CoreResult<Vec<CatalogEntry>> {
        self.store.catalog()
    }

    /// Store counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn stats(&self) -> CoreResult<StoreStats> {
        self.store.stats()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::error::CoreError;
    use crate::store::MemoryStore;
    use rollcall_protocol::{StudentKey, Timestamp};

    fn engine() -> SyncEngine<MemoryStore> {
        let clock = Arc::new(ManualClock::new(Timestamp::from_micros(1_000_000)));
        SyncEngine::with_clock(MemoryStore::new(), clock)
    }

    fn student(sbrn: &str, name: &str, version: u64) -> Record<Student> {
        Record::new(Student::new(sbrn, name), version)
    }

    #[test]
    fn empty_batch_is_rejected() {
        let engine = engine();
        let err = engine.push(RecordBatch::Students(Vec::new())).unwrap_err();
        assert!(matches!(err, CoreError::Validation { .. }));
        assert!(!err.is_retryable());
    }

    #[test]
    fn oversized_batch_is_rejected() {
        let engine = engine().with_config(EngineConfig::new().max_push_batch(2));
        let batch = (0..3).map(|i| student(&format!("S{i}"), "x", 1)).collect();
        assert!(matches!(
            engine.push_records::<Student>(batch),
            Err(CoreError::Validation { .. })
        ));
    }

    #[test]
    fn redelivery_is_all_stale() {
        let engine = engine();
        let batch = vec![student("S001", "Alice", 1), student("S002", "Bob", 1)];
        let first = engine.push_records(batch.clone()).unwrap();
        assert_eq!((first.accepted, first.stale), (2, 0));

        let before = engine.store().snapshot();
        let second = engine.push_records(batch).unwrap();
        assert_eq!((second.accepted, second.stale), (0, 2));
        assert_eq!(second.processed(), 2);
        assert_eq!(
            engine.store().snapshot().tables().table::<Student>().len(),
            before.tables().table::<Student>().len()
        );
        assert_eq!(engine.store().snapshot().last_stamp(), before.last_stamp());
    }

    #[test]
    fn pull_reports_next_watermark_and_echoes_on_empty() {
        let engine = engine();
        engine
            .push_records(vec![student("S001", "Alice", 1), student("S002", "Bob", 1)])
            .unwrap();

        let page = engine.pull_records::<Student>(None, None).unwrap();
        assert_eq!(page.records.len(), 2);
        assert!(!page.has_more);
        let watermark = page.next_watermark.unwrap();

        let empty = engine.pull_records::<Student>(Some(&watermark), None).unwrap();
        assert!(empty.records.is_empty());
        assert_eq!(empty.next_watermark.as_deref(), Some(watermark.as_str()));

        let fresh = engine.pull_records::<Student>(None, Some(5)).unwrap();
        assert!(fresh.records.len() == 2 && !fresh.has_more);
    }

    #[test]
    fn empty_store_full_pull_has_no_watermark() {
        let page = engine().pull_records::<Student>(None, None).unwrap();
        assert!(page.records.is_empty());
        assert_eq!(page.next_watermark, None);
    }

    #[test]
    fn zero_limit_is_rejected() {
        assert!(matches!(
            engine().pull_records::<Student>(None, Some(0)),
            Err(CoreError::Validation { .. })
        ));
    }

    #[test]
    fn wire_pull_dispatches_by_kind() {
        let engine = engine();
        engine
            .push(RecordBatch::TimetableSlots(vec![Record::new(
                TimetableSlot::new("CSE", "3", "A", "Monday", 1, "CS301"),
                1,
            )]))
            .unwrap();
        let response = engine
            .pull(&PullRequest::full(EntityKind::TimetableSlot))
            .unwrap();
        assert_eq!(response.batch.kind(), EntityKind::TimetableSlot);
        assert_eq!(response.batch.len(), 1);

        let students = engine.pull(&PullRequest::full(EntityKind::Student)).unwrap();
        assert!(students.batch.is_empty());
    }

    #[test]
    fn tombstone_is_pulled() {
        let engine = engine();
        engine.push_records(vec![student("S001", "Alice", 1)]).unwrap();
        let page = engine.pull_records::<Student>(None, None).unwrap();

        let report = engine
            .push_records(vec![Record::tombstone(Student::new("S001", "Alice"), 2)])
            .unwrap();
        assert_eq!(report.deleted, 1);

        let delta = engine
            .pull_records::<Student>(page.next_watermark.as_deref(), None)
            .unwrap();
        assert_eq!(delta.records.len(), 1);
        assert!(delta.records[0].is_deleted);
        assert!(delta.records[0].deleted_at.is_some());

        let stored = engine
            .store()
            .fetch::<Student>(&StudentKey("S001".into()))
            .unwrap()
            .unwrap();
        assert_eq!(stored.version, 2);
    }
}
