//! The client's offline copy of the synchronized collections.

use crate::error::{SyncError, SyncResult};
use parking_lot::RwLock;
use rollcall_protocol::{
    AttendanceRecord, EntityKey, EntityKind, Record, RecordBatch, Student, SyncEntity, Timestamp,
    TimetableSlot,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Rows of one collection plus the keys changed locally since the last push.
#[derive(Debug)]
pub struct Collection<E: SyncEntity> {
    rows: BTreeMap<E::Key, Record<E>>,
    pending: Vec<E::Key>,
}

impl<E: SyncEntity> Default for Collection<E> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            pending: Vec::new(),
        }
    }
}

impl<E: SyncEntity> Collection<E> {
    /// Record stored under `key`, tombstones included.
    pub fn get(&self, key: &E::Key) -> Option<&Record<E>> {
        self.rows.get(key)
    }

    /// Number of rows, tombstones included.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the collection holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Rows in key order.
    pub fn iter(&self) -> impl Iterator<Item = &Record<E>> {
        self.rows.values()
    }

    /// Number of keys waiting to be pushed.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    fn queue(&mut self, key: E::Key) {
        if !self.pending.contains(&key) {
            self.pending.push(key);
        }
    }

    fn unqueue(&mut self, key: &E::Key) {
        self.pending.retain(|k| k != key);
    }
}

/// Every collection of a replica.
#[derive(Debug, Default)]
pub struct ReplicaTables {
    students: Collection<Student>,
    slots: Collection<TimetableSlot>,
    attendance: Collection<AttendanceRecord>,
    watermarks: BTreeMap<EntityKind, String>,
}

impl ReplicaTables {
    /// The collection of `E`.
    pub fn collection<E: ReplicaEntity>(&self) -> &Collection<E> {
        E::collection(self)
    }
}

/// Binds an entity type to its collection in [`ReplicaTables`].
pub trait ReplicaEntity: SyncEntity {
    /// Shared access to this type's collection.
    fn collection(tables: &ReplicaTables) -> &Collection<Self>;

    /// Exclusive access to this type's collection.
    fn collection_mut(tables: &mut ReplicaTables) -> &mut Collection<Self>;
}

impl ReplicaEntity for Student {
    fn collection(tables: &ReplicaTables) -> &Collection<Self> {
        &tables.students
    }

    fn collection_mut(tables: &mut ReplicaTables) -> &mut Collection<Self> {
        &mut tables.students
    }
}

impl ReplicaEntity for TimetableSlot {
    fn collection(tables: &ReplicaTables) -> &Collection<Self> {
        &tables.slots
    }

    fn collection_mut(tables: &mut ReplicaTables) -> &mut Collection<Self> {
        &mut tables.slots
    }
}

impl ReplicaEntity for AttendanceRecord {
    fn collection(tables: &ReplicaTables) -> &Collection<Self> {
        &tables.attendance
    }

    fn collection_mut(tables: &mut ReplicaTables) -> &mut Collection<Self> {
        &mut tables.attendance
    }
}

/// Serializable form of a replica.
///
/// Pending keys are stored as key tokens, the same text used after the `@`
/// of a composite watermark.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ReplicaSnapshot {
    /// One batch per collection.
    pub collections: Vec<RecordBatch>,
    /// Pending key tokens per collection, in queue order.
    pub pending: BTreeMap<EntityKind, Vec<String>>,
    /// Last watermark pulled per collection.
    pub watermarks: BTreeMap<EntityKind, String>,
}

/// A device's local copy of every collection.
///
/// Local edits go through [`LocalReplica::record_local_change`] or
/// [`LocalReplica::record_local_delete`], which bump the version and queue
/// the key for the next push. Pulled records go through
/// [`LocalReplica::apply_remote`].
///
/// All methods take `&self`; the replica can be shared between the UI and the
/// sync client.
#[derive(Debug, Default)]
pub struct LocalReplica {
    tables: RwLock<ReplicaTables>,
}

impl LocalReplica {
    /// Creates an empty replica.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record stored under `key`.
    pub fn get<E: ReplicaEntity>(&self, key: &E::Key) -> Option<Record<E>> {
        E::collection(&self.tables.read()).get(key).cloned()
    }

    /// Every record of `E` in key order, tombstones included.
    pub fn records<E: ReplicaEntity>(&self) -> Vec<Record<E>> {
        E::collection(&self.tables.read()).iter().cloned().collect()
    }

    /// Live (not deleted) entities of `E` in key order.
    pub fn live<E: ReplicaEntity>(&self) -> Vec<E> {
        E::collection(&self.tables.read())
            .iter()
            .filter(|r| !r.is_deleted)
            .map(|r| r.entity.clone())
            .collect()
    }

    /// Saves a local edit of `entity` and queues it for the next push.
    ///
    /// The new version is one above the local one (1 for a new key). A
    /// tombstoned key comes back to life.
    ///
    /// # Errors
    ///
    /// Fails when the entity's identity fields are missing.
    pub fn record_local_change<E: ReplicaEntity>(&self, entity: E) -> SyncResult<Record<E>> {
        self.record_local(entity, false)
    }

    /// Saves a local deletion of `entity` as a tombstone and queues it.
    ///
    /// # Errors
    ///
    /// Fails when the identity fields are missing or when `E` does not
    /// support deletion.
    pub fn record_local_delete<E: ReplicaEntity>(&self, entity: E) -> SyncResult<Record<E>> {
        if !E::SUPPORTS_SOFT_DELETE {
            return Err(SyncError::InvalidChange(format!(
                "{} records cannot be deleted",
                E::KIND
            )));
        }
        self.record_local(entity, true)
    }

    fn record_local<E: ReplicaEntity>(&self, entity: E, deleted: bool) -> SyncResult<Record<E>> {
        let key = entity.key().ok_or_else(|| {
            SyncError::InvalidChange(format!("{} record is missing its identity", E::KIND))
        })?;

        let mut tables = self.tables.write();
        let collection = E::collection_mut(&mut tables);
        let version = collection.get(&key).map_or(1, |r| r.version + 1);

        let mut record = if deleted {
            Record::tombstone(entity, version)
        } else {
            Record::new(entity, version)
        };
        record.last_modified = Some(Timestamp::now());

        collection.rows.insert(key.clone(), record.clone());
        collection.queue(key);
        Ok(record)
    }

    /// Up to `limit` pending records of `E`, in the order they were first
    /// changed.
    pub fn pending<E: ReplicaEntity>(&self, limit: usize) -> Vec<Record<E>> {
        let tables = self.tables.read();
        let collection = E::collection(&tables);
        collection
            .pending
            .iter()
            .filter_map(|key| collection.rows.get(key).cloned())
            .take(limit)
            .collect()
    }

    /// Total number of pending records across all collections.
    pub fn pending_count(&self) -> usize {
        let tables = self.tables.read();
        tables.students.pending_len() + tables.slots.pending_len() + tables.attendance.pending_len()
    }

    /// Removes pushed records from the pending queue.
    ///
    /// A key edited again while the push was in flight has a higher version
    /// than the pushed copy and stays queued.
    pub fn acknowledge<E: ReplicaEntity>(&self, pushed: &[Record<E>]) {
        let mut tables = self.tables.write();
        let collection = E::collection_mut(&mut tables);
        for record in pushed {
            let Some(key) = record.key() else { continue };
            let unchanged = collection
                .rows
                .get(&key)
                .is_some_and(|current| current.version == record.version);
            if unchanged {
                collection.unqueue(&key);
            }
        }
    }

    /// Applies records pulled from the server; returns how many replaced the
    /// local copy.
    ///
    /// The local copy survives only if the server would accept it over the
    /// pulled one, i.e. its version is strictly higher. Otherwise the pulled
    /// record (tombstones included) replaces it and any pending local edit of
    /// that key is discarded, since pushing it would come back stale.
    pub fn apply_remote<E: ReplicaEntity>(&self, records: Vec<Record<E>>) -> usize {
        let mut tables = self.tables.write();
        let collection = E::collection_mut(&mut tables);
        let mut applied = 0;
        for record in records {
            let Some(key) = record.key() else { continue };
            let keep_local = collection
                .rows
                .get(&key)
                .is_some_and(|local| E::supersedes(local.version, Some(record.version)));
            if keep_local {
                continue;
            }
            collection.unqueue(&key);
            collection.rows.insert(key, record);
            applied += 1;
        }
        debug!(kind = %E::KIND, applied, "applied remote records");
        applied
    }

    /// Last watermark pulled for `kind`.
    pub fn watermark(&self, kind: EntityKind) -> Option<String> {
        self.tables.read().watermarks.get(&kind).cloned()
    }

    /// Stores the watermark to resume `kind` from.
    pub fn set_watermark(&self, kind: EntityKind, watermark: impl Into<String>) {
        self.tables.write().watermarks.insert(kind, watermark.into());
    }

    /// Forgets the watermark of `kind`, forcing a full pull next time.
    pub fn reset_watermark(&self, kind: EntityKind) {
        self.tables.write().watermarks.remove(&kind);
    }

    /// Captures the replica in serializable form.
    pub fn snapshot(&self) -> ReplicaSnapshot {
        let tables = self.tables.read();
        let mut snapshot = ReplicaSnapshot {
            watermarks: tables.watermarks.clone(),
            ..ReplicaSnapshot::default()
        };
        capture::<Student>(&tables, &mut snapshot);
        capture::<TimetableSlot>(&tables, &mut snapshot);
        capture::<AttendanceRecord>(&tables, &mut snapshot);
        snapshot
    }

    /// Rebuilds a replica from a snapshot.
    ///
    /// # Errors
    ///
    /// Fails when a stored record or pending token has no valid identity.
    pub fn from_snapshot(snapshot: ReplicaSnapshot) -> SyncResult<Self> {
        let mut tables = ReplicaTables {
            watermarks: snapshot.watermarks,
            ..ReplicaTables::default()
        };
        for batch in snapshot.collections {
            match batch {
                RecordBatch::Students(records) => restore_rows(&mut tables, records)?,
                RecordBatch::TimetableSlots(records) => restore_rows(&mut tables, records)?,
                RecordBatch::Attendance(records) => restore_rows(&mut tables, records)?,
            }
        }
        for (kind, tokens) in &snapshot.pending {
            match kind {
                EntityKind::Student => restore_pending::<Student>(&mut tables, tokens)?,
                EntityKind::TimetableSlot => restore_pending::<TimetableSlot>(&mut tables, tokens)?,
                EntityKind::Attendance => restore_pending::<AttendanceRecord>(&mut tables, tokens)?,
            }
        }
        Ok(Self {
            tables: RwLock::new(tables),
        })
    }

    /// Writes the replica to `path` as CBOR.
    ///
    /// # Errors
    ///
    /// Fails on encoding or I/O errors.
    pub fn save(&self, path: &Path) -> SyncResult<()> {
        let mut bytes = Vec::new();
        ciborium::into_writer(&self.snapshot(), &mut bytes)
            .map_err(|e| SyncError::Protocol(format!("failed to encode replica: {e}")))?;
        let staging = path.with_extension("tmp");
        fs::write(&staging, bytes)?;
        fs::rename(&staging, path)?;
        Ok(())
    }

    /// Loads a replica saved with [`LocalReplica::save`]; a missing file
    /// gives an empty replica.
    ///
    /// # Errors
    ///
    /// Fails on I/O errors or an undecodable file.
    pub fn open(path: &Path) -> SyncResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }
        let bytes = fs::read(path)?;
        let snapshot: ReplicaSnapshot = ciborium::from_reader(bytes.as_slice())
            .map_err(|e| SyncError::Protocol(format!("failed to decode replica: {e}")))?;
        Self::from_snapshot(snapshot)
    }
}

fn capture<E: ReplicaEntity>(tables: &ReplicaTables, snapshot: &mut ReplicaSnapshot) {
    let collection = E::collection(tables);
    snapshot
        .collections
        .push(E::into_batch(collection.iter().cloned().collect()));
    if !collection.pending.is_empty() {
        snapshot.pending.insert(
            E::KIND,
            collection.pending.iter().map(|key| key.to_token()).collect(),
        );
    }
}

fn restore_rows<E: ReplicaEntity>(
    tables: &mut ReplicaTables,
    records: Vec<Record<E>>,
) -> SyncResult<()> {
    let collection = E::collection_mut(tables);
    for record in records {
        let key = record.key().ok_or_else(|| {
            SyncError::Protocol(format!("stored {} record has no identity", E::KIND))
        })?;
        collection.rows.insert(key, record);
    }
    Ok(())
}

fn restore_pending<E: ReplicaEntity>(
    tables: &mut ReplicaTables,
    tokens: &[String],
) -> SyncResult<()> {
    let collection = E::collection_mut(tables);
    for token in tokens {
        let key = E::Key::from_token(token).ok_or_else(|| {
            SyncError::Protocol(format!("bad pending {} key {token:?}", E::KIND))
        })?;
        collection.queue(key);
    }
    Ok(())
}
