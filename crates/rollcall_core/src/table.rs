//! One logical table per collection.

use crate::cursor::Cursor;
use rollcall_protocol::{Record, SyncEntity, Timestamp};
use std::collections::{BTreeMap, BTreeSet};
use std::ops::Bound;

/// Rows of one collection keyed by identity, plus the `(last_modified, key)`
/// index pulls walk.
///
/// # Invariants
///
/// - every row appears in the index exactly once, under its current stamp
/// - rows are never removed; deletion is a tombstone row
#[derive(Debug, Clone)]
pub struct Table<E: SyncEntity> {
    rows: BTreeMap<E::Key, Record<E>>,
    changes: BTreeMap<Timestamp, BTreeSet<E::Key>>,
}

impl<E: SyncEntity> Default for Table<E> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            changes: BTreeMap::new(),
        }
    }
}

impl<E: SyncEntity> Table<E> {
    /// Row stored under `key`, tombstones included.
    pub fn get(&self, key: &E::Key) -> Option<&Record<E>> {
        self.rows.get(key)
    }

    /// Number of rows, tombstones included.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when the table holds no rows.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of tombstones.
    pub fn tombstones(&self) -> usize {
        self.rows.values().filter(|row| row.is_deleted).count()
    }

    /// Highest stamp in the table.
    pub fn latest_stamp(&self) -> Option<Timestamp> {
        self.changes.keys().next_back().copied()
    }

    /// Rows in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&E::Key, &Record<E>)> {
        self.rows.iter()
    }

    /// Stores `row` under `key`, moving its index entry.
    pub(crate) fn put(&mut self, key: E::Key, row: Record<E>) {
        if let Some(previous) = self.rows.get(&key) {
            let old_stamp = position(previous);
            if let Some(keys) = self.changes.get_mut(&old_stamp) {
                keys.remove(&key);
                if keys.is_empty() {
                    self.changes.remove(&old_stamp);
                }
            }
        }
        self.changes
            .entry(position(&row))
            .or_default()
            .insert(key.clone());
        self.rows.insert(key, row);
    }

    /// Up to `limit` rows positioned strictly after `cursor`, ascending.
    pub fn scan_after(&self, cursor: Option<&Cursor<E::Key>>, limit: usize) -> Vec<Record<E>> {
        let start = cursor.map_or(Bound::Unbounded, |c| Bound::Included(c.stamp));
        let mut page = Vec::new();

        for (stamp, keys) in self.changes.range((start, Bound::Unbounded)) {
            for key in keys {
                if page.len() >= limit {
                    return page;
                }
                if cursor.is_some_and(|c| !c.precedes(*stamp, key)) {
                    continue;
                }
                if let Some(row) = self.rows.get(key) {
                    page.push(row.clone());
                }
            }
        }
        page
    }
}

fn position<E: SyncEntity>(row: &Record<E>) -> Timestamp {
    row.last_modified.unwrap_or(Timestamp::EPOCH)
}
