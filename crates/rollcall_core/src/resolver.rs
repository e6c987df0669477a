//! Version-gated last-writer-wins.

use rollcall_protocol::{Record, SyncEntity, Timestamp};

/// A validated incoming record together with its identity key.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate<E: SyncEntity> {
    /// Identity key.
    pub key: E::Key,
    /// The record as pushed.
    pub record: Record<E>,
}

impl<E: SyncEntity> Candidate<E> {
    /// Wraps a record, or returns `None` when its identity is incomplete.
    pub fn new(record: Record<E>) -> Option<Self> {
        let key = record.key()?;
        Some(Self { key, record })
    }
}

/// How an accepted write changed the stored record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Acceptance {
    /// No record existed under the key.
    Created,
    /// A live record was replaced by a live record.
    Updated,
    /// A tombstone was replaced by a live record.
    Revived,
    /// The record became (or stayed) a tombstone.
    Deleted,
}

/// Outcome of comparing an incoming record with the stored one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resolution {
    /// The incoming record replaces the stored one wholesale.
    Accepted(Acceptance),
    /// The store already holds this version or a newer one.
    Stale {
        /// Version held by the store.
        stored_version: u64,
    },
}

impl Resolution {
    /// Returns true for an accepted write.
    pub fn is_accepted(&self) -> bool {
        matches!(self, Resolution::Accepted(_))
    }
}

/// Decides whether `incoming` replaces `stored`.
///
/// An absent record counts as version 0. Ties go to the stored record, which
/// makes redelivery a no-op.
pub fn resolve<E: SyncEntity>(incoming: &Record<E>, stored: Option<&Record<E>>) -> Resolution {
    let stored_version = stored.map(|row| row.version);
    if !E::supersedes(incoming.version, stored_version) {
        return Resolution::Stale {
            stored_version: stored_version.unwrap_or(0),
        };
    }

    let acceptance = match stored {
        _ if incoming.is_deleted => Acceptance::Deleted,
        None => Acceptance::Created,
        Some(row) if row.is_deleted => Acceptance::Revived,
        Some(_) => Acceptance::Updated,
    };
    Resolution::Accepted(acceptance)
}

/// Builds the row stored for an accepted write.
///
/// Every payload field and the version come from `incoming`. `last_modified`
/// becomes the authority stamp and the client's own stamp moves to
/// `client_modified`. A tombstone keeps the `deleted_at` of an earlier
/// tombstone, otherwise it is deleted at `stamp`.
pub fn stamp<E: SyncEntity>(
    incoming: Record<E>,
    stored: Option<&Record<E>>,
    stamp: Timestamp,
) -> Record<E> {
    let deleted_at = if incoming.is_deleted {
        stored
            .filter(|row| row.is_deleted)
            .and_then(|row| row.deleted_at)
            .or(Some(stamp))
    } else {
        None
    };

    Record {
        client_modified: incoming.last_modified,
        last_modified: Some(stamp),
        deleted_at,
        ..incoming
    }
}
