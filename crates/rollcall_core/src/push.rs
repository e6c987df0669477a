//! Merging a client's batch into the authority store.

use crate::adapter::StoredEntity;
use crate::clock::Clock;
use crate::config::EngineConfig;
use crate::error::{CoreError, CoreResult};
use crate::resolver::{Acceptance, Candidate, Resolution};
use crate::store::AuthorityStore;
use rollcall_protocol::{PushResponse, Record, SyncEntity};
use serde::Serialize;
use std::fmt;
use tracing::{debug, warn};

/// Why a pushed record was removed before reconciliation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    /// A mandatory identity field is missing or blank.
    MissingIdentity,
    /// Version 0, i.e. no version at all.
    MissingVersion,
    /// A tombstone for a type without soft delete.
    DeleteUnsupported,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DropReason::MissingIdentity => "missing identity field",
            DropReason::MissingVersion => "missing version",
            DropReason::DeleteUnsupported => "soft delete not supported",
        })
    }
}

/// Checks one pushed record.
pub fn check<E: SyncEntity>(record: &Record<E>) -> Result<(), DropReason> {
    if record.key().is_none() {
        Err(DropReason::MissingIdentity)
    } else if record.version == 0 {
        Err(DropReason::MissingVersion)
    } else if record.is_deleted && !E::SUPPORTS_SOFT_DELETE {
        Err(DropReason::DeleteUnsupported)
    } else {
        Ok(())
    }
}

/// Splits a batch into valid candidates and a count of dropped records.
pub fn validate<E: SyncEntity>(records: Vec<Record<E>>) -> (Vec<Candidate<E>>, usize) {
    let mut candidates = Vec::with_capacity(records.len());
    let mut dropped = 0;

    for (index, record) in records.into_iter().enumerate() {
        if let Err(reason) = check(&record) {
            warn!(kind = %E::KIND, index, %reason, "dropping pushed record");
            dropped += 1;
            continue;
        }
        if let Some(candidate) = Candidate::new(record) {
            candidates.push(candidate);
        }
    }
    (candidates, dropped)
}

/// Outcome counts of one push.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct PushReport {
    /// Records written.
    pub accepted: usize,
    /// Records the store already held at that version or newer.
    pub stale: usize,
    /// Records removed by validation.
    pub dropped: usize,
    /// Accepted records that were new keys.
    pub created: usize,
    /// Accepted records that replaced live records.
    pub updated: usize,
    /// Accepted records that replaced tombstones.
    pub revived: usize,
    /// Accepted tombstones.
    pub deleted: usize,
    /// Catalog entries derived in the same commit.
    pub catalog_added: usize,
}

impl PushReport {
    /// Accepted plus stale. A client may clear exactly these from its queue.
    pub fn processed(&self) -> usize {
        self.accepted + self.stale
    }

    fn tally(&mut self, resolution: Resolution) {
        match resolution {
            Resolution::Stale { .. } => self.stale += 1,
            Resolution::Accepted(acceptance) => {
                self.accepted += 1;
                match acceptance {
                    Acceptance::Created => self.created += 1,
                    Acceptance::Updated => self.updated += 1,
                    Acceptance::Revived => self.revived += 1,
                    Acceptance::Deleted => self.deleted += 1,
                }
            }
        }
    }
}

impl From<PushReport> for PushResponse {
    fn from(report: PushReport) -> Self {
        let count = |n: usize| u32::try_from(n).unwrap_or(u32::MAX);
        PushResponse {
            accepted: count(report.accepted),
            stale: count(report.stale),
            dropped: count(report.dropped),
        }
    }
}

/// Validates `records` and commits the survivors as one unit.
///
/// # Errors
///
/// - [`CoreError::Validation`] for an empty batch or one over
///   `config.max_push_batch`
/// - a retryable storage error when the commit fails; nothing is applied
pub fn reconcile<E, S>(
    store: &S,
    clock: &dyn Clock,
    config: &EngineConfig,
    records: Vec<Record<E>>,
) -> CoreResult<PushReport>
where
    E: StoredEntity,
    S: AuthorityStore,
{
    if records.is_empty() {
        return Err(CoreError::validation(format!("empty {} batch", E::KIND)));
    }
    if records.len() > config.max_push_batch {
        return Err(CoreError::validation(format!(
            "{} batch of {} records exceeds the limit of {}",
            E::KIND,
            records.len(),
            config.max_push_batch
        )));
    }

    let (candidates, dropped) = validate(records);
    let mut report = PushReport {
        dropped,
        ..PushReport::default()
    };
    if candidates.is_empty() {
        return Ok(report);
    }

    let outcome = store.commit(candidates, clock)?;
    for resolution in outcome.resolutions {
        report.tally(resolution);
    }
    report.catalog_added = outcome.catalog_added;

    debug!(
        kind = %E::KIND,
        accepted = report.accepted,
        stale = report.stale,
        dropped = report.dropped,
        catalog_added = report.catalog_added,
        "push reconciled"
    );
    Ok(report)
}
