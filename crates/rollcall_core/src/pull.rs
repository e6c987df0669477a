//! Serving changes since a watermark.

use crate::adapter::StoredEntity;
use crate::config::EngineConfig;
use crate::cursor::Cursor;
use crate::error::{CoreError, CoreResult};
use crate::store::AuthorityStore;
use rollcall_protocol::{PullResponse, Record, SyncEntity};
use tracing::debug;

/// One page of changes.
#[derive(Debug, Clone, PartialEq)]
pub struct PullPage<E> {
    /// Changed records, tombstones included, ascending by
    /// `(last_modified, key)`.
    pub records: Vec<Record<E>>,
    /// Position of the last record returned, or the request's watermark
    /// when nothing changed.
    pub next_watermark: Option<String>,
    /// True when the limit cut the page short.
    pub has_more: bool,
}

impl<E: SyncEntity> PullPage<E> {
    /// Wire form.
    pub fn into_response(self) -> PullResponse {
        PullResponse {
            batch: E::into_batch(self.records),
            next_watermark: self.next_watermark,
            has_more: self.has_more,
        }
    }
}

/// Returns the records changed after `watermark`.
///
/// Without a limit every change is returned in one page. A limit is clamped
/// to `config.max_pull_limit`.
///
/// # Errors
///
/// - [`CoreError::MalformedWatermark`] for an unparsable watermark, which is
///   never treated as "no watermark"
/// - [`CoreError::Validation`] for a zero limit
pub fn reconcile<E, S>(
    store: &S,
    config: &EngineConfig,
    watermark: Option<&str>,
    limit: Option<usize>,
) -> CoreResult<PullPage<E>>
where
    E: StoredEntity,
    S: AuthorityStore,
{
    let cursor = Cursor::<E::Key>::parse(watermark)?;
    let page_size = match limit {
        Some(0) => return Err(CoreError::validation("pull limit must be positive")),
        Some(n) => n.min(config.max_pull_limit),
        None => usize::MAX,
    };

    let mut records = store.scan::<E>(cursor.as_ref(), page_size.saturating_add(1))?;
    let has_more = records.len() > page_size;
    records.truncate(page_size);

    let next_watermark = match records.last() {
        Some(last) => Cursor::of(last).map(|c| c.to_watermark().to_string()),
        None => watermark.map(str::to_string),
    };

    debug!(
        kind = %E::KIND,
        since = watermark.unwrap_or("<start>"),
        returned = records.len(),
        has_more,
        "pull served"
    );
    Ok(PullPage {
        records,
        next_watermark,
        has_more,
    })
}
