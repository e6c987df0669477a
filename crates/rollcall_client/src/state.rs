//! Sync client state machine.

use crate::config::ClientConfig;
use crate::error::{SyncError, SyncResult};
use crate::replica::{LocalReplica, ReplicaEntity};
use crate::transport::SyncTransport;
use parking_lot::RwLock;
use rollcall_protocol::{AttendanceRecord, PullRequest, PushRequest, Student, TimetableSlot};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// The current state of the sync client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    /// Client is idle, not syncing.
    Idle,
    /// Client is pulling changes from the server.
    Pulling,
    /// Client is pushing changes to the server.
    Pushing,
    /// Client has completed a sync cycle.
    Synced,
    /// Client encountered an error.
    Error,
}

impl SyncState {
    /// Returns true if the client is in an active sync state.
    pub fn is_active(&self) -> bool {
        matches!(self, SyncState::Pulling | SyncState::Pushing)
    }

    /// Returns true if the client can start a new sync.
    pub fn can_start_sync(&self) -> bool {
        matches!(self, SyncState::Idle | SyncState::Synced | SyncState::Error)
    }
}

/// Statistics about sync operations.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Total number of sync cycles completed.
    pub cycles_completed: u64,
    /// Total number of records pulled.
    pub records_pulled: u64,
    /// Total number of pushed records the server accepted.
    pub records_pushed: u64,
    /// Total number of pushed records the server already had.
    pub records_stale: u64,
    /// Total number of retries.
    pub retries: u64,
    /// Last sync time.
    pub last_sync_time: Option<Instant>,
    /// Last error message.
    pub last_error: Option<String>,
}

/// Result of a sync cycle.
#[derive(Debug, Clone, Default)]
pub struct SyncCycleResult {
    /// Records received from the server.
    pub pulled: u64,
    /// Pulled records that replaced the local copy.
    pub applied: u64,
    /// Pushed records the server accepted.
    pub pushed: u64,
    /// Pushed records the server already had at that version or newer.
    pub stale: u64,
    /// Pushed records the server dropped as invalid.
    pub dropped: u64,
    /// Duration of the sync cycle.
    pub duration: Duration,
}

/// Synchronizes a [`LocalReplica`] with a remote server.
pub struct SyncClient<T: SyncTransport> {
    config: ClientConfig,
    transport: T,
    replica: Arc<LocalReplica>,
    state: RwLock<SyncState>,
    stats: RwLock<SyncStats>,
    cancelled: AtomicBool,
}

impl<T: SyncTransport> SyncClient<T> {
    /// Creates a new sync client.
    pub fn new(config: ClientConfig, transport: T, replica: Arc<LocalReplica>) -> Self {
        Self {
            config,
            transport,
            replica,
            state: RwLock::new(SyncState::Idle),
            stats: RwLock::new(SyncStats::default()),
            cancelled: AtomicBool::new(false),
        }
    }

    /// Gets the current state.
    pub fn state(&self) -> SyncState {
        *self.state.read()
    }

    /// Gets the current stats.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// The replica being synchronized.
    pub fn replica(&self) -> &Arc<LocalReplica> {
        &self.replica
    }

    /// The transport in use.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Cancels any ongoing sync operation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Resets the cancelled flag.
    pub fn reset_cancel(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }

    fn check_cancelled(&self) -> SyncResult<()> {
        if self.cancelled.load(Ordering::SeqCst) {
            Err(SyncError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn set_state(&self, state: SyncState) {
        *self.state.write() = state;
    }

    /// Performs a full sync cycle: pull every collection, then push every
    /// collection's pending changes.
    ///
    /// # Errors
    ///
    /// Returns the first failure that survived the retry policy. Watermarks
    /// already advanced and pushes already acknowledged stay in effect, so
    /// the next cycle resumes where this one stopped.
    pub fn sync(&self) -> SyncResult<SyncCycleResult> {
        let start = Instant::now();
        self.reset_cancel();

        if !self.state().can_start_sync() {
            return Err(SyncError::InvalidStateTransition {
                from: format!("{:?}", self.state()),
                to: "sync".into(),
            });
        }

        let mut result = SyncCycleResult::default();
        if let Err(e) = self.run_cycle(&mut result) {
            self.handle_error(&e);
            return Err(e);
        }

        result.duration = start.elapsed();
        self.set_state(SyncState::Synced);

        {
            let mut stats = self.stats.write();
            stats.cycles_completed += 1;
            stats.records_pulled += result.pulled;
            stats.records_pushed += result.pushed;
            stats.records_stale += result.stale;
            stats.last_sync_time = Some(Instant::now());
            stats.last_error = None;
        }

        info!(
            pulled = result.pulled,
            pushed = result.pushed,
            stale = result.stale,
            dropped = result.dropped,
            "sync cycle complete"
        );
        Ok(result)
    }

    fn run_cycle(&self, result: &mut SyncCycleResult) -> SyncResult<()> {
        self.set_state(SyncState::Pulling);
        self.pull_collection::<Student>(result)?;
        self.pull_collection::<TimetableSlot>(result)?;
        self.pull_collection::<AttendanceRecord>(result)?;

        self.set_state(SyncState::Pushing);
        self.push_collection::<Student>(result)?;
        self.push_collection::<TimetableSlot>(result)?;
        self.push_collection::<AttendanceRecord>(result)?;
        Ok(())
    }

    /// Pulls every page of `E` after the stored watermark.
    fn pull_collection<E: ReplicaEntity>(&self, result: &mut SyncCycleResult) -> SyncResult<()> {
        loop {
            self.check_cancelled()?;

            let request = PullRequest::since(E::KIND, self.replica.watermark(E::KIND))
                .with_limit(self.config.pull_batch_size);
            let response = self.with_retry(|| self.transport.pull(&request))?;

            let has_more = response.has_more;
            let records = E::from_batch(response.batch).ok_or_else(|| {
                SyncError::Protocol(format!("pull for {} returned another collection", E::KIND))
            })?;
            if has_more && records.is_empty() {
                return Err(SyncError::Protocol(format!(
                    "empty {} page claims more records",
                    E::KIND
                )));
            }

            let received = records.len() as u64;
            result.pulled += received;
            result.applied += self.replica.apply_remote(records) as u64;
            if let Some(watermark) = response.next_watermark {
                self.replica.set_watermark(E::KIND, watermark);
            }

            debug!(kind = %E::KIND, received, has_more, "pulled page");
            if !has_more {
                return Ok(());
            }
        }
    }

    /// Pushes pending changes of `E` in batches until the queue is empty.
    fn push_collection<E: ReplicaEntity>(&self, result: &mut SyncCycleResult) -> SyncResult<()> {
        let batch_size = (self.config.push_batch_size as usize).max(1);
        loop {
            self.check_cancelled()?;

            let batch = self.replica.pending::<E>(batch_size);
            if batch.is_empty() {
                return Ok(());
            }

            let request = PushRequest::new(E::into_batch(batch.clone()));
            let response = self.with_retry(|| self.transport.push(&request))?;
            self.replica.acknowledge(&batch);

            result.pushed += u64::from(response.accepted);
            result.stale += u64::from(response.stale);
            result.dropped += u64::from(response.dropped);
            if response.dropped > 0 {
                warn!(kind = %E::KIND, dropped = response.dropped, "server dropped pushed records");
            }
            debug!(
                kind = %E::KIND,
                sent = batch.len(),
                accepted = response.accepted,
                stale = response.stale,
                "pushed batch"
            );
        }
    }

    /// Runs `request`, retrying retryable failures per the retry policy.
    fn with_retry<R>(&self, mut request: impl FnMut() -> SyncResult<R>) -> SyncResult<R> {
        let retry = &self.config.retry;
        let mut attempt = 0;
        loop {
            match request() {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt + 1 < retry.max_attempts => {
                    attempt += 1;
                    self.stats.write().retries += 1;
                    warn!(error = %e, attempt, "retrying sync request");
                    std::thread::sleep(retry.delay_for_attempt(attempt));
                    self.check_cancelled()?;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn handle_error(&self, error: &SyncError) {
        self.set_state(SyncState::Error);
        self.stats.write().last_error = Some(error.to_string());
    }
}
