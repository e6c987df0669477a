//! Transport layer abstraction for sync operations.

use crate::error::{SyncError, SyncResult};
use rollcall_core::AuthorityStore;
use rollcall_protocol::{PullRequest, PullResponse, PushRequest, PushResponse, SyncMessage};
use rollcall_server::SyncServer;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

/// A sync transport carries requests to the sync server.
///
/// This trait abstracts the network layer, allowing for different
/// implementations (HTTP, WebSocket, in-process for testing, etc.).
pub trait SyncTransport: Send + Sync {
    /// Pulls changes from the server.
    fn pull(&self, request: &PullRequest) -> SyncResult<PullResponse>;

    /// Pushes changes to the server.
    fn push(&self, request: &PushRequest) -> SyncResult<PushResponse>;

    /// Checks if the transport is connected.
    fn is_connected(&self) -> bool;

    /// Closes the transport connection.
    fn close(&self) -> SyncResult<()>;
}

/// An in-process transport talking straight to a [`SyncServer`].
///
/// Every request still goes through CBOR encoding, exactly as it would over a
/// socket. Failures can be injected to exercise retry paths.
pub struct LoopbackTransport<S: AuthorityStore> {
    server: Arc<SyncServer<S>>,
    connected: AtomicBool,
    failing_requests: AtomicU32,
    lost_replies: AtomicU32,
}

impl<S: AuthorityStore> LoopbackTransport<S> {
    /// Creates a transport to `server`.
    pub fn new(server: Arc<SyncServer<S>>) -> Self {
        Self {
            server,
            connected: AtomicBool::new(true),
            failing_requests: AtomicU32::new(0),
            lost_replies: AtomicU32::new(0),
        }
    }

    /// The next `count` requests fail with a retryable error before reaching
    /// the server.
    pub fn fail_next_requests(&self, count: u32) {
        self.failing_requests.store(count, Ordering::SeqCst);
    }

    /// The next `count` requests reach the server, but their replies are lost
    /// and the caller sees a retryable error, like a timeout.
    pub fn lose_next_replies(&self, count: u32) {
        self.lost_replies.store(count, Ordering::SeqCst);
    }

    /// Sets the connected state.
    pub fn set_connected(&self, connected: bool) {
        self.connected.store(connected, Ordering::SeqCst);
    }

    fn exchange(&self, message: SyncMessage) -> SyncResult<SyncMessage> {
        if !self.is_connected() {
            return Err(SyncError::NotConnected);
        }
        if take_one(&self.failing_requests) {
            return Err(SyncError::transport_retryable("connection reset"));
        }

        let body = message.encode()?;
        let reply = self
            .server
            .handle_bytes(&body)
            .map_err(|e| SyncError::transport_fatal(e.to_string()))?;

        if take_one(&self.lost_replies) {
            return Err(SyncError::transport_retryable("reply timed out"));
        }

        match SyncMessage::decode(&reply)? {
            SyncMessage::Error(error) => Err(error.into()),
            other => Ok(other),
        }
    }
}

/// Decrements `counter` if it is positive; true when it did.
fn take_one(counter: &AtomicU32) -> bool {
    counter
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

impl<S: AuthorityStore> SyncTransport for LoopbackTransport<S> {
    fn pull(&self, request: &PullRequest) -> SyncResult<PullResponse> {
        match self.exchange(SyncMessage::PullRequest(request.clone()))? {
            SyncMessage::PullResponse(response) => Ok(response),
            _ => Err(SyncError::Protocol("expected a pull response".into())),
        }
    }

    fn push(&self, request: &PushRequest) -> SyncResult<PushResponse> {
        match self.exchange(SyncMessage::PushRequest(request.clone()))? {
            SyncMessage::PushResponse(response) => Ok(response),
            _ => Err(SyncError::Protocol("expected a push response".into())),
        }
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    fn close(&self) -> SyncResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}
