//! Main sync server.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use crate::handler::{HandlerContext, RequestHandler};
use rollcall_core::{AuthorityStore, SyncEngine};
use rollcall_protocol::{PullRequest, PullResponse, PushRequest, PushResponse, SyncMessage};
use std::sync::Arc;
use tracing::warn;

/// The sync server.
///
/// This server answers push and pull requests from clients using the
/// Rollcall sync protocol. All state lives in the engine's authority store,
/// so one server can be shared across threads.
///
/// # Example
///
/// ```
/// use rollcall_core::{MemoryStore, SyncEngine};
/// use rollcall_protocol::{EntityKind, PullRequest, SyncMessage};
/// use rollcall_server::{ServerConfig, SyncServer};
///
/// let server = SyncServer::new(ServerConfig::default(), SyncEngine::new(MemoryStore::new()));
///
/// // In a real application an HTTP or socket layer calls handle_message()
/// // or handle_bytes() for every incoming request.
/// let request = PullRequest::full(EntityKind::Student);
/// let reply = server.handle_message(SyncMessage::PullRequest(request));
/// assert!(matches!(reply, SyncMessage::PullResponse(_)));
/// ```
pub struct SyncServer<S: AuthorityStore> {
    handler: RequestHandler<S>,
    context: Arc<HandlerContext<S>>,
}

impl<S: AuthorityStore> SyncServer<S> {
    /// Creates a new sync server owning `engine`.
    pub fn new(config: ServerConfig, engine: SyncEngine<S>) -> Self {
        Self::with_engine(config, Arc::new(engine))
    }

    /// Creates a sync server over a shared engine.
    pub fn with_engine(config: ServerConfig, engine: Arc<SyncEngine<S>>) -> Self {
        let context = Arc::new(HandlerContext::new(config, engine));
        let handler = RequestHandler::new(Arc::clone(&context));

        Self { handler, context }
    }

    /// Handles a pull request.
    pub fn handle_pull(&self, request: PullRequest) -> ServerResult<PullResponse> {
        self.handler.handle_pull(request)
    }

    /// Handles a push request.
    pub fn handle_push(&self, request: PushRequest) -> ServerResult<PushResponse> {
        self.handler.handle_push(request)
    }

    /// Handles a sync message (dispatches to appropriate handler).
    ///
    /// Failures come back as [`SyncMessage::Error`] carrying the retry hint.
    pub fn handle_message(&self, message: SyncMessage) -> SyncMessage {
        let result = match message {
            SyncMessage::PullRequest(req) => self.handle_pull(req).map(SyncMessage::PullResponse),
            SyncMessage::PushRequest(req) => self.handle_push(req).map(SyncMessage::PushResponse),
            SyncMessage::PushResponse(_) => Err(ServerError::UnexpectedMessage("push_response")),
            SyncMessage::PullResponse(_) => Err(ServerError::UnexpectedMessage("pull_response")),
            SyncMessage::Error(_) => Err(ServerError::UnexpectedMessage("error")),
        };

        result.unwrap_or_else(|err| {
            if err.is_server_error() {
                warn!(error = %err, retryable = err.is_retryable(), "request failed");
            }
            SyncMessage::Error(err.to_response())
        })
    }

    /// Handles one CBOR-encoded message and returns the CBOR-encoded reply.
    ///
    /// Undecodable input is answered with an error reply rather than an
    /// `Err`; only a reply that cannot be encoded fails.
    pub fn handle_bytes(&self, request: &[u8]) -> ServerResult<Vec<u8>> {
        let reply = match SyncMessage::decode(request) {
            Ok(message) => self.handle_message(message),
            Err(err) => SyncMessage::Error(ServerError::from(err).to_response()),
        };
        reply
            .encode()
            .map_err(|e| ServerError::Internal(e.to_string()))
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.context.config
    }

    /// The engine requests are served from.
    pub fn engine(&self) -> &Arc<SyncEngine<S>> {
        &self.context.engine
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::MemoryStore;
    use rollcall_protocol::{EntityKind, ErrorCode, Record, RecordBatch, Student};

    fn server() -> SyncServer<MemoryStore> {
        SyncServer::new(ServerConfig::default(), SyncEngine::new(MemoryStore::new()))
    }

    fn push(sbrn: &str, name: &str, version: u64) -> PushRequest {
        PushRequest::new(RecordBatch::Students(vec![Record::new(
            Student::new(sbrn, name),
            version,
        )]))
    }

    #[test]
    fn full_sync_flow() {
        let server = server();

        // 1. Pull (should be empty initially)
        let response = server
            .handle_pull(PullRequest::full(EntityKind::Student))
            .unwrap();
        assert!(response.batch.is_empty());
        assert_eq!(response.next_watermark, None);

        // 2. Push a change
        let response = server.handle_push(push("S001", "Alice", 1)).unwrap();
        assert_eq!(response.accepted, 1);

        // 3. Pull again (should get the pushed record)
        let response = server
            .handle_pull(PullRequest::full(EntityKind::Student))
            .unwrap();
        assert_eq!(response.batch.len(), 1);
        let watermark = response.next_watermark.clone();

        // 4. Pull from the watermark (nothing new, watermark echoed)
        let response = server
            .handle_pull(PullRequest::since(EntityKind::Student, watermark.clone()))
            .unwrap();
        assert!(response.batch.is_empty());
        assert_eq!(response.next_watermark, watermark);
    }

    #[test]
    fn message_dispatch() {
        let server = server();
        let reply = server.handle_message(SyncMessage::PushRequest(push("S001", "Alice", 1)));
        assert!(matches!(reply, SyncMessage::PushResponse(r) if r.accepted == 1));
    }

    #[test]
    fn unexpected_message_is_answered_with_error() {
        let server = server();
        let reply = server.handle_message(SyncMessage::PushResponse(PushResponse::default()));
        match reply {
            SyncMessage::Error(e) => {
                assert_eq!(e.code, ErrorCode::Validation);
                assert!(!e.retryable);
            }
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[test]
    fn malformed_watermark_reply() {
        let server = server();
        let reply = server.handle_message(SyncMessage::PullRequest(PullRequest::since(
            EntityKind::Student,
            Some("yesterday".into()),
        )));
        assert!(matches!(
            reply,
            SyncMessage::Error(e) if e.code == ErrorCode::MalformedWatermark && !e.retryable
        ));
    }

    #[test]
    fn unavailable_store_reply_is_retryable() {
        let server = server();
        server.engine().store().set_unavailable(true);
        let reply = server.handle_message(SyncMessage::PushRequest(push("S001", "Alice", 1)));
        assert!(matches!(reply, SyncMessage::Error(ref e) if e.retryable));

        server.engine().store().set_unavailable(false);
        let reply = server.handle_message(SyncMessage::PushRequest(push("S001", "Alice", 1)));
        assert!(matches!(reply, SyncMessage::PushResponse(r) if r.accepted == 1));
    }

    #[test]
    fn bytes_round_trip() {
        let server = server();
        let request = SyncMessage::PushRequest(push("S001", "Alice", 1))
            .encode()
            .unwrap();
        let reply = SyncMessage::decode(&server.handle_bytes(&request).unwrap()).unwrap();
        assert!(matches!(reply, SyncMessage::PushResponse(_)));

        let garbage = SyncMessage::decode(&server.handle_bytes(&[0xff, 0x01]).unwrap()).unwrap();
        assert!(matches!(garbage, SyncMessage::Error(e) if e.code == ErrorCode::Validation));
    }

    #[test]
    fn shared_engine() {
        let engine = Arc::new(SyncEngine::new(MemoryStore::new()));
        let server = SyncServer::with_engine(ServerConfig::default(), Arc::clone(&engine));

        server.handle_push(push("S001", "Alice", 1)).unwrap();
        assert_eq!(engine.stats().unwrap().collections[0].rows, 1);
    }
}
