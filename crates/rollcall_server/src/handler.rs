//! Request handlers for sync endpoints.

use crate::config::ServerConfig;
use crate::error::{ServerError, ServerResult};
use rollcall_core::{AuthorityStore, SyncEngine};
use rollcall_protocol::{PullRequest, PullResponse, PushRequest, PushResponse};
use std::sync::Arc;
use tracing::debug;

/// Context for request handling.
pub struct HandlerContext<S: AuthorityStore> {
    /// Server configuration.
    pub config: ServerConfig,
    /// Engine over the authority store (shared across all handlers).
    pub engine: Arc<SyncEngine<S>>,
}

impl<S: AuthorityStore> HandlerContext<S> {
    /// Creates a new handler context.
    pub fn new(config: ServerConfig, engine: Arc<SyncEngine<S>>) -> Self {
        Self { config, engine }
    }
}

/// Handler for sync requests.
pub struct RequestHandler<S: AuthorityStore> {
    context: Arc<HandlerContext<S>>,
}

impl<S: AuthorityStore> RequestHandler<S> {
    /// Creates a new request handler.
    pub fn new(context: Arc<HandlerContext<S>>) -> Self {
        Self { context }
    }

    /// Handles a pull request.
    pub fn handle_pull(&self, request: PullRequest) -> ServerResult<PullResponse> {
        let limit = self.context.config.effective_pull_limit(request.limit);
        let request = PullRequest {
            limit: Some(limit),
            ..request
        };

        let response = self.context.engine.pull(&request)?;
        debug!(
            kind = %request.kind,
            watermark = ?request.watermark,
            returned = response.batch.len(),
            has_more = response.has_more,
            "served pull"
        );
        Ok(response)
    }

    /// Handles a push request.
    pub fn handle_push(&self, request: PushRequest) -> ServerResult<PushResponse> {
        let max = self.context.config.max_push_batch as usize;
        if request.batch.len() > max {
            return Err(ServerError::InvalidRequest(format!(
                "too many records: {} > {}",
                request.batch.len(),
                max
            )));
        }

        let kind = request.batch.kind();
        let report = self.context.engine.push(request.batch)?;
        debug!(
            %kind,
            accepted = report.accepted,
            stale = report.stale,
            dropped = report.dropped,
            "served push"
        );
        Ok(report.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::MemoryStore;
    use rollcall_protocol::{EntityKind, Record, RecordBatch, Student};

    fn handler(config: ServerConfig) -> RequestHandler<MemoryStore> {
        let engine = Arc::new(SyncEngine::new(MemoryStore::new()));
        RequestHandler::new(Arc::new(HandlerContext::new(config, engine)))
    }

    fn students(n: usize) -> RecordBatch {
        RecordBatch::Students(
            (0..n)
                .map(|i| Record::new(Student::new(format!("S{i:03}"), "x"), 1))
                .collect(),
        )
    }

    #[test]
    fn oversized_push_is_rejected_before_the_engine() {
        let handler = handler(ServerConfig::new().with_max_push_batch(2));
        let err = handler.handle_push(PushRequest::new(students(3))).unwrap_err();
        assert!(err.is_client_error());

        let pulled = handler
            .handle_pull(PullRequest::full(EntityKind::Student))
            .unwrap();
        assert!(pulled.batch.is_empty());
    }

    #[test]
    fn empty_push_is_a_client_error() {
        let handler = handler(ServerConfig::default());
        let err = handler
            .handle_push(PushRequest::new(RecordBatch::empty(EntityKind::Student)))
            .unwrap_err();
        assert!(matches!(err, ServerError::InvalidRequest(_)));
    }

    #[test]
    fn pull_uses_default_limit_and_clamps() {
        let handler = handler(
            ServerConfig::new()
                .with_max_pull_batch(4)
                .with_default_pull_limit(3),
        );
        handler.handle_push(PushRequest::new(students(6))).unwrap();

        let page = handler
            .handle_pull(PullRequest::full(EntityKind::Student))
            .unwrap();
        assert_eq!(page.batch.len(), 3);
        assert!(page.has_more);

        let page = handler
            .handle_pull(PullRequest::full(EntityKind::Student).with_limit(100))
            .unwrap();
        assert_eq!(page.batch.len(), 4);
        assert!(page.has_more);
    }
}
