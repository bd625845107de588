//! Application state for the gateway API

use std::sync::Arc;

use composite_gateway::{CompositeRouter, Registry};
use tokio_util::sync::CancellationToken;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    router: Arc<CompositeRouter>,
    /// Value for `Access-Control-Allow-Origin`
    allow_origin: Arc<str>,
    /// Cancelled to end open MCP sessions on shutdown
    shutdown: CancellationToken,
}

impl AppState {
    /// Create a new AppState that allows any origin
    pub fn new(router: CompositeRouter) -> Self {
        Self::with_allow_origin(router, "*")
    }

    pub fn with_allow_origin(router: CompositeRouter, allow_origin: &str) -> Self {
        Self {
            router: Arc::new(router),
            allow_origin: Arc::from(allow_origin),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn router(&self) -> &Arc<CompositeRouter> {
        &self.router
    }

    pub fn registry(&self) -> &Arc<Registry> {
        self.router.registry()
    }

    pub fn allow_origin(&self) -> &str {
        &self.allow_origin
    }

    /// Token that closes every MCP session when cancelled
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }
}
