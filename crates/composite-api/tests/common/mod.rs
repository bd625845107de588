//! Test utilities for running the gateway on an ephemeral port

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use composite_api::{create_router, AppState};
use composite_core::{BackendDescriptor, CompositeConfig, SupervisorSettings};
use composite_gateway::mock::MockConnector;
use composite_gateway::{CompositeRouter, Registry};

/// A test server that automatically shuts down when dropped
pub struct TestServer {
    pub addr: SocketAddr,
    pub client: reqwest::Client,
    pub registry: Arc<Registry>,
    mcp_shutdown: CancellationToken,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl TestServer {
    /// Serve the gateway API over the given mock backends
    pub async fn start(connector: &MockConnector, backends: Vec<BackendDescriptor>) -> Self {
        let registry = Arc::new(Registry::new(
            Arc::new(CompositeConfig::with_backends(backends)),
            Arc::new(connector.clone()),
            SupervisorSettings {
                start_timeout_ms: 500,
                stop_grace_ms: 500,
            },
        ));
        let state = AppState::new(CompositeRouter::new(registry.clone()));
        let mcp_shutdown = state.shutdown_token().clone();
        let router = create_router(state);

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();

        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        // Give server a moment to start
        tokio::time::sleep(Duration::from_millis(10)).await;

        Self {
            addr,
            client: reqwest::Client::new(),
            registry,
            mcp_shutdown,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.mcp_shutdown.cancel();
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
