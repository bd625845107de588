//! composite-api - HTTP surfaces for the composite tool gateway
//!
//! Exposes the aggregated backend catalog two ways on one listener:
//! - an MCP server on `/sse` (see [`mcp`]) whose `composite_*` tools return
//!   the router's text rendering
//! - a REST API under `/v1`. Handlers are thin: they delegate to
//!   [`CompositeRouter`](composite_gateway::CompositeRouter) and map
//!   [`CompositeError`](composite_core::CompositeError) onto status codes.
//!
//! # Usage
//!
//! ```ignore
//! use composite_api::{create_router, AppState};
//!
//! let state = AppState::with_allow_origin(router, "*");
//! let app = create_router(state);
//! axum::serve(listener, app).await?;
//! ```

pub mod error;
pub mod handlers;
pub mod mcp;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// CORS layer for the configured origin; `*` allows any origin
pub fn cors_layer(allow_origin: &str) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
    if allow_origin == "*" {
        return cors.allow_origin(Any);
    }
    match HeaderValue::from_str(allow_origin) {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            tracing::warn!(allow_origin, "Invalid CORS origin, allowing any origin");
            cors.allow_origin(Any)
        }
    }
}

/// Create the gateway router (MCP over SSE and REST) with the given state
pub fn create_router(state: AppState) -> Router {
    let cors = cors_layer(state.allow_origin());
    let mcp = mcp::sse_router(state.router().clone(), state.shutdown_token().clone());

    Router::new()
        // Health check
        .route("/health", get(|| async { "OK" }))
        // Backends
        .route("/v1/backends", get(handlers::backends::list_backends))
        // Tools
        .route("/v1/tools", get(handlers::tools::list_tools))
        .route(
            "/v1/tools/{qualified_name}",
            post(handlers::tools::call_tool),
        )
        // Prompts
        .route("/v1/prompts", get(handlers::prompts::list_prompts))
        .route(
            "/v1/prompts/{qualified_name}",
            post(handlers::prompts::get_prompt),
        )
        .with_state(state)
        .merge(mcp)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use composite_core::{BackendDescriptor, CompositeConfig, SupervisorSettings};
    use composite_gateway::mock::{MockBackend, MockConnector};
    use composite_gateway::{CompositeRouter, Registry};
    use tower::ServiceExt;

    fn app(connector: MockConnector, backends: Vec<BackendDescriptor>) -> Router {
        let registry = Registry::new(
            Arc::new(CompositeConfig::with_backends(backends)),
            Arc::new(connector),
            SupervisorSettings::default(),
        );
        create_router(AppState::new(CompositeRouter::new(Arc::new(registry))))
    }

    #[tokio::test]
    async fn health_does_not_bootstrap() {
        let connector = MockConnector::new().with_backend("http://a/sse", MockBackend::new());
        let app = app(
            connector.clone(),
            vec![BackendDescriptor::new("a", "http://a/sse")],
        );

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"OK");
        assert!(connector.connect_attempts().is_empty());
    }

    #[tokio::test]
    async fn invalid_arguments_are_rejected() {
        let connector = MockConnector::new()
            .with_backend("http://a/sse", MockBackend::new().with_tool("echo", "Echo"));
        let app = app(connector, vec![BackendDescriptor::new("a", "http://a/sse")]);

        let response = app
            .oneshot(
                Request::post("/v1/tools/a_echo")
                    .header("content-type", "application/json")
                    .body(Body::from("[1, 2, 3]"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
