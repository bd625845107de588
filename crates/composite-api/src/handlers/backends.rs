//! Backend status handlers

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use composite_core::{BackendStatus, SupervisorState};

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct BackendsResponse {
    pub items: Vec<BackendItem>,
}

#[derive(Serialize)]
pub struct BackendItem {
    pub name: String,
    pub prefix: String,
    pub url: String,
    pub connected: bool,
    pub state: SupervisorState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<String>,
}

impl From<BackendStatus> for BackendItem {
    fn from(status: BackendStatus) -> Self {
        Self {
            name: status.name,
            prefix: status.prefix,
            url: status.url,
            connected: status.connected,
            state: status.state,
            connected_at: status.connected_at.map(|t| t.to_rfc3339()),
        }
    }
}

/// GET /v1/backends
/// List configured backends and their connectivity
pub async fn list_backends(
    State(state): State<AppState>,
) -> Result<Json<BackendsResponse>, ApiError> {
    let statuses = state.router().backend_statuses().await?;
    Ok(Json(BackendsResponse {
        items: statuses.into_iter().map(BackendItem::from).collect(),
    }))
}
