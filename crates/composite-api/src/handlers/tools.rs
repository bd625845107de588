//! Tool catalog and invocation handlers

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use composite_core::ContentPart;

use super::{parse_arguments, CatalogResponse};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ToolCallResponse {
    pub tool: String,
    /// Content parts rendered and joined with newlines
    pub output: String,
    pub content: Vec<ContentPart>,
    pub is_error: bool,
}

/// GET /v1/tools
/// List tools of every connected backend under their qualified names
pub async fn list_tools(State(state): State<AppState>) -> Result<Json<CatalogResponse>, ApiError> {
    let lines = state.router().tool_catalog().await?;
    Ok(Json(lines.into()))
}

/// POST /v1/tools/{qualified_name}
/// Call a tool; the body is an optional JSON object of arguments
pub async fn call_tool(
    State(state): State<AppState>,
    Path(qualified_name): Path<String>,
    body: Bytes,
) -> Result<Json<ToolCallResponse>, ApiError> {
    let arguments = parse_arguments(&body)?;
    let output = state
        .router()
        .try_call_tool(&qualified_name, arguments)
        .await?;

    Ok(Json(ToolCallResponse {
        tool: qualified_name,
        output: output.render_text(),
        is_error: output.is_error,
        content: output.content,
    }))
}
