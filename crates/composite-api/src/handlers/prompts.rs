//! Prompt catalog handlers

use axum::body::Bytes;
use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use composite_core::PromptMessage;

use super::{parse_arguments, CatalogResponse};
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct PromptResponse {
    pub prompt: String,
    /// Messages rendered as `{role}: {text}` lines
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

/// GET /v1/prompts
pub async fn list_prompts(
    State(state): State<AppState>,
) -> Result<Json<CatalogResponse>, ApiError> {
    let lines = state.router().prompt_catalog().await?;
    Ok(Json(lines.into()))
}

/// POST /v1/prompts/{qualified_name}
pub async fn get_prompt(
    State(state): State<AppState>,
    Path(qualified_name): Path<String>,
    body: Bytes,
) -> Result<Json<PromptResponse>, ApiError> {
    let arguments = parse_arguments(&body)?;
    let output = state
        .router()
        .try_get_prompt(&qualified_name, arguments)
        .await?;

    Ok(Json(PromptResponse {
        prompt: qualified_name,
        output: output.render_text(),
        description: output.description,
        messages: output.messages,
    }))
}
