//! HTTP request handlers for the gateway API
//!
//! Every handler goes through [`CompositeRouter`](composite_gateway::CompositeRouter),
//! which bootstraps the backend registry on first use.

pub mod backends;
pub mod prompts;
pub mod tools;

use axum::body::Bytes;
use composite_core::JsonObject;
use serde::Serialize;

use crate::error::ApiError;

/// Aggregated catalog listing
#[derive(Serialize)]
pub struct CatalogResponse {
    pub items: Vec<CatalogItem>,
    /// Backends whose catalog could not be fetched
    pub errors: Vec<CatalogErrorItem>,
}

#[derive(Serialize)]
pub struct CatalogItem {
    pub name: String,
    pub description: String,
}

#[derive(Serialize)]
pub struct CatalogErrorItem {
    pub backend: String,
    pub message: String,
}

impl From<Vec<composite_gateway::CatalogLine>> for CatalogResponse {
    fn from(lines: Vec<composite_gateway::CatalogLine>) -> Self {
        use composite_gateway::CatalogLine;

        let mut items = Vec::new();
        let mut errors = Vec::new();
        for line in lines {
            match line {
                CatalogLine::Entry { name, description } => {
                    items.push(CatalogItem { name, description })
                }
                CatalogLine::Failed { backend, message } => {
                    errors.push(CatalogErrorItem { backend, message })
                }
            }
        }
        Self { items, errors }
    }
}

/// Parse an optional JSON object body; an empty body means no arguments
pub(crate) fn parse_arguments(body: &Bytes) -> Result<Option<JsonObject>, ApiError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    serde_json::from_slice::<JsonObject>(body)
        .map(Some)
        .map_err(|e| ApiError::BadRequest(format!("Arguments must be a JSON object: {}", e)))
}
