//! Aggregation API: prefixed catalogs and call dispatch
//!
//! The text operations (`list_backends`, `list_tools`, `call_tool`, ...)
//! never fail: every error is rendered as a descriptive line. The `try_*`
//! and catalog operations return structured results for callers that map
//! errors themselves, such as the HTTP surface.

use std::sync::Arc;

use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use composite_core::routing::{qualified_name, strip_qualified_prefix};
use composite_core::{
    BackendStatus, CallToolOutput, CompositeError, CompositeResult, JsonObject, PromptOutput,
};

use crate::registry::Registry;
use crate::supervisor::Supervisor;

/// One line of an aggregated catalog
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CatalogLine {
    /// A tool or prompt under its qualified name
    Entry {
        name: String,
        description: String,
    },
    /// A backend whose catalog could not be fetched
    Failed { backend: String, message: String },
}

#[derive(Debug, Clone, Copy)]
enum CatalogKind {
    Tools,
    Prompts,
}

impl CatalogKind {
    fn noun(&self) -> &'static str {
        match self {
            CatalogKind::Tools => "tools",
            CatalogKind::Prompts => "prompts",
        }
    }
}

/// Presents all backends as one namespaced catalog
#[derive(Clone)]
pub struct CompositeRouter {
    registry: Arc<Registry>,
}

impl CompositeRouter {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    // =========================================================================
    // Backends
    // =========================================================================

    pub async fn backend_statuses(&self) -> CompositeResult<Vec<BackendStatus>> {
        let supervisors = self.registry.ensure_ready().await?;
        Ok(supervisors.iter().map(|s| s.status()).collect())
    }

    /// `{name}: connected|disconnected ({url})` per backend
    pub async fn list_backends(&self) -> String {
        match self.backend_statuses().await {
            Ok(statuses) if statuses.is_empty() => "No backends configured".to_string(),
            Ok(statuses) => statuses
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("\n"),
            Err(e) => format!("Error: {}", e),
        }
    }

    // =========================================================================
    // Tools
    // =========================================================================

    /// Qualified tools of every connected backend, in backend order
    pub async fn tool_catalog(&self) -> CompositeResult<Vec<CatalogLine>> {
        self.catalog(CatalogKind::Tools).await
    }

    /// `{prefix}_{tool}: {description}` per tool
    pub async fn list_tools(&self) -> String {
        match self.tool_catalog().await {
            Ok(lines) => render_catalog(&lines, CatalogKind::Tools),
            Err(e) => format!("Error: {}", e),
        }
    }

    /// Dispatch a qualified tool call to the backend that owns its prefix
    pub async fn try_call_tool(
        &self,
        qualified: &str,
        arguments: Option<JsonObject>,
    ) -> CompositeResult<CallToolOutput> {
        let (supervisor, local) = self
            .resolve(qualified)
            .await?
            .ok_or_else(|| CompositeError::ToolNotFound(qualified.to_string()))?;
        debug!(backend = %supervisor.name(), tool = %local, "Routing tool call");
        supervisor.call_tool(local, arguments).await
    }

    /// Call a tool and render its output as text
    pub async fn call_tool(&self, qualified: &str, arguments: Option<JsonObject>) -> String {
        match self.try_call_tool(qualified, arguments).await {
            Ok(output) => output.render_text(),
            Err(e @ CompositeError::ToolNotFound(_)) => e.to_string(),
            Err(e) if is_routing_error(&e) => format!("Error: {}", e),
            Err(e) => format!("Error calling tool: {}", e),
        }
    }

    // =========================================================================
    // Prompts
    // =========================================================================

    pub async fn prompt_catalog(&self) -> CompositeResult<Vec<CatalogLine>> {
        self.catalog(CatalogKind::Prompts).await
    }

    /// `{prefix}_{prompt}: {description}` per prompt
    pub async fn list_prompts(&self) -> String {
        match self.prompt_catalog().await {
            Ok(lines) => render_catalog(&lines, CatalogKind::Prompts),
            Err(e) => format!("Error: {}", e),
        }
    }

    pub async fn try_get_prompt(
        &self,
        qualified: &str,
        arguments: Option<JsonObject>,
    ) -> CompositeResult<PromptOutput> {
        let (supervisor, local) = self
            .resolve(qualified)
            .await?
            .ok_or_else(|| CompositeError::PromptNotFound(qualified.to_string()))?;
        debug!(backend = %supervisor.name(), prompt = %local, "Routing prompt request");
        supervisor.get_prompt(local, arguments).await
    }

    /// Fetch a prompt and render its messages as `{role}: {text}` lines
    pub async fn get_prompt(&self, qualified: &str, arguments: Option<JsonObject>) -> String {
        match self.try_get_prompt(qualified, arguments).await {
            Ok(output) => output.render_text(),
            Err(e @ CompositeError::PromptNotFound(_)) => e.to_string(),
            Err(e) if is_routing_error(&e) => format!("Error: {}", e),
            Err(e) => format!("Error getting prompt: {}", e),
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Find the supervisor whose `{prefix}_` leads `qualified`.
    ///
    /// Prefixes are validated not to overlap, so the first match is the
    /// only one.
    async fn resolve<'a>(
        &self,
        qualified: &'a str,
    ) -> CompositeResult<Option<(&Arc<Supervisor>, &'a str)>> {
        let supervisors = self.registry.ensure_ready().await?;
        Ok(supervisors.iter().find_map(|s| {
            strip_qualified_prefix(qualified, s.prefix()).map(|local| (s, local))
        }))
    }

    async fn catalog(&self, kind: CatalogKind) -> CompositeResult<Vec<CatalogLine>> {
        let supervisors = self.registry.ensure_ready().await?;
        let connected: Vec<&Arc<Supervisor>> =
            supervisors.iter().filter(|s| s.is_connected()).collect();

        let listings = join_all(connected.iter().map(|s| async move {
            match kind {
                CatalogKind::Tools => s.list_tools().await.map(|tools| {
                    tools
                        .iter()
                        .map(|t| CatalogLine::Entry {
                            name: qualified_name(s.prefix(), &t.name),
                            description: t.description_text().to_string(),
                        })
                        .collect::<Vec<_>>()
                }),
                CatalogKind::Prompts => s.list_prompts().await.map(|prompts| {
                    prompts
                        .iter()
                        .map(|p| CatalogLine::Entry {
                            name: qualified_name(s.prefix(), &p.name),
                            description: p.description_text().to_string(),
                        })
                        .collect::<Vec<_>>()
                }),
            }
        }))
        .await;

        let mut lines = Vec::new();
        for (supervisor, listing) in connected.iter().zip(listings) {
            match listing {
                Ok(entries) => lines.extend(entries),
                Err(e) => {
                    warn!(
                        backend = %supervisor.name(),
                        error = %e,
                        "Failed to list {} from backend",
                        kind.noun()
                    );
                    lines.push(CatalogLine::Failed {
                        backend: supervisor.name().to_string(),
                        message: e.to_string(),
                    });
                }
            }
        }
        Ok(lines)
    }
}

/// Errors that are about where a call went rather than what it did
fn is_routing_error(e: &CompositeError) -> bool {
    matches!(
        e,
        CompositeError::BackendNotConnected(_)
            | CompositeError::ConfigMissing(_)
            | CompositeError::InvalidConfig(_)
    )
}

fn render_catalog(lines: &[CatalogLine], kind: CatalogKind) -> String {
    if lines.is_empty() {
        return format!("No {} available", kind.noun());
    }
    lines
        .iter()
        .map(|line| match line {
            CatalogLine::Entry { name, description } => format!("{}: {}", name, description),
            CatalogLine::Failed { backend, message } => {
                format!("{}: Error listing {} - {}", backend, kind.noun(), message)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
