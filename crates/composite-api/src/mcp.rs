//! MCP server surface
//!
//! The gateway is itself an MCP server: clients connect to `/sse` and see a
//! handful of `composite_*` tools that list backends and catalogs and
//! forward calls. Every tool returns the router's plain-text rendering,
//! errors included, so an agent always gets a readable answer.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use rmcp::handler::server::{router::tool::ToolRouter, wrapper::Parameters};
use rmcp::model::{CallToolResult, Content, Implementation, ServerCapabilities, ServerInfo};
use rmcp::schemars;
use rmcp::transport::sse_server::{SseServer, SseServerConfig};
use rmcp::{tool, tool_handler, tool_router, ErrorData, ServerHandler};
use serde::Deserialize;
use tokio_util::sync::CancellationToken;

use composite_core::JsonObject;
use composite_gateway::CompositeRouter;

/// Path of the SSE event stream
pub const SSE_PATH: &str = "/sse";
/// Path clients post JSON-RPC messages to
pub const MESSAGE_PATH: &str = "/messages/";

const SERVER_NAME: &str = "mcp-composite";

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct CallToolRequest {
    #[schemars(description = "Qualified tool name in prefix_toolname format, e.g. 'lang_query'")]
    pub tool_name: String,
    #[schemars(description = "Arguments passed to the backend tool")]
    #[serde(default)]
    pub arguments: Option<JsonObject>,
}

#[derive(Debug, Deserialize, schemars::JsonSchema)]
pub struct GetPromptRequest {
    #[schemars(description = "Qualified prompt name in prefix_promptname format")]
    pub prompt_name: String,
    #[schemars(description = "Arguments used to render the prompt")]
    #[serde(default)]
    pub arguments: Option<JsonObject>,
}

/// MCP handler exposing the aggregation API as tools
#[derive(Clone)]
pub struct CompositeMcpServer {
    router: Arc<CompositeRouter>,
    tool_router: ToolRouter<CompositeMcpServer>,
}

impl CompositeMcpServer {
    pub fn new(router: Arc<CompositeRouter>) -> Self {
        Self {
            router,
            tool_router: Self::tool_router(),
        }
    }
}

fn text(output: String) -> Result<CallToolResult, ErrorData> {
    Ok(CallToolResult::success(vec![Content::text(output)]))
}

#[tool_router]
impl CompositeMcpServer {
    #[tool(description = "List all configured backends and their connection status.")]
    async fn composite_list_backends(&self) -> Result<CallToolResult, ErrorData> {
        text(self.router.list_backends().await)
    }

    #[tool(description = "List all tools available from all connected backends.")]
    async fn composite_list_tools(&self) -> Result<CallToolResult, ErrorData> {
        text(self.router.list_tools().await)
    }

    #[tool(
        description = "Call a tool from a backend. Use prefix_toolname format (e.g., 'lang_query')."
    )]
    async fn composite_call_tool(
        &self,
        Parameters(CallToolRequest {
            tool_name,
            arguments,
        }): Parameters<CallToolRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        text(self.router.call_tool(&tool_name, arguments).await)
    }

    #[tool(description = "List all prompts available from all connected backends.")]
    async fn composite_list_prompts(&self) -> Result<CallToolResult, ErrorData> {
        text(self.router.list_prompts().await)
    }

    #[tool(description = "Render a prompt from a backend. Use prefix_promptname format.")]
    async fn composite_get_prompt(
        &self,
        Parameters(GetPromptRequest {
            prompt_name,
            arguments,
        }): Parameters<GetPromptRequest>,
    ) -> Result<CallToolResult, ErrorData> {
        text(self.router.get_prompt(&prompt_name, arguments).await)
    }
}

#[tool_handler]
impl ServerHandler for CompositeMcpServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "Aggregates several MCP servers. Backend tools are named {prefix}_{tool}; \
                 use composite_list_tools to discover them and composite_call_tool to invoke them."
                    .to_string(),
            ),
            ..Default::default()
        }
    }
}

/// SSE routes serving [`CompositeMcpServer`], one handler per client session.
///
/// Sessions end when `shutdown` is cancelled. The routes are served by
/// whatever listener they are merged into.
pub fn sse_router(router: Arc<CompositeRouter>, shutdown: CancellationToken) -> Router {
    let (sse_server, routes) = SseServer::new(SseServerConfig {
        // Only recorded by the SSE server, never bound
        bind: SocketAddr::from(([0, 0, 0, 0], 0)),
        sse_path: SSE_PATH.to_string(),
        post_path: MESSAGE_PATH.to_string(),
        ct: shutdown,
        sse_keep_alive: None,
    });
    sse_server.with_service(move || CompositeMcpServer::new(router.clone()));
    routes
}
