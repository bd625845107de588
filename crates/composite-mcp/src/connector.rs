//! SSE connector and session

use async_trait::async_trait;
use rmcp::model::{CallToolRequestParam, GetPromptRequestParam};
use rmcp::service::{RoleClient, RunningServiceCancellationToken};
use rmcp::transport::SseClientTransport;
use rmcp::{Peer, ServiceExt};
use tokio::sync::watch;
use tracing::{debug, info};

use composite_core::{
    BackendSession, CallToolOutput, Connector, JsonObject, PromptInfo, PromptOutput,
    SessionError, SessionResult, ToolInfo,
};

use crate::convert;

/// Opens MCP sessions over SSE
#[derive(Debug, Clone, Default)]
pub struct McpConnector;

impl McpConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for McpConnector {
    async fn connect(&self, url: &str) -> SessionResult<Box<dyn BackendSession>> {
        debug!(url = %url, "Opening SSE transport");
        let transport = SseClientTransport::start(url.to_string())
            .await
            .map_err(|e| SessionError::ConnectFailed(format!("{}: {}", url, e)))?;

        let service = ()
            .serve(transport)
            .await
            .map_err(|e| SessionError::ConnectFailed(format!("{}: {}", url, e)))?;

        if let Some(peer) = service.peer_info() {
            info!(
                url = %url,
                server = %peer.server_info.name,
                version = %peer.server_info.version,
                "MCP session initialized"
            );
        }

        let peer = service.peer().clone();
        let cancel = service.cancellation_token();
        let (closed_tx, closed_rx) = watch::channel(None);

        // The service task ends when the transport drops or the session is cancelled
        let watched_url = url.to_string();
        tokio::spawn(async move {
            let reason = match service.waiting().await {
                Ok(reason) => format!("{:?}", reason),
                Err(e) => e.to_string(),
            };
            debug!(url = %watched_url, reason = %reason, "MCP session ended");
            closed_tx.send_replace(Some(reason));
        });

        Ok(Box::new(McpSession {
            url: url.to_string(),
            peer,
            closed: closed_rx,
            cancel: Some(cancel),
        }))
    }
}

/// A live MCP client session; dropping it cancels the session
pub struct McpSession {
    url: String,
    peer: Peer<RoleClient>,
    /// Set to the quit reason once the service task has finished
    closed: watch::Receiver<Option<String>>,
    cancel: Option<RunningServiceCancellationToken>,
}

impl McpSession {
    pub fn url(&self) -> &str {
        &self.url
    }

    fn check_open(&self) -> SessionResult<()> {
        if self.peer.is_transport_closed() || self.closed.borrow().is_some() {
            return Err(SessionError::Closed(format!("transport to {} closed", self.url)));
        }
        Ok(())
    }
}

impl Drop for McpSession {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel.cancel();
        }
    }
}

#[async_trait]
impl BackendSession for McpSession {
    async fn list_tools(&self) -> SessionResult<Vec<ToolInfo>> {
        self.check_open()?;
        let tools = self
            .peer
            .list_all_tools()
            .await
            .map_err(convert::session_error)?;
        Ok(tools.into_iter().map(convert::tool_info).collect())
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> SessionResult<CallToolOutput> {
        self.check_open()?;
        let result = self
            .peer
            .call_tool(CallToolRequestParam {
                name: name.to_string().into(),
                arguments,
            })
            .await
            .map_err(convert::session_error)?;
        Ok(convert::call_tool_output(result))
    }

    async fn list_prompts(&self) -> SessionResult<Vec<PromptInfo>> {
        self.check_open()?;
        let prompts = self
            .peer
            .list_all_prompts()
            .await
            .map_err(convert::session_error)?;
        Ok(prompts.into_iter().map(convert::prompt_info).collect())
    }

    async fn get_prompt(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> SessionResult<PromptOutput> {
        self.check_open()?;
        let result = self
            .peer
            .get_prompt(GetPromptRequestParam {
                name: name.to_string(),
                arguments,
            })
            .await
            .map_err(convert::session_error)?;
        Ok(convert::prompt_output(result))
    }

    async fn closed(&self) -> SessionError {
        let mut rx = self.closed.clone();
        let reason = rx
            .wait_for(Option::is_some)
            .await
            .map(|reason| (*reason).clone().unwrap_or_default())
            .unwrap_or_else(|_| "session task gone".to_string());
        SessionError::Closed(format!("{}: {}", self.url, reason))
    }
}
