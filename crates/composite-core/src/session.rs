//! Backend session traits - the seam between the gateway and the wire protocol

use async_trait::async_trait;

use crate::error::{SessionError, SessionResult};
use crate::models::{CallToolOutput, JsonObject, PromptInfo, PromptOutput, ToolInfo};

/// An open session with one tool-serving backend.
///
/// Implementations talk to the backend over whatever protocol they speak.
/// The session is closed when it is dropped.
#[async_trait]
pub trait BackendSession: Send + Sync {
    /// List the tools this backend offers
    async fn list_tools(&self) -> SessionResult<Vec<ToolInfo>>;

    /// Invoke a tool by its backend-local name
    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> SessionResult<CallToolOutput>;

    /// List the prompt templates this backend offers
    async fn list_prompts(&self) -> SessionResult<Vec<PromptInfo>>;

    /// Render a prompt by its backend-local name
    async fn get_prompt(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> SessionResult<PromptOutput>;

    /// Resolves once the session has ended on its own, with the reason.
    ///
    /// Must be cancel-safe: the supervisor races it against incoming
    /// requests while the session is idle.
    async fn closed(&self) -> SessionError;
}

/// Opens sessions to backends by url
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, url: &str) -> SessionResult<Box<dyn BackendSession>>;
}
