//! Scriptable in-memory backends for testing
//!
//! A [`MockConnector`] maps urls to [`MockBackend`] scripts. Connecting to an
//! unknown url fails like a refused connection. Every connect attempt and
//! every served call is recorded so tests can assert on what reached a
//! backend and in which order.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use tokio::sync::watch;

use composite_core::{
    BackendSession, CallToolOutput, Connector, JsonObject, PromptInfo, PromptOutput,
    SessionError, SessionResult, ToolInfo,
};

/// Script for one mock backend
#[derive(Debug, Clone, Default)]
pub struct MockBackend {
    tools: Vec<ToolInfo>,
    prompts: Vec<(PromptInfo, PromptOutput)>,
    responses: HashMap<String, Result<CallToolOutput, String>>,
    connect_delay: Duration,
    call_latency: Duration,
    refuse: bool,
    list_tools_error: Option<String>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Advertise a tool. Unscripted tools echo their arguments as JSON text.
    pub fn with_tool(mut self, name: &str, description: &str) -> Self {
        self.tools.push(ToolInfo::new(name, description));
        self
    }

    /// Advertise a tool with a fixed response
    pub fn with_tool_response(mut self, name: &str, output: CallToolOutput) -> Self {
        if !self.tools.iter().any(|t| t.name == name) {
            self.tools.push(ToolInfo::new(name, ""));
        }
        self.responses.insert(name.to_string(), Ok(output));
        self
    }

    /// Advertise a tool that always fails with `message`
    pub fn with_tool_error(mut self, name: &str, message: &str) -> Self {
        if !self.tools.iter().any(|t| t.name == name) {
            self.tools.push(ToolInfo::new(name, ""));
        }
        self.responses
            .insert(name.to_string(), Err(message.to_string()));
        self
    }

    pub fn with_prompt(mut self, info: PromptInfo, output: PromptOutput) -> Self {
        self.prompts.push((info, output));
        self
    }

    /// Delay before the session opens
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// Delay before every call is answered
    pub fn with_call_latency(mut self, latency: Duration) -> Self {
        self.call_latency = latency;
        self
    }

    /// Refuse every connection attempt
    pub fn refusing(mut self) -> Self {
        self.refuse = true;
        self
    }

    /// Fail tool listings with `message`
    pub fn with_list_tools_error(mut self, message: &str) -> Self {
        self.list_tools_error = Some(message.to_string());
        self
    }
}

/// A call that reached a mock backend
#[derive(Debug, Clone, PartialEq)]
pub struct ServedCall {
    pub method: &'static str,
    pub name: Option<String>,
    pub arguments: Option<JsonObject>,
}

struct MockState {
    backends: RwLock<HashMap<String, MockBackend>>,
    connects: Mutex<Vec<String>>,
    severed: watch::Sender<HashSet<String>>,
    served: Mutex<HashMap<String, Vec<ServedCall>>>,
    closed: Mutex<HashMap<String, usize>>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            backends: RwLock::default(),
            connects: Mutex::default(),
            severed: watch::Sender::new(HashSet::new()),
            served: Mutex::default(),
            closed: Mutex::default(),
        }
    }
}

/// Connector serving scripted backends
#[derive(Clone, Default)]
pub struct MockConnector {
    state: Arc<MockState>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a backend script for `url`
    pub fn with_backend(self, url: &str, backend: MockBackend) -> Self {
        self.state
            .backends
            .write()
            .insert(url.to_string(), backend);
        self
    }

    /// Drop the connection of the backend at `url`.
    ///
    /// Open sessions observe the loss right away, later calls fail as closed.
    pub fn sever(&self, url: &str) {
        self.state.severed.send_modify(|severed| {
            severed.insert(url.to_string());
        });
    }

    /// Urls that connection attempts were made to, in order
    pub fn connect_attempts(&self) -> Vec<String> {
        self.state.connects.lock().clone()
    }

    pub fn was_contacted(&self, url: &str) -> bool {
        self.state.connects.lock().iter().any(|u| u == url)
    }

    /// Calls served by the backend at `url`, in the order they were served
    pub fn served(&self, url: &str) -> Vec<ServedCall> {
        self.state
            .served
            .lock()
            .get(url)
            .cloned()
            .unwrap_or_default()
    }

    /// Number of sessions to `url` that have been closed
    pub fn closed_sessions(&self, url: &str) -> usize {
        self.state.closed.lock().get(url).copied().unwrap_or(0)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, url: &str) -> SessionResult<Box<dyn BackendSession>> {
        self.state.connects.lock().push(url.to_string());

        let backend = self
            .state
            .backends
            .read()
            .get(url)
            .cloned()
            .ok_or_else(|| SessionError::ConnectFailed(format!("connection refused: {}", url)))?;

        if !backend.connect_delay.is_zero() {
            tokio::time::sleep(backend.connect_delay).await;
        }
        if backend.refuse {
            return Err(SessionError::ConnectFailed(format!(
                "connection refused: {}",
                url
            )));
        }

        Ok(Box::new(MockSession {
            url: url.to_string(),
            backend,
            state: self.state.clone(),
        }))
    }
}

struct MockSession {
    url: String,
    backend: MockBackend,
    state: Arc<MockState>,
}

impl MockSession {
    async fn serve(
        &self,
        method: &'static str,
        name: Option<&str>,
        arguments: Option<&JsonObject>,
    ) -> SessionResult<()> {
        if !self.backend.call_latency.is_zero() {
            tokio::time::sleep(self.backend.call_latency).await;
        }
        if self.state.severed.borrow().contains(&self.url) {
            return Err(severed());
        }
        self.state
            .served
            .lock()
            .entry(self.url.clone())
            .or_default()
            .push(ServedCall {
                method,
                name: name.map(str::to_string),
                arguments: arguments.cloned(),
            });
        Ok(())
    }
}

#[async_trait]
impl BackendSession for MockSession {
    async fn list_tools(&self) -> SessionResult<Vec<ToolInfo>> {
        self.serve("tools/list", None, None).await?;
        match &self.backend.list_tools_error {
            Some(message) => Err(SessionError::Remote(message.clone())),
            None => Ok(self.backend.tools.clone()),
        }
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> SessionResult<CallToolOutput> {
        self.serve("tools/call", Some(name), arguments.as_ref())
            .await?;

        if let Some(response) = self.backend.responses.get(name) {
            return response.clone().map_err(SessionError::Remote);
        }
        if !self.backend.tools.iter().any(|t| t.name == name) {
            return Err(SessionError::Remote(format!("Unknown tool: {}", name)));
        }

        let echo = serde_json::Value::Object(arguments.unwrap_or_default());
        Ok(CallToolOutput::text(echo.to_string()))
    }

    async fn list_prompts(&self) -> SessionResult<Vec<PromptInfo>> {
        self.serve("prompts/list", None, None).await?;
        Ok(self.backend.prompts.iter().map(|(p, _)| p.clone()).collect())
    }

    async fn get_prompt(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> SessionResult<PromptOutput> {
        self.serve("prompts/get", Some(name), arguments.as_ref())
            .await?;
        self.backend
            .prompts
            .iter()
            .find(|(p, _)| p.name == name)
            .map(|(_, output)| output.clone())
            .ok_or_else(|| SessionError::Remote(format!("Unknown prompt: {}", name)))
    }

    async fn closed(&self) -> SessionError {
        let mut rx = self.state.severed.subscribe();
        let _ = rx.wait_for(|urls| urls.contains(&self.url)).await;
        severed()
    }
}

fn severed() -> SessionError {
    SessionError::Closed("connection reset by peer".into())
}

impl Drop for MockSession {
    fn drop(&mut self) {
        *self.state.closed.lock().entry(self.url.clone()).or_default() += 1;
    }
}
