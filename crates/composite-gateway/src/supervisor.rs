//! Per-backend connection supervisor
//!
//! A [`Supervisor`] owns the single long-lived session to one backend. A
//! dedicated worker task opens the session and then serves queued requests
//! one at a time, in submission order, until it is told to stop or the
//! session is lost. Callers never touch the session directly: they enqueue a
//! [`BackendCall`] and await the reply slot attached to it.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::{Mutex, RwLock};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use composite_core::{
    BackendDescriptor, BackendSession, BackendStatus, CallToolOutput, CompositeError,
    CompositeResult, Connector, JsonObject, PromptInfo, PromptOutput, SessionError,
    SupervisorSettings, SupervisorState, ToolInfo,
};

/// A request for the backend, as queued by callers
#[derive(Debug, Clone)]
pub enum BackendCall {
    ListTools,
    CallTool {
        name: String,
        arguments: Option<JsonObject>,
    },
    ListPrompts,
    GetPrompt {
        name: String,
        arguments: Option<JsonObject>,
    },
}

impl BackendCall {
    /// Protocol method name, for logging
    pub fn method(&self) -> &'static str {
        match self {
            BackendCall::ListTools => "tools/list",
            BackendCall::CallTool { .. } => "tools/call",
            BackendCall::ListPrompts => "prompts/list",
            BackendCall::GetPrompt { .. } => "prompts/get",
        }
    }
}

/// Reply to a [`BackendCall`]
#[derive(Debug, Clone)]
pub enum BackendReply {
    Tools(Vec<ToolInfo>),
    ToolOutput(CallToolOutput),
    Prompts(Vec<PromptInfo>),
    Prompt(PromptOutput),
}

/// A queued call and the slot its result is delivered to
struct PendingRequest {
    call: BackendCall,
    reply: oneshot::Sender<CompositeResult<BackendReply>>,
}

#[derive(Debug)]
struct Status {
    state: SupervisorState,
    connected_at: Option<DateTime<Utc>>,
}

impl Status {
    fn set(&mut self, state: SupervisorState) {
        self.state = state;
        if state == SupervisorState::Connected {
            self.connected_at = Some(Utc::now());
        } else {
            self.connected_at = None;
        }
    }
}

/// Owns the connection to one backend
pub struct Supervisor {
    name: String,
    url: String,
    prefix: String,
    connector: Arc<dyn Connector>,
    settings: SupervisorSettings,
    status: Arc<RwLock<Status>>,
    requests: Mutex<Option<mpsc::UnboundedSender<PendingRequest>>>,
    stop_tx: watch::Sender<bool>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl Supervisor {
    pub fn new(
        descriptor: &BackendDescriptor,
        connector: Arc<dyn Connector>,
        settings: SupervisorSettings,
    ) -> Self {
        let (stop_tx, _) = watch::channel(false);
        Self {
            name: descriptor.name.clone(),
            url: descriptor.url.clone(),
            prefix: descriptor.prefix().to_string(),
            connector,
            settings,
            status: Arc::new(RwLock::new(Status {
                state: SupervisorState::Created,
                connected_at: None,
            })),
            requests: Mutex::new(None),
            stop_tx,
            worker: Mutex::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn state(&self) -> SupervisorState {
        self.status.read().state
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    pub fn status(&self) -> BackendStatus {
        let status = self.status.read();
        BackendStatus {
            name: self.name.clone(),
            prefix: self.prefix.clone(),
            url: self.url.clone(),
            connected: status.state.is_connected(),
            state: status.state,
            connected_at: status.connected_at,
        }
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start the worker and wait for the connected confirmation.
    ///
    /// Returns whether the backend is connected. Connection failures are
    /// logged, never raised. Calling this again does not spawn another
    /// worker; it only reports the current connectivity.
    pub async fn start(&self) -> bool {
        match self.try_start().await {
            Ok(()) => true,
            Err(e) => {
                warn!(backend = %self.name, url = %self.url, error = %e, "Backend failed to start");
                false
            }
        }
    }

    /// Like [`start`](Self::start), but reports why the backend is not connected
    pub async fn try_start(&self) -> CompositeResult<()> {
        let ready_rx = {
            let mut worker = self.worker.lock();
            if worker.is_some() || self.state() != SupervisorState::Created {
                return if self.is_connected() {
                    Ok(())
                } else {
                    Err(CompositeError::BackendNotConnected(self.name.clone()))
                };
            }

            let (request_tx, request_rx) = mpsc::unbounded_channel();
            let (ready_tx, ready_rx) = oneshot::channel();
            *self.requests.lock() = Some(request_tx);
            self.status.write().set(SupervisorState::Connecting);

            let ctx = WorkerContext {
                name: self.name.clone(),
                url: self.url.clone(),
                connector: self.connector.clone(),
                status: self.status.clone(),
            };
            *worker = Some(tokio::spawn(ctx.run(
                request_rx,
                self.stop_tx.subscribe(),
                ready_tx,
            )));
            debug!(backend = %self.name, url = %self.url, "Spawned backend worker");
            ready_rx
        };

        match tokio::time::timeout(self.settings.start_timeout(), ready_rx).await {
            Ok(Ok(Ok(()))) => Ok(()),
            Ok(Ok(Err(e))) => Err(e.into()),
            Ok(Err(_)) => Err(CompositeError::BackendNotConnected(self.name.clone())),
            Err(_) => Err(CompositeError::BackendStartTimeout {
                backend: self.name.clone(),
                timeout_ms: self.settings.start_timeout_ms,
            }),
        }
    }

    /// Stop the worker and close the session.
    ///
    /// Waits up to the grace period for the worker to exit, then aborts it.
    /// Requests still queued or in flight fail with `Cancelled`. Always
    /// leaves the supervisor disconnected. Safe to call more than once.
    pub async fn stop(&self) {
        let handle = self.worker.lock().take();
        self.stop_tx.send_replace(true);
        self.requests.lock().take();

        let Some(mut handle) = handle else {
            self.status.write().set(SupervisorState::Stopped);
            return;
        };

        self.status.write().set(SupervisorState::Stopping);
        debug!(backend = %self.name, "Stopping backend worker");

        match tokio::time::timeout(self.settings.stop_grace(), &mut handle).await {
            Ok(_) => debug!(backend = %self.name, "Backend worker exited"),
            Err(_) => {
                warn!(
                    backend = %self.name,
                    grace_ms = self.settings.stop_grace_ms,
                    "Backend worker did not exit in time, aborting"
                );
                handle.abort();
            }
        }

        self.status.write().set(SupervisorState::Stopped);
        info!(backend = %self.name, "Backend stopped");
    }

    // =========================================================================
    // Calls
    // =========================================================================

    /// Queue a call and wait for its reply.
    ///
    /// The call is enqueued before the first suspension point, so calls
    /// issued in sequence are served in that sequence.
    pub async fn call(&self, call: BackendCall) -> CompositeResult<BackendReply> {
        if !self.is_connected() {
            return Err(CompositeError::BackendNotConnected(self.name.clone()));
        }
        let sender = self
            .requests
            .lock()
            .clone()
            .ok_or_else(|| CompositeError::BackendNotConnected(self.name.clone()))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        sender
            .send(PendingRequest {
                call,
                reply: reply_tx,
            })
            .map_err(|_| CompositeError::BackendNotConnected(self.name.clone()))?;

        reply_rx.await.map_err(|_| {
            CompositeError::Cancelled(format!("backend {} stopped", self.name))
        })?
    }

    pub async fn list_tools(&self) -> CompositeResult<Vec<ToolInfo>> {
        match self.call(BackendCall::ListTools).await? {
            BackendReply::Tools(tools) => Ok(tools),
            other => Err(unexpected_reply("tools/list", &other)),
        }
    }

    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> CompositeResult<CallToolOutput> {
        let call = BackendCall::CallTool {
            name: name.to_string(),
            arguments,
        };
        match self.call(call).await? {
            BackendReply::ToolOutput(output) => Ok(output),
            other => Err(unexpected_reply("tools/call", &other)),
        }
    }

    pub async fn list_prompts(&self) -> CompositeResult<Vec<PromptInfo>> {
        match self.call(BackendCall::ListPrompts).await? {
            BackendReply::Prompts(prompts) => Ok(prompts),
            other => Err(unexpected_reply("prompts/list", &other)),
        }
    }

    pub async fn get_prompt(
        &self,
        name: &str,
        arguments: Option<JsonObject>,
    ) -> CompositeResult<PromptOutput> {
        let call = BackendCall::GetPrompt {
            name: name.to_string(),
            arguments,
        };
        match self.call(call).await? {
            BackendReply::Prompt(output) => Ok(output),
            other => Err(unexpected_reply("prompts/get", &other)),
        }
    }
}

impl Drop for Supervisor {
    fn drop(&mut self) {
        if let Some(handle) = self.worker.get_mut().take() {
            handle.abort();
        }
    }
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("name", &self.name)
            .field("url", &self.url)
            .field("prefix", &self.prefix)
            .field("state", &self.state())
            .finish()
    }
}

fn unexpected_reply(method: &str, reply: &BackendReply) -> CompositeError {
    CompositeError::Internal(format!("unexpected reply to {}: {:?}", method, reply))
}

// =============================================================================
// Worker
// =============================================================================

struct WorkerContext {
    name: String,
    url: String,
    connector: Arc<dyn Connector>,
    status: Arc<RwLock<Status>>,
}

impl WorkerContext {
    async fn run(
        self,
        mut requests: mpsc::UnboundedReceiver<PendingRequest>,
        mut stop_rx: watch::Receiver<bool>,
        ready: oneshot::Sender<Result<(), SessionError>>,
    ) {
        let session = tokio::select! {
            biased;
            _ = stop_rx.wait_for(|stopped| *stopped) => {
                debug!(backend = %self.name, "Stopped while connecting");
                self.cancel_pending(&mut requests);
                return;
            }
            result = self.connector.connect(&self.url) => match result {
                Ok(session) => session,
                Err(e) => {
                    self.status.write().set(SupervisorState::Failed);
                    let _ = ready.send(Err(e));
                    self.cancel_pending(&mut requests);
                    return;
                }
            },
        };

        self.status.write().set(SupervisorState::Connected);
        info!(backend = %self.name, url = %self.url, "Connected to backend");
        let _ = ready.send(Ok(()));

        loop {
            let pending = tokio::select! {
                biased;
                _ = stop_rx.wait_for(|stopped| *stopped) => break,
                next = requests.recv() => match next {
                    Some(pending) => pending,
                    None => break,
                },
                reason = session.closed() => {
                    warn!(backend = %self.name, error = %reason, "Backend session lost while idle");
                    self.status.write().set(SupervisorState::Failed);
                    break;
                }
            };

            if pending.reply.is_closed() {
                debug!(
                    backend = %self.name,
                    method = pending.call.method(),
                    "Caller gone, skipping request"
                );
                continue;
            }

            let method = pending.call.method();
            let result = tokio::select! {
                biased;
                _ = stop_rx.wait_for(|stopped| *stopped) => {
                    let _ = pending.reply.send(Err(self.cancelled()));
                    break;
                }
                result = dispatch(session.as_ref(), pending.call) => result,
            };

            match result {
                Err(e) if e.is_terminal() => {
                    warn!(backend = %self.name, method, error = %e, "Backend session lost");
                    self.status.write().set(SupervisorState::Failed);
                    let _ = pending.reply.send(Err(e.into()));
                    break;
                }
                result => {
                    if let Err(e) = &result {
                        debug!(backend = %self.name, method, error = %e, "Backend call failed");
                    }
                    let _ = pending.reply.send(result.map_err(Into::into));
                }
            }
        }

        self.cancel_pending(&mut requests);
        drop(session);
        debug!(backend = %self.name, "Backend worker finished");
    }

    /// Close the queue and fail everything still in it
    fn cancel_pending(&self, requests: &mut mpsc::UnboundedReceiver<PendingRequest>) {
        requests.close();
        let mut cancelled = 0usize;
        while let Ok(pending) = requests.try_recv() {
            let _ = pending.reply.send(Err(self.cancelled()));
            cancelled += 1;
        }
        if cancelled > 0 {
            debug!(backend = %self.name, cancelled, "Cancelled pending requests");
        }
    }

    fn cancelled(&self) -> CompositeError {
        CompositeError::Cancelled(format!("backend {} stopped", self.name))
    }
}

async fn dispatch(
    session: &dyn BackendSession,
    call: BackendCall,
) -> Result<BackendReply, SessionError> {
    match call {
        BackendCall::ListTools => session.list_tools().await.map(BackendReply::Tools),
        BackendCall::CallTool { name, arguments } => session
            .call_tool(&name, arguments)
            .await
            .map(BackendReply::ToolOutput),
        BackendCall::ListPrompts => session.list_prompts().await.map(BackendReply::Prompts),
        BackendCall::GetPrompt { name, arguments } => session
            .get_prompt(&name, arguments)
            .await
            .map(BackendReply::Prompt),
    }
}
