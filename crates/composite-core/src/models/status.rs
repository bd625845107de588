//! Backend lifecycle and status models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle of a backend supervisor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupervisorState {
    /// Constructed, `start()` not called yet
    Created,
    /// Worker spawned, session being opened
    Connecting,
    /// Session open, serving requests
    Connected,
    /// `stop()` in progress
    Stopping,
    /// Worker gone after `stop()`
    Stopped,
    /// Connection could not be opened or was lost
    Failed,
}

impl SupervisorState {
    pub fn is_connected(&self) -> bool {
        matches!(self, SupervisorState::Connected)
    }
}

impl std::fmt::Display for SupervisorState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SupervisorState::Created => "created",
            SupervisorState::Connecting => "connecting",
            SupervisorState::Connected => "connected",
            SupervisorState::Stopping => "stopping",
            SupervisorState::Stopped => "stopped",
            SupervisorState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Snapshot of one backend as seen by the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendStatus {
    pub name: String,
    pub prefix: String,
    pub url: String,
    pub connected: bool,
    pub state: SupervisorState,
    /// When the current session was opened
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<DateTime<Utc>>,
}

impl std::fmt::Display for BackendStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let connectivity = if self.connected {
            "connected"
        } else {
            "disconnected"
        };
        write!(f, "{}: {} ({})", self.name, connectivity, self.url)
    }
}
