//! Common error types for the composite gateway

use std::path::PathBuf;

use thiserror::Error;

/// Result type for gateway operations
pub type CompositeResult<T> = Result<T, CompositeError>;

/// Result type for backend session operations
pub type SessionResult<T> = Result<T, SessionError>;

/// Errors surfaced by the aggregation layer
#[derive(Debug, Error)]
pub enum CompositeError {
    /// No usable configuration source was found
    #[error("No configuration file found: {0}")]
    ConfigMissing(String),

    /// Configuration was found but could not be used
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Backend did not confirm its connection in time
    #[error("Backend {backend} did not connect within {timeout_ms}ms")]
    BackendStartTimeout {
        /// Backend name
        backend: String,
        /// Startup wait that elapsed
        timeout_ms: u64,
    },

    /// Backend is known but has no live session
    #[error("Backend {0} not connected")]
    BackendNotConnected(String),

    /// No backend owns the qualified tool name
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// No backend owns the qualified prompt name
    #[error("Prompt not found: {0}")]
    PromptNotFound(String),

    /// Failure reported by the backend itself, passed through as-is
    #[error("{0}")]
    RemoteCall(String),

    /// Request abandoned because its supervisor stopped
    #[error("Request cancelled: {0}")]
    Cancelled(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CompositeError {
    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            CompositeError::ConfigMissing(_) => 500,
            CompositeError::InvalidConfig(_) => 500,
            CompositeError::BackendStartTimeout { .. } => 504,
            CompositeError::BackendNotConnected(_) => 503,
            CompositeError::ToolNotFound(_) => 404,
            CompositeError::PromptNotFound(_) => 404,
            CompositeError::RemoteCall(_) => 502,
            CompositeError::Cancelled(_) => 503,
            CompositeError::Internal(_) => 500,
        }
    }
}

/// Errors from a single backend session
///
/// `Remote` is request-scoped: the session keeps serving. `Closed` means the
/// session is gone and its supervisor stops serving for good.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SessionError {
    /// The backend answered with an error for this request
    #[error("{0}")]
    Remote(String),

    /// The session was lost
    #[error("Session closed: {0}")]
    Closed(String),

    /// The session could not be opened
    #[error("Connection failed: {0}")]
    ConnectFailed(String),
}

impl SessionError {
    /// Whether this error ends the session
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionError::Closed(_) | SessionError::ConnectFailed(_))
    }
}

impl From<SessionError> for CompositeError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::Remote(msg) => CompositeError::RemoteCall(msg),
            other => CompositeError::RemoteCall(other.to_string()),
        }
    }
}

/// Errors raised while locating, reading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No config file was found in any of the searched locations
    #[error("searched {searched}")]
    Missing { searched: String },

    /// Config file exists but could not be read
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file could not be parsed
    #[error("failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    /// Parsed config violates a constraint
    #[error("{0}")]
    Invalid(String),
}

impl From<ConfigError> for CompositeError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Missing { .. } => CompositeError::ConfigMissing(err.to_string()),
            other => CompositeError::InvalidConfig(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_match_router_text() {
        assert_eq!(
            CompositeError::BackendNotConnected("docs".into()).to_string(),
            "Backend docs not connected"
        );
        assert_eq!(
            CompositeError::ToolNotFound("xyz_tool".into()).to_string(),
            "Tool not found: xyz_tool"
        );
        assert_eq!(
            CompositeError::RemoteCall("boom".into()).to_string(),
            "boom"
        );
    }

    #[test]
    fn only_closed_sessions_are_terminal() {
        assert!(!SessionError::Remote("bad args".into()).is_terminal());
        assert!(SessionError::Closed("eof".into()).is_terminal());
        assert!(SessionError::ConnectFailed("refused".into()).is_terminal());
    }

    #[test]
    fn remote_session_error_passes_through_opaquely() {
        let err: CompositeError = SessionError::Remote("division by zero".into()).into();
        assert_eq!(err.to_string(), "division by zero");
        assert_eq!(err.status_code(), 502);
    }

    #[test]
    fn missing_config_maps_to_config_missing() {
        let err: CompositeError = ConfigError::Missing {
            searched: "./composite-config.yaml".into(),
        }
        .into();
        assert!(matches!(err, CompositeError::ConfigMissing(_)));
        assert_eq!(
            err.to_string(),
            "No configuration file found: searched ./composite-config.yaml"
        );
    }
}
