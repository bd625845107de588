//! Gateway configuration
//!
//! Backends are declared in a YAML (`backends:` list) or TOML
//! (`[[backends]]` tables) file. The format is picked from the file
//! extension. Configuration is read once at bootstrap; there is no reload.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{CompositeResult, ConfigError};
use crate::routing::prefixes_overlap;

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "COMPOSITE_CONFIG_PATH";

/// File names searched in the working directory, in order
pub const DEFAULT_CONFIG_FILES: &[&str] = &[
    "composite-config.yaml",
    "composite-config.yml",
    "composite-config.toml",
];

// =============================================================================
// Backend descriptors
// =============================================================================

/// Declaration of one backend to aggregate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendDescriptor {
    /// Unique backend name
    pub name: String,
    /// SSE endpoint of the backend (e.g. `http://localhost:8001/sse`)
    pub url: String,
    /// Namespace for this backend's tools; defaults to `name`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    prefix: Option<String>,
    /// Disabled backends are never constructed
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_enabled() -> bool {
    true
}

impl BackendDescriptor {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
            prefix: None,
            enabled: true,
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Effective prefix (falls back to the backend name)
    pub fn prefix(&self) -> &str {
        self.prefix.as_deref().unwrap_or(&self.name)
    }
}

// =============================================================================
// Settings sections
// =============================================================================

/// Supervisor timing
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SupervisorSettings {
    /// How long `start()` waits for the connected confirmation
    #[serde(default = "default_start_timeout_ms")]
    pub start_timeout_ms: u64,
    /// How long `stop()` waits for the worker before aborting it
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,
}

fn default_start_timeout_ms() -> u64 {
    5000
}

fn default_stop_grace_ms() -> u64 {
    5000
}

impl Default for SupervisorSettings {
    fn default() -> Self {
        Self {
            start_timeout_ms: default_start_timeout_ms(),
            stop_grace_ms: default_stop_grace_ms(),
        }
    }
}

impl SupervisorSettings {
    pub fn start_timeout(&self) -> Duration {
        Duration::from_millis(self.start_timeout_ms)
    }

    pub fn stop_grace(&self) -> Duration {
        Duration::from_millis(self.stop_grace_ms)
    }
}

/// HTTP listener settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Value for `Access-Control-Allow-Origin`; `*` allows any origin
    #[serde(default = "default_allow_origin")]
    pub allow_origin: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_allow_origin() -> String {
    "*".to_string()
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            allow_origin: default_allow_origin(),
        }
    }
}

// =============================================================================
// Top-level configuration
// =============================================================================

/// Top-level gateway configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompositeConfig {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub supervisor: SupervisorSettings,
    #[serde(default)]
    pub backends: Vec<BackendDescriptor>,
}

impl CompositeConfig {
    pub fn with_backends(backends: Vec<BackendDescriptor>) -> Self {
        Self {
            backends,
            ..Default::default()
        }
    }

    /// Parse YAML without validating
    pub fn from_yaml(content: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(content)
    }

    /// Parse TOML without validating
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// Read, parse and validate a config file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_toml = path
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(|e| e.eq_ignore_ascii_case("toml"));

        let config = if is_toml {
            Self::from_toml(&content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        } else {
            Self::from_yaml(&content).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                message: e.to_string(),
            })?
        };

        config.validate()?;
        tracing::debug!(
            path = %path.display(),
            backends = config.backends.len(),
            "Loaded configuration"
        );
        Ok(config)
    }

    /// Locate the config file.
    ///
    /// An explicit path wins, then `COMPOSITE_CONFIG_PATH`, then the default
    /// file names in the working directory.
    pub fn discover(explicit: Option<&Path>) -> Result<PathBuf, ConfigError> {
        let from_env = std::env::var_os(CONFIG_PATH_ENV).map(PathBuf::from);
        let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self::discover_in(explicit.map(Path::to_path_buf).or(from_env), &cwd)
    }

    /// Locate the config file relative to `dir`
    pub fn discover_in(explicit: Option<PathBuf>, dir: &Path) -> Result<PathBuf, ConfigError> {
        if let Some(path) = explicit {
            if path.is_file() {
                return Ok(path);
            }
            return Err(ConfigError::Missing {
                searched: path.display().to_string(),
            });
        }

        for name in DEFAULT_CONFIG_FILES {
            let candidate = dir.join(name);
            if candidate.is_file() {
                return Ok(candidate);
            }
        }

        Err(ConfigError::Missing {
            searched: DEFAULT_CONFIG_FILES
                .iter()
                .map(|n| dir.join(n).display().to_string())
                .collect::<Vec<_>>()
                .join(", "),
        })
    }

    /// Check descriptor constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut names = HashSet::new();
        for backend in &self.backends {
            if backend.name.trim().is_empty() {
                return Err(ConfigError::Invalid("backend name must not be empty".into()));
            }
            if !names.insert(backend.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate backend name '{}'",
                    backend.name
                )));
            }
            let url = Url::parse(&backend.url).map_err(|e| {
                ConfigError::Invalid(format!(
                    "backend '{}' has invalid url '{}': {}",
                    backend.name, backend.url, e
                ))
            })?;
            if url.scheme() != "http" && url.scheme() != "https" {
                return Err(ConfigError::Invalid(format!(
                    "backend '{}' url must be http or https, got '{}'",
                    backend.name,
                    url.scheme()
                )));
            }
        }

        let enabled: Vec<&BackendDescriptor> = self.enabled_backends().collect();
        for (i, a) in enabled.iter().enumerate() {
            if a.prefix().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "backend '{}' has an empty prefix",
                    a.name
                )));
            }
            for b in &enabled[i + 1..] {
                if prefixes_overlap(a.prefix(), b.prefix()) {
                    return Err(ConfigError::Invalid(format!(
                        "prefix '{}' of backend '{}' overlaps prefix '{}' of backend '{}'",
                        a.prefix(),
                        a.name,
                        b.prefix(),
                        b.name
                    )));
                }
            }
        }

        Ok(())
    }

    /// Enabled descriptors in declaration order
    pub fn enabled_backends(&self) -> impl Iterator<Item = &BackendDescriptor> {
        self.backends.iter().filter(|b| b.enabled)
    }
}

// =============================================================================
// Descriptor sources
// =============================================================================

/// Supplies backend descriptors at bootstrap
pub trait DescriptorSource: Send + Sync {
    fn load_descriptors(&self) -> CompositeResult<Vec<BackendDescriptor>>;
}

impl DescriptorSource for CompositeConfig {
    fn load_descriptors(&self) -> CompositeResult<Vec<BackendDescriptor>> {
        Ok(self.backends.clone())
    }
}

/// Reads descriptors from a file when asked
#[derive(Debug, Clone)]
pub struct ConfigFile(pub PathBuf);

impl DescriptorSource for ConfigFile {
    fn load_descriptors(&self) -> CompositeResult<Vec<BackendDescriptor>> {
        Ok(CompositeConfig::load(&self.0)?.backends)
    }
}
