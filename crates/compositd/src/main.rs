//! compositd - Composite Gateway Daemon
//!
//! Aggregates several MCP servers (reachable over SSE) behind one HTTP
//! endpoint. Backend tools and prompts are exposed as `{prefix}_{name}`.
//! MCP clients connect to `/sse`; the same catalog is served as REST under
//! `/v1`.
//!
//! Usage:
//!   compositd [OPTIONS]
//!
//! The backend list is read from `--config`, `COMPOSITE_CONFIG_PATH`, or
//! `./composite-config.yaml` / `./composite-config.toml`. Running without
//! any of these is an error.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use composite_api::{create_router, AppState};
use composite_core::{CompositeConfig, CompositeError, ServerSettings};
use composite_gateway::{CompositeRouter, Registry};
use composite_mcp::McpConnector;

#[derive(Parser, Debug)]
#[command(name = "compositd")]
#[command(version, about = "Composite gateway for MCP backends")]
struct Cli {
    /// Backend configuration file (YAML or TOML)
    #[arg(short, long, env = "COMPOSITE_CONFIG_PATH")]
    config: Option<PathBuf>,

    /// Address to listen on
    #[arg(long, env = "HOST")]
    host: Option<String>,

    /// Port to listen on
    #[arg(short, long, env = "PORT")]
    port: Option<u16>,

    /// Value for Access-Control-Allow-Origin
    #[arg(long, env = "ALLOW_ORIGIN")]
    allow_origin: Option<String>,

    /// Emit logs as JSON
    #[arg(long)]
    log_json: bool,
}

impl Cli {
    /// Command line and environment take precedence over the config file
    fn server_settings(&self, from_file: &ServerSettings) -> ServerSettings {
        ServerSettings {
            host: self.host.clone().unwrap_or_else(|| from_file.host.clone()),
            port: self.port.unwrap_or(from_file.port),
            allow_origin: self
                .allow_origin
                .clone()
                .unwrap_or_else(|| from_file.allow_origin.clone()),
        }
    }
}

fn init_tracing(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "compositd=info,composite_gateway=info,composite_api=info,composite_mcp=info".into()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(json.then(|| tracing_subscriber::fmt::layer().json()))
        .with((!json).then(|| tracing_subscriber::fmt::layer()))
        .init();
}

fn load_config(cli: &Cli) -> anyhow::Result<(PathBuf, CompositeConfig)> {
    let path = CompositeConfig::discover(cli.config.as_deref())
        .map_err(CompositeError::from)
        .context("Cannot start without a backend configuration")?;
    let config = CompositeConfig::load(&path)
        .map_err(CompositeError::from)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    Ok((path, config))
}

/// Wait for Ctrl-C, then close open MCP sessions so their streams end
async fn shutdown_signal(mcp_sessions: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
    mcp_sessions.cancel();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_json);

    tracing::info!("Starting compositd (Composite Gateway Daemon)");

    let (config_path, config) = load_config(&cli)?;
    tracing::info!(path = %config_path.display(), "Loaded configuration");

    for backend in &config.backends {
        if backend.enabled {
            tracing::info!(
                backend = %backend.name,
                prefix = %backend.prefix(),
                url = %backend.url,
                "Backend enabled"
            );
        } else {
            tracing::info!(backend = %backend.name, "Backend disabled, skipping");
        }
    }

    let server = cli.server_settings(&config.server);
    let supervisor_settings = config.supervisor;

    // Backends connect lazily on the first request
    let registry = Arc::new(Registry::new(
        Arc::new(config),
        Arc::new(McpConnector::new()),
        supervisor_settings,
    ));
    let router = CompositeRouter::new(registry.clone());
    let state = AppState::with_allow_origin(router, &server.allow_origin);
    let mcp_sessions = state.shutdown_token().clone();
    let app = create_router(state);

    let listener = tokio::net::TcpListener::bind((server.host.as_str(), server.port))
        .await
        .with_context(|| format!("Failed to bind {}:{}", server.host, server.port))?;
    let addr: SocketAddr = listener.local_addr()?;
    tracing::info!("Listening on http://{}", addr);
    tracing::info!("MCP endpoint: http://{}{}", addr, composite_api::mcp::SSE_PATH);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(mcp_sessions))
        .await?;

    registry.shutdown().await;
    tracing::info!("compositd stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_overrides_file_settings() {
        let cli = Cli::try_parse_from([
            "compositd",
            "--host",
            "127.0.0.1",
            "--port",
            "9100",
            "--allow-origin",
            "https://app.example.com",
        ])
        .unwrap();

        let settings = cli.server_settings(&ServerSettings::default());
        assert_eq!(settings.host, "127.0.0.1");
        assert_eq!(settings.port, 9100);
        assert_eq!(settings.allow_origin, "https://app.example.com");
    }

    #[test]
    fn missing_explicit_config_is_an_error() {
        let cli = Cli::try_parse_from(["compositd", "--config", "/does/not/exist.yaml"]).unwrap();
        let err = load_config(&cli).unwrap_err();
        assert!(format!("{:#}", err).contains("No configuration file found"));
    }
}
