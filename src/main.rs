//! CEDAR MCP server binary
//!
//! Serves the MCP tools over stdio (default) or HTTP.

use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cedar_mcp::api::{create_router, AppState};
use cedar_mcp::config::Config;
use cedar_mcp::mcp::serve_stdio;
use cedar_mcp::tasks::spawn_cleanup_task;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Transport {
    Stdio,
    Http,
}

/// MCP server for CEDAR templates and BioPortal ontology lookups
#[derive(Debug, Parser)]
#[command(name = "cedar-mcp", version, about)]
struct Cli {
    /// CEDAR API key (overrides CEDAR_API_KEY)
    #[arg(long)]
    cedar_api_key: Option<String>,

    /// BioPortal API key (overrides BIOPORTAL_API_KEY)
    #[arg(long)]
    bioportal_api_key: Option<String>,

    #[arg(long, value_enum, default_value_t = Transport::Stdio)]
    transport: Transport,

    /// HTTP port (overrides CEDAR_MCP_SERVER_PORT)
    #[arg(long)]
    port: Option<u16>,

    /// Search cache directory (overrides CEDAR_MCP_CACHE_DIR)
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Search cache TTL in seconds (overrides CEDAR_MCP_CACHE_TTL_SECONDS)
    #[arg(long)]
    cache_ttl_seconds: Option<u64>,
}

impl Cli {
    /// Layers command-line overrides on top of the environment.
    fn apply(&self, mut config: Config) -> Config {
        if let Some(key) = &self.cedar_api_key {
            config.cedar_api_key = Some(key.clone());
        }
        if let Some(key) = &self.bioportal_api_key {
            config.bioportal_api_key = Some(key.clone());
        }
        if let Some(port) = self.port {
            config.server_port = port;
        }
        if let Some(dir) = &self.cache_dir {
            config.cache.cache_directory = dir.clone();
        }
        if let Some(ttl) = self.cache_ttl_seconds {
            config.cache.ttl_seconds = ttl;
        }
        config
    }
}

fn check_credentials(config: &Config) -> anyhow::Result<()> {
    if config.cedar_api_key.is_none() {
        bail!("CEDAR API key not provided. Set CEDAR_API_KEY or use --cedar-api-key.");
    }
    if config.bioportal_api_key.is_none() {
        bail!("BioPortal API key not provided. Set BIOPORTAL_API_KEY or use --bioportal-api-key.");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // stdout belongs to the stdio transport
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cedar_mcp=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    let config = cli.apply(Config::from_env());
    check_credentials(&config)?;

    info!(
        "Configuration loaded: cache_dir={}, ttl={}s, cleanup_interval={}s",
        config.cache.cache_directory.display(),
        config.cache.ttl_seconds,
        config.cleanup_interval
    );

    let state = AppState::from_config(&config).context("failed to initialise upstream clients")?;
    if !state.cache.is_available() {
        warn!("Search cache disabled; every lookup goes upstream");
    }

    let cleanup_handle = (config.cleanup_interval > 0)
        .then(|| spawn_cleanup_task(state.cache.clone(), config.cleanup_interval));

    match cli.transport {
        Transport::Stdio => {
            info!("Starting CEDAR MCP server on stdio");
            tokio::select! {
                result = serve_stdio(state) => result.context("stdio transport failed")?,
                _ = shutdown_signal() => {}
            }
        }
        Transport::Http => {
            let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .with_context(|| format!("failed to bind {addr}"))?;
            info!("Server listening on http://{}", addr);

            axum::serve(listener, create_router(state))
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("HTTP server failed")?;
        }
    }

    stop_cleanup(cleanup_handle);
    info!("Server shutdown complete");
    Ok(())
}

fn stop_cleanup(handle: Option<JoinHandle<()>>) {
    if let Some(handle) = handle {
        handle.abort();
        info!("Cache sweep task stopped");
    }
}

/// Waits for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_defaults_to_stdio() {
        let cli = Cli::try_parse_from(["cedar-mcp"]).unwrap();
        assert_eq!(cli.transport, Transport::Stdio);
        assert!(cli.port.is_none());
    }

    #[test]
    fn test_cli_overrides_environment() {
        let cli = Cli::try_parse_from([
            "cedar-mcp",
            "--transport",
            "http",
            "--port",
            "9000",
            "--cache-ttl-seconds",
            "60",
            "--cache-dir",
            "/tmp/cache",
            "--cedar-api-key",
            "c",
        ])
        .unwrap();

        let config = cli.apply(Config::default());
        assert_eq!(cli.transport, Transport::Http);
        assert_eq!(config.server_port, 9000);
        assert_eq!(config.cache.ttl_seconds, 60);
        assert_eq!(config.cache.cache_directory, PathBuf::from("/tmp/cache"));
        assert_eq!(config.cedar_api_key.as_deref(), Some("c"));
        assert!(config.bioportal_api_key.is_none());
    }

    #[test]
    fn test_missing_key_is_reported() {
        let config = Config {
            cedar_api_key: Some("c".to_string()),
            ..Config::default()
        };
        let err = check_credentials(&config).unwrap_err().to_string();
        assert!(err.contains("BIOPORTAL_API_KEY"));
        assert!(err.contains("--bioportal-api-key"));
    }
}
