//! CORS proxy server.
//!
//! ```text
//!   Browser ── GET /?https://api.example.com/x ──▶ proxy ──▶ api.example.com
//!   Browser ◀── upstream response + CORS headers ── proxy ◀──┘
//! ```
//!
//! Runs with built-in defaults unless `--config` names a TOML file.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::net::TcpListener;

use cors_proxy::config::{load_config, ProxyConfig};
use cors_proxy::lifecycle::{signals::shutdown_on_signal, Shutdown};
use cors_proxy::observability::{logging, metrics};
use cors_proxy::HttpServer;

#[derive(Parser)]
#[command(name = "cors-proxy")]
#[command(about = "CORS proxy: forwards /?<url> and adds CORS headers", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability.log_level);
    tracing::info!("cors-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address,
        blacklist_urls = config.policy.blacklist_urls.len(),
        whitelist_origins = config.policy.whitelist_origins.len(),
        upstream_timeout_secs = config.timeouts.upstream_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr = config
            .observability
            .metrics_address
            .parse()
            .context("parsing observability.metrics_address")?;
        metrics::init_metrics(addr).context("starting metrics endpoint")?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address)
        .await
        .with_context(|| format!("binding {}", config.listener.bind_address))?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    tokio::spawn(shutdown_on_signal(shutdown.clone()));

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
