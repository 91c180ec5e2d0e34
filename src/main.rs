//! giscus-proxy
//!
//! Re-serves the giscus widget and its sibling paths from this origin.
//!
//! # Architecture Overview
//!
//! ```text
//! Client
//!   → http::server (request ID, trace, CORS, request timeout)
//!       → proxy::widget       rep rules + footer removal, never cached
//!       → proxy::passthrough  cache lookup / store on max-age
//!   → upstream::client (one GET, 25s timeout)
//!   → giscus.app
//! ```
//!
//! # Startup
//! CLI → config (file, env, flags) → logging → metrics → bind → serve.
//! Failing to bind is fatal; everything after that is per-request.

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use giscus_proxy::config::env::{derive_public_url, ProcessEnv};
use giscus_proxy::config::load_config;
use giscus_proxy::lifecycle::{wait_for_signal, Shutdown};
use giscus_proxy::observability::{logging, metrics};
use giscus_proxy::HttpServer;

/// Command line arguments.
#[derive(Debug, Parser)]
#[command(name = "giscus-proxy", version, about = "Reverse proxy for the giscus widget")]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen address, overriding the file and environment.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = load_config(cli.config.as_deref(), &ProcessEnv)?;
    if let Some(bind) = cli.bind {
        config.listener.bind_address = Some(bind);
    }

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "giscus-proxy starting");
    tracing::info!(
        upstream = %config.upstream.origin,
        widget_paths = ?config.widget.paths,
        cache_enabled = config.cache.enabled,
        cache_max_entries = config.cache.max_entries,
        upstream_timeout_secs = config.upstream.timeout_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = HttpServer::new(&config)?;

    let bind = config.listener.resolved_address();
    let listener = match TcpListener::bind(&bind).await {
        Ok(listener) => listener,
        Err(e) => {
            tracing::error!(bind = %bind, error = %e, "Failed to bind listener");
            return Err(e.into());
        }
    };
    let local_addr = listener.local_addr()?;
    tracing::info!(
        bind = %local_addr,
        url = %derive_public_url(&bind, &ProcessEnv),
        "Listening for connections"
    );

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
