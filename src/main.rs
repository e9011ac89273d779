//! Image proxy server.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌──────────────────────────────────────────────────────┐
//!                       │                     IMAGE PROXY                      │
//!   GET /api/image-     │  ┌────────┐   ┌───────────┐   ┌────────────────────┐ │
//!   proxy?url=...   ────┼─▶│  http  │──▶│ normalize │──▶│ candidates         │ │
//!                       │  │ server │   └───────────┘   │ https → http       │ │
//!                       │  └────────┘                   └─────────┬──────────┘ │
//!                       │                                         ▼            │
//!                       │  ┌────────┐   ┌───────────┐   ┌────────────────────┐ │   Upstream
//!   image bytes or  ◀───┼──│response│◀──│  stream   │◀──│ fetch + sniff      │◀┼── image host
//!   placeholder         │  │ cache  │   │  budget   │   │ (5s per attempt)   │ │
//!                       │  └────────┘   └───────────┘   └────────────────────┘ │
//!                       │                                                      │
//!                       │  cross-cutting: config · observability · lifecycle   │
//!                       └──────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use image_proxy::config::{load_config, validation::validate_config, ProxyConfig};
use image_proxy::lifecycle::signals::spawn_signal_listener;
use image_proxy::observability::{logging, metrics};
use image_proxy::{HttpServer, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "image-proxy", version, about = "Streaming, content-sniffing image proxy")]
struct Args {
    /// Path to a TOML configuration file. Defaults are used when omitted.
    #[arg(short, long, env = "IMAGE_PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Override the listener bind address.
    #[arg(short, long)]
    bind: Option<String>,

    /// Override the configured log level.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let mut config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };
    if let Some(bind) = args.bind {
        config.listener.bind_address = bind;
    }
    if let Some(level) = args.log_level {
        config.observability.log_level = level;
    }
    validate_config(&config).map_err(image_proxy::config::ConfigError::Validation)?;

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "image-proxy starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        max_connections = config.listener.max_connections,
        attempt_timeout_ms = config.upstream.attempt_timeout_ms,
        max_body_bytes = config.upstream.max_body_bytes,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    spawn_signal_listener(shutdown.clone());

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
