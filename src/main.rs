//! realip-proxy
//!
//! A forwarding HTTP proxy that resolves the real client address for each
//! request and stamps it into a configurable header.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌────────────────────────────────────────────┐
//!                      │                 REALIP PROXY               │
//!                      │                                            │
//!   Client Request     │  ┌─────────┐   ┌──────────┐   ┌─────────┐ │
//!   ───────────────────┼─▶│  http   │──▶│  realip  │──▶│ forward │─┼──▶ Upstream
//!                      │  │ server  │   │middleware│   │ handler │ │
//!                      │  └─────────┘   └────┬─────┘   └─────────┘ │
//!                      │                     │                      │
//!                      │          ┌──────────┴──────────┐           │
//!                      │          │ trust table (CIDR)  │           │
//!                      │          │ resolver policy     │           │
//!                      │          └─────────────────────┘           │
//!                      │                                            │
//!                      │  config · observability · lifecycle        │
//!                      └────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use realip_proxy::config::{load_config, ProxyConfig};
use realip_proxy::http::HttpServer;
use realip_proxy::lifecycle::Shutdown;
use realip_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "realip-proxy", about = "Real-client-IP resolving HTTP proxy")]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(long, short)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    logging::init("realip_proxy=debug,tower_http=debug");

    tracing::info!("realip-proxy v0.1.0 starting");

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => ProxyConfig::default(),
    };

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        real_ip_enabled = config.real_ip.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_ctrl_c();

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
