//! leave-relay: HR console backend relay.
//!
//! # Architecture Overview
//!
//! ```text
//!   Console client                                             Upstream API
//!        │                                                          ▲
//!        ▼                                                          │
//!  ┌──────────┐   ┌────────────┐   ┌───────────┐   ┌───────────┐   │
//!  │  http    │──▶│  routing   │──▶│ upstream  │──▶│ transport │───┘
//!  │ server   │   │ table +    │   │ forwarder │   │ (reqwest) │
//!  │          │   │ shapers    │   │ +deadline │   └───────────┘
//!  └──────────┘   └────────────┘   └─────┬─────┘
//!        │                               │ approval routes
//!        │                         ┌─────▼─────┐
//!        │                         │resilience │ retry 2s/4s/8s
//!        │                         └───────────┘
//!        ▼
//!  ┌──────────┐
//!  │    db    │ PgPool + query helper (/health)
//!  └──────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use leave_relay::config::load_config;
use leave_relay::lifecycle::{shutdown_on_signal, Shutdown};
use leave_relay::observability::{logging, metrics};
use leave_relay::HttpServer;

#[derive(Parser)]
#[command(name = "leave-relay")]
#[command(about = "HR console backend: leave approval relay to the upstream API", long_about = None)]
struct Cli {
    /// Optional TOML configuration file; environment variables override it.
    #[arg(short, long, env = "LEAVE_RELAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    logging::init_tracing(&config.observability);
    tracing::info!("leave-relay v{} starting", env!("CARGO_PKG_VERSION"));

    tracing::info!(
        bind_address = %config.listener.bind_address(),
        upstream_host = %config.upstream.host,
        upstream_port = config.upstream.port,
        retried_routes = ?config.retries.routes,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(config.listener.bind_address()).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    let server_shutdown = shutdown.subscribe();

    let signals = shutdown.clone();
    tokio::spawn(async move { shutdown_on_signal(&signals).await });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
