//! Traffic control host service.
//!
//! Serves HTTP behind the inbound gate and exposes the read-only status
//! surface over every scope the controller has seen.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                 TRAFFIC CONTROL              │
//!   Inbound request    │  ┌─────────┐   ┌──────────┐   ┌──────────┐   │
//!   ───────────────────┼─▶│  http   │──▶│ inbound  │──▶│ handler  │   │
//!                      │  │ server  │   │   gate   │   └──────────┘   │
//!                      │  └─────────┘   └────┬─────┘                  │
//!                      │                     │ acquire / record       │
//!                      │                     ▼                        │
//!                      │              ┌─────────────┐                 │
//!                      │              │   traffic   │◀── admin (read) │
//!                      │              │ controller  │                 │
//!                      │              └─────────────┘                 │
//!                      │                     ▲ acquire / record       │
//!   Provider call      │  ┌──────────────────┴──┐                     │
//!   ◀──────────────────┼──│ outbound client     │                     │
//!                      │  │ (retry, backoff)    │                     │
//!                      │  └─────────────────────┘                     │
//!                      └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use traffic_control::config::{load_config, TrafficConfig};
use traffic_control::lifecycle::startup;
use traffic_control::observability::logging;

#[derive(Parser)]
#[command(name = "traffic-control")]
#[command(about = "Per-scope rate limiting, circuit breaking and retries", long_about = None)]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => TrafficConfig::default(),
    };
    logging::init(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = ?cli.config,
        bind_address = %config.listener.bind_address,
        admin_enabled = config.admin.enabled,
        providers = config.outbound.providers.len(),
        endpoint_groups = config.inbound.groups.len(),
        "traffic-control starting"
    );

    startup::run(config).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
