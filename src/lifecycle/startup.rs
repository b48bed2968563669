//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Bind listeners and begin accepting traffic
//! - Run until shutdown, then wait for every server to drain
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Listeners are bound before any server starts, so a bad address aborts
//!   startup instead of leaving a half-running process
//! - Configuration is validated before this point (see `config::load_config`)

use std::error::Error;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;

use crate::admin::setup_admin_router;
use crate::config::TrafficConfig;
use crate::http::HttpServer;
use crate::lifecycle::{signals, Shutdown};
use crate::observability::metrics;
use crate::traffic::TrafficController;

/// Start the host server and, if enabled, the status surface and metrics.
pub async fn run(config: TrafficConfig) -> Result<(), Box<dyn Error + Send + Sync>> {
    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr);
    }

    let controller = Arc::new(TrafficController::new(&config));

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let admin_listener = if config.admin.enabled {
        Some(TcpListener::bind(&config.admin.bind_address).await?)
    } else {
        None
    };

    let shutdown = Shutdown::new();
    signals::spawn_signal_listener(shutdown.clone());

    let admin_task = admin_listener.map(|listener| {
        let router = setup_admin_router(controller.clone());
        let stop = shutdown.signalled();
        tokio::spawn(async move {
            let addr = listener.local_addr()?;
            tracing::info!(address = %addr, "Status surface listening");
            axum::serve(listener, router).with_graceful_shutdown(stop).await
        })
    });

    let server = HttpServer::new(config, controller);
    server.run(listener, shutdown.signalled()).await?;

    if let Some(task) = admin_task {
        task.await??;
    }
    Ok(())
}
