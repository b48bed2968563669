//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the host service's handlers
//! - Wire up middleware (tracing, timeout, request ID, inbound gate)
//! - Serve on a bound listener until shutdown
//!
//! # Design Decisions
//! - The inbound gate runs inside the request-ID and trace layers, so
//!   rejections are traced and carry an ID like any other response
//! - The request timeout runs inside the gate, so a timed-out request is
//!   recorded against its group as a 408
//! - `/health` is routed normally and bypasses the gate via `exempt_paths`

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::Request,
    http::StatusCode,
    middleware,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use serde_json::json;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::config::TrafficConfig;
use crate::http::request::{propagate_request_id_layer, request_id, set_request_id_layer};
use crate::inbound::{gate_middleware, InboundGate};
use crate::traffic::TrafficController;

/// HTTP server fronted by the inbound gate.
pub struct HttpServer {
    router: Router,
    config: TrafficConfig,
}

impl HttpServer {
    pub fn new(config: TrafficConfig, controller: Arc<TrafficController>) -> Self {
        let gate = Arc::new(InboundGate::new(controller, &config.inbound));
        let router = Self::build_router(&config, gate);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &TrafficConfig, gate: Arc<InboundGate>) -> Router {
        let routes = Router::new()
            .route("/health", get(health_handler))
            .fallback(echo_handler);
        Self::with_middleware(routes, config, gate)
    }

    #[allow(deprecated)]
    fn with_middleware(routes: Router, config: &TrafficConfig, gate: Arc<InboundGate>) -> Router {
        routes
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(middleware::from_fn_with_state(gate, gate_middleware))
            .layer(
                ServiceBuilder::new()
                    .layer(set_request_id_layer())
                    .layer(TraceLayer::new_for_http())
                    .layer(propagate_request_id_layer()),
            )
    }

    /// The router, for embedding or for driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve until `shutdown` resolves, then drain in-flight requests.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    pub fn config(&self) -> &TrafficConfig {
        &self.config
    }
}

async fn health_handler() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

/// Describes the admitted request back to the caller.
async fn echo_handler(request: Request) -> impl IntoResponse {
    tracing::debug!(
        request_id = %request_id(&request),
        method = %request.method(),
        path = %request.uri().path(),
        "Request admitted"
    );

    Json(json!({
        "method": request.method().as_str(),
        "path": request.uri().path(),
        "request_id": request_id(&request),
    }))
}
