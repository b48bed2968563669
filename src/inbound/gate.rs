//! Inbound admission gate.
//!
//! # Responsibilities
//! - Classify each request into an endpoint group
//! - Admit or reject it against that group's bucket before any handler runs
//! - Feed response classes back into the group's telemetry
//!
//! # Design Decisions
//! - Rejection is immediate: inbound callers are never queued or retried
//! - Inbound scopes have no breaker, so recorded outcomes only move counters
//! - `check` is a pure decision usable by any framework; `gate_middleware`
//!   wires it into axum

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::config::InboundConfig;
use crate::inbound::classifier::{Classification, EndpointClassifier};
use crate::observability::metrics;
use crate::resilience::Outcome;
use crate::traffic::{Denial, DenialReason, ScopeKey, TrafficController};

/// Gate verdict for one request.
#[derive(Debug, Clone, PartialEq)]
pub enum GateDecision {
    /// Path bypasses admission control.
    Exempt,
    /// Admitted; the response should be recorded against this scope.
    Proceed(ScopeKey),
    Reject(GateRejection),
}

/// A rejected inbound request. Renders as `429 Too Many Requests`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GateRejection {
    pub error: &'static str,
    pub reason: DenialReason,
    pub scope: ScopeKey,
    /// Whole seconds to wait, never less than one.
    pub retry_after: u64,
}

impl From<Denial> for GateRejection {
    fn from(denial: Denial) -> Self {
        Self {
            error: "rate_limited",
            reason: denial.reason,
            scope: denial.scope,
            retry_after: wait_hint_secs(denial.retry_after),
        }
    }
}

fn wait_hint_secs(retry_after: Duration) -> u64 {
    let secs = retry_after.as_secs_f64().ceil();
    if secs.is_finite() {
        (secs as u64).max(1)
    } else {
        u64::MAX
    }
}

impl IntoResponse for GateRejection {
    fn into_response(self) -> Response {
        let retry_after = HeaderValue::from(self.retry_after);
        let mut response = (StatusCode::TOO_MANY_REQUESTS, Json(self)).into_response();
        response.headers_mut().insert(header::RETRY_AFTER, retry_after);
        response
    }
}

#[derive(Debug)]
pub struct InboundGate {
    controller: Arc<TrafficController>,
    classifier: EndpointClassifier,
}

impl InboundGate {
    pub fn new(controller: Arc<TrafficController>, config: &InboundConfig) -> Self {
        Self {
            controller,
            classifier: EndpointClassifier::from_config(config),
        }
    }

    pub fn controller(&self) -> &Arc<TrafficController> {
        &self.controller
    }

    /// Decide whether a request for `path` may proceed.
    pub fn check(&self, path: &str) -> GateDecision {
        let scope = match self.classifier.classify(path) {
            Classification::Exempt => return GateDecision::Exempt,
            Classification::Group(scope) => scope,
        };

        match self.controller.acquire_key(scope) {
            Ok(_) => GateDecision::Proceed(scope.clone()),
            Err(denial) => GateDecision::Reject(denial.into()),
        }
    }

    /// Record the status the handler produced for an admitted request.
    pub fn complete(&self, scope: &ScopeKey, status: StatusCode) {
        self.controller.record(scope, Outcome::Status(status.as_u16()));
    }
}

/// Axum middleware running [`InboundGate::check`] ahead of the handlers.
pub async fn gate_middleware(
    State(gate): State<Arc<InboundGate>>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();

    let scope = match gate.check(request.uri().path()) {
        GateDecision::Exempt => return next.run(request).await,
        GateDecision::Proceed(scope) => scope,
        GateDecision::Reject(rejection) => {
            tracing::warn!(
                scope = %rejection.scope,
                path = %request.uri().path(),
                reason = rejection.reason.as_str(),
                retry_after = rejection.retry_after,
                "Inbound request rejected"
            );
            return rejection.into_response();
        }
    };

    let response = next.run(request).await;
    gate.complete(&scope, response.status());
    metrics::record_gate_latency(&scope, start);
    response
}
