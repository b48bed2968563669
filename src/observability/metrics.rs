//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define traffic-control metrics
//! - Expose a Prometheus-compatible scrape endpoint
//!
//! # Metrics
//! - `traffic_acquire_denied_total` (counter): denials by scope, reason
//! - `traffic_outcomes_total` (counter): terminal outcomes by scope, class
//! - `traffic_retries_total` (counter): outbound re-attempts by scope
//! - `traffic_circuit_state` (gauge): 0=closed, 1=half_open, 2=open
//! - `traffic_gate_duration_seconds` (histogram): inbound request latency by group
//!
//! Recording is a no-op until a recorder is installed, so library users and
//! tests pay nothing unless they opt in.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::resilience::{CircuitState, OutcomeClass};
use crate::traffic::ScopeKey;

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_denied(scope: &ScopeKey, reason: &'static str) {
    counter!(
        "traffic_acquire_denied_total",
        "scope" => scope.to_string(),
        "direction" => scope.direction().as_str(),
        "reason" => reason
    )
    .increment(1);
}

pub fn record_outcome(scope: &ScopeKey, class: OutcomeClass) {
    counter!(
        "traffic_outcomes_total",
        "scope" => scope.to_string(),
        "direction" => scope.direction().as_str(),
        "class" => class.as_str()
    )
    .increment(1);
}

pub fn record_retry(scope: &ScopeKey) {
    counter!("traffic_retries_total", "scope" => scope.to_string()).increment(1);
}

pub fn record_circuit_state(scope: &ScopeKey, state: CircuitState) {
    gauge!("traffic_circuit_state", "scope" => scope.to_string()).set(state.as_gauge());
}

pub fn record_gate_latency(scope: &ScopeKey, start: Instant) {
    histogram!("traffic_gate_duration_seconds", "scope" => scope.to_string())
        .record(start.elapsed().as_secs_f64());
}
