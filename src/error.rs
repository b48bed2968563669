//! Error taxonomy for traffic-controlled calls.

use std::time::Duration;

use thiserror::Error;

use crate::traffic::ScopeKey;

/// Failure of a traffic-controlled call or a status query.
#[derive(Debug, Error)]
pub enum TrafficError {
    /// The scope's bucket is empty. Recoverable by waiting `retry_after`.
    #[error("rate limited on {scope}; retry after {:.3}s", .retry_after.as_secs_f64())]
    RateLimited { scope: ScopeKey, retry_after: Duration },

    /// The upstream is presumed unhealthy. Recoverable once the breaker times out.
    #[error("circuit open for {scope}; retry after {:.3}s", .retry_after.as_secs_f64())]
    CircuitOpen { scope: ScopeKey, retry_after: Duration },

    /// Transport failure or retriable status, after the last permitted attempt.
    /// `status` is `None` for transport failures.
    #[error("upstream error on {scope} after {attempts} attempt(s): {}", describe_status(.status, .message))]
    UpstreamError {
        scope: ScopeKey,
        status: Option<u16>,
        attempts: u32,
        message: String,
    },

    /// A 4xx other than 429. Never retried.
    #[error("client error on {scope}: HTTP {status}")]
    ClientError { scope: ScopeKey, status: u16 },

    /// The status surface was asked about a scope that has never been used.
    #[error("scope not found: {0}")]
    ScopeNotFound(String),

    /// The request could not be built (bad URL, unserializable body).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

fn describe_status(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("HTTP {}", code),
        None => format!("transport failure ({})", message),
    }
}

impl TrafficError {
    /// Wait hint carried by a denial.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            TrafficError::RateLimited { retry_after, .. }
            | TrafficError::CircuitOpen { retry_after, .. } => Some(*retry_after),
            _ => None,
        }
    }

    /// True for errors produced by traffic control rather than by the upstream.
    pub fn is_denial(&self) -> bool {
        matches!(
            self,
            TrafficError::RateLimited { .. } | TrafficError::CircuitOpen { .. }
        )
    }

    /// HTTP status of the upstream response, if one was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            TrafficError::UpstreamError { status, .. } => *status,
            TrafficError::ClientError { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Result alias for traffic-controlled operations.
pub type Result<T> = std::result::Result<T, TrafficError>;
