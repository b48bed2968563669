//! Traffic control for outbound provider calls and inbound endpoints.
//!
//! A [`TrafficController`] owns one scope per provider or endpoint group.
//! Each scope pairs a token bucket with (outbound only) a circuit breaker and
//! a retry policy. [`TrafficClient`] and [`BlockingTrafficClient`] wrap
//! provider calls; [`InboundGate`] fronts an axum service.

pub mod admin;
pub mod clock;
pub mod config;
pub mod error;
pub mod http;
pub mod inbound;
pub mod lifecycle;
pub mod observability;
pub mod outbound;
pub mod resilience;
pub mod traffic;

pub use config::TrafficConfig;
pub use error::{Result, TrafficError};
pub use http::HttpServer;
pub use inbound::InboundGate;
pub use lifecycle::Shutdown;
pub use outbound::{BlockingTrafficClient, TrafficClient};
pub use traffic::{Direction, ScopeKey, TrafficController};
