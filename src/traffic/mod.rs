//! Traffic control core.
//!
//! # Data Flow
//! ```text
//! Outbound call / inbound request
//!     → scope.rs (ScopeKey: direction + name)
//!     → controller.rs (get-or-create scope, acquire, record)
//!     → telemetry.rs (per-scope counters)
//! ```
//!
//! Both directions share the same controller; only their policies differ.

pub mod controller;
pub mod scope;
pub mod telemetry;

pub use controller::{Denial, DenialReason, Permit, Scope, ScopeSnapshot, TrafficController};
pub use scope::{Direction, ScopeKey};
pub use telemetry::TelemetryCounters;
