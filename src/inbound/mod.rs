//! Inbound traffic: calls other services make into this process.
//!
//! # Data Flow
//! ```text
//! HTTP request
//!     → gate.rs (middleware)
//!     → classifier.rs (path → endpoint group)
//!     → TrafficController::acquire (endpoint-group scope)
//!     → 429 + Retry-After, or the handler
//! ```

pub mod classifier;
pub mod gate;

pub use classifier::{Classification, EndpointClassifier};
pub use gate::{gate_middleware, GateDecision, GateRejection, InboundGate};
