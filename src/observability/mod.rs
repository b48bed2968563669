//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! TrafficController / gate / outbound client produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → Metrics endpoint (Prometheus scrape)
//!     → Status surface (admin/, reads controller snapshots directly)
//! ```
//!
//! # Design Decisions
//! - Structured logging with scope keys as fields
//! - Metrics are cheap and recorder-agnostic (metrics facade)
//! - Per-call outcome events are opt-in (`observability.detailed_telemetry`)

pub mod logging;
pub mod metrics;
