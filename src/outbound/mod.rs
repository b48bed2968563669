//! Outbound traffic: calls this process makes to external providers.
//!
//! # Data Flow
//! ```text
//! TrafficClient / BlockingTrafficClient
//!     → executor.rs (acquire, attempt, retry loop, record)
//!     → reqwest
//!     → provider
//! ```

pub mod blocking;
pub mod client;
pub mod executor;

pub use blocking::BlockingTrafficClient;
pub use client::TrafficClient;
pub use executor::{execute, execute_blocking, Attempt, CallOptions, RetryLoop, Step};
