//! Resilience primitives.
//!
//! # Data Flow
//! ```text
//! Call for a scope:
//!     → circuit_breaker.rs (fail fast while the upstream is presumed down)
//!     → token_bucket.rs (spend one token or report the wait)
//!     → attempt
//!     → outcome.rs (classify the result)
//!     → retries.rs + backoff.rs (retry? after how long?)
//!     → timeouts.rs (sleep without overrunning the caller's deadline)
//! ```
//!
//! # Design Decisions
//! - Buckets and breakers are plain state machines with no locks or clocks;
//!   the traffic controller owns locking and time
//! - Retry policy is stateless and shared per scope

pub mod backoff;
pub mod circuit_breaker;
pub mod outcome;
pub mod retries;
pub mod timeouts;
pub mod token_bucket;

pub use circuit_breaker::{BreakerConfig, BreakerSnapshot, CircuitBreaker, CircuitState};
pub use outcome::{Outcome, OutcomeClass};
pub use retries::{RetryConfig, RetryPolicy};
pub use timeouts::{Deadline, SleepOutcome};
pub use token_bucket::{BucketConfig, BucketSnapshot, ConsumeResult, TokenBucket};
