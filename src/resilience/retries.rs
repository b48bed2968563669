//! Retry policy.
//!
//! # Responsibilities
//! - Compute the backoff before each retry (exponential, jittered, capped)
//! - Decide whether an outcome is worth another attempt
//!
//! # Design Decisions
//! - Stateless: one policy value is shared by every call in a scope
//! - Transport failures, 5xx and 429 are retriable; other 4xx never are
//! - Per-call attempt tracking lives with the caller (see `outbound::executor`)

use std::time::Duration;

use crate::resilience::backoff::{apply_jitter, base_delay};
use crate::resilience::outcome::Outcome;

/// Retry tuning for a scope.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryConfig {
    /// Maximum network attempts per logical call, first attempt included.
    pub max_attempts: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub exponential_base: f64,
    /// Relative jitter in `[0, 1]`.
    pub jitter_factor: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(30),
            exponential_base: 2.0,
            jitter_factor: 0.1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// A policy that never retries.
    pub fn no_retry() -> Self {
        Self::new(RetryConfig {
            max_attempts: 1,
            ..RetryConfig::default()
        })
    }

    pub fn config(&self) -> &RetryConfig {
        &self.config
    }

    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts
    }

    /// Delay before retry `attempt` (1-based), before jitter.
    pub fn base_delay(&self, attempt: u32) -> Duration {
        base_delay(
            attempt,
            self.config.initial_delay,
            self.config.max_delay,
            self.config.exponential_base,
        )
    }

    /// Jittered delay before retry `attempt` (1-based).
    pub fn next_delay(&self, attempt: u32) -> Duration {
        apply_jitter(
            self.base_delay(attempt),
            self.config.jitter_factor,
            self.config.max_delay,
            &mut rand::thread_rng(),
        )
    }

    /// Delay honouring an upstream `Retry-After` hint, still capped at `max_delay`.
    pub fn delay_with_hint(&self, attempt: u32, hint: Option<Duration>) -> Duration {
        let delay = self.next_delay(attempt);
        match hint {
            Some(hint) => delay.max(hint).min(self.config.max_delay),
            None => delay,
        }
    }

    pub fn is_retriable(&self, outcome: &Outcome) -> bool {
        outcome.is_retriable()
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(RetryConfig::default())
    }
}
