//! Continuous-refill token bucket.
//!
//! Tokens accrue continuously at `refill_rate` per second up to `capacity`;
//! each admitted request spends one. Bursts are smoothed rather than reset at
//! window boundaries.
//!
//! The bucket holds no lock and reads no clock: the owning scope serializes
//! access and passes in `now`.

use std::time::Instant;

use serde::Serialize;

/// Bucket sizing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BucketConfig {
    /// Maximum tokens (burst size). Always > 0.
    pub capacity: f64,
    /// Tokens added per second. Always > 0.
    pub refill_rate: f64,
}

/// Result of a consume attempt.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConsumeResult {
    pub allowed: bool,
    /// Tokens left after this call.
    pub tokens_available: f64,
    /// Seconds until one whole token is available; 0 when one already is.
    pub seconds_until_next_token: f64,
}

/// Read-only view of a bucket.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BucketSnapshot {
    pub capacity: f64,
    pub refill_rate: f64,
    pub tokens: f64,
}

#[derive(Debug)]
pub struct TokenBucket {
    config: BucketConfig,
    tokens: f64,
    last_refill_at: Instant,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(config: BucketConfig, now: Instant) -> Self {
        Self {
            config,
            tokens: config.capacity,
            last_refill_at: now,
        }
    }

    pub fn config(&self) -> BucketConfig {
        self.config
    }

    fn refilled(&self, now: Instant) -> f64 {
        // `saturating_duration_since` keeps a clock that jumps backwards from
        // draining the bucket.
        let elapsed = now.saturating_duration_since(self.last_refill_at).as_secs_f64();
        (self.tokens + elapsed * self.config.refill_rate).min(self.config.capacity)
    }

    fn wait_for_token(&self) -> f64 {
        if self.tokens >= 1.0 {
            0.0
        } else {
            (1.0 - self.tokens) / self.config.refill_rate
        }
    }

    /// Refill, then try to spend one token.
    pub fn try_consume(&mut self, now: Instant) -> ConsumeResult {
        self.tokens = self.refilled(now);
        self.last_refill_at = now;

        let allowed = if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        };

        ConsumeResult {
            allowed,
            tokens_available: self.tokens,
            seconds_until_next_token: self.wait_for_token(),
        }
    }

    /// Project the fill level at `now` without mutating the bucket.
    pub fn snapshot(&self, now: Instant) -> BucketSnapshot {
        BucketSnapshot {
            capacity: self.config.capacity,
            refill_rate: self.config.refill_rate,
            tokens: self.refilled(now),
        }
    }
}
