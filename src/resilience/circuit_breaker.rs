//! Circuit breaker for upstream protection.
//!
//! # States
//! - Closed: normal operation, requests pass through
//! - Open: upstream assumed down, requests fail fast
//! - Half-Open: probing whether the upstream recovered
//!
//! # State Transitions
//! ```text
//! Closed → Open: failure_count reaches failure_threshold
//! Open → Half-Open: first allow_request() after timeout elapsed
//! Half-Open → Closed: success_count reaches success_threshold
//! Half-Open → Open: any probe fails
//! ```
//!
//! # Design Decisions
//! - Per-scope circuit breaker (never global)
//! - Single probe in flight while Half-Open; the next probe is admitted once
//!   the previous one reports or is released
//! - Every issued probe gets a ticket, so a late release of an old probe cannot
//!   free a newer one
//! - No internal locking; the owning scope serializes access and supplies `now`

use std::fmt;
use std::time::{Duration, Instant};

use serde::Serialize;

/// Wait hint for callers turned away while a probe is in flight. The probe's
/// outcome is unknown, so there is no window to report.
const PROBE_WAIT_HINT: Duration = Duration::from_secs(1);

/// Breaker thresholds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BreakerConfig {
    /// Consecutive failures while closed that open the circuit.
    pub failure_threshold: u32,
    /// Consecutive successes while half-open that close the circuit.
    pub success_threshold: u32,
    /// How long the circuit stays open before probing.
    pub timeout: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            timeout: Duration::from_secs(60),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }

    /// Numeric encoding used for the state gauge.
    pub fn as_gauge(&self) -> f64 {
        match self {
            CircuitState::Closed => 0.0,
            CircuitState::HalfOpen => 1.0,
            CircuitState::Open => 2.0,
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Read-only view of a breaker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BreakerSnapshot {
    pub state: CircuitState,
    pub failure_count: u32,
    pub success_count: u32,
    pub failure_threshold: u32,
    pub success_threshold: u32,
    pub timeout_seconds: f64,
    /// Seconds until the next probe window; present only while open.
    pub open_remaining_seconds: Option<f64>,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    state: CircuitState,
    failure_count: u32,
    success_count: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
    probe_ticket: u64,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            state: CircuitState::Closed,
            failure_count: 0,
            success_count: 0,
            opened_at: None,
            probe_in_flight: false,
            probe_ticket: 0,
        }
    }

    pub fn state(&self) -> CircuitState {
        self.state
    }

    /// Time left before an open circuit admits a probe. Zero unless open.
    pub fn remaining_open(&self, now: Instant) -> Duration {
        match (self.state, self.opened_at) {
            (CircuitState::Open, Some(opened_at)) => self
                .config
                .timeout
                .saturating_sub(now.saturating_duration_since(opened_at)),
            _ => Duration::ZERO,
        }
    }

    /// How long a refused caller should wait before asking again.
    ///
    /// The rest of the open window while open. While half-open with the probe
    /// taken, a short fixed hint (never longer than the breaker timeout).
    pub fn retry_hint(&self, now: Instant) -> Duration {
        match self.state {
            CircuitState::HalfOpen => self.config.timeout.min(PROBE_WAIT_HINT),
            _ => self.remaining_open(now),
        }
    }

    /// Ticket of the most recently issued probe.
    pub fn probe_ticket(&self) -> u64 {
        self.probe_ticket
    }

    /// Whether a request may be attempted now.
    ///
    /// May transition Open → Half-Open. A `true` answer while Half-Open
    /// reserves the probe slot until [`report_outcome`](Self::report_outcome)
    /// or [`release_probe`](Self::release_probe).
    pub fn allow_request(&mut self, now: Instant) -> bool {
        match self.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                if self.remaining_open(now) > Duration::ZERO {
                    return false;
                }
                self.transition(CircuitState::HalfOpen, now);
                self.issue_probe();
                true
            }
            CircuitState::HalfOpen => {
                if self.probe_in_flight {
                    false
                } else {
                    self.issue_probe();
                    true
                }
            }
        }
    }

    fn issue_probe(&mut self) {
        self.probe_in_flight = true;
        self.probe_ticket = self.probe_ticket.wrapping_add(1);
    }

    /// Give back a Half-Open probe slot that was not used for a reported call.
    pub fn release_probe(&mut self) {
        self.probe_in_flight = false;
    }

    /// [`release_probe`](Self::release_probe), but only if `ticket` is still
    /// the probe in flight.
    pub fn release_probe_ticket(&mut self, ticket: u64) {
        if self.state == CircuitState::HalfOpen && self.probe_ticket == ticket {
            self.probe_in_flight = false;
        }
    }

    pub fn report_outcome(&mut self, success: bool, now: Instant) {
        if success {
            self.on_success(now);
        } else {
            self.on_failure(now);
        }
    }

    fn on_success(&mut self, now: Instant) {
        match self.state {
            CircuitState::Closed => self.failure_count = 0,
            CircuitState::HalfOpen => {
                self.probe_in_flight = false;
                self.success_count = self.success_count.saturating_add(1);
                if self.success_count >= self.config.success_threshold {
                    self.transition(CircuitState::Closed, now);
                }
            }
            // An attempt admitted before the circuit opened; the open window stands.
            CircuitState::Open => {}
        }
    }

    fn on_failure(&mut self, now: Instant) {
        match self.state {
            CircuitState::Closed => {
                self.failure_count = self.failure_count.saturating_add(1);
                if self.failure_count >= self.config.failure_threshold {
                    self.transition(CircuitState::Open, now);
                }
            }
            CircuitState::HalfOpen => self.transition(CircuitState::Open, now),
            CircuitState::Open => {}
        }
    }

    fn transition(&mut self, to: CircuitState, now: Instant) {
        self.state = to;
        self.failure_count = 0;
        self.success_count = 0;
        self.probe_in_flight = false;
        self.opened_at = match to {
            CircuitState::Closed => None,
            CircuitState::Open => Some(now),
            CircuitState::HalfOpen => self.opened_at,
        };
    }

    pub fn snapshot(&self, now: Instant) -> BreakerSnapshot {
        BreakerSnapshot {
            state: self.state,
            failure_count: self.failure_count,
            success_count: self.success_count,
            failure_threshold: self.config.failure_threshold,
            success_threshold: self.config.success_threshold,
            timeout_seconds: self.config.timeout.as_secs_f64(),
            open_remaining_seconds: (self.state == CircuitState::Open)
                .then(|| self.remaining_open(now).as_secs_f64()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(failure_threshold: u32, success_threshold: u32, timeout_secs: u64) -> CircuitBreaker {
        CircuitBreaker::new(BreakerConfig {
            failure_threshold,
            success_threshold,
            timeout: Duration::from_secs(timeout_secs),
        })
    }

    #[test]
    fn test_initial_state() {
        let mut cb = breaker(3, 1, 60);
        let now = Instant::now();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.allow_request(now));

        let snap = cb.snapshot(now);
        assert_eq!(snap.failure_count, 0);
        assert_eq!(snap.success_count, 0);
        assert!(snap.open_remaining_seconds.is_none());
    }

    #[test]
    fn test_success_resets_failures_while_closed() {
        let mut cb = breaker(3, 1, 60);
        let now = Instant::now();
        cb.report_outcome(false, now);
        cb.report_outcome(false, now);
        assert_eq!(cb.snapshot(now).failure_count, 2);

        cb.report_outcome(true, now);
        assert_eq!(cb.snapshot(now).failure_count, 0);

        cb.report_outcome(false, now);
        cb.report_outcome(false, now);
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_trips_at_threshold() {
        let mut cb = breaker(3, 1, 60);
        let t0 = Instant::now();
        for _ in 0..3 {
            assert!(cb.allow_request(t0));
            cb.report_outcome(false, t0);
        }
        assert_eq!(cb.state(), CircuitState::Open);
        assert_eq!(cb.snapshot(t0).failure_count, 0);
        assert!(!cb.allow_request(t0));
    }

    #[test]
    fn test_open_window_then_half_open() {
        let mut cb = breaker(3, 1, 60);
        let t0 = Instant::now();
        for _ in 0..3 {
            cb.report_outcome(false, t0);
        }

        let t30 = t0 + Duration::from_secs(30);
        assert!(!cb.allow_request(t30));
        assert_eq!(cb.remaining_open(t30), Duration::from_secs(30));

        let t61 = t0 + Duration::from_secs(61);
        assert!(cb.allow_request(t61));
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        // Only one probe until it reports.
        assert!(!cb.allow_request(t61));
    }

    #[test]
    fn test_half_open_closes_after_success_threshold() {
        let mut cb = breaker(1, 2, 10);
        let t0 = Instant::now();
        cb.report_outcome(false, t0);
        assert_eq!(cb.state(), CircuitState::Open);

        let t = t0 + Duration::from_secs(10);
        assert!(cb.allow_request(t));
        cb.report_outcome(true, t);
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert_eq!(cb.snapshot(t).success_count, 1);

        assert!(cb.allow_request(t));
        cb.report_outcome(true, t);
        assert_eq!(cb.state(), CircuitState::Closed);

        let snap = cb.snapshot(t);
        assert_eq!(snap.success_count, 0);
        assert_eq!(snap.failure_count, 0);
        assert!(cb.allow_request(t));
        assert!(cb.allow_request(t));
    }

    #[test]
    fn test_half_open_failure_reopens_with_fresh_window() {
        let mut cb = breaker(1, 2, 10);
        let t0 = Instant::now();
        cb.report_outcome(false, t0);

        let t10 = t0 + Duration::from_secs(10);
        assert!(cb.allow_request(t10));
        cb.report_outcome(false, t10);
        assert_eq!(cb.state(), CircuitState::Open);

        // The window restarts from the failed probe, not the first trip.
        assert!(!cb.allow_request(t0 + Duration::from_secs(15)));
        assert!(cb.allow_request(t0 + Duration::from_secs(20)));
    }

    #[test]
    fn test_released_probe_can_be_reissued() {
        let mut cb = breaker(1, 1, 5);
        let t0 = Instant::now();
        cb.report_outcome(false, t0);

        let t = t0 + Duration::from_secs(5);
        assert!(cb.allow_request(t));
        assert!(!cb.allow_request(t));

        cb.release_probe();
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        assert!(cb.allow_request(t));
    }

    #[test]
    fn test_stale_ticket_does_not_free_newer_slot() {
        let mut cb = breaker(1, 2, 5);
        let t0 = Instant::now();
        cb.report_outcome(false, t0);

        let t = t0 + Duration::from_secs(5);
        assert!(cb.allow_request(t));
        let first = cb.probe_ticket();
        cb.report_outcome(true, t);

        assert!(cb.allow_request(t));
        let second = cb.probe_ticket();
        assert_ne!(first, second);

        cb.release_probe_ticket(first);
        assert!(!cb.allow_request(t));
        cb.release_probe_ticket(second);
        assert!(cb.allow_request(t));
    }

    #[test]
    fn test_retry_hint_never_zero_while_half_open() {
        let mut cb = breaker(1, 1, 30);
        let t0 = Instant::now();
        cb.report_outcome(false, t0);
        assert_eq!(cb.retry_hint(t0 + Duration::from_secs(10)), Duration::from_secs(20));

        let t = t0 + Duration::from_secs(30);
        assert!(cb.allow_request(t));
        assert!(!cb.allow_request(t));
        assert_eq!(cb.retry_hint(t), Duration::from_secs(1));

        let mut short = CircuitBreaker::new(BreakerConfig {
            failure_threshold: 1,
            success_threshold: 1,
            timeout: Duration::from_millis(50),
        });
        short.report_outcome(false, t0);
        assert!(short.allow_request(t0 + Duration::from_millis(50)));
        assert_eq!(short.retry_hint(t0), Duration::from_millis(50));
    }

    #[test]
    fn test_snapshot_reports_open_remaining() {
        let mut cb = breaker(1, 1, 30);
        let t0 = Instant::now();
        cb.report_outcome(false, t0);

        let snap = cb.snapshot(t0 + Duration::from_secs(12));
        assert_eq!(snap.state, CircuitState::Open);
        assert_eq!(snap.timeout_seconds, 30.0);
        assert_eq!(snap.open_remaining_seconds, Some(18.0));
    }

    #[test]
    fn test_saturating_failures() {
        let mut cb = breaker(u32::MAX, 1, 1);
        let now = Instant::now();
        for _ in 0..1000 {
            cb.report_outcome(false, now);
        }
        assert_eq!(cb.snapshot(now).failure_count, 1000);
        assert_eq!(cb.state(), CircuitState::Closed);
    }
}
