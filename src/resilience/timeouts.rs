//! Deadlines and deadline-aware sleeping.
//!
//! # Responsibilities
//! - Represent a caller's total time budget for a logical call
//! - Suspend a retry loop without overrunning that budget
//!
//! # Design Decisions
//! - One primitive with two hosts: `sleep` for tasks, `sleep_blocking` for threads
//! - A sleep that would cross the deadline does not start
//! - Async cancellation is by dropping the future

use std::time::{Duration, Instant};

/// Absolute point in time after which no new attempt may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Deadline(Option<Instant>);

/// How a deadline-aware sleep ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepOutcome {
    Completed,
    DeadlineExceeded,
}

impl Deadline {
    /// No deadline.
    pub fn none() -> Self {
        Self(None)
    }

    pub fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    /// Deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self(Instant::now().checked_add(budget))
    }

    pub fn instant(&self) -> Option<Instant> {
        self.0
    }

    /// Time left, `None` when unbounded.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.0.map(|at| at.saturating_duration_since(now))
    }

    pub fn is_expired(&self, now: Instant) -> bool {
        matches!(self.remaining(now), Some(left) if left.is_zero())
    }

    /// Whether waiting `delay` from `now` ends strictly before the deadline.
    pub fn admits(&self, now: Instant, delay: Duration) -> bool {
        match self.remaining(now) {
            Some(left) => delay < left,
            None => true,
        }
    }

    /// Cap a per-attempt timeout by the remaining budget.
    pub fn clamp(&self, timeout: Duration, now: Instant) -> Duration {
        match self.remaining(now) {
            Some(left) => timeout.min(left),
            None => timeout,
        }
    }
}

/// Sleep on the tokio timer unless doing so would cross `deadline`.
pub async fn sleep(delay: Duration, deadline: Deadline) -> SleepOutcome {
    if !deadline.admits(Instant::now(), delay) {
        return SleepOutcome::DeadlineExceeded;
    }
    tokio::time::sleep(delay).await;
    SleepOutcome::Completed
}

/// Blocking counterpart of [`sleep`].
pub fn sleep_blocking(delay: Duration, deadline: Deadline) -> SleepOutcome {
    if !deadline.admits(Instant::now(), delay) {
        return SleepOutcome::DeadlineExceeded;
    }
    std::thread::sleep(delay);
    SleepOutcome::Completed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unbounded_deadline_admits_everything() {
        let d = Deadline::none();
        let now = Instant::now();
        assert!(d.admits(now, Duration::from_secs(3600)));
        assert!(!d.is_expired(now));
        assert_eq!(d.clamp(Duration::from_secs(5), now), Duration::from_secs(5));
    }

    #[test]
    fn test_bounded_deadline() {
        let now = Instant::now();
        let d = Deadline::at(now + Duration::from_secs(2));
        assert!(d.admits(now, Duration::from_secs(1)));
        assert!(!d.admits(now, Duration::from_secs(2)));
        assert_eq!(d.clamp(Duration::from_secs(30), now), Duration::from_secs(2));
        assert!(d.is_expired(now + Duration::from_secs(3)));
    }

    #[test]
    fn test_blocking_sleep_refuses_to_overrun() {
        let d = Deadline::after(Duration::from_millis(20));
        assert_eq!(
            sleep_blocking(Duration::from_secs(5), d),
            SleepOutcome::DeadlineExceeded
        );
        assert_eq!(
            sleep_blocking(Duration::from_millis(1), Deadline::none()),
            SleepOutcome::Completed
        );
    }

    #[tokio::test]
    async fn test_async_sleep_refuses_to_overrun() {
        let d = Deadline::after(Duration::from_millis(20));
        assert_eq!(sleep(Duration::from_secs(5), d).await, SleepOutcome::DeadlineExceeded);
        assert_eq!(
            sleep(Duration::from_millis(1), Deadline::none()).await,
            SleepOutcome::Completed
        );
    }
}
