//! Outbound call execution.
//!
//! # Responsibilities
//! - Drive one logical call through acquire → attempt → retry → record
//! - Bound the loop by the scope's attempt limit and the caller's deadline
//! - Map the final attempt onto the caller-facing result
//!
//! # Design Decisions
//! - The retry decision is a plain state machine ([`RetryLoop`]) shared by the
//!   async and blocking drivers; only the sleeping differs
//! - Every re-attempt re-acquires from the controller: retries spend tokens
//!   and respect an open circuit like first attempts do
//! - Only the terminal outcome of a logical call reaches the breaker and the
//!   per-class counters; intermediate failures count as retries
//! - A half-open probe slot is handed back before sleeping so the re-acquire
//!   can take it again
//! - The current permit lives in a drop guard, so a cancelled call future or a
//!   panicking call also hands its probe slot back

use std::future::Future;
use std::time::{Duration, Instant};

use reqwest::header::{HeaderMap, RETRY_AFTER};

use crate::error::{Result, TrafficError};
use crate::resilience::timeouts::{self, Deadline, SleepOutcome};
use crate::resilience::{Outcome, OutcomeClass, RetryPolicy};
use crate::traffic::{Permit, ScopeKey, TrafficController};

/// Per-call limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallOptions {
    /// Timeout of a single attempt.
    pub attempt_timeout: Duration,
    /// Total budget of the logical call, retries and sleeps included.
    pub deadline: Deadline,
}

impl Default for CallOptions {
    fn default() -> Self {
        Self {
            attempt_timeout: Duration::from_secs(30),
            deadline: Deadline::none(),
        }
    }
}

/// Result of one network attempt.
#[derive(Debug)]
pub enum Attempt<T> {
    /// The upstream answered.
    Response {
        status: u16,
        /// Parsed `Retry-After`, if the upstream sent one.
        retry_after: Option<Duration>,
        response: T,
    },
    /// No response: connect failure, reset, or attempt timeout.
    Transport(String),
}

impl<T> Attempt<T> {
    pub fn outcome(&self) -> Outcome {
        match self {
            Attempt::Response { status, .. } => Outcome::Status(*status),
            Attempt::Transport(_) => Outcome::Transport,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            Attempt::Response { retry_after, .. } => *retry_after,
            Attempt::Transport(_) => None,
        }
    }
}

/// What to do after an attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    /// Sleep this long, then try again.
    Retry(Duration),
    /// The last attempt is the answer.
    Finish,
}

/// Retry bookkeeping for one logical call.
#[derive(Debug, Clone)]
pub struct RetryLoop {
    policy: RetryPolicy,
    deadline: Deadline,
    attempts: u32,
}

impl RetryLoop {
    pub fn new(policy: RetryPolicy, deadline: Deadline) -> Self {
        Self {
            policy,
            deadline,
            attempts: 0,
        }
    }

    /// Attempts completed so far.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Account for a finished attempt and decide the next step.
    pub fn after_attempt(&mut self, outcome: &Outcome, hint: Option<Duration>, now: Instant) -> Step {
        self.attempts = self.attempts.saturating_add(1);

        if !self.policy.is_retriable(outcome) || self.attempts >= self.policy.max_attempts() {
            return Step::Finish;
        }

        let delay = self.policy.delay_with_hint(self.attempts, hint);
        if !self.deadline.admits(now, delay) {
            return Step::Finish;
        }
        Step::Retry(delay)
    }
}

/// The permit of the attempt in progress.
struct HeldPermit<'a> {
    controller: &'a TrafficController,
    permit: Option<Permit>,
}

impl<'a> HeldPermit<'a> {
    fn new(controller: &'a TrafficController, permit: Permit) -> Self {
        Self {
            controller,
            permit: Some(permit),
        }
    }

    /// Hand the probe slot back now.
    fn release(&mut self) {
        if let Some(permit) = self.permit.take() {
            self.controller.release(&permit);
        }
    }

    /// The outcome is about to be recorded, which settles the probe.
    fn settle(&mut self) {
        self.permit = None;
    }
}

impl Drop for HeldPermit<'_> {
    fn drop(&mut self) {
        self.release();
    }
}

/// Run `call` under `scope`'s traffic control.
///
/// `call` receives the timeout for that attempt (the per-attempt timeout
/// capped by what is left of the deadline).
pub async fn execute<T, F, Fut>(
    controller: &TrafficController,
    scope: &ScopeKey,
    options: CallOptions,
    mut call: F,
) -> Result<T>
where
    F: FnMut(Duration) -> Fut,
    Fut: Future<Output = Attempt<T>>,
{
    let policy = *controller.scope(scope).retry_policy();
    let mut retry = RetryLoop::new(policy, options.deadline);
    let mut held = HeldPermit::new(controller, controller.acquire_key(scope)?);

    loop {
        let timeout = options.deadline.clamp(options.attempt_timeout, Instant::now());
        let attempt = call(timeout).await;
        let outcome = attempt.outcome();

        let delay = match retry.after_attempt(&outcome, attempt.retry_after(), Instant::now()) {
            Step::Finish => {
                held.settle();
                return settle(controller, scope, attempt, retry.attempts());
            }
            Step::Retry(delay) => delay,
        };

        tracing::debug!(
            scope = %scope,
            attempt = retry.attempts(),
            outcome = %outcome,
            delay = ?delay,
            "Retrying call"
        );
        held.release();
        if timeouts::sleep(delay, options.deadline).await == SleepOutcome::DeadlineExceeded {
            return settle(controller, scope, attempt, retry.attempts());
        }

        controller.record_retry(scope);
        held = match controller.acquire_key(scope) {
            Ok(permit) => HeldPermit::new(controller, permit),
            Err(denial) => {
                controller.record(scope, outcome);
                return Err(denial.into());
            }
        };
    }
}

/// Blocking counterpart of [`execute`]. Sleeps the calling thread.
pub fn execute_blocking<T, F>(
    controller: &TrafficController,
    scope: &ScopeKey,
    options: CallOptions,
    mut call: F,
) -> Result<T>
where
    F: FnMut(Duration) -> Attempt<T>,
{
    let policy = *controller.scope(scope).retry_policy();
    let mut retry = RetryLoop::new(policy, options.deadline);
    let mut held = HeldPermit::new(controller, controller.acquire_key(scope)?);

    loop {
        let timeout = options.deadline.clamp(options.attempt_timeout, Instant::now());
        let attempt = call(timeout);
        let outcome = attempt.outcome();

        let delay = match retry.after_attempt(&outcome, attempt.retry_after(), Instant::now()) {
            Step::Finish => {
                held.settle();
                return settle(controller, scope, attempt, retry.attempts());
            }
            Step::Retry(delay) => delay,
        };

        tracing::debug!(
            scope = %scope,
            attempt = retry.attempts(),
            outcome = %outcome,
            delay = ?delay,
            "Retrying call"
        );
        held.release();
        if timeouts::sleep_blocking(delay, options.deadline) == SleepOutcome::DeadlineExceeded {
            return settle(controller, scope, attempt, retry.attempts());
        }

        controller.record_retry(scope);
        held = match controller.acquire_key(scope) {
            Ok(permit) => HeldPermit::new(controller, permit),
            Err(denial) => {
                controller.record(scope, outcome);
                return Err(denial.into());
            }
        };
    }
}

/// Record the terminal attempt and turn it into the caller's result.
fn settle<T>(
    controller: &TrafficController,
    scope: &ScopeKey,
    attempt: Attempt<T>,
    attempts: u32,
) -> Result<T> {
    let outcome = attempt.outcome();
    controller.record(scope, outcome);

    match attempt {
        Attempt::Response {
            status, response, ..
        } => match outcome.class() {
            OutcomeClass::Success => Ok(response),
            OutcomeClass::ClientError => Err(TrafficError::ClientError {
                scope: scope.clone(),
                status,
            }),
            OutcomeClass::RateLimited | OutcomeClass::ServerError => {
                tracing::warn!(scope = %scope, status, attempts, "Upstream call failed");
                Err(TrafficError::UpstreamError {
                    scope: scope.clone(),
                    status: Some(status),
                    attempts,
                    message: format!("HTTP {}", status),
                })
            }
        },
        Attempt::Transport(message) => {
            tracing::warn!(scope = %scope, attempts, error = %message, "Upstream call failed");
            Err(TrafficError::UpstreamError {
                scope: scope.clone(),
                status: None,
                attempts,
                message,
            })
        }
    }
}

/// `Retry-After` in delta-seconds form. HTTP-date values are ignored.
pub fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}
