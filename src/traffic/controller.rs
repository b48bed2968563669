//! Traffic controller.
//!
//! # Responsibilities
//! - Own the scope registry and create each scope's state on first use
//! - Answer "may I proceed" (`acquire`) for a scope
//! - Fold completed calls back into the scope (`record`, `record_retry`)
//! - Serve read-only snapshots to the status surface
//!
//! # Design Decisions
//! - The registry is an injectable value, not a process global
//! - One mutex per scope; bucket, breaker and counters change together under it
//! - The registry map is sharded and only write-locked when a scope is created,
//!   so lookups of existing scopes never wait on unrelated creations
//! - `acquire` checks the breaker before the bucket: an open circuit must not
//!   spend tokens
//! - `acquire` never waits; denials carry a wait hint instead

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;

use crate::clock::{Clock, SystemClock};
use crate::config::{Policy, PolicyTable, TrafficConfig};
use crate::error::TrafficError;
use crate::observability::metrics;
use crate::resilience::{
    BreakerSnapshot, BucketSnapshot, CircuitBreaker, CircuitState, Outcome, OutcomeClass,
    RetryPolicy, TokenBucket,
};
use crate::traffic::scope::{Direction, ScopeKey};
use crate::traffic::telemetry::TelemetryCounters;

/// Why `acquire` refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialReason {
    CircuitOpen,
    RateLimited,
}

impl DenialReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            DenialReason::CircuitOpen => "circuit_open",
            DenialReason::RateLimited => "rate_limited",
        }
    }
}

/// A refused acquire.
#[derive(Debug, Clone, PartialEq)]
pub struct Denial {
    pub scope: ScopeKey,
    pub reason: DenialReason,
    /// How long until asking again could succeed.
    pub retry_after: Duration,
}

impl From<Denial> for TrafficError {
    fn from(denial: Denial) -> Self {
        match denial.reason {
            DenialReason::CircuitOpen => TrafficError::CircuitOpen {
                scope: denial.scope,
                retry_after: denial.retry_after,
            },
            DenialReason::RateLimited => TrafficError::RateLimited {
                scope: denial.scope,
                retry_after: denial.retry_after,
            },
        }
    }
}

/// Permission to make one attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct Permit {
    pub scope: ScopeKey,
    /// Tokens left in the bucket after this permit.
    pub tokens_remaining: f64,
    /// This attempt is the half-open probe.
    pub probe: bool,
    probe_ticket: u64,
}

/// Read-only view of one scope.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ScopeSnapshot {
    pub scope: ScopeKey,
    pub direction: Direction,
    pub name: String,
    pub bucket: BucketSnapshot,
    /// Absent for inbound scopes.
    pub breaker: Option<BreakerSnapshot>,
    pub telemetry: TelemetryCounters,
}

#[derive(Debug)]
struct ScopeState {
    bucket: TokenBucket,
    breaker: Option<CircuitBreaker>,
    telemetry: TelemetryCounters,
}

/// A scope's policy and guarded state.
#[derive(Debug)]
pub struct Scope {
    key: ScopeKey,
    policy: Policy,
    retry: RetryPolicy,
    state: Mutex<ScopeState>,
}

impl Scope {
    fn new(key: ScopeKey, policy: Policy, clock: &dyn Clock) -> Self {
        let state = ScopeState {
            bucket: TokenBucket::new(policy.bucket, clock.now()),
            breaker: policy.breaker.map(CircuitBreaker::new),
            telemetry: TelemetryCounters::default(),
        };
        Self {
            retry: policy.retry.map(RetryPolicy::new).unwrap_or_else(RetryPolicy::no_retry),
            key,
            policy,
            state: Mutex::new(state),
        }
    }

    pub fn key(&self) -> &ScopeKey {
        &self.key
    }

    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Retry policy; a single attempt for inbound scopes.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    // Every critical section leaves the state consistent, so a panic elsewhere
    // while holding the lock does not invalidate it.
    fn lock(&self) -> MutexGuard<'_, ScopeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Whether a terminal outcome counts for the breaker: `Some(true)` success,
    /// `Some(false)` failure, `None` neutral.
    fn breaker_verdict(&self, outcome: &Outcome) -> Option<bool> {
        match outcome.class() {
            OutcomeClass::Success => Some(true),
            OutcomeClass::RateLimited | OutcomeClass::ServerError => Some(false),
            OutcomeClass::ClientError => outcome
                .status()
                .filter(|code| self.policy.failure_statuses.contains(code))
                .map(|_| false),
        }
    }
}

/// Registry of scopes and the single coordinator of their state.
#[derive(Debug)]
pub struct TrafficController {
    scopes: DashMap<ScopeKey, Arc<Scope>>,
    policies: PolicyTable,
    clock: Arc<dyn Clock>,
    detailed_telemetry: bool,
}

impl TrafficController {
    /// Controller using the given config's policies and the system clock.
    pub fn new(config: &TrafficConfig) -> Self {
        Self::from_policies(PolicyTable::from_config(config))
            .with_detailed_telemetry(config.observability.detailed_telemetry)
    }

    pub fn from_policies(policies: PolicyTable) -> Self {
        Self {
            scopes: DashMap::new(),
            policies,
            clock: Arc::new(SystemClock),
            detailed_telemetry: false,
        }
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Emit one structured event per recorded outcome.
    pub fn with_detailed_telemetry(mut self, enabled: bool) -> Self {
        self.detailed_telemetry = enabled;
        self
    }

    /// Look up a scope, creating it from its resolved policy on first use.
    pub fn scope(&self, key: &ScopeKey) -> Arc<Scope> {
        if let Some(existing) = self.scopes.get(key) {
            return Arc::clone(existing.value());
        }

        let entry = self.scopes.entry(key.clone()).or_insert_with(|| {
            let policy = self.policies.resolve(key.direction(), key.name());
            tracing::debug!(scope = %key, ?policy, "Scope created");
            Arc::new(Scope::new(key.clone(), policy, self.clock.as_ref()))
        });
        Arc::clone(entry.value())
    }

    /// Ask to proceed with one attempt in `scope_id`.
    pub fn acquire(&self, scope_id: &str, direction: Direction) -> Result<Permit, Denial> {
        self.acquire_key(&ScopeKey::new(direction, scope_id))
    }

    /// [`acquire`](Self::acquire) for a prebuilt key.
    pub fn acquire_key(&self, key: &ScopeKey) -> Result<Permit, Denial> {
        let scope = self.scope(key);
        let now = self.clock.now();
        let mut guard = scope.lock();
        let state = &mut *guard;

        let mut probe = false;
        let mut probe_ticket = 0;
        if let Some(breaker) = state.breaker.as_mut() {
            let before = breaker.state();
            if !breaker.allow_request(now) {
                state.telemetry.total_circuit_rejections += 1;
                let retry_after = breaker.retry_hint(now);
                drop(guard);

                metrics::record_denied(key, DenialReason::CircuitOpen.as_str());
                tracing::debug!(scope = %key, retry_after = ?retry_after, "Circuit open, request rejected");
                return Err(Denial {
                    scope: key.clone(),
                    reason: DenialReason::CircuitOpen,
                    retry_after,
                });
            }
            probe = breaker.state() == CircuitState::HalfOpen;
            probe_ticket = breaker.probe_ticket();
            if before != breaker.state() {
                log_transition(key, before, breaker.state());
            }
        }

        let consumed = state.bucket.try_consume(now);
        if !consumed.allowed {
            if probe {
                // The probe never ran; let the next caller take it.
                if let Some(breaker) = state.breaker.as_mut() {
                    breaker.release_probe();
                }
            }
            state.telemetry.total_rate_limited += 1;
            drop(guard);

            let retry_after = Duration::try_from_secs_f64(consumed.seconds_until_next_token)
                .unwrap_or(Duration::MAX);
            metrics::record_denied(key, DenialReason::RateLimited.as_str());
            tracing::debug!(scope = %key, retry_after = ?retry_after, "Rate limit exceeded");
            return Err(Denial {
                scope: key.clone(),
                reason: DenialReason::RateLimited,
                retry_after,
            });
        }

        Ok(Permit {
            scope: key.clone(),
            tokens_remaining: consumed.tokens_available,
            probe,
            probe_ticket,
        })
    }

    /// Record the terminal outcome of a call made under a permit.
    ///
    /// 2xx closes toward healthy, 5xx/429/transport count as failures, other
    /// 4xx are caller errors and leave the breaker alone unless listed in the
    /// scope's `failure_statuses`.
    pub fn record(&self, key: &ScopeKey, outcome: Outcome) {
        let scope = self.scope(key);
        let class = outcome.class();
        let verdict = scope.breaker_verdict(&outcome);
        let now = self.clock.now();

        let mut state = scope.lock();
        state.telemetry.record(class);

        let mut transition = None;
        if let Some(breaker) = state.breaker.as_mut() {
            let before = breaker.state();
            match verdict {
                Some(success) => breaker.report_outcome(success, now),
                None => breaker.release_probe(),
            }
            if before != breaker.state() {
                transition = Some((before, breaker.state()));
            }
        }
        let counters = state.telemetry;
        drop(state);

        metrics::record_outcome(key, class);
        if let Some((from, to)) = transition {
            log_transition(key, from, to);
        }
        if self.detailed_telemetry {
            tracing::info!(
                scope = %key,
                outcome = %outcome,
                class = class.as_str(),
                total_requests = counters.total_requests,
                total_2xx = counters.total_2xx,
                total_4xx = counters.total_4xx,
                total_5xx = counters.total_5xx,
                total_429 = counters.total_429,
                total_retries = counters.total_retries,
                "Call recorded"
            );
        }
    }

    /// Count one outbound re-attempt.
    pub fn record_retry(&self, key: &ScopeKey) {
        let scope = self.scope(key);
        scope.lock().telemetry.total_retries += 1;
        metrics::record_retry(key);
    }

    /// Return a permit's half-open probe slot without reporting an outcome.
    ///
    /// A no-op once the probe has been reported or superseded.
    pub fn release(&self, permit: &Permit) {
        if !permit.probe {
            return;
        }
        let scope = self.scope(&permit.scope);
        let mut state = scope.lock();
        if let Some(breaker) = state.breaker.as_mut() {
            breaker.release_probe_ticket(permit.probe_ticket);
        }
    }

    /// Snapshot of one scope. Fails for scopes that have never been used.
    pub fn snapshot(&self, key: &ScopeKey) -> Result<ScopeSnapshot, TrafficError> {
        let scope = self
            .scopes
            .get(key)
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| TrafficError::ScopeNotFound(key.to_string()))?;
        Ok(self.snapshot_scope(&scope))
    }

    /// Snapshots of every active scope, ordered by key.
    pub fn snapshot_all(&self) -> Vec<ScopeSnapshot> {
        let scopes: Vec<Arc<Scope>> = self
            .scopes
            .iter()
            .map(|entry| Arc::clone(entry.value()))
            .collect();

        let mut snapshots: Vec<ScopeSnapshot> =
            scopes.iter().map(|scope| self.snapshot_scope(scope)).collect();
        snapshots.sort_by(|a, b| a.scope.cmp(&b.scope));
        snapshots
    }

    fn snapshot_scope(&self, scope: &Scope) -> ScopeSnapshot {
        let now = self.clock.now();
        let state = scope.lock();
        ScopeSnapshot {
            scope: scope.key.clone(),
            direction: scope.key.direction(),
            name: scope.key.name().to_string(),
            bucket: state.bucket.snapshot(now),
            breaker: state.breaker.as_ref().map(|b| b.snapshot(now)),
            telemetry: state.telemetry,
        }
    }

    /// Number of scopes created so far.
    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }
}

impl Default for TrafficController {
    fn default() -> Self {
        Self::from_policies(PolicyTable::default())
    }
}

fn log_transition(key: &ScopeKey, from: CircuitState, to: CircuitState) {
    metrics::record_circuit_state(key, to);
    match to {
        CircuitState::Open => {
            tracing::warn!(scope = %key, from = %from, to = %to, "Circuit breaker opened")
        }
        _ => tracing::info!(scope = %key, from = %from, to = %to, "Circuit breaker transition"),
    }
}
