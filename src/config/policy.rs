//! Policy resolution.
//!
//! Turns the raw configuration into per-scope [`Policy`] values: defaults
//! merged with the matching named override, converted to the types the
//! resilience primitives take. Resolution happens once per scope, at scope
//! creation; nothing here runs on the request path afterwards.

use std::collections::HashMap;
use std::time::Duration;

use crate::config::schema::{InboundSettings, OutboundSettings, TrafficConfig};
use crate::resilience::{BreakerConfig, BucketConfig, RetryConfig};
use crate::traffic::Direction;

/// Everything a scope needs, resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct Policy {
    pub bucket: BucketConfig,
    /// Absent for inbound scopes (pure admission control).
    pub breaker: Option<BreakerConfig>,
    /// Absent for inbound scopes.
    pub retry: Option<RetryConfig>,
    /// Non-429 client-error statuses that count as breaker failures.
    pub failure_statuses: Vec<u16>,
}

impl From<&OutboundSettings> for Policy {
    fn from(s: &OutboundSettings) -> Self {
        Policy {
            bucket: BucketConfig {
                capacity: s.capacity,
                refill_rate: s.refill_rate,
            },
            breaker: Some(BreakerConfig {
                failure_threshold: s.failure_threshold,
                success_threshold: s.success_threshold,
                timeout: secs(s.timeout_seconds),
            }),
            retry: Some(RetryConfig {
                max_attempts: s.max_attempts,
                initial_delay: secs(s.initial_delay),
                max_delay: secs(s.max_delay),
                exponential_base: s.exponential_base,
                jitter_factor: s.jitter_factor,
            }),
            failure_statuses: s.failure_statuses.clone(),
        }
    }
}

impl From<&InboundSettings> for Policy {
    fn from(s: &InboundSettings) -> Self {
        Policy {
            bucket: BucketConfig {
                capacity: s.capacity,
                refill_rate: s.refill_rate,
            },
            breaker: None,
            retry: None,
            failure_statuses: Vec::new(),
        }
    }
}

// Validation rejects negative and non-finite values before we get here.
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::MAX)
}

/// Pre-merged policies for every configured name, plus the two defaults.
#[derive(Debug, Clone)]
pub struct PolicyTable {
    outbound_default: Policy,
    inbound_default: Policy,
    providers: HashMap<String, Policy>,
    groups: HashMap<String, Policy>,
}

impl PolicyTable {
    pub fn from_config(config: &TrafficConfig) -> Self {
        let outbound = &config.outbound;
        let inbound = &config.inbound;

        Self {
            outbound_default: Policy::from(&outbound.defaults),
            inbound_default: Policy::from(&inbound.defaults),
            providers: outbound
                .providers
                .iter()
                .map(|(name, over)| (name.clone(), Policy::from(&outbound.defaults.merged(over))))
                .collect(),
            groups: inbound
                .groups
                .iter()
                .map(|(name, over)| (name.clone(), Policy::from(&inbound.defaults.merged(over))))
                .collect(),
        }
    }

    /// Policy for a scope: its override if one is configured, else the default.
    pub fn resolve(&self, direction: Direction, name: &str) -> Policy {
        let (named, default) = match direction {
            Direction::Outbound => (&self.providers, &self.outbound_default),
            Direction::Inbound => (&self.groups, &self.inbound_default),
        };
        named.get(name).unwrap_or(default).clone()
    }
}

impl Default for PolicyTable {
    fn default() -> Self {
        Self::from_config(&TrafficConfig::default())
    }
}
