//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the traffic
//! control layer. All types derive Serde traits for deserialization from
//! config files; every section has defaults so a minimal (even empty) file
//! is valid.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct TrafficConfig {
    /// Listener configuration for the host server.
    pub listener: ListenerConfig,

    /// Timeout configuration for the host server.
    pub timeouts: TimeoutConfig,

    /// Policies for calls this process makes to external providers.
    pub outbound: OutboundConfig,

    /// Policies for calls other services make into this process.
    pub inbound: InboundConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Read-only status surface.
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration for the host server.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Outbound (provider) traffic configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct OutboundConfig {
    /// Settings applied to every provider without an override.
    pub defaults: OutboundSettings,

    /// Per-provider overrides keyed by provider name.
    pub providers: BTreeMap<String, OutboundOverride>,
}

/// Fully specified outbound settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutboundSettings {
    /// Bucket capacity (burst size).
    pub capacity: f64,
    /// Tokens added per second.
    pub refill_rate: f64,
    /// Consecutive failures that open the breaker.
    pub failure_threshold: u32,
    /// Consecutive half-open successes that close the breaker.
    pub success_threshold: u32,
    /// Seconds the breaker stays open before probing.
    pub timeout_seconds: f64,
    /// Maximum network attempts per logical call (first attempt included).
    pub max_attempts: u32,
    /// Delay before the first retry, in seconds.
    pub initial_delay: f64,
    /// Upper bound on any retry delay, in seconds.
    pub max_delay: f64,
    /// Multiplier applied per attempt.
    pub exponential_base: f64,
    /// Relative jitter in `[0, 1]`.
    pub jitter_factor: f64,
    /// Client-error statuses (other than 429) that count as breaker failures.
    /// Empty means every non-429 4xx is breaker neutral.
    pub failure_statuses: Vec<u16>,
}

impl Default for OutboundSettings {
    fn default() -> Self {
        Self {
            capacity: 60.0,
            refill_rate: 1.0,
            failure_threshold: 5,
            success_threshold: 2,
            timeout_seconds: 60.0,
            max_attempts: 3,
            initial_delay: 1.0,
            max_delay: 30.0,
            exponential_base: 2.0,
            jitter_factor: 0.1,
            failure_statuses: Vec::new(),
        }
    }
}

/// Partial outbound settings; unset fields inherit from the defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct OutboundOverride {
    pub capacity: Option<f64>,
    pub refill_rate: Option<f64>,
    pub failure_threshold: Option<u32>,
    pub success_threshold: Option<u32>,
    pub timeout_seconds: Option<f64>,
    pub max_attempts: Option<u32>,
    pub initial_delay: Option<f64>,
    pub max_delay: Option<f64>,
    pub exponential_base: Option<f64>,
    pub jitter_factor: Option<f64>,
    pub failure_statuses: Option<Vec<u16>>,
}

impl OutboundSettings {
    /// Apply an override on top of these settings.
    pub fn merged(&self, over: &OutboundOverride) -> OutboundSettings {
        OutboundSettings {
            capacity: over.capacity.unwrap_or(self.capacity),
            refill_rate: over.refill_rate.unwrap_or(self.refill_rate),
            failure_threshold: over.failure_threshold.unwrap_or(self.failure_threshold),
            success_threshold: over.success_threshold.unwrap_or(self.success_threshold),
            timeout_seconds: over.timeout_seconds.unwrap_or(self.timeout_seconds),
            max_attempts: over.max_attempts.unwrap_or(self.max_attempts),
            initial_delay: over.initial_delay.unwrap_or(self.initial_delay),
            max_delay: over.max_delay.unwrap_or(self.max_delay),
            exponential_base: over.exponential_base.unwrap_or(self.exponential_base),
            jitter_factor: over.jitter_factor.unwrap_or(self.jitter_factor),
            failure_statuses: over
                .failure_statuses
                .clone()
                .unwrap_or_else(|| self.failure_statuses.clone()),
        }
    }
}

/// Inbound (endpoint group) traffic configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InboundConfig {
    /// Settings applied to every endpoint group without an override.
    pub defaults: InboundSettings,

    /// Per-group overrides keyed by endpoint group name.
    pub groups: BTreeMap<String, InboundOverride>,

    /// Path-prefix to endpoint-group mapping.
    pub routes: Vec<EndpointRoute>,

    /// Group for paths matching no route.
    pub default_group: String,

    /// Paths that bypass the gate entirely (health checks).
    pub exempt_paths: Vec<String>,
}

impl Default for InboundConfig {
    fn default() -> Self {
        Self {
            defaults: InboundSettings::default(),
            groups: BTreeMap::new(),
            routes: Vec::new(),
            default_group: "default".to_string(),
            exempt_paths: vec!["/health".to_string()],
        }
    }
}

/// Fully specified inbound settings. Inbound scopes have no breaker or retry.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InboundSettings {
    /// Bucket capacity (burst size).
    pub capacity: f64,
    /// Tokens added per second.
    pub refill_rate: f64,
}

impl Default for InboundSettings {
    fn default() -> Self {
        Self {
            capacity: 100.0,
            refill_rate: 10.0,
        }
    }
}

/// Partial inbound settings.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct InboundOverride {
    pub capacity: Option<f64>,
    pub refill_rate: Option<f64>,
}

impl InboundSettings {
    /// Apply an override on top of these settings.
    pub fn merged(&self, over: &InboundOverride) -> InboundSettings {
        InboundSettings {
            capacity: over.capacity.unwrap_or(self.capacity),
            refill_rate: over.refill_rate.unwrap_or(self.refill_rate),
        }
    }
}

/// Maps a path prefix onto an endpoint group.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EndpointRoute {
    /// Path prefix to match (segment aware).
    pub prefix: String,

    /// Endpoint group name.
    pub group: String,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) or a full filter directive.
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// Emit a structured event for every recorded call outcome.
    pub detailed_telemetry: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
            detailed_telemetry: false,
        }
    }
}

/// Status surface configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Serve the status endpoints.
    pub enabled: bool,

    /// Status surface bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}
