//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges on defaults and on every merged override
//! - Check the inbound route table (prefix shape, duplicates, group names)
//! - Check listener and metrics addresses
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is a pure function: TrafficConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system, never at call time

use std::collections::HashSet;
use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::{InboundSettings, OutboundSettings, TrafficConfig};

/// A single semantic problem, located by its config key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validate a whole configuration.
pub fn validate_config(config: &TrafficConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_addr(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be > 0"));
    }

    let outbound = &config.outbound;
    check_outbound(&mut errors, "outbound.defaults", &outbound.defaults);
    for (name, over) in &outbound.providers {
        let merged = outbound.defaults.merged(over);
        check_outbound(&mut errors, &format!("outbound.providers.{}", name), &merged);
    }

    let inbound = &config.inbound;
    check_inbound(&mut errors, "inbound.defaults", &inbound.defaults);
    for (name, over) in &inbound.groups {
        let merged = inbound.defaults.merged(over);
        check_inbound(&mut errors, &format!("inbound.groups.{}", name), &merged);
    }

    if inbound.default_group.trim().is_empty() {
        errors.push(ValidationError::new("inbound.default_group", "must not be empty"));
    }

    let mut seen = HashSet::new();
    for (i, route) in inbound.routes.iter().enumerate() {
        let field = format!("inbound.routes[{}]", i);
        if !route.prefix.starts_with('/') {
            errors.push(ValidationError::new(
                format!("{}.prefix", field),
                format!("'{}' must start with '/'", route.prefix),
            ));
        }
        if route.group.trim().is_empty() {
            errors.push(ValidationError::new(format!("{}.group", field), "must not be empty"));
        }
        if !seen.insert(route.prefix.trim_end_matches('/')) {
            errors.push(ValidationError::new(
                format!("{}.prefix", field),
                format!("duplicate prefix '{}'", route.prefix),
            ));
        }
    }

    for (i, path) in inbound.exempt_paths.iter().enumerate() {
        if !path.starts_with('/') {
            errors.push(ValidationError::new(
                format!("inbound.exempt_paths[{}]", i),
                format!("'{}' must start with '/'", path),
            ));
        }
    }

    let obs = &config.observability;
    if obs.log_level.trim().is_empty() {
        errors.push(ValidationError::new("observability.log_level", "must not be empty"));
    }
    if obs.metrics_enabled {
        check_addr(&mut errors, "observability.metrics_address", &obs.metrics_address);
    }
    if config.admin.enabled {
        check_addr(&mut errors, "admin.bind_address", &config.admin.bind_address);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_addr(errors: &mut Vec<ValidationError>, field: &str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            field,
            format!("'{}' is not a socket address", value),
        ));
    }
}

fn check_positive(errors: &mut Vec<ValidationError>, field: String, value: f64) {
    if !(value.is_finite() && value > 0.0) {
        errors.push(ValidationError::new(field, format!("must be > 0 (got {})", value)));
    }
}

// A bucket below one token can never admit a request.
fn check_capacity(errors: &mut Vec<ValidationError>, field: String, value: f64) {
    if !(value.is_finite() && value >= 1.0) {
        errors.push(ValidationError::new(field, format!("must be >= 1 (got {})", value)));
    }
}

fn check_non_negative(errors: &mut Vec<ValidationError>, field: String, value: f64) {
    if !(value.is_finite() && value >= 0.0) {
        errors.push(ValidationError::new(field, format!("must be >= 0 (got {})", value)));
    }
}

fn check_outbound(errors: &mut Vec<ValidationError>, prefix: &str, s: &OutboundSettings) {
    let key = |name: &str| format!("{}.{}", prefix, name);

    check_capacity(errors, key("capacity"), s.capacity);
    check_positive(errors, key("refill_rate"), s.refill_rate);
    check_positive(errors, key("timeout_seconds"), s.timeout_seconds);
    check_non_negative(errors, key("initial_delay"), s.initial_delay);
    check_non_negative(errors, key("max_delay"), s.max_delay);

    if s.failure_threshold == 0 {
        errors.push(ValidationError::new(key("failure_threshold"), "must be >= 1"));
    }
    if s.success_threshold == 0 {
        errors.push(ValidationError::new(key("success_threshold"), "must be >= 1"));
    }
    if s.max_attempts == 0 {
        errors.push(ValidationError::new(key("max_attempts"), "must be >= 1"));
    }
    if s.max_delay < s.initial_delay {
        errors.push(ValidationError::new(
            key("max_delay"),
            format!("must be >= initial_delay ({})", s.initial_delay),
        ));
    }
    if !(s.exponential_base.is_finite() && s.exponential_base >= 1.0) {
        errors.push(ValidationError::new(
            key("exponential_base"),
            format!("must be >= 1 (got {})", s.exponential_base),
        ));
    }
    if !(0.0..=1.0).contains(&s.jitter_factor) {
        errors.push(ValidationError::new(
            key("jitter_factor"),
            format!("must be within [0, 1] (got {})", s.jitter_factor),
        ));
    }
    for status in &s.failure_statuses {
        if !(400..500).contains(status) || *status == 429 {
            errors.push(ValidationError::new(
                key("failure_statuses"),
                format!("{} is not a non-429 client error status", status),
            ));
        }
    }
}

fn check_inbound(errors: &mut Vec<ValidationError>, prefix: &str, s: &InboundSettings) {
    check_capacity(errors, format!("{}.capacity", prefix), s.capacity);
    check_positive(errors, format!("{}.refill_rate", prefix), s.refill_rate);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::{EndpointRoute, InboundOverride, OutboundOverride};

    fn fields(errors: &[ValidationError]) -> Vec<&str> {
        errors.iter().map(|e| e.field.as_str()).collect()
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&TrafficConfig::default()).is_ok());
    }

    #[test]
    fn test_non_positive_capacity_rejected() {
        let mut config = TrafficConfig::default();
        config.outbound.defaults.capacity = 0.0;
        config.inbound.defaults.refill_rate = -1.0;

        let errors = validate_config(&config).unwrap_err();
        let fields = fields(&errors);
        assert!(fields.contains(&"outbound.defaults.capacity"));
        assert!(fields.contains(&"inbound.defaults.refill_rate"));
    }

    #[test]
    fn test_fractional_capacity_rejected() {
        let mut config = TrafficConfig::default();
        config.outbound.defaults.capacity = 0.5;
        config.inbound.groups.insert(
            "chat".into(),
            InboundOverride {
                capacity: Some(0.9),
                refill_rate: None,
            },
        );

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            fields(&errors),
            vec!["outbound.defaults.capacity", "inbound.groups.chat.capacity"]
        );
        assert!(errors[0].message.contains("must be >= 1"));

        config.outbound.defaults.capacity = 1.0;
        config.inbound.groups.clear();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_reports_all_errors() {
        let mut config = TrafficConfig::default();
        config.outbound.defaults.max_attempts = 0;
        config.outbound.defaults.jitter_factor = 1.5;
        config.outbound.defaults.exponential_base = 0.5;
        config.listener.bind_address = "not-an-address".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
    }

    #[test]
    fn test_override_checked_after_merge() {
        let mut config = TrafficConfig::default();
        config.outbound.providers.insert(
            "flaky".into(),
            OutboundOverride {
                max_delay: Some(0.1),
                ..Default::default()
            },
        );
        config.inbound.groups.insert(
            "chat".into(),
            InboundOverride {
                capacity: Some(f64::NAN),
                refill_rate: None,
            },
        );

        let errors = validate_config(&config).unwrap_err();
        let fields = fields(&errors);
        // initial_delay defaults to 1.0, so a 0.1 cap is inconsistent.
        assert!(fields.contains(&"outbound.providers.flaky.max_delay"));
        assert!(fields.contains(&"inbound.groups.chat.capacity"));
    }

    #[test]
    fn test_route_table_checks() {
        let mut config = TrafficConfig::default();
        config.inbound.routes = vec![
            EndpointRoute { prefix: "/api/v1/chat".into(), group: "chat".into() },
            EndpointRoute { prefix: "/api/v1/chat/".into(), group: "other".into() },
            EndpointRoute { prefix: "api/v1/jobs".into(), group: "".into() },
        ];

        let errors = validate_config(&config).unwrap_err();
        let fields = fields(&errors);
        assert!(fields.contains(&"inbound.routes[1].prefix"));
        assert!(fields.contains(&"inbound.routes[2].prefix"));
        assert!(fields.contains(&"inbound.routes[2].group"));
    }

    #[test]
    fn test_failure_statuses_must_be_client_errors() {
        let mut config = TrafficConfig::default();
        config.outbound.defaults.failure_statuses = vec![401, 429, 503];

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors[0].to_string().starts_with("outbound.defaults.failure_statuses"));
    }
}
