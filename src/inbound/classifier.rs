//! Path → endpoint group classification.
//!
//! # Responsibilities
//! - Map a request path onto the endpoint group whose budget it spends
//! - Recognise exempt paths (health checks) that bypass the gate
//!
//! # Design Decisions
//! - Prefix matching is segment aware: `/api/chat` matches `/api/chat` and
//!   `/api/chat/stream`, never `/api/chatter`
//! - Longest prefix wins, independent of configuration order
//! - Paths matching no route fall into the default group
//! - Immutable after construction; scope keys are built once, up front

use crate::config::InboundConfig;
use crate::traffic::ScopeKey;

/// Where a path belongs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification<'a> {
    /// Not subject to admission control.
    Exempt,
    /// Spends from this endpoint group.
    Group(&'a ScopeKey),
}

#[derive(Debug, Clone)]
struct PrefixRoute {
    prefix: String,
    scope: ScopeKey,
}

#[derive(Debug, Clone)]
pub struct EndpointClassifier {
    /// Sorted longest prefix first.
    routes: Vec<PrefixRoute>,
    exempt: Vec<String>,
    default: ScopeKey,
}

impl EndpointClassifier {
    pub fn from_config(config: &InboundConfig) -> Self {
        let mut routes: Vec<PrefixRoute> = config
            .routes
            .iter()
            .map(|route| PrefixRoute {
                prefix: normalize(&route.prefix),
                scope: ScopeKey::inbound(route.group.as_str()),
            })
            .collect();
        routes.sort_by(|a, b| b.prefix.len().cmp(&a.prefix.len()));

        Self {
            routes,
            exempt: config.exempt_paths.iter().map(|p| normalize(p)).collect(),
            default: ScopeKey::inbound(config.default_group.as_str()),
        }
    }

    pub fn classify(&self, path: &str) -> Classification<'_> {
        if self.exempt.iter().any(|prefix| segment_prefix(path, prefix)) {
            return Classification::Exempt;
        }

        let scope = self
            .routes
            .iter()
            .find(|route| segment_prefix(path, &route.prefix))
            .map(|route| &route.scope)
            .unwrap_or(&self.default);
        Classification::Group(scope)
    }

    pub fn default_scope(&self) -> &ScopeKey {
        &self.default
    }
}

fn normalize(prefix: &str) -> String {
    match prefix.trim_end_matches('/') {
        "" => "/".to_string(),
        trimmed => trimmed.to_string(),
    }
}

fn segment_prefix(path: &str, prefix: &str) -> bool {
    if prefix == "/" {
        return true;
    }
    match path.strip_prefix(prefix) {
        Some(rest) => rest.is_empty() || rest.starts_with('/'),
        None => false,
    }
}
