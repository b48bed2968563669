//! Scope identity.
//!
//! A scope is a named traffic class in one direction: a provider this process
//! calls out to, or an endpoint group other services call into. Scopes with
//! the same name in different directions are unrelated.

use std::fmt;
use std::sync::Arc;

use serde::{Serialize, Serializer};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Calls this process makes to external providers.
    Outbound,
    /// Calls other services make into this process.
    Inbound,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Outbound => "outbound",
            Direction::Inbound => "inbound",
        }
    }

    /// Prefix used in the textual scope key.
    pub fn key_prefix(&self) -> &'static str {
        match self {
            Direction::Outbound => "provider",
            Direction::Inbound => "endpoint-group",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Registry key of a scope. Cheap to clone.
///
/// Renders as `provider:<name>` or `endpoint-group:<name>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScopeKey {
    direction: Direction,
    name: Arc<str>,
}

impl ScopeKey {
    pub fn new(direction: Direction, name: impl Into<Arc<str>>) -> Self {
        Self {
            direction,
            name: name.into(),
        }
    }

    pub fn outbound(name: impl Into<Arc<str>>) -> Self {
        Self::new(Direction::Outbound, name)
    }

    pub fn inbound(name: impl Into<Arc<str>>) -> Self {
        Self::new(Direction::Inbound, name)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parse the textual form produced by `Display`.
    pub fn parse(text: &str) -> Option<Self> {
        let (prefix, name) = text.split_once(':')?;
        if name.is_empty() {
            return None;
        }
        let direction = [Direction::Outbound, Direction::Inbound]
            .into_iter()
            .find(|d| d.key_prefix() == prefix)?;
        Some(Self::new(direction, name))
    }
}

impl fmt::Display for ScopeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.direction.key_prefix(), self.name)
    }
}

impl Serialize for ScopeKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}
