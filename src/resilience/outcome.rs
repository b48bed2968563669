//! Call outcomes and their classification.
//!
//! Every completed attempt is reduced to an [`Outcome`]: either the HTTP
//! status the upstream returned, or a transport failure when no status was
//! received at all (connect error, reset, timeout).

use std::fmt;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// The upstream answered with this HTTP status.
    Status(u16),
    /// No response was received.
    Transport,
}

/// Telemetry bucket an outcome is counted under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeClass {
    /// 1xx-3xx.
    Success,
    /// 4xx other than 429.
    ClientError,
    /// 429.
    RateLimited,
    /// 5xx and transport failures.
    ServerError,
}

impl OutcomeClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeClass::Success => "2xx",
            OutcomeClass::ClientError => "4xx",
            OutcomeClass::RateLimited => "429",
            OutcomeClass::ServerError => "5xx",
        }
    }
}

impl Outcome {
    pub fn status(&self) -> Option<u16> {
        match self {
            Outcome::Status(code) => Some(*code),
            Outcome::Transport => None,
        }
    }

    pub fn class(&self) -> OutcomeClass {
        match self {
            Outcome::Transport => OutcomeClass::ServerError,
            Outcome::Status(429) => OutcomeClass::RateLimited,
            Outcome::Status(code) if *code >= 500 => OutcomeClass::ServerError,
            Outcome::Status(code) if *code >= 400 => OutcomeClass::ClientError,
            Outcome::Status(_) => OutcomeClass::Success,
        }
    }

    /// Transport failures, 5xx and 429 may succeed on a later attempt.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self.class(),
            OutcomeClass::ServerError | OutcomeClass::RateLimited
        )
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Status(code) => write!(f, "HTTP {}", code),
            Outcome::Transport => f.write_str("transport failure"),
        }
    }
}
