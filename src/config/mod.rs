//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → TrafficConfig (validated, immutable)
//!     → policy.rs (defaults merged with named overrides, per scope)
//!     → handed to the TrafficController at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Malformed policies are rejected here, never at call time

pub mod loader;
pub mod policy;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, ConfigError};
pub use policy::{Policy, PolicyTable};
pub use schema::{
    AdminConfig, EndpointRoute, InboundConfig, InboundOverride, InboundSettings, ListenerConfig,
    ObservabilityConfig, OutboundConfig, OutboundOverride, OutboundSettings, TimeoutConfig,
    TrafficConfig,
};
pub use validation::{validate_config, ValidationError};
