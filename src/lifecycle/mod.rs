//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Validated config → metrics → controller → bind listeners → serve
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → trigger shutdown
//!
//! Shutdown (shutdown.rs):
//!     Trigger → every server stops accepting → drain → exit
//! ```

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
