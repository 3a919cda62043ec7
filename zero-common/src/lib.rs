//! Zero Common - Shared configuration and logging for Zero services.
//!
//! This crate provides:
//! - Configuration types and loading (`~/.codecoder/config.json` + env overrides)
//! - Logging setup with noise filtering for HTTP client internals
//! - Trace/span identifier helpers

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod config;
pub mod logging;

pub use config::{Config, NetworkConfig, ObservabilityConfig, ScreenerServiceConfig};

/// Re-export commonly used types for convenience
pub mod prelude {
    pub use crate::config::{Config, ScreenerServiceConfig};
    pub use crate::logging::init_logging;
}
