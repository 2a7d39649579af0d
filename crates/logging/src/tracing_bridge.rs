//! crates/logging/src/tracing_bridge.rs
//! Subscriber installation for the engine's tracing targets.
//!
//! # Usage
//!
//! ```rust,ignore
//! use logging::{VerbosityConfig, init_tracing};
//!
//! init_tracing(VerbosityConfig::from_verbose_level(2))?;
//! logging::trace_phase2!("phase 2 begin");
//! ```

use tracing_subscriber::EnvFilter;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};

use super::config::VerbosityConfig;

/// Environment variable whose value, when set and valid, replaces the
/// directives derived from [`VerbosityConfig`].
pub const ENV_FILTER_VAR: &str = "BACKUP_LOG";

/// Builds the filter for `config`, preferring [`ENV_FILTER_VAR`] when it
/// holds a valid directive string.
pub fn build_filter(config: &VerbosityConfig) -> EnvFilter {
    EnvFilter::try_from_env(ENV_FILTER_VAR).unwrap_or_else(|_| EnvFilter::new(config.directives()))
}

/// Installs a global formatting subscriber filtered by `config`.
///
/// Fails if a global subscriber is already installed.
pub fn init_tracing(config: VerbosityConfig) -> Result<(), TryInitError> {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(&config))
        .with_target(true)
        .finish()
        .try_init()
}
