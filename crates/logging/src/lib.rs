#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `logging` wires the backup engine into the [`tracing`] ecosystem. Every
//! subsystem logs under its own target (`backup::phase2`, `backup::manifest`,
//! `backup::delta`, ...) through the `trace_*` macros exported here, so a
//! single filter directive can raise or silence one part of the engine.
//!
//! # Design
//!
//! - [`Subsystem`] enumerates the targets.
//! - [`VerbosityConfig`] maps a numeric verbosity (`-v` count) to a per-target
//!   [`LogLevel`] and renders it as an `EnvFilter` directive string.
//! - [`init_tracing`] installs a formatting subscriber using those directives,
//!   unless the `BACKUP_LOG` environment variable supplies its own.
//!
//! # Examples
//!
//! ```
//! use logging::{LogLevel, Subsystem, VerbosityConfig};
//!
//! let config = VerbosityConfig::from_verbose_level(1);
//! assert_eq!(config.level(Subsystem::Phase2), LogLevel::Info);
//! assert!(config.directives().contains("backup::phase2=info"));
//! ```

mod config;
mod tracing_bridge;
mod tracing_macros;

pub use config::{LogLevel, Subsystem, VerbosityConfig};
pub use tracing_bridge::{ENV_FILTER_VAR, build_filter, init_tracing};
