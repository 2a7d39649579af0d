//! crates/logging/src/config.rs
//! Verbosity configuration mapping `-v` counts to per-subsystem levels.

use std::fmt;

/// Severity threshold for one tracing target.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum LogLevel {
    /// Nothing is recorded.
    Off,
    /// Errors only.
    Error,
    /// Warnings and errors.
    #[default]
    Warn,
    /// Informational progress.
    Info,
    /// Per-record detail.
    Debug,
    /// Byte-level detail.
    Trace,
}

impl LogLevel {
    /// Returns the directive spelling understood by `EnvFilter`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::Error => "error",
            Self::Warn => "warn",
            Self::Info => "info",
            Self::Debug => "debug",
            Self::Trace => "trace",
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Engine subsystem with its own tracing target.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum Subsystem {
    /// Orchestrator decisions and phase boundaries.
    Phase2,
    /// Manifest readers and writers.
    Manifest,
    /// Signature generation.
    Delta,
    /// Records received from the client.
    Receiver,
    /// Requests sent to the client.
    Sender,
    /// Transport byte movement.
    Io,
    /// Block retrieval cache.
    Cache,
    /// End-of-phase counters.
    Stats,
}

impl Subsystem {
    /// Every subsystem.
    pub const ALL: [Self; 8] = [
        Self::Phase2,
        Self::Manifest,
        Self::Delta,
        Self::Receiver,
        Self::Sender,
        Self::Io,
        Self::Cache,
        Self::Stats,
    ];

    /// Returns the tracing target used by this subsystem's macro.
    pub const fn target(self) -> &'static str {
        match self {
            Self::Phase2 => "backup::phase2",
            Self::Manifest => "backup::manifest",
            Self::Delta => "backup::delta",
            Self::Receiver => "backup::receiver",
            Self::Sender => "backup::sender",
            Self::Io => "backup::io",
            Self::Cache => "backup::cache",
            Self::Stats => "backup::stats",
        }
    }
}

/// Per-subsystem levels plus the level applied to every other target.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VerbosityConfig {
    /// Level for targets outside the engine.
    pub base: LogLevel,
    /// `backup::phase2`.
    pub phase2: LogLevel,
    /// `backup::manifest`.
    pub manifest: LogLevel,
    /// `backup::delta`.
    pub delta: LogLevel,
    /// `backup::receiver`.
    pub receiver: LogLevel,
    /// `backup::sender`.
    pub sender: LogLevel,
    /// `backup::io`.
    pub io: LogLevel,
    /// `backup::cache`.
    pub cache: LogLevel,
    /// `backup::stats`.
    pub stats: LogLevel,
}

impl VerbosityConfig {
    /// Create a configuration from a verbose level (0-3, higher saturates).
    ///
    /// - 0: warnings only, plus the final statistics.
    /// - 1: per-file phase-2 decisions.
    /// - 2: per-record detail from manifests, signatures, cache and network.
    /// - 3: everything, including transport byte movement.
    pub fn from_verbose_level(level: u8) -> Self {
        let mut config = Self {
            stats: LogLevel::Info,
            ..Self::default()
        };
        if level >= 1 {
            config.phase2 = LogLevel::Info;
        }
        if level >= 2 {
            config.manifest = LogLevel::Debug;
            config.delta = LogLevel::Debug;
            config.receiver = LogLevel::Debug;
            config.sender = LogLevel::Debug;
            config.cache = LogLevel::Debug;
            config.phase2 = LogLevel::Debug;
        }
        if level >= 3 {
            for subsystem in Subsystem::ALL {
                config.set_level(subsystem, LogLevel::Trace);
            }
            config.base = LogLevel::Info;
        }
        config
    }

    /// Returns the level for `subsystem`.
    pub const fn level(&self, subsystem: Subsystem) -> LogLevel {
        match subsystem {
            Subsystem::Phase2 => self.phase2,
            Subsystem::Manifest => self.manifest,
            Subsystem::Delta => self.delta,
            Subsystem::Receiver => self.receiver,
            Subsystem::Sender => self.sender,
            Subsystem::Io => self.io,
            Subsystem::Cache => self.cache,
            Subsystem::Stats => self.stats,
        }
    }

    /// Overrides the level for `subsystem`.
    pub fn set_level(&mut self, subsystem: Subsystem, level: LogLevel) {
        let slot = match subsystem {
            Subsystem::Phase2 => &mut self.phase2,
            Subsystem::Manifest => &mut self.manifest,
            Subsystem::Delta => &mut self.delta,
            Subsystem::Receiver => &mut self.receiver,
            Subsystem::Sender => &mut self.sender,
            Subsystem::Io => &mut self.io,
            Subsystem::Cache => &mut self.cache,
            Subsystem::Stats => &mut self.stats,
        };
        *slot = level;
    }

    /// Renders the configuration as an `EnvFilter` directive string.
    ///
    /// Targets left at the base level are omitted.
    pub fn directives(&self) -> String {
        let mut out = String::from(self.base.as_str());
        for subsystem in Subsystem::ALL {
            let level = self.level(subsystem);
            if level != self.base {
                out.push(',');
                out.push_str(subsystem.target());
                out.push('=');
                out.push_str(level.as_str());
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_zero_keeps_stats_visible() {
        let config = VerbosityConfig::from_verbose_level(0);
        assert_eq!(config.directives(), "warn,backup::stats=info");
    }

    #[test]
    fn levels_are_monotonic() {
        for subsystem in Subsystem::ALL {
            let mut previous = LogLevel::Off;
            for level in 0..=4 {
                let current = VerbosityConfig::from_verbose_level(level).level(subsystem);
                assert!(current >= previous, "{subsystem:?} dropped at -v{level}");
                previous = current;
            }
        }
    }

    #[test]
    fn set_level_overrides_one_target() {
        let mut config = VerbosityConfig::from_verbose_level(0);
        config.set_level(Subsystem::Cache, LogLevel::Trace);
        assert_eq!(config.level(Subsystem::Cache), LogLevel::Trace);
        assert!(config.directives().contains("backup::cache=trace"));
        assert!(!config.directives().contains("backup::delta"));
    }

    #[test]
    fn targets_share_the_backup_prefix() {
        for subsystem in Subsystem::ALL {
            assert!(subsystem.target().starts_with("backup::"));
        }
    }

    #[cfg(feature = "serde")]
    #[test]
    fn serde_round_trip() {
        let config = VerbosityConfig::from_verbose_level(2);
        let json = serde_json::to_string(&config).unwrap();
        let back: VerbosityConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
