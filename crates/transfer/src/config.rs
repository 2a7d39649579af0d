//! crates/transfer/src/config.rs
//!
//! Phase-2 configuration and on-disk locations.

use std::path::{Path, PathBuf};

use protocol::DEFAULT_WRITE_CAPACITY;
use signature::DEFAULT_STRONG_LEN;

/// Default number of entries per storage directory level.
pub const DEFAULT_MAX_STORAGE_SUBDIRS: u32 = 30_000;

/// Settings supplied to the phase-2 orchestrator.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct Phase2Config {
    /// Request deltas for changed files instead of full copies.
    pub delta_enabled: bool,
    /// The client runs Windows, where a status-change-only difference is
    /// handled as a data change.
    pub client_is_windows: bool,
    /// Entries per level of the `PPPP/SSSS/TTTT` storage tree.
    pub max_storage_subdirs: u32,
    /// Bytes of MD4 kept per signature block.
    pub signature_strong_len: usize,
    /// Size of the transport write buffer, in bytes.
    pub write_buffer_capacity: usize,
}

impl Default for Phase2Config {
    fn default() -> Self {
        Self {
            delta_enabled: true,
            client_is_windows: false,
            max_storage_subdirs: DEFAULT_MAX_STORAGE_SUBDIRS,
            signature_strong_len: DEFAULT_STRONG_LEN,
            write_buffer_capacity: DEFAULT_WRITE_CAPACITY,
        }
    }
}

/// Files and directories touched by one phase-2 run.
#[derive(Clone, Debug, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StorageDirs {
    /// Client-declared file list written during phase 1.
    pub phase1: PathBuf,
    /// Manifest of the previous backup, if there is one.
    pub previous: PathBuf,
    /// Log of entries whose data was not retransmitted.
    pub unchanged: PathBuf,
    /// Log of entries received during this phase.
    pub changed: PathBuf,
    /// Stored data of the previous backup.
    pub current_data: PathBuf,
    /// Destination of new files received this phase.
    pub data_tmp: PathBuf,
    /// Scratch file a delta is received into.
    pub delta_tmp: PathBuf,
    /// Working directory of the backup in progress.
    pub working: PathBuf,
    /// Block data directory for entries stored as block references.
    pub block_data: Option<PathBuf>,
}

impl StorageDirs {
    /// Conventional layout below `root`.
    ///
    /// ```
    /// use transfer::StorageDirs;
    ///
    /// let dirs = StorageDirs::under("/srv/backup/client");
    /// assert!(dirs.changed.ends_with("working/changed"));
    /// assert!(dirs.block_data.is_none());
    /// ```
    pub fn under(root: impl AsRef<Path>) -> Self {
        let root = root.as_ref();
        let working = root.join("working");
        Self {
            phase1: working.join("phase1.gz"),
            previous: root.join("current").join("manifest.gz"),
            unchanged: working.join("unchanged"),
            changed: working.join("changed"),
            current_data: root.join("current").join("data"),
            data_tmp: working.join("data.tmp"),
            delta_tmp: working.join("delta.tmp"),
            working,
            block_data: None,
        }
    }

    /// Permanent location of a finished delta.
    pub fn forward_delta(&self, datapath: &str) -> PathBuf {
        self.working.join("deltas.forward").join(datapath)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_enable_deltas() {
        let config = Phase2Config::default();
        assert!(config.delta_enabled);
        assert!(!config.client_is_windows);
        assert_eq!(config.signature_strong_len, 8);
        assert_eq!(config.max_storage_subdirs, 30_000);
    }

    #[test]
    fn forward_deltas_live_under_the_working_directory() {
        let dirs = StorageDirs::under("/b");
        assert_eq!(
            dirs.forward_delta("0000/0000/0001"),
            Path::new("/b/working/deltas.forward/0000/0000/0001")
        );
    }

    #[cfg(feature = "serde")]
    #[test]
    fn missing_fields_take_defaults() {
        let config: Phase2Config = serde_json::from_str(r#"{"client_is_windows":true}"#).unwrap();
        assert!(config.client_is_windows);
        assert!(config.delta_enabled);
    }
}
