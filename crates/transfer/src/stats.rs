//! crates/transfer/src/stats.rs
//! Per-run counters.

use std::fmt;

/// Dispositions and byte counts of one phase-2 run.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Phase2Stats {
    /// Entries carried forward from the previous backup.
    pub same: u64,
    /// Entries whose data changed since the previous backup.
    pub changed: u64,
    /// Entries absent from the previous backup, or requested in full.
    pub new: u64,
    /// Previous entries missing from the client's list.
    pub deleted: u64,
    /// Warning and message records from the client.
    pub warnings: u64,
    /// Logical bytes of every entry in the new backup that has data.
    pub bytes: u64,
    /// Bytes written to disk from the client.
    pub received: u64,
}

impl Phase2Stats {
    /// Entries written to either log.
    pub fn total(&self) -> u64 {
        self.same + self.changed + self.new
    }

    pub(crate) fn log(&self) {
        logging::trace_stats!(
            same = self.same,
            changed = self.changed,
            new = self.new,
            deleted = self.deleted,
            warnings = self.warnings,
            bytes = self.bytes,
            received = self.received,
            "phase 2 finished"
        );
    }
}

impl fmt::Display for Phase2Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} same, {} changed, {} new, {} deleted, {} warnings, {} bytes ({} received)",
            self.same,
            self.changed,
            self.new,
            self.deleted,
            self.warnings,
            self.bytes,
            self.received
        )
    }
}
