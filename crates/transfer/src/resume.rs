//! crates/transfer/src/resume.rs
//!
//! Restarting an interrupted phase 2.
//!
//! The orchestrator hands out a [`ResumePosition`] describing the longest
//! prefix of the client's list whose entries are all dispositioned and
//! logged. The surrounding system persists it; on restart, [`prepare`]
//! truncates both logs back to that prefix and the orchestrator seeks its
//! inputs to match, so the finished logs equal those of an uninterrupted run.

use std::fs::OpenOptions;
use std::io;
use std::path::Path;

use manifest::ManifestOffset;

use crate::config::StorageDirs;
use crate::error::Phase2Error;

/// Point a phase-2 run can be restarted from.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ResumePosition {
    /// Next unread entry of the client's list.
    pub phase1: ManifestOffset,
    /// Next unconsumed entry of the previous manifest.
    pub previous: ManifestOffset,
    /// Length of the unchanged log at that point.
    pub unchanged_len: u64,
    /// Length of the changed log at that point.
    pub changed_len: u64,
    /// Storage-name counter at that point.
    pub next_data_index: u64,
}

/// Truncates the logs in `dirs` back to `position`.
///
/// Fails if a log is shorter than recorded, which means it was not written by
/// the run the position came from.
pub fn prepare(dirs: &StorageDirs, position: &ResumePosition) -> Result<(), Phase2Error> {
    truncate(&dirs.unchanged, position.unchanged_len)?;
    truncate(&dirs.changed, position.changed_len)?;
    logging::trace_phase2!(
        unchanged = position.unchanged_len,
        changed = position.changed_len,
        phase1 = position.phase1.get(),
        "logs rewound for resume"
    );
    Ok(())
}

fn truncate(path: &Path, len: u64) -> Result<(), Phase2Error> {
    let file = match OpenOptions::new().write(true).open(path) {
        Ok(file) => file,
        Err(err) if err.kind() == io::ErrorKind::NotFound && len == 0 => return Ok(()),
        Err(err) => return Err(Phase2Error::io(path, err)),
    };
    let actual = file
        .metadata()
        .map_err(|err| Phase2Error::io(path, err))?
        .len();
    if actual < len {
        return Err(Phase2Error::io(
            path,
            io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("log holds {actual} bytes, resume point expects {len}"),
            ),
        ));
    }
    file.set_len(len).map_err(|err| Phase2Error::io(path, err))
}
