#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! src/lib.rs
//!
//! Server-side engine for phase 2 of an incremental backup.
//!
//! This crate gathers the workspace into one surface:
//!
//! - [`protocol`]: framed records and the non-blocking [`Transport`];
//! - [`manifest`]: file records, attribute codec and manifest I/O;
//! - [`signature`]: cooperative librsync-style signature generation;
//! - [`blockcache`]: cached access to stored block data;
//! - [`transfer`]: the phase-2 orchestrator, storage layout and resume;
//! - [`logging`]: tracing targets and subscriber setup.
//!
//! [`serve`] runs a whole phase over a socket.

use std::io::{Read, Write};

pub use blockcache;
pub use checksums;
pub use logging;
pub use manifest;
pub use protocol;
pub use signature;
pub use transfer;

pub use logging::{VerbosityConfig, init_tracing};
pub use protocol::{AsyncStream, Command, Record, Transport};
pub use transfer::{
    Phase2, Phase2Config, Phase2Error, Phase2Stats, Progress, ResumePosition, StorageDirs,
};

/// Runs phase 2 to completion over `stream`.
///
/// `stream` must already be in non-blocking mode; the engine polls it until
/// the client acknowledges the end of the phase. Before resuming from
/// `resume`, rewind the logs with [`transfer::resume::prepare`].
pub fn serve<S: Read + Write>(
    stream: S,
    config: Phase2Config,
    dirs: StorageDirs,
    resume: Option<ResumePosition>,
) -> Result<Phase2Stats, Phase2Error> {
    let transport = AsyncStream::with_capacity(stream, config.write_buffer_capacity);
    let mut phase2 = Phase2::open(transport, config, dirs, resume)?;
    let stats = phase2.run()?;
    logging::trace_phase2!(%stats, "served");
    Ok(stats)
}
