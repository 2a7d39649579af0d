#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![cfg_attr(docsrs, feature(doc_cfg))]
//! crates/transfer/src/lib.rs
//!
//! Server side of phase 2 of an incremental backup.
//!
//! During phase 1 the client scanned its filesystem and sent the server a
//! sorted list of entries. Phase 2 walks that list against the manifest of
//! the previous backup and decides, per entry:
//!
//! - **unchanged**: the stored data is carried forward and the entry is
//!   written to the unchanged log with refreshed attributes;
//! - **changed**: the server sends a signature of its stored copy and the
//!   client answers with a delta, received into `deltas.forward/`;
//! - **new**: the client sends the whole file, received into `data.tmp/`;
//! - **deleted**: previous entries the client no longer lists are counted.
//!
//! Received entries are written to the changed log. Both logs are append-only
//! so an interrupted run can be resumed from a [`ResumePosition`].
//!
//! [`Phase2`] is a cooperative state machine over a non-blocking
//! [`Transport`](protocol::Transport): call [`Phase2::step`] whenever the
//! transport may have made progress, or [`Phase2::run`] to spin until done.
//!
//! # Examples
//!
//! ```
//! use manifest::ManifestWriter;
//! use test_support::ScriptedClient;
//! use transfer::{Phase2, Phase2Config, StorageDirs};
//!
//! let root = tempfile::tempdir().unwrap();
//! let dirs = StorageDirs::under(root.path());
//! ManifestWriter::create(&dirs.phase1).unwrap().close().unwrap();
//!
//! let mut phase2 = Phase2::open(ScriptedClient::new(), Phase2Config::default(), dirs, None).unwrap();
//! let stats = phase2.run().unwrap();
//! assert_eq!(stats.total(), 0);
//! assert!(phase2.transport().phase_end_seen());
//! ```

mod config;
mod data_path;
mod error;
mod phase2;
pub mod resume;
mod stats;
mod temp_guard;

pub use config::{DEFAULT_MAX_STORAGE_SUBDIRS, Phase2Config, StorageDirs};
pub use data_path::{SequentialAllocator, StoragePathAllocator, is_compressed};
pub use error::Phase2Error;
pub use phase2::{PHASE_END, PHASE_END_ACK, Phase2, Progress};
pub use resume::ResumePosition;
pub use stats::Phase2Stats;
