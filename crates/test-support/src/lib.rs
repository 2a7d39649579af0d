#![deny(unsafe_code)]
#![deny(missing_docs)]

//! Shared test utilities for the backup engine workspace.
//!
//! - [`MemoryTransport`]: a transport the test drives by hand.
//! - [`ScriptedClient`]: an in-process client answering phase-2 requests.
//! - Manifest fixtures for building previous backups and phase-1 lists.

mod client;
mod fixtures;
mod memory;

pub use client::{CHUNK_LEN, Request, ScriptedClient};
pub use fixtures::{
    entry, link, manifest_paths, read_manifest, scratch, stored, write_manifest,
};
pub use memory::{MemoryTransport, UNBOUNDED};
