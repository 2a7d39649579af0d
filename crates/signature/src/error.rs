//! crates/signature/src/error.rs
//! Signature job failures.

use std::io;

use protocol::TransportError;
use thiserror::Error;

/// Errors returned while driving a [`SignatureJob`](crate::SignatureJob).
#[derive(Debug, Error)]
pub enum SignatureError {
    /// Reading the delta base failed.
    #[error("failed to read delta base: {0}")]
    Io(#[from] io::Error),
    /// Queueing signature bytes for the client failed.
    #[error("failed to queue signature bytes: {0}")]
    Transport(#[from] TransportError),
    /// The block length is outside the supported range.
    #[error("invalid signature block length {0}")]
    BlockLength(u32),
    /// The strong checksum length is zero or wider than an MD4 digest.
    #[error("invalid strong checksum length {0}")]
    StrongLength(usize),
    /// `step` was called before `begin`.
    #[error("signature job has not been started")]
    NotStarted,
    /// The block buffer could not be allocated.
    #[error("cannot allocate a {0}-byte signature block")]
    OutOfMemory(usize),
    /// `step` was called again after a failure.
    #[error("signature job already failed")]
    Failed,
}
