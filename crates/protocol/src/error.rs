//! crates/protocol/src/error.rs
//! Error types for record framing and transports.

use std::io;

use thiserror::Error;

use crate::header::{HEADER_LEN, MAX_PAYLOAD_LEN};

/// Failure to frame or unframe a record.
///
/// A framing error is fatal to the stream it occurred on: the byte position
/// of the next record is unknown afterwards.
#[derive(Debug, Error)]
pub enum FramingError {
    /// Fewer than [`HEADER_LEN`] header bytes were available.
    #[error("record header truncated: expected {HEADER_LEN} bytes, got {0}")]
    TruncatedHeader(usize),
    /// The length field is not four hexadecimal digits.
    #[error("record header length field {0:?} is not valid hexadecimal")]
    InvalidLength(String),
    /// The command byte does not name a known command.
    #[error("unknown record command byte 0x{0:02x}")]
    UnknownCommand(u8),
    /// The payload cannot be represented in a 4-digit length field.
    #[error("payload of {0} bytes exceeds the {MAX_PAYLOAD_LEN}-byte record limit")]
    PayloadTooLarge(usize),
    /// The stream ended inside a payload.
    #[error("short read: expected {expected} payload bytes, got {got}")]
    ShortRead {
        /// Bytes declared by the header.
        expected: usize,
        /// Bytes actually available.
        got: usize,
    },
    /// A manifest record was not followed by its newline terminator.
    #[error("manifest record is not newline terminated (found 0x{0:02x})")]
    MissingNewline(u8),
    /// Underlying reader or writer failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl From<crate::command::UnknownCommand> for FramingError {
    fn from(err: crate::command::UnknownCommand) -> Self {
        Self::UnknownCommand(err.0)
    }
}

/// Failure reported by a [`Transport`](crate::Transport).
#[derive(Debug, Error)]
pub enum TransportError {
    /// The inbound byte stream could not be unframed.
    #[error("transport framing error: {0}")]
    Framing(#[from] FramingError),
    /// Socket I/O failed.
    #[error("transport I/O error: {0}")]
    Io(#[from] io::Error),
    /// The peer closed the connection.
    #[error("peer closed the connection")]
    Closed,
}
