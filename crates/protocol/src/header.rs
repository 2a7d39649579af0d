//! crates/protocol/src/header.rs
//!
//! The 5-byte record header: one command byte followed by the payload length
//! as four uppercase, zero-padded hexadecimal digits.

use crate::command::Command;
use crate::error::FramingError;
use crate::record::Record;

/// Size of an encoded [`RecordHeader`] in bytes.
pub const HEADER_LEN: usize = 5;

/// Largest payload representable by the 4-digit length field.
pub const MAX_PAYLOAD_LEN: usize = 0xFFFF;

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

/// Decoded record header.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct RecordHeader {
    command: Command,
    payload_len: u16,
}

impl RecordHeader {
    /// Creates a header, rejecting payloads longer than [`MAX_PAYLOAD_LEN`].
    pub fn new(command: Command, payload_len: usize) -> Result<Self, FramingError> {
        let payload_len =
            u16::try_from(payload_len).map_err(|_| FramingError::PayloadTooLarge(payload_len))?;
        Ok(Self {
            command,
            payload_len,
        })
    }

    /// Creates the header describing `record`.
    pub fn for_record(record: &Record) -> Result<Self, FramingError> {
        Self::new(record.command(), record.len())
    }

    /// Returns the command tag.
    #[inline]
    pub const fn command(&self) -> Command {
        self.command
    }

    /// Returns the declared payload length.
    #[inline]
    pub const fn payload_len(&self) -> usize {
        self.payload_len as usize
    }

    /// Encodes the header as `<command><LLLL>`.
    pub fn encode(&self) -> [u8; HEADER_LEN] {
        let len = self.payload_len;
        [
            self.command.as_byte(),
            HEX_UPPER[usize::from(len >> 12)],
            HEX_UPPER[usize::from((len >> 8) & 0xF)],
            HEX_UPPER[usize::from((len >> 4) & 0xF)],
            HEX_UPPER[usize::from(len & 0xF)],
        ]
    }

    /// Decodes a header from the first [`HEADER_LEN`] bytes of `bytes`.
    ///
    /// Lowercase hex digits are accepted on input.
    pub fn decode(bytes: &[u8]) -> Result<Self, FramingError> {
        if bytes.len() < HEADER_LEN {
            return Err(FramingError::TruncatedHeader(bytes.len()));
        }
        let command = Command::try_from(bytes[0])?;
        let digits = &bytes[1..HEADER_LEN];
        let mut payload_len = 0u16;
        for &digit in digits {
            let value = hex_value(digit).ok_or_else(|| {
                FramingError::InvalidLength(String::from_utf8_lossy(digits).into_owned())
            })?;
            payload_len = (payload_len << 4) | u16::from(value);
        }
        Ok(Self {
            command,
            payload_len,
        })
    }
}

const fn hex_value(digit: u8) -> Option<u8> {
    match digit {
        b'0'..=b'9' => Some(digit - b'0'),
        b'A'..=b'F' => Some(digit - b'A' + 10),
        b'a'..=b'f' => Some(digit - b'a' + 10),
        _ => None,
    }
}
