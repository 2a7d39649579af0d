//! crates/manifest/src/endfile.rs
//! End-of-file summaries.

use std::fmt;

use protocol::{Command, Record};

use crate::error::ManifestError;

/// Payload of the end-of-file record that closes a signature stream.
pub const SIG_END: &str = "endfile";

/// Parsed `<bytes>:<md5-hex>` end-of-file payload.
///
/// The checksum part is optional: older clients send the byte count alone.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct EndFile {
    /// Size of the file as read by the client.
    pub bytes: u64,
    /// Lowercase hex MD5 of the file contents, when supplied.
    pub md5: Option<String>,
}

impl EndFile {
    /// Parses an end-of-file payload.
    pub fn parse(payload: &[u8]) -> Result<Self, ManifestError> {
        let malformed = || ManifestError::EndFile(String::from_utf8_lossy(payload).into_owned());
        let text = std::str::from_utf8(payload).map_err(|_| malformed())?;
        let (bytes, md5) = match text.split_once(':') {
            Some((bytes, md5)) => (bytes, Some(md5)),
            None => (text, None),
        };
        let bytes = bytes.parse::<u64>().map_err(|_| malformed())?;
        let md5 = match md5 {
            Some(hex) if hex.len() == 32 && hex.bytes().all(|b| b.is_ascii_hexdigit()) => {
                Some(hex.to_ascii_lowercase())
            }
            Some("") | None => None,
            Some(_) => return Err(malformed()),
        };
        Ok(Self { bytes, md5 })
    }

    /// Builds the end-of-file record for this summary.
    pub fn to_record(&self) -> Record {
        Record::with_text(Command::EndFile, &self.to_string())
    }
}

impl fmt::Display for EndFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.md5 {
            Some(md5) => write!(f, "{}:{md5}", self.bytes),
            None => write!(f, "{}", self.bytes),
        }
    }
}
