//! crates/manifest/src/block.rs
//! Block references carried by signature records.

use protocol::{Command, Record};

use crate::error::ManifestError;

/// Reference to one stored block of a file's previous contents.
///
/// Encoded as a signature record whose payload is
/// `<weak-hex> <strong-hex> <save-path>`. The save path names the data file
/// and, in its last component, the block's index inside that file.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BlockRef {
    /// Rolling checksum of the block.
    pub weak: u32,
    /// Strong checksum of the block.
    pub strong: Vec<u8>,
    /// `<data-file>/<index-hex>`.
    pub save_path: String,
}

impl BlockRef {
    /// Parses a signature record payload.
    pub fn parse(payload: &[u8]) -> Result<Self, ManifestError> {
        let malformed = || ManifestError::BlockRef(String::from_utf8_lossy(payload).into_owned());
        let text = std::str::from_utf8(payload).map_err(|_| malformed())?;
        let mut parts = text.splitn(3, ' ');
        let (Some(weak), Some(strong), Some(save_path)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(malformed());
        };
        let weak = u32::from_str_radix(weak, 16).map_err(|_| malformed())?;
        let strong = decode_hex(strong).ok_or_else(malformed)?;
        if save_path.is_empty() {
            return Err(malformed());
        }
        Ok(Self {
            weak,
            strong,
            save_path: save_path.to_owned(),
        })
    }

    /// Builds the signature record for this reference.
    pub fn to_record(&self) -> Record {
        let mut text = format!("{:08X} ", self.weak);
        for byte in &self.strong {
            text.push_str(&format!("{byte:02x}"));
        }
        text.push(' ');
        text.push_str(&self.save_path);
        Record::with_text(Command::Sig, &text)
    }
}

fn decode_hex(text: &str) -> Option<Vec<u8>> {
    if text.len() % 2 != 0 {
        return None;
    }
    (0..text.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(text.get(i..i + 2)?, 16).ok())
        .collect()
}
