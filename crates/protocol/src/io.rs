//! crates/protocol/src/io.rs
//!
//! Blocking record I/O for manifest and data files.

use std::io::{self, Read, Write};

use crate::error::FramingError;
use crate::header::{HEADER_LEN, RecordHeader};
use crate::record::Record;

/// How a record's payload is terminated in a byte stream.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum Framing {
    /// Header and payload only, as sent over the network and stored in
    /// block data files.
    #[default]
    Wire,
    /// Header, payload and a trailing `\n`, as stored in manifests.
    Manifest,
}

impl Framing {
    const fn trailer_len(self) -> usize {
        match self {
            Self::Wire => 0,
            Self::Manifest => 1,
        }
    }
}

/// Writes `record` to `writer`, returning the number of bytes written.
pub fn write_record<W: Write + ?Sized>(
    writer: &mut W,
    record: &Record,
    framing: Framing,
) -> Result<usize, FramingError> {
    let header = RecordHeader::for_record(record)?;
    writer.write_all(&header.encode())?;
    writer.write_all(record.payload())?;
    if framing == Framing::Manifest {
        writer.write_all(b"\n")?;
    }
    Ok(HEADER_LEN + record.len() + framing.trailer_len())
}

/// Reads one record from `reader`.
///
/// Returns `Ok(None)` when the stream ends cleanly at a record boundary.
/// Ending anywhere else is a [`FramingError`].
pub fn read_record<R: Read + ?Sized>(
    reader: &mut R,
    framing: Framing,
) -> Result<Option<Record>, FramingError> {
    let mut header_bytes = [0u8; HEADER_LEN];
    let got = read_full(reader, &mut header_bytes)?;
    if got == 0 {
        return Ok(None);
    }
    if got < HEADER_LEN {
        return Err(FramingError::TruncatedHeader(got));
    }
    let header = RecordHeader::decode(&header_bytes)?;

    let expected = header.payload_len() + framing.trailer_len();
    let mut payload = vec![0u8; expected];
    let got = read_full(reader, &mut payload)?;
    if got < expected {
        return Err(FramingError::ShortRead { expected, got });
    }
    if framing == Framing::Manifest {
        let trailer = payload.pop().unwrap_or_default();
        if trailer != b'\n' {
            return Err(FramingError::MissingNewline(trailer));
        }
    }
    Ok(Some(Record::new(header.command(), payload)))
}

/// Fills `buf` as far as the stream allows, returning the byte count.
fn read_full<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}
