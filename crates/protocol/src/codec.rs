//! crates/protocol/src/codec.rs
//!
//! [`tokio_util::codec`] implementation for framed records.
//!
//! [`RecordCodec`] decodes records from a [`BytesMut`] read buffer and encodes
//! them into a write buffer. It keeps no cursor of its own: the position in
//! the stream is exactly the start of the read buffer, so one codec per
//! connection is all the state a transport needs.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::FramingError;
use crate::header::{HEADER_LEN, RecordHeader};
use crate::record::Record;

/// Codec for 5-byte-header records as sent over the wire.
///
/// Wire records carry no trailing newline; see [`Framing`](crate::Framing)
/// for the manifest variant.
#[derive(Clone, Copy, Debug, Default)]
pub struct RecordCodec;

impl RecordCodec {
    /// Creates a codec.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl Decoder for RecordCodec {
    type Item = Record;
    type Error = FramingError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if src.len() < HEADER_LEN {
            return Ok(None);
        }

        // Peek: the header stays in the buffer until the payload is complete.
        let header = RecordHeader::decode(&src[..HEADER_LEN])?;
        let total_len = HEADER_LEN + header.payload_len();
        if src.len() < total_len {
            src.reserve(total_len - src.len());
            return Ok(None);
        }

        src.advance(HEADER_LEN);
        let payload = src.split_to(header.payload_len()).to_vec();
        Ok(Some(Record::new(header.command(), payload)))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(record) => Ok(Some(record)),
            None if src.is_empty() => Ok(None),
            None if src.len() < HEADER_LEN => Err(FramingError::TruncatedHeader(src.len())),
            None => {
                let header = RecordHeader::decode(&src[..HEADER_LEN])?;
                Err(FramingError::ShortRead {
                    expected: header.payload_len(),
                    got: src.len() - HEADER_LEN,
                })
            }
        }
    }
}

impl Encoder<&Record> for RecordCodec {
    type Error = FramingError;

    fn encode(&mut self, item: &Record, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let header = RecordHeader::for_record(item)?;
        dst.reserve(HEADER_LEN + item.len());
        dst.put_slice(&header.encode());
        dst.put_slice(item.payload());
        Ok(())
    }
}

impl Encoder<Record> for RecordCodec {
    type Error = FramingError;

    fn encode(&mut self, item: Record, dst: &mut BytesMut) -> Result<(), Self::Error> {
        self.encode(&item, dst)
    }
}
