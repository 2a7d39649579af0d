//! crates/protocol/src/transport/stream.rs
//!
//! [`Transport`] over a non-blocking `Read + Write` byte stream.

use std::io::{self, Read, Write};

use bytes::{Buf, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use super::{Append, Transport};
use crate::codec::RecordCodec;
use crate::error::TransportError;
use crate::header::{HEADER_LEN, MAX_PAYLOAD_LEN};
use crate::record::Record;

/// Default size of the outbound buffer.
pub const DEFAULT_WRITE_CAPACITY: usize = 128 * 1024;

const READ_CHUNK: usize = 16 * 1024;

/// Record transport over a socket placed in non-blocking mode.
///
/// `WouldBlock` from the socket is never an error: [`service`](Transport::service)
/// simply stops and the caller tries again on its next iteration.
#[derive(Debug)]
pub struct AsyncStream<S> {
    inner: S,
    codec: RecordCodec,
    read_buf: BytesMut,
    write_buf: BytesMut,
    capacity: usize,
    peer_closed: bool,
}

impl<S: Read + Write> AsyncStream<S> {
    /// Wraps `inner` with a [`DEFAULT_WRITE_CAPACITY`] outbound buffer.
    pub fn new(inner: S) -> Self {
        Self::with_capacity(inner, DEFAULT_WRITE_CAPACITY)
    }

    /// Wraps `inner` with an outbound buffer of `capacity` bytes.
    ///
    /// The capacity is raised to fit at least one maximum-size record.
    pub fn with_capacity(inner: S, capacity: usize) -> Self {
        let capacity = capacity.max(HEADER_LEN + MAX_PAYLOAD_LEN);
        Self {
            inner,
            codec: RecordCodec::new(),
            read_buf: BytesMut::with_capacity(READ_CHUNK),
            write_buf: BytesMut::with_capacity(capacity),
            capacity,
            peer_closed: false,
        }
    }

    /// Returns a reference to the wrapped stream.
    pub fn get_ref(&self) -> &S {
        &self.inner
    }

    /// Unwraps the stream, discarding buffered data.
    pub fn into_inner(self) -> S {
        self.inner
    }

    fn flush_some(&mut self) -> Result<(), TransportError> {
        while !self.write_buf.is_empty() {
            match self.inner.write(&self.write_buf) {
                Ok(0) => return Err(TransportError::Closed),
                Ok(n) => self.write_buf.advance(n),
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err.into()),
            }
        }
        match self.inner.flush() {
            Err(err) if err.kind() != io::ErrorKind::WouldBlock => Err(err.into()),
            _ => Ok(()),
        }
    }

    fn fill_some(&mut self) -> Result<(), TransportError> {
        if self.peer_closed {
            return Ok(());
        }
        let mut chunk = [0u8; READ_CHUNK];
        loop {
            match self.inner.read(&mut chunk) {
                Ok(0) => {
                    logging::trace_io!(buffered = self.read_buf.len(), "peer closed stream");
                    self.peer_closed = true;
                    return Ok(());
                }
                Ok(n) => {
                    self.read_buf.extend_from_slice(&chunk[..n]);
                    if n < chunk.len() {
                        return Ok(());
                    }
                }
                Err(err) if err.kind() == io::ErrorKind::WouldBlock => return Ok(()),
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => return Err(err.into()),
            }
        }
    }
}

impl<S: Read + Write> Transport for AsyncStream<S> {
    fn service(&mut self) -> Result<(), TransportError> {
        self.flush_some()?;
        self.fill_some()
    }

    fn read(&mut self) -> Result<Option<Record>, TransportError> {
        if !self.peer_closed {
            return Ok(self.codec.decode(&mut self.read_buf)?);
        }
        match self.codec.decode_eof(&mut self.read_buf)? {
            Some(record) => Ok(Some(record)),
            None => Err(TransportError::Closed),
        }
    }

    fn append(&mut self, record: &Record) -> Result<Append, TransportError> {
        if self.write_buf.len() + HEADER_LEN + record.len() > self.capacity {
            return Ok(Append::Blocked);
        }
        self.codec.encode(record, &mut self.write_buf)?;
        Ok(Append::Queued)
    }

    fn pending_write(&self) -> usize {
        self.write_buf.len()
    }

    fn write_space(&self) -> usize {
        self.capacity.saturating_sub(self.write_buf.len())
    }
}
