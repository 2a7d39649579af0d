//! crates/protocol/src/transport.rs
//!
//! Non-blocking record transport.
//!
//! The phase-2 loop never waits on the network. Each iteration it calls
//! [`Transport::service`] once to move bytes between the socket and the
//! transport's buffers, then pops at most one inbound record with
//! [`Transport::read`] and queues outbound records with
//! [`Transport::append`]. A full write buffer is reported as
//! [`Append::Blocked`]; the caller keeps its own state and retries on a later
//! iteration.

mod stream;

pub use stream::{AsyncStream, DEFAULT_WRITE_CAPACITY};

use crate::error::TransportError;
use crate::record::Record;

/// Outcome of queueing a record for the peer.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[must_use]
pub enum Append {
    /// The record is buffered and will be sent by a later `service` call.
    Queued,
    /// The write buffer lacks room; nothing was queued.
    Blocked,
}

/// Buffered, non-blocking record stream to one client.
pub trait Transport {
    /// Flushes buffered output and reads whatever input is ready, without
    /// blocking.
    fn service(&mut self) -> Result<(), TransportError>;

    /// Pops the next complete inbound record, or `None` when none is ready.
    fn read(&mut self) -> Result<Option<Record>, TransportError>;

    /// Queues `record` for sending.
    fn append(&mut self, record: &Record) -> Result<Append, TransportError>;

    /// Bytes queued but not yet handed to the socket.
    fn pending_write(&self) -> usize;

    /// Bytes that can be queued before [`append`](Self::append) blocks,
    /// header included.
    fn write_space(&self) -> usize;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn service(&mut self) -> Result<(), TransportError> {
        (**self).service()
    }

    fn read(&mut self) -> Result<Option<Record>, TransportError> {
        (**self).read()
    }

    fn append(&mut self, record: &Record) -> Result<Append, TransportError> {
        (**self).append(record)
    }

    fn pending_write(&self) -> usize {
        (**self).pending_write()
    }

    fn write_space(&self) -> usize {
        (**self).write_space()
    }
}
