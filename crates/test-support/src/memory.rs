//! In-memory transport with a bounded write buffer.

use std::collections::VecDeque;

use protocol::{Append, HEADER_LEN, Record, Transport, TransportError};

/// Default write-buffer size, large enough that nothing blocks.
pub const UNBOUNDED: usize = usize::MAX / 2;

/// Transport whose peer is the test itself.
///
/// Appended records sit in a write buffer of `capacity` bytes until
/// [`service`](Transport::service) moves them to the sent list. Inbound
/// records are queued with [`push_inbound`](Self::push_inbound).
#[derive(Debug)]
pub struct MemoryTransport {
    capacity: usize,
    queued: Vec<Record>,
    queued_len: usize,
    sent: Vec<Record>,
    inbound: VecDeque<Record>,
    closed: bool,
    services: usize,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryTransport {
    /// Transport that never blocks.
    pub fn new() -> Self {
        Self::with_capacity(UNBOUNDED)
    }

    /// Transport whose write buffer holds `capacity` bytes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            queued: Vec::new(),
            queued_len: 0,
            sent: Vec::new(),
            inbound: VecDeque::new(),
            closed: false,
            services: 0,
        }
    }

    /// Queues a record for the engine to read.
    pub fn push_inbound(&mut self, record: Record) {
        self.inbound.push_back(record);
    }

    /// Makes `read` fail with [`TransportError::Closed`] once the inbound
    /// queue is empty.
    pub fn close(&mut self) {
        self.closed = true;
    }

    /// Records flushed so far.
    pub fn sent(&self) -> &[Record] {
        &self.sent
    }

    /// Drains the flushed records.
    pub fn take_sent(&mut self) -> Vec<Record> {
        std::mem::take(&mut self.sent)
    }

    /// Number of `service` calls.
    pub fn services(&self) -> usize {
        self.services
    }
}

impl Transport for MemoryTransport {
    fn service(&mut self) -> Result<(), TransportError> {
        self.services += 1;
        self.sent.append(&mut self.queued);
        self.queued_len = 0;
        Ok(())
    }

    fn read(&mut self) -> Result<Option<Record>, TransportError> {
        match self.inbound.pop_front() {
            Some(record) => Ok(Some(record)),
            None if self.closed => Err(TransportError::Closed),
            None => Ok(None),
        }
    }

    fn append(&mut self, record: &Record) -> Result<Append, TransportError> {
        let len = HEADER_LEN + record.len();
        if len > self.write_space() {
            return Ok(Append::Blocked);
        }
        self.queued.push(record.clone());
        self.queued_len += len;
        Ok(Append::Queued)
    }

    fn pending_write(&self) -> usize {
        self.queued_len
    }

    fn write_space(&self) -> usize {
        self.capacity.saturating_sub(self.queued_len)
    }
}
