//! crates/signature/src/job.rs
//!
//! Cooperative signature generation.
//!
//! A [`SignatureJob`] reads its base a few blocks at a time and hands the
//! encoded signature to the transport as `append` records, never queueing
//! more than the transport reports room for. When the transport is full the
//! job reports [`SigStep::Blocked`] and keeps its unsent bytes for the next
//! call.

use std::fmt;
use std::io::{self, Read};

use checksums::{MD4_DIGEST_LEN, Md4, Rollsum};
use protocol::{Append, Command, HEADER_LEN, MAX_PAYLOAD_LEN, Record, Transport};

use crate::block_size::MIN_BLOCK_LEN;
use crate::error::SignatureError;

/// librsync magic number for MD4 signatures.
pub const MD4_SIG_MAGIC: u32 = 0x7273_0136;

/// Strong checksum length used by default, in bytes.
pub const DEFAULT_STRONG_LEN: usize = 8;

/// Largest block length accepted by [`SignatureJob::begin`].
pub const MAX_BLOCK_LEN: u32 = 1 << 24;

/// Lifecycle of a job.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SigState {
    /// Not started.
    Idle,
    /// Emitting signature bytes.
    Running,
    /// The whole signature has been queued.
    Done,
    /// A step failed; the job must be reset.
    Failed,
}

/// Result of one [`SignatureJob::step`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[must_use]
pub enum SigStep {
    /// The transport is full; retry after it drains.
    Blocked,
    /// Progress was made and more remains.
    Running,
    /// The signature is complete.
    Done,
}

/// Incremental signature of one delta base.
pub struct SignatureJob {
    state: SigState,
    input: Option<Box<dyn Read>>,
    strong_len: usize,
    block_len: usize,
    block: Vec<u8>,
    out: Vec<u8>,
    input_done: bool,
    blocks: u64,
}

impl SignatureJob {
    /// Creates an idle job emitting `strong_len`-byte strong sums.
    pub fn new(strong_len: usize) -> Result<Self, SignatureError> {
        if strong_len == 0 || strong_len > MD4_DIGEST_LEN {
            return Err(SignatureError::StrongLength(strong_len));
        }
        Ok(Self {
            state: SigState::Idle,
            input: None,
            strong_len,
            block_len: 0,
            block: Vec::new(),
            out: Vec::new(),
            input_done: false,
            blocks: 0,
        })
    }

    /// Current state.
    pub fn state(&self) -> SigState {
        self.state
    }

    /// Blocks signed so far.
    pub fn blocks(&self) -> u64 {
        self.blocks
    }

    /// Starts signing `input` with `block_len`-byte blocks.
    pub fn begin(&mut self, input: Box<dyn Read>, block_len: u32) -> Result<(), SignatureError> {
        if !(MIN_BLOCK_LEN..=MAX_BLOCK_LEN).contains(&block_len) {
            return Err(SignatureError::BlockLength(block_len));
        }
        self.reset();
        self.block_len = block_len as usize;
        let mut block = Vec::new();
        block
            .try_reserve_exact(self.block_len)
            .map_err(|_| SignatureError::OutOfMemory(self.block_len))?;
        block.resize(self.block_len, 0);
        self.block = block;
        self.out.extend_from_slice(&MD4_SIG_MAGIC.to_be_bytes());
        self.out.extend_from_slice(&block_len.to_be_bytes());
        self.out
            .extend_from_slice(&(self.strong_len as u32).to_be_bytes());
        self.input = Some(input);
        self.state = SigState::Running;
        logging::trace_delta!(block_len, strong_len = self.strong_len, "signature job started");
        Ok(())
    }

    /// Returns the job to [`SigState::Idle`], dropping its input.
    pub fn reset(&mut self) {
        self.state = SigState::Idle;
        self.input = None;
        self.block.clear();
        self.out.clear();
        self.input_done = false;
        self.blocks = 0;
    }

    /// Advances the job without waiting on the transport.
    pub fn step(&mut self, transport: &mut dyn Transport) -> Result<SigStep, SignatureError> {
        match self.state {
            SigState::Idle => return Err(SignatureError::NotStarted),
            SigState::Failed => return Err(SignatureError::Failed),
            SigState::Done => return Ok(SigStep::Done),
            SigState::Running => {}
        }
        match self.advance(transport) {
            Ok(step) => {
                if step == SigStep::Done {
                    self.state = SigState::Done;
                    self.input = None;
                    logging::trace_delta!(blocks = self.blocks, "signature job done");
                }
                Ok(step)
            }
            Err(err) => {
                self.state = SigState::Failed;
                self.input = None;
                Err(err)
            }
        }
    }

    fn advance(&mut self, transport: &mut dyn Transport) -> Result<SigStep, SignatureError> {
        if self.out.len() < MAX_PAYLOAD_LEN && !self.input_done {
            self.fill()?;
        }
        if self.out.is_empty() {
            return Ok(if self.input_done {
                SigStep::Done
            } else {
                SigStep::Running
            });
        }

        let room = transport.write_space().saturating_sub(HEADER_LEN);
        if room == 0 {
            return Ok(SigStep::Blocked);
        }
        let chunk = room.min(self.out.len()).min(MAX_PAYLOAD_LEN);
        let record = Record::new(Command::Append, &self.out[..chunk]);
        match transport.append(&record)? {
            Append::Blocked => return Ok(SigStep::Blocked),
            Append::Queued => {
                self.out.drain(..chunk);
            }
        }
        if self.out.is_empty() && self.input_done {
            Ok(SigStep::Done)
        } else {
            Ok(SigStep::Running)
        }
    }

    /// Signs blocks until one record's worth of output is pending or the
    /// input ends.
    fn fill(&mut self) -> io::Result<()> {
        let Some(input) = self.input.as_mut() else {
            self.input_done = true;
            return Ok(());
        };
        while self.out.len() < MAX_PAYLOAD_LEN {
            let n = read_block(input.as_mut(), &mut self.block)?;
            if n == 0 {
                self.input_done = true;
                break;
            }
            let data = &self.block[..n];
            self.out.extend_from_slice(&Rollsum::of(data).to_be_bytes());
            self.out
                .extend_from_slice(&Md4::digest(data)[..self.strong_len]);
            self.blocks += 1;
            if n < self.block_len {
                self.input_done = true;
                break;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for SignatureJob {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignatureJob")
            .field("state", &self.state)
            .field("block_len", &self.block_len)
            .field("strong_len", &self.strong_len)
            .field("pending", &self.out.len())
            .field("blocks", &self.blocks)
            .finish_non_exhaustive()
    }
}

/// Reads until `buf` is full or the input ends.
fn read_block(input: &mut dyn Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match input.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
            Err(err) => return Err(err),
        }
    }
    Ok(filled)
}
