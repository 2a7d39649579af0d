//! crates/transfer/src/phase2/mod.rs
//!
//! The phase-2 orchestrator.
//!
//! One [`Phase2`] drives one client connection through phase 2 as a
//! cooperative loop. Each [`step`](Phase2::step):
//!
//! 1. services the transport and handles at most one inbound record, when a
//!    file was requested, output is pending or the client's list is
//!    exhausted;
//! 2. flushes whatever the current candidate still owes the client (data
//!    path, attributes, path, signature bytes, end of signature), returning
//!    early if the transport is full;
//! 3. otherwise reads the next candidate from the client's list and merges
//!    it against the previous manifest.
//!
//! Nothing in a step waits on the network. A full write buffer leaves the
//! state untouched for the next step.

mod merge;
mod receive;
mod send;

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt;
use std::rc::Rc;

use blockcache::BlockCache;
use manifest::{
    AttribCodec, FileRecord, ManifestOffset, ManifestReader, ManifestWriter, StatAttribs,
};
use protocol::{Append, Command, Record, Transport};
use signature::SignatureJob;

use crate::config::{Phase2Config, StorageDirs};
use crate::data_path::{SequentialAllocator, StoragePathAllocator};
use crate::error::Phase2Error;
use crate::resume::ResumePosition;
use crate::stats::Phase2Stats;

use self::receive::ReceiveTarget;

/// Sent to the client once its list is exhausted.
pub const PHASE_END: &str = "backupphase2end";

/// The client's acknowledgement of [`PHASE_END`].
pub const PHASE_END_ACK: &str = "okbackupphase2end";

/// Outcome of one [`Phase2::step`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
#[must_use]
pub enum Progress {
    /// More steps are needed.
    Continue,
    /// Both sides agreed the phase is over and the logs are closed.
    Finished,
}

/// Positions of every input just before a candidate was read.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
struct Snapshot {
    phase1: ManifestOffset,
    previous: ManifestOffset,
    unchanged_len: u64,
}

/// A file requested from the client and not yet received.
#[derive(Debug)]
struct Outstanding {
    path: Vec<u8>,
    at: Snapshot,
}

/// Whether the client is owed nothing more for now.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Flush {
    Done,
    Pending,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum PhaseEnd {
    NotYet,
    Pending,
    Sent,
}

/// Phase-2 state for one connection.
pub struct Phase2<T: Transport, C: AttribCodec = StatAttribs> {
    transport: T,
    codec: C,
    config: Phase2Config,
    dirs: StorageDirs,
    allocator: Box<dyn StoragePathAllocator>,
    committed_index: u64,
    phase1: Option<ManifestReader>,
    phase1_pos: ManifestOffset,
    previous: Option<ManifestReader>,
    previous_pos: ManifestOffset,
    unchanged: Option<ManifestWriter>,
    changed: Option<ManifestWriter>,
    cache: Option<Rc<RefCell<BlockCache>>>,
    /// Entry of the previous manifest under comparison.
    current: FileRecord,
    current_start: ManifestOffset,
    /// Entry of the client's list under comparison.
    candidate: FileRecord,
    sig: SignatureJob,
    /// Entry arriving from the client.
    receiving: FileRecord,
    target: Option<ReceiveTarget>,
    last_requested: Option<Vec<u8>>,
    outstanding: VecDeque<Outstanding>,
    phase_end: PhaseEnd,
    finished: bool,
    stats: Phase2Stats,
}

impl<T: Transport> Phase2<T> {
    /// Opens a run using the default attribute codec.
    pub fn open(
        transport: T,
        config: Phase2Config,
        dirs: StorageDirs,
        resume: Option<ResumePosition>,
    ) -> Result<Self, Phase2Error> {
        Self::with_codec(transport, StatAttribs, config, dirs, resume)
    }
}

impl<T: Transport, C: AttribCodec> Phase2<T, C> {
    /// Opens the inputs and logs named by `dirs`.
    ///
    /// With a `resume` position the client's list and the previous manifest
    /// are repositioned and the storage-name counter restored. The logs must
    /// already have been rewound with [`prepare`](crate::resume::prepare).
    pub fn with_codec(
        transport: T,
        codec: C,
        config: Phase2Config,
        dirs: StorageDirs,
        resume: Option<ResumePosition>,
    ) -> Result<Self, Phase2Error> {
        let mut allocator = SequentialAllocator::scan(&dirs.current_data, config.max_storage_subdirs)
            .map_err(|err| Phase2Error::io(&dirs.current_data, err))?;
        let mut phase1 = ManifestReader::open(&dirs.phase1)?;
        let mut previous = if dirs.previous.exists() {
            Some(ManifestReader::open(&dirs.previous)?)
        } else {
            logging::trace_phase2!("no previous manifest, every entry is new");
            None
        };
        if let Some(position) = &resume {
            phase1.seek(position.phase1)?;
            if let Some(previous) = previous.as_mut() {
                previous.seek(position.previous)?;
            }
            allocator.set_index(position.next_data_index);
            logging::trace_phase2!(
                phase1 = position.phase1.get(),
                previous = position.previous.get(),
                "resuming phase 2"
            );
        }
        let unchanged = ManifestWriter::open_append(&dirs.unchanged)?;
        let changed = ManifestWriter::open_append(&dirs.changed)?;
        let sig = SignatureJob::new(config.signature_strong_len)?;
        let cache = dirs
            .block_data
            .as_ref()
            .map(|root| Rc::new(RefCell::new(BlockCache::new(root))));
        Ok(Self {
            transport,
            codec,
            phase1_pos: phase1.tell(),
            phase1: Some(phase1),
            previous_pos: previous.as_ref().map_or(ManifestOffset::START, ManifestReader::tell),
            previous,
            committed_index: allocator.index(),
            allocator: Box::new(allocator),
            config,
            dirs,
            unchanged: Some(unchanged),
            changed: Some(changed),
            cache,
            current: FileRecord::new(),
            current_start: ManifestOffset::START,
            candidate: FileRecord::new(),
            sig,
            receiving: FileRecord::new(),
            target: None,
            last_requested: None,
            outstanding: VecDeque::new(),
            phase_end: PhaseEnd::NotYet,
            finished: false,
            stats: Phase2Stats::default(),
        })
    }

    /// Replaces the storage-name allocator, keeping the current position.
    pub fn with_allocator(mut self, mut allocator: Box<dyn StoragePathAllocator>) -> Self {
        allocator.set_index(self.allocator.index());
        self.allocator = allocator;
        self
    }

    /// Counters so far.
    pub fn stats(&self) -> &Phase2Stats {
        &self.stats
    }

    /// The transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// The transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// Gives the transport back, dropping everything else.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Returns `true` once the phase has finished.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Runs one iteration of the loop.
    pub fn step(&mut self) -> Result<Progress, Phase2Error> {
        if self.finished {
            return Ok(Progress::Finished);
        }
        if self.wants_receive() && self.receive()? == Progress::Finished {
            self.finish()?;
            return Ok(Progress::Finished);
        }
        if self.send()? == Flush::Pending {
            return Ok(Progress::Continue);
        }
        if self.phase1.is_some() {
            self.next_candidate()?;
        }
        Ok(Progress::Continue)
    }

    /// Steps until the phase finishes.
    ///
    /// On failure the logs are flushed as far as they got, and an allocation
    /// failure is reported to the client if it can still be told.
    pub fn run(&mut self) -> Result<Phase2Stats, Phase2Error> {
        loop {
            match self.step() {
                Ok(Progress::Continue) => {}
                Ok(Progress::Finished) => return Ok(self.stats),
                Err(err) => {
                    self.abort(&err);
                    return Err(err);
                }
            }
        }
    }

    /// Flushes both logs and returns the point a restart may resume from.
    ///
    /// The position covers every entry of the client's list up to, but not
    /// including, the oldest file still awaited from the client.
    pub fn checkpoint(&mut self) -> Result<ResumePosition, Phase2Error> {
        for writer in [&mut self.unchanged, &mut self.changed].into_iter().flatten() {
            writer.flush()?;
        }
        let at = match self.outstanding.front() {
            Some(oldest) => oldest.at,
            None => self.snapshot(),
        };
        Ok(ResumePosition {
            phase1: at.phase1,
            previous: at.previous,
            unchanged_len: at.unchanged_len,
            changed_len: self.changed.as_ref().map_or(0, ManifestWriter::len),
            next_data_index: self.committed_index,
        })
    }

    fn wants_receive(&self) -> bool {
        self.last_requested.is_some() || self.phase1.is_none() || self.transport.pending_write() > 0
    }

    fn snapshot(&self) -> Snapshot {
        let previous = if self.current.is_empty() {
            self.previous
                .as_ref()
                .map_or(self.previous_pos, ManifestReader::tell)
        } else {
            self.current_start
        };
        Snapshot {
            phase1: self
                .phase1
                .as_ref()
                .map_or(self.phase1_pos, ManifestReader::tell),
            previous,
            unchanged_len: self.unchanged.as_ref().map_or(0, ManifestWriter::len),
        }
    }

    fn finish(&mut self) -> Result<(), Phase2Error> {
        self.finished = true;
        if let Some(writer) = self.unchanged.take() {
            writer.close()?;
        }
        if let Some(writer) = self.changed.take() {
            writer.close()?;
        }
        self.release();
        self.stats.log();
        Ok(())
    }

    fn abort(&mut self, err: &Phase2Error) {
        tracing::error!(target: "backup::phase2", error = %err, "phase 2 failed");
        for writer in [&mut self.unchanged, &mut self.changed].into_iter().flatten() {
            if let Err(flush) = writer.flush() {
                tracing::error!(target: "backup::phase2", error = %flush, "flushing log after failure");
            }
        }
        if err.is_out_of_memory() {
            self.report_error("out of memory");
        }
        self.release();
    }

    /// Drops per-slot content; the logs stay open for a checkpoint.
    fn release(&mut self) {
        self.current.reset();
        self.candidate.reset();
        self.receiving.reset();
        self.sig.reset();
        self.target = None;
        self.cache = None;
    }

    /// Best-effort error notice to the client.
    fn report_error(&mut self, message: &str) {
        let record = Record::with_text(Command::Error, message);
        match self.transport.append(&record) {
            Ok(Append::Queued) => {
                let _ = self.transport.service();
            }
            Ok(Append::Blocked) | Err(_) => {
                logging::trace_send!(error = message, "could not report error to client");
            }
        }
    }

    /// Writes `entry` to the unchanged log with freshly encoded attributes.
    fn log_unchanged(&mut self, entry: &mut FileRecord) -> Result<(), Phase2Error> {
        encode_attribs(&self.codec, entry)?;
        if let Some(writer) = self.unchanged.as_mut() {
            writer.write(entry)?;
        }
        Ok(())
    }
}

impl<T: Transport, C: AttribCodec> fmt::Debug for Phase2<T, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Phase2")
            .field("dirs", &self.dirs)
            .field("config", &self.config)
            .field("candidate", &self.candidate.display_path())
            .field("outstanding", &self.outstanding.len())
            .field("phase_end", &self.phase_end)
            .field("finished", &self.finished)
            .field("stats", &self.stats)
            .finish_non_exhaustive()
    }
}

fn decode_attribs<C: AttribCodec>(codec: &C, record: &mut FileRecord) -> Result<(), Phase2Error> {
    codec.decode(record).map_err(|err| {
        Phase2Error::protocol(format!(
            "bad attributes for {}: {err}",
            record.display_path()
        ))
    })
}

fn encode_attribs<C: AttribCodec>(codec: &C, record: &mut FileRecord) -> Result<(), Phase2Error> {
    codec.encode(record).map_err(|err| {
        Phase2Error::protocol(format!(
            "cannot encode attributes for {}: {err}",
            record.display_path()
        ))
    })
}
