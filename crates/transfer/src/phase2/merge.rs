//! crates/transfer/src/phase2/merge.rs
//!
//! Walks the client's list against the previous manifest.
//!
//! Both manifests are sorted with [`record_cmp`], so one pass decides every
//! entry: equal paths go through the unchanged/changed decision, a previous
//! entry sorting first was deleted, and a candidate sorting first is new.

use std::cmp::Ordering;
use std::fs::File;
use std::io::{BufReader, Read};
use std::rc::Rc;

use blockcache::StoredBlocksReader;
use flate2::read::MultiGzDecoder;
use manifest::{AttribCodec, FileRecord, RecordFlags, record_cmp};
use protocol::Transport;
use signature::block_len_for;

use super::{Outstanding, Phase2, PhaseEnd, Snapshot, decode_attribs};
use crate::data_path::is_compressed;
use crate::error::Phase2Error;

/// How a candidate whose path matches a previous entry is handled.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub(super) enum Disposition {
    /// Carry the stored data forward.
    Unchanged,
    /// Ask for the whole file.
    New,
    /// Ask for a delta against the stored data, or log a changed non-file.
    Changed,
}

/// Unchanged/changed decision for two entries at the same path.
///
/// A status-change-only difference stays unchanged unless either side is
/// encrypted, metadata or a backup stream, or the client runs Windows. Those
/// fall through to the changed branch, which requests the special kinds in
/// full and deltas plain files.
pub(super) fn classify(current: &FileRecord, candidate: &FileRecord, client_is_windows: bool) -> Disposition {
    let (Some(old_kind), Some(new_kind)) = (current.kind(), candidate.kind()) else {
        return Disposition::New;
    };
    if old_kind != new_kind {
        return Disposition::New;
    }
    if current.stat.mtime == candidate.stat.mtime {
        if current.stat.ctime == candidate.stat.ctime {
            return Disposition::Unchanged;
        }
        if !client_is_windows && !needs_full_copy(current) && !needs_full_copy(candidate) {
            return Disposition::Unchanged;
        }
    }
    Disposition::Changed
}

/// Kinds never sent as deltas.
fn needs_full_copy(record: &FileRecord) -> bool {
    record.is_metadata() || record.is_encrypted() || record.is_vssdata()
}

impl<T: Transport, C: AttribCodec> Phase2<T, C> {
    /// Reads the next entry of the client's list and dispositions it.
    pub(super) fn next_candidate(&mut self) -> Result<(), Phase2Error> {
        let before = self.snapshot();
        let Some(reader) = self.phase1.as_mut() else {
            return Ok(());
        };
        let next = reader.read()?;
        self.phase1_pos = reader.tell();
        let Some(mut candidate) = next else {
            self.phase1 = None;
            self.phase_end = PhaseEnd::Pending;
            logging::trace_phase2!("end of client list");
            return self.drain_previous();
        };
        if candidate.attr.is_some() {
            decode_attribs(&self.codec, &mut candidate)?;
        }
        self.candidate = candidate;
        self.merge(before)
    }

    fn merge(&mut self, before: Snapshot) -> Result<(), Phase2Error> {
        loop {
            if self.current.is_empty() && !self.read_previous()? {
                return self.process_new(before);
            }
            match record_cmp(&self.current, &self.candidate) {
                Ordering::Equal => {
                    let result = self.decide(before);
                    self.current.reset();
                    return result;
                }
                Ordering::Greater => return self.process_new(before),
                Ordering::Less => {
                    logging::trace_phase2!(path = %self.current.display_path(), "deleted");
                    self.stats.deleted += 1;
                    self.current.reset();
                }
            }
        }
    }

    /// Loads the next previous entry into `current`; `false` once there is
    /// none.
    fn read_previous(&mut self) -> Result<bool, Phase2Error> {
        let Some(reader) = self.previous.as_mut() else {
            return Ok(false);
        };
        self.current_start = reader.tell();
        let next = reader.read()?;
        self.previous_pos = reader.tell();
        match next {
            Some(mut entry) => {
                if entry.attr.is_some() {
                    decode_attribs(&self.codec, &mut entry)?;
                }
                self.current = entry;
                Ok(true)
            }
            None => {
                self.previous = None;
                Ok(false)
            }
        }
    }

    /// Counts everything left in the previous manifest as deleted.
    fn drain_previous(&mut self) -> Result<(), Phase2Error> {
        if !self.current.is_empty() {
            self.stats.deleted += 1;
            self.current.reset();
        }
        while self.read_previous()? {
            logging::trace_phase2!(path = %self.current.display_path(), "deleted");
            self.stats.deleted += 1;
            self.current.reset();
        }
        Ok(())
    }

    fn decide(&mut self, before: Snapshot) -> Result<(), Phase2Error> {
        match classify(&self.current, &self.candidate, self.config.client_is_windows) {
            Disposition::Unchanged => self.process_unchanged(),
            Disposition::New => self.process_new(before),
            Disposition::Changed => self.process_changed(before),
        }
    }

    /// Requests file data in full, or logs an entry that has none.
    fn process_new(&mut self, before: Snapshot) -> Result<(), Phase2Error> {
        if self.candidate.is_filedata() || self.candidate.is_vssdata() {
            logging::trace_phase2!(path = %self.candidate.display_path(), "requesting new file");
            self.candidate
                .flags
                .insert(RecordFlags::SEND_STAT | RecordFlags::SEND_PATH);
            self.expect(before);
            return Ok(());
        }
        let mut entry = self.candidate.take();
        self.log_unchanged(&mut entry)?;
        self.stats.new += 1;
        Ok(())
    }

    fn process_unchanged(&mut self) -> Result<(), Phase2Error> {
        let mut entry = self.candidate.take();
        entry.datapath = self.current.datapath.take();
        entry.endfile = self.current.endfile.take();
        entry.blocks = std::mem::take(&mut self.current.blocks);
        entry.compression = self.current.compression;
        entry.winattr = self.current.winattr;
        self.log_unchanged(&mut entry)?;
        logging::trace_phase2!(path = %entry.display_path(), "unchanged");
        self.stats.same += 1;
        self.stats.bytes += entry.endfile_bytes();
        Ok(())
    }

    fn process_changed(&mut self, before: Snapshot) -> Result<(), Phase2Error> {
        let (current, candidate) = (&self.current, &self.candidate);
        if !self.config.delta_enabled || needs_full_copy(current) || needs_full_copy(candidate) {
            return self.process_new(before);
        }
        let stored_compressed = current
            .datapath
            .as_ref()
            .is_some_and(|datapath| is_compressed(current.compression, &datapath.text()));
        if stored_compressed != (candidate.compression > 0) {
            logging::trace_phase2!(path = %candidate.display_path(), "compression changed");
            return self.process_new(before);
        }
        if candidate.is_filedata() {
            return self.process_changed_file(before);
        }
        let mut entry = self.candidate.take();
        self.log_unchanged(&mut entry)?;
        logging::trace_phase2!(path = %entry.display_path(), "changed, no data");
        self.stats.changed += 1;
        Ok(())
    }

    /// Starts a signature of the stored copy and queues the delta request.
    fn process_changed_file(&mut self, before: Snapshot) -> Result<(), Phase2Error> {
        let Some(datapath) = self.current.datapath.take() else {
            return self.process_new(before);
        };
        let base = self.open_delta_base(&datapath.text())?;
        let block_len = block_len_for(self.current.endfile_bytes());
        self.sig.begin(base, block_len)?;
        logging::trace_phase2!(
            path = %self.candidate.display_path(),
            datapath = %datapath.text(),
            block_len,
            "requesting delta"
        );
        self.candidate.datapath = Some(datapath);
        self.candidate.flags.insert(
            RecordFlags::SEND_DATAPATH | RecordFlags::SEND_STAT | RecordFlags::SEND_PATH,
        );
        self.expect(before);
        Ok(())
    }

    fn open_delta_base(&mut self, datapath: &str) -> Result<Box<dyn Read>, Phase2Error> {
        if let Some(cache) = self.cache.as_ref().filter(|_| !self.current.blocks.is_empty()) {
            let save_paths = std::mem::take(&mut self.current.blocks)
                .into_iter()
                .map(|block| block.save_path);
            return Ok(Box::new(StoredBlocksReader::new(Rc::clone(cache), save_paths)));
        }
        let path = self.dirs.current_data.join(datapath);
        let file = File::open(&path).map_err(|err| Phase2Error::io(&path, err))?;
        let reader = BufReader::new(file);
        if is_compressed(self.current.compression, datapath) {
            Ok(Box::new(MultiGzDecoder::new(reader)))
        } else {
            Ok(Box::new(reader))
        }
    }

    fn expect(&mut self, before: Snapshot) {
        self.outstanding.push_back(Outstanding {
            path: self.candidate.path_bytes().to_vec(),
            at: before,
        });
    }
}
