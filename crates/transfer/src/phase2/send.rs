//! crates/transfer/src/phase2/send.rs
//!
//! Requests owed to the client.
//!
//! A requested candidate owes, in order: its data path (deltas only), its
//! attributes, its path, the signature of the stored copy (deltas only) and
//! an end-of-signature marker. Each item is sent at most once; a full
//! transport leaves the remaining items for a later step.

use manifest::{AttribCodec, RecordFlags, SIG_END};
use protocol::{Append, Command, Record, Transport};
use signature::{SigState, SigStep};

use super::{Flush, PHASE_END, Phase2, PhaseEnd};
use crate::error::Phase2Error;

impl<T: Transport, C: AttribCodec> Phase2<T, C> {
    pub(super) fn send(&mut self) -> Result<Flush, Phase2Error> {
        if self.owes_client() {
            if self.send_candidate()? == Flush::Pending {
                return Ok(Flush::Pending);
            }
            self.candidate.reset();
        }
        if self.phase_end == PhaseEnd::Pending {
            let marker = Record::with_text(Command::Gen, PHASE_END);
            if self.transport.append(&marker)? == Append::Blocked {
                return Ok(Flush::Pending);
            }
            logging::trace_send!("sent end of phase 2");
            self.phase_end = PhaseEnd::Sent;
        }
        Ok(Flush::Done)
    }

    fn owes_client(&self) -> bool {
        let flags = self.candidate.flags;
        flags.has_pending_send()
            || flags.contains(RecordFlags::SEND_ENDOFSIG)
            || self.sig.state() == SigState::Running
    }

    fn send_candidate(&mut self) -> Result<Flush, Phase2Error> {
        if self.candidate.flags.contains(RecordFlags::SEND_DATAPATH) {
            if let Some(datapath) = &self.candidate.datapath {
                if self.transport.append(datapath)? == Append::Blocked {
                    return Ok(Flush::Pending);
                }
            }
            self.candidate.flags.remove(RecordFlags::SEND_DATAPATH);
        }
        if self.candidate.flags.contains(RecordFlags::SEND_STAT) {
            if let Some(attr) = &self.candidate.attr {
                if self.transport.append(attr)? == Append::Blocked {
                    return Ok(Flush::Pending);
                }
            }
            self.candidate.flags.remove(RecordFlags::SEND_STAT);
        }
        if self.candidate.flags.contains(RecordFlags::SEND_PATH) {
            let Some(path) = &self.candidate.path else {
                return Err(Phase2Error::protocol("requested entry has no path"));
            };
            if self.transport.append(path)? == Append::Blocked {
                return Ok(Flush::Pending);
            }
            logging::trace_send!(path = %path.text(), "requested");
            self.last_requested = Some(path.payload().to_vec());
            self.candidate.flags.remove(RecordFlags::SEND_PATH);
        }
        if self.sig.state() == SigState::Running {
            match self.sig.step(&mut self.transport)? {
                SigStep::Blocked | SigStep::Running => return Ok(Flush::Pending),
                SigStep::Done => {
                    logging::trace_send!(blocks = self.sig.blocks(), "signature sent");
                    self.sig.reset();
                    self.candidate.flags.insert(RecordFlags::SEND_ENDOFSIG);
                }
            }
        }
        if self.candidate.flags.contains(RecordFlags::SEND_ENDOFSIG) {
            let marker = Record::with_text(Command::EndFile, SIG_END);
            if self.transport.append(&marker)? == Append::Blocked {
                return Ok(Flush::Pending);
            }
            self.candidate.flags.remove(RecordFlags::SEND_ENDOFSIG);
        }
        Ok(Flush::Done)
    }
}
