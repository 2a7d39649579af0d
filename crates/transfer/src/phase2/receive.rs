//! crates/transfer/src/phase2/receive.rs
//!
//! Records arriving from the client.
//!
//! The receive half is idle until a path record announces a file. Before
//! that it collects the data path (deltas only) and attributes, and watches
//! for interrupts and the end-of-phase acknowledgement. While a file is open
//! it accepts `append` chunks until the end-of-file record, which closes the
//! target, moves a delta into `deltas.forward/` and logs the entry as
//! changed.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use checksums::{Md5, to_hex};
use flate2::Compression;
use flate2::write::GzEncoder;
use manifest::{AttribCodec, RecordFlags};
use protocol::{Command, Record, Transport};

use super::{PHASE_END_ACK, Phase2, Progress, decode_attribs, encode_attribs};
use crate::error::Phase2Error;
use crate::temp_guard::TempFileGuard;

enum Sink {
    Plain(BufWriter<File>),
    Gzip(GzEncoder<BufWriter<File>>),
}

impl Sink {
    fn finish(self) -> io::Result<()> {
        let writer = match self {
            Self::Plain(writer) => writer,
            Self::Gzip(encoder) => encoder.finish()?,
        };
        let file = writer.into_inner().map_err(io::IntoInnerError::into_error)?;
        file.sync_data()
    }
}

/// File being written from `append` records.
pub(super) struct ReceiveTarget {
    sink: Sink,
    guard: TempFileGuard,
    md5: Md5,
    written: u64,
}

/// A closed receive target.
#[derive(Debug)]
pub(super) struct Received {
    path: PathBuf,
    written: u64,
    md5: String,
}

impl ReceiveTarget {
    /// Creates `path`, compressing at `level` when one is given.
    fn create(path: &Path, level: Option<u32>) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = BufWriter::new(File::create(path)?);
        let sink = match level {
            Some(level) => Sink::Gzip(GzEncoder::new(file, Compression::new(level.min(9)))),
            None => Sink::Plain(file),
        };
        Ok(Self {
            sink,
            guard: TempFileGuard::new(path.to_path_buf()),
            md5: Md5::new(),
            written: 0,
        })
    }

    fn path(&self) -> &Path {
        self.guard.path()
    }

    fn write(&mut self, data: &[u8]) -> io::Result<()> {
        match &mut self.sink {
            Sink::Plain(writer) => writer.write_all(data)?,
            Sink::Gzip(encoder) => encoder.write_all(data)?,
        }
        self.md5.update(data);
        self.written += data.len() as u64;
        Ok(())
    }

    fn finish(self) -> io::Result<Received> {
        let Self {
            mut guard,
            sink,
            md5,
            written,
            ..
        } = self;
        sink.finish()?;
        guard.keep();
        Ok(Received {
            path: guard.path().to_path_buf(),
            written,
            md5: to_hex(&md5.finalize()),
        })
    }
}

impl<T: Transport, C: AttribCodec> Phase2<T, C> {
    /// Services the transport and handles at most one inbound record.
    pub(super) fn receive(&mut self) -> Result<Progress, Phase2Error> {
        self.transport.service()?;
        let Some(record) = self.transport.read()? else {
            return Ok(Progress::Continue);
        };
        match record.command() {
            Command::Warning => {
                tracing::warn!(target: "backup::receiver", "client warning: {}", record.text());
                self.stats.warnings += 1;
                return Ok(Progress::Continue);
            }
            Command::Message => {
                tracing::info!(target: "backup::receiver", "client message: {}", record.text());
                self.stats.warnings += 1;
                return Ok(Progress::Continue);
            }
            _ => {}
        }
        if self.target.is_some() {
            self.receive_data(record)?;
            return Ok(Progress::Continue);
        }
        self.receive_announcement(record)
    }

    fn receive_announcement(&mut self, record: Record) -> Result<Progress, Phase2Error> {
        match record.command() {
            Command::DataPath => self.receiving.datapath = Some(record),
            Command::Attribs => {
                self.receiving.attr = Some(record);
                decode_attribs(&self.codec, &mut self.receiving)?;
            }
            Command::Gen if record.payload() == PHASE_END_ACK.as_bytes() => {
                logging::trace_recv!("client acknowledged end of phase 2");
                return Ok(Progress::Finished);
            }
            Command::Interrupt => self.interrupted(record.payload()),
            Command::Error => {
                return Err(Phase2Error::protocol(format!(
                    "client reported error: {}",
                    record.text()
                )));
            }
            kind if kind.is_filedata() || kind.is_vssdata() => self.start_receive(record)?,
            kind => {
                return Err(Phase2Error::protocol(format!(
                    "unexpected '{kind}' record ({}) while idle",
                    record.text()
                )));
            }
        }
        Ok(Progress::Continue)
    }

    fn interrupted(&mut self, path: &[u8]) {
        logging::trace_recv!(path = %String::from_utf8_lossy(path), "interrupted by client");
        if self.last_requested.as_deref() == Some(path) {
            self.last_requested = None;
        }
        self.settle(path);
    }

    /// Drops the outstanding request for `path`.
    fn settle(&mut self, path: &[u8]) {
        if let Some(position) = self.outstanding.iter().position(|o| o.path == path) {
            self.outstanding.remove(position);
        }
    }

    fn start_receive(&mut self, path: Record) -> Result<(), Phase2Error> {
        if self.receiving.attr.is_none() {
            return Err(Phase2Error::protocol(format!(
                "path {} arrived without attributes",
                path.text()
            )));
        }
        let kind = path.command();
        self.receiving.path = Some(path);
        let target = if self.receiving.datapath.is_some() {
            let level = u32::try_from(self.receiving.compression)
                .ok()
                .filter(|level| *level > 0);
            let tmp = self.dirs.delta_tmp.clone();
            self.receiving.flags.insert(RecordFlags::RECV_DELTA);
            ReceiveTarget::create(&tmp, level).map_err(|err| Phase2Error::io(tmp, err))?
        } else {
            let datapath = self.allocator.make(self.receiving.compression, kind);
            let dest = self.dirs.data_tmp.join(&datapath);
            let target =
                ReceiveTarget::create(&dest, None).map_err(|err| Phase2Error::io(dest, err))?;
            self.receiving.datapath = Some(Record::with_text(Command::DataPath, &datapath));
            self.allocator.advance();
            target
        };
        logging::trace_recv!(
            path = %self.receiving.display_path(),
            datapath = %String::from_utf8_lossy(self.receiving.datapath_bytes()),
            flags = ?self.receiving.flags,
            "receiving"
        );
        self.target = Some(target);
        Ok(())
    }

    fn receive_data(&mut self, record: Record) -> Result<(), Phase2Error> {
        match record.command() {
            Command::Append => {
                let Some(target) = self.target.as_mut() else {
                    return Ok(());
                };
                if let Err(err) = target.write(record.payload()) {
                    let path = target.path().to_path_buf();
                    self.report_error("write failed");
                    return Err(Phase2Error::io(path, err));
                }
                logging::trace_io!(bytes = record.len(), "appended");
                Ok(())
            }
            Command::EndFile => self.finish_receive(record),
            kind => Err(Phase2Error::protocol(format!(
                "unexpected '{kind}' record while receiving {}",
                self.receiving.display_path()
            ))),
        }
    }

    fn finish_receive(&mut self, endfile: Record) -> Result<(), Phase2Error> {
        let Some(target) = self.target.take() else {
            return Ok(());
        };
        let delta = self.receiving.flags.contains(RecordFlags::RECV_DELTA);
        let tmp = target.path().to_path_buf();
        let received = target.finish().map_err(|err| Phase2Error::io(&tmp, err))?;
        self.receiving.endfile = Some(endfile);
        let summary = self.receiving.end_file()?;

        if delta {
            let datapath = String::from_utf8_lossy(self.receiving.datapath_bytes()).into_owned();
            let dest = self.dirs.forward_delta(&datapath);
            if let Some(parent) = dest.parent() {
                fs::create_dir_all(parent).map_err(|err| Phase2Error::io(parent, err))?;
            }
            fs::rename(&received.path, &dest).map_err(|err| Phase2Error::io(&dest, err))?;
            self.stats.changed += 1;
        } else {
            if self.receiving.compression <= 0 {
                self.verify(&received, summary.as_ref().and_then(|s| s.md5.as_deref()));
            }
            self.committed_index = self.allocator.index();
            self.stats.new += 1;
        }

        encode_attribs(&self.codec, &mut self.receiving)?;
        if let Some(writer) = self.changed.as_mut() {
            writer.write(&self.receiving)?;
        }
        self.stats.bytes += summary.map_or(0, |s| s.bytes);
        self.stats.received += received.written;
        logging::trace_recv!(
            path = %self.receiving.display_path(),
            bytes = received.written,
            delta,
            "received"
        );

        let path = self.receiving.path_bytes().to_vec();
        if self.last_requested.as_deref() == Some(path.as_slice()) {
            self.last_requested = None;
        }
        self.settle(&path);
        self.receiving.reset();
        Ok(())
    }

    /// Compares the client's checksum with what was written.
    fn verify(&mut self, received: &Received, expected: Option<&str>) {
        let Some(expected) = expected else { return };
        if expected != received.md5 {
            tracing::warn!(
                target: "backup::receiver",
                path = %self.receiving.display_path(),
                expected,
                actual = %received.md5,
                "checksum mismatch"
            );
            self.stats.warnings += 1;
        }
    }
}
