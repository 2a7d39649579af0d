//! crates/manifest/src/reader.rs
//!
//! Sequential manifest reader.
//!
//! A file record is reassembled from consecutive framed records:
//!
//! ```text
//! [t datapath] r attribs  <kind> path  [<link-kind> target]  [x endfile] [S sig]*
//! ```
//!
//! The trailing end-of-file and signature records belong to the entry before
//! them, so the reader looks one record ahead. [`ManifestReader::tell`]
//! accounts for that lookahead and always reports the offset where the next
//! unread entry starts.

use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use flate2::bufread::MultiGzDecoder;
use protocol::{Command, Framing, HEADER_LEN, Record, read_record};

use crate::block::BlockRef;
use crate::error::ManifestError;
use crate::flags::RecordFlags;
use crate::record::FileRecord;

/// Generic control payloads that terminate a manifest stream.
pub const END_MARKERS: [&str; 4] = ["phase1end", "backupphase2", "backupphase2end", "restore_end"];

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Opaque position in the decompressed record stream of a manifest.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Ord, PartialOrd, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ManifestOffset(u64);

impl ManifestOffset {
    /// Start of the manifest.
    pub const START: Self = Self(0);

    /// Wraps a raw byte offset.
    pub const fn new(offset: u64) -> Self {
        Self(offset)
    }

    /// Raw byte offset.
    pub const fn get(self) -> u64 {
        self.0
    }
}

enum Source {
    Plain(BufReader<File>),
    Gzip(Box<MultiGzDecoder<BufReader<File>>>),
    Memory(Cursor<Vec<u8>>),
}

impl Read for Source {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Self::Plain(reader) => reader.read(buf),
            Self::Gzip(reader) => reader.read(buf),
            Self::Memory(reader) => reader.read(buf),
        }
    }
}

/// Reads file records from a plain or gzip-compressed manifest.
pub struct ManifestReader {
    path: PathBuf,
    source: Source,
    consumed: u64,
    lookahead: Option<(Record, u64)>,
    finished: bool,
}

impl ManifestReader {
    /// Opens the manifest at `path`, detecting gzip compression.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        let path = path.as_ref().to_path_buf();
        let source = Self::open_source(&path)?;
        logging::trace_manifest!(
            path = %path.display(),
            compressed = matches!(source, Source::Gzip(_)),
            "opened manifest for reading"
        );
        Ok(Self {
            path,
            source,
            consumed: 0,
            lookahead: None,
            finished: false,
        })
    }

    /// Reads an uncompressed manifest held in memory.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            path: PathBuf::from("<memory>"),
            source: Source::Memory(Cursor::new(bytes)),
            consumed: 0,
            lookahead: None,
            finished: false,
        }
    }

    fn open_source(path: &Path) -> Result<Source, ManifestError> {
        let file = File::open(path).map_err(|err| ManifestError::io(path, err))?;
        let mut reader = BufReader::new(file);
        let head = reader.fill_buf().map_err(|err| ManifestError::io(path, err))?;
        if head.starts_with(&GZIP_MAGIC) {
            Ok(Source::Gzip(Box::new(MultiGzDecoder::new(reader))))
        } else {
            Ok(Source::Plain(reader))
        }
    }

    /// Location the manifest was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` when the manifest is gzip-compressed.
    pub fn is_compressed(&self) -> bool {
        matches!(self.source, Source::Gzip(_))
    }

    /// Offset of the next unread entry.
    pub fn tell(&self) -> ManifestOffset {
        let pending = self.lookahead.as_ref().map_or(0, |(_, len)| *len);
        ManifestOffset(self.consumed - pending)
    }

    /// Repositions the reader at `offset`, which must come from
    /// [`tell`](Self::tell) on the same manifest.
    pub fn seek(&mut self, offset: ManifestOffset) -> Result<(), ManifestError> {
        let target = offset.get();
        if self.is_compressed() {
            // Compressed streams cannot seek; decompress from the start.
            let mut source = Self::open_source(&self.path)?;
            let skipped = io::copy(&mut (&mut source).take(target), &mut io::sink())
                .map_err(|err| ManifestError::io(&self.path, err))?;
            if skipped < target {
                return Err(self.truncated());
            }
            self.source = source;
        } else if let Source::Plain(reader) = &mut self.source {
            reader
                .seek(SeekFrom::Start(target))
                .map_err(|err| ManifestError::io(&self.path, err))?;
        } else if let Source::Memory(cursor) = &mut self.source {
            cursor.set_position(target);
        }
        self.consumed = target;
        self.lookahead = None;
        self.finished = false;
        logging::trace_manifest!(path = %self.path.display(), offset = target, "seek");
        Ok(())
    }

    /// Reads the next file record.
    ///
    /// Returns `Ok(None)` at the end of the stream or at an end marker.
    pub fn read(&mut self) -> Result<Option<FileRecord>, ManifestError> {
        if self.finished {
            return Ok(None);
        }
        let mut record = FileRecord::new();
        loop {
            let Some((raw, _)) = self.next_raw()? else {
                if record.attr.is_some() || record.datapath.is_some() {
                    return Err(self.truncated());
                }
                self.finished = true;
                return Ok(None);
            };

            match raw.command() {
                Command::DataPath => record.datapath = Some(raw),
                Command::Attribs => {
                    record.attr = Some(raw);
                    record.path = None;
                    record.link = None;
                    record.flags.remove(RecordFlags::NEED_LINK);
                }
                Command::Warning => {
                    tracing::warn!(
                        target: "backup::manifest",
                        path = %self.path.display(),
                        "manifest warning: {}",
                        raw.text()
                    );
                }
                Command::Gen if END_MARKERS.iter().any(|m| raw.payload() == m.as_bytes()) => {
                    if record.attr.is_some() || record.datapath.is_some() {
                        return Err(self.truncated());
                    }
                    logging::trace_manifest!(marker = %raw.text(), "end marker");
                    self.finished = true;
                    return Ok(None);
                }
                Command::Error => {
                    return Err(ManifestError::ErrorRecord {
                        path: self.path.clone(),
                        message: raw.text().into_owned(),
                    });
                }
                Command::Manifest | Command::Fingerprint => {
                    record.path = Some(raw);
                    return Ok(Some(record));
                }
                kind if kind.is_path() => {
                    if record.flags.contains(RecordFlags::NEED_LINK) {
                        if !kind.is_link() {
                            return Err(ManifestError::LinkTargetExpected {
                                path: self.path.clone(),
                                command: kind,
                            });
                        }
                        record.link = Some(raw);
                        record.flags.remove(RecordFlags::NEED_LINK);
                        self.attach_trailers(&mut record)?;
                        return Ok(Some(record));
                    }
                    if record.attr.is_none() {
                        return Err(ManifestError::MissingAttribs {
                            path: self.path.clone(),
                            entry: raw.text().into_owned(),
                        });
                    }
                    record.path = Some(raw);
                    if kind.is_link() {
                        record.flags.insert(RecordFlags::NEED_LINK);
                        continue;
                    }
                    self.attach_trailers(&mut record)?;
                    return Ok(Some(record));
                }
                command => {
                    return Err(ManifestError::UnexpectedCommand {
                        path: self.path.clone(),
                        command,
                    });
                }
            }
        }
    }

    /// Absorbs the end-of-file and signature records that follow an entry.
    fn attach_trailers(&mut self, record: &mut FileRecord) -> Result<(), ManifestError> {
        while let Some((raw, len)) = self.next_raw()? {
            match raw.command() {
                Command::EndFile => record.endfile = Some(raw),
                Command::Sig => record.blocks.push(BlockRef::parse(raw.payload())?),
                _ => {
                    self.lookahead = Some((raw, len));
                    break;
                }
            }
        }
        Ok(())
    }

    fn next_raw(&mut self) -> Result<Option<(Record, u64)>, ManifestError> {
        if let Some(pending) = self.lookahead.take() {
            return Ok(Some(pending));
        }
        let record = read_record(&mut self.source, Framing::Manifest)
            .map_err(|err| ManifestError::framing(&self.path, err))?;
        Ok(record.map(|record| {
            let len = (HEADER_LEN + record.len() + 1) as u64;
            self.consumed += len;
            (record, len)
        }))
    }

    fn truncated(&self) -> ManifestError {
        ManifestError::Truncated {
            path: self.path.clone(),
        }
    }
}

impl std::fmt::Debug for ManifestReader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManifestReader")
            .field("path", &self.path)
            .field("offset", &self.tell())
            .field("compressed", &self.is_compressed())
            .field("finished", &self.finished)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use protocol::write_record;

    fn manifest(records: &[(Command, &str)]) -> Vec<u8> {
        let mut out = Vec::new();
        for (command, payload) in records {
            write_record(
                &mut out,
                &Record::with_text(*command, payload),
                Framing::Manifest,
            )
            .unwrap();
        }
        out
    }

    #[test]
    fn reads_file_and_link_entries() {
        let bytes = manifest(&[
            (Command::Attribs, "A"),
            (Command::File, "/a"),
            (Command::Attribs, "B"),
            (Command::SoftLink, "/b"),
            (Command::SoftLink, "/target"),
            (Command::Attribs, "C"),
            (Command::Directory, "/c"),
        ]);
        let mut reader = ManifestReader::from_bytes(bytes);

        let file = reader.read().unwrap().unwrap();
        assert_eq!(file.path_bytes(), b"/a");
        assert!(file.link.is_none());

        let link = reader.read().unwrap().unwrap();
        assert_eq!(link.kind(), Some(Command::SoftLink));
        assert_eq!(link.link.as_ref().unwrap().payload(), b"/target");
        assert!(!link.flags.contains(RecordFlags::NEED_LINK));

        let dir = reader.read().unwrap().unwrap();
        assert_eq!(dir.attr.as_ref().unwrap().payload(), b"C");
        assert!(reader.read().unwrap().is_none());
        assert!(reader.read().unwrap().is_none());
    }

    #[test]
    fn trailers_attach_to_the_preceding_entry() {
        let bytes = manifest(&[
            (Command::DataPath, "0000/0000/0001"),
            (Command::Attribs, "A"),
            (Command::File, "/a"),
            (Command::EndFile, "5:"),
            (Command::Sig, "00000001 ab 0000/0000/0000/0000"),
            (Command::Attribs, "B"),
            (Command::File, "/b"),
        ]);
        let mut reader = ManifestReader::from_bytes(bytes);
        let first = reader.read().unwrap().unwrap();
        assert_eq!(first.datapath_bytes(), b"0000/0000/0001");
        assert_eq!(first.endfile_bytes(), 5);
        assert_eq!(first.blocks.len(), 1);
        let second = reader.read().unwrap().unwrap();
        assert_eq!(second.path_bytes(), b"/b");
        assert!(second.blocks.is_empty());
    }

    #[test]
    fn tell_points_at_the_next_entry() {
        let first = manifest(&[(Command::Attribs, "A"), (Command::File, "/a")]);
        let mut bytes = first.clone();
        bytes.extend(manifest(&[(Command::Attribs, "B"), (Command::File, "/b")]));
        let mut reader = ManifestReader::from_bytes(bytes.clone());

        assert_eq!(reader.tell(), ManifestOffset::START);
        reader.read().unwrap().unwrap();
        let offset = reader.tell();
        assert_eq!(offset.get(), first.len() as u64);

        let mut resumed = ManifestReader::from_bytes(bytes);
        resumed.seek(offset).unwrap();
        assert_eq!(resumed.read().unwrap().unwrap().path_bytes(), b"/b");
    }

    #[test]
    fn end_marker_stops_reading() {
        let bytes = manifest(&[
            (Command::Attribs, "A"),
            (Command::File, "/a"),
            (Command::Gen, "phase1end"),
            (Command::Attribs, "B"),
            (Command::File, "/b"),
        ]);
        let mut reader = ManifestReader::from_bytes(bytes);
        assert!(reader.read().unwrap().is_some());
        assert!(reader.read().unwrap().is_none());
        assert!(reader.read().unwrap().is_none());
    }

    #[test]
    fn warnings_are_skipped() {
        let bytes = manifest(&[
            (Command::Warning, "could not open /x"),
            (Command::Attribs, "A"),
            (Command::File, "/a"),
        ]);
        let mut reader = ManifestReader::from_bytes(bytes);
        assert_eq!(reader.read().unwrap().unwrap().path_bytes(), b"/a");
    }

    #[test]
    fn manifest_and_fingerprint_entries_are_path_only() {
        let bytes = manifest(&[(Command::Manifest, "0000/0001"), (Command::Fingerprint, "abc")]);
        let mut reader = ManifestReader::from_bytes(bytes);
        let entry = reader.read().unwrap().unwrap();
        assert_eq!(entry.kind(), Some(Command::Manifest));
        assert!(entry.attr.is_none());
        assert_eq!(
            reader.read().unwrap().unwrap().kind(),
            Some(Command::Fingerprint)
        );
    }

    #[test]
    fn malformed_sequences_are_errors() {
        let mut reader = ManifestReader::from_bytes(manifest(&[(Command::File, "/a")]));
        assert!(matches!(
            reader.read(),
            Err(ManifestError::MissingAttribs { .. })
        ));

        let mut reader = ManifestReader::from_bytes(manifest(&[
            (Command::Attribs, "A"),
            (Command::HardLink, "/a"),
            (Command::File, "/b"),
        ]));
        assert!(matches!(
            reader.read(),
            Err(ManifestError::LinkTargetExpected {
                command: Command::File,
                ..
            })
        ));

        let mut reader = ManifestReader::from_bytes(manifest(&[(Command::Attribs, "A")]));
        assert!(matches!(reader.read(), Err(ManifestError::Truncated { .. })));

        let mut reader = ManifestReader::from_bytes(manifest(&[(Command::Error, "disk full")]));
        match reader.read() {
            Err(ManifestError::ErrorRecord { message, .. }) => assert_eq!(message, "disk full"),
            other => panic!("unexpected result: {other:?}"),
        }

        let mut reader = ManifestReader::from_bytes(manifest(&[(Command::Append, "xx")]));
        assert!(matches!(
            reader.read(),
            Err(ManifestError::UnexpectedCommand {
                command: Command::Append,
                ..
            })
        ));
    }
}
