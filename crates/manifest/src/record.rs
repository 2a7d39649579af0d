//! crates/manifest/src/record.rs
//!
//! The file record: everything known about one filesystem entry while it
//! moves through phase 2.

use protocol::{Command, Record};

use crate::attribs::Stat;
use crate::block::BlockRef;
use crate::endfile::EndFile;
use crate::error::ManifestError;
use crate::flags::RecordFlags;

/// Compression level meaning "not set".
pub const COMPRESSION_UNSET: i32 = -1;

/// One filesystem entry as read from, or written to, a manifest.
///
/// The sub-records are owned `Option<Record>`s; moving one into another
/// record is done with [`Option::take`], leaving the source empty. A record
/// without a `path` is empty and is never written to a manifest.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRecord {
    /// Path record; its command is the entry kind.
    pub path: Option<Record>,
    /// Encoded attributes.
    pub attr: Option<Record>,
    /// Link target, only for link kinds.
    pub link: Option<Record>,
    /// Where the entry's data is stored on the server.
    pub datapath: Option<Record>,
    /// End-of-file summary (`<bytes>:<md5-hex>`).
    pub endfile: Option<Record>,
    /// Decoded stat fields.
    pub stat: Stat,
    /// Position of the record in the client's scan.
    pub index: u64,
    /// Requested compression level, [`COMPRESSION_UNSET`] if unknown.
    pub compression: i32,
    /// Windows attribute bits.
    pub winattr: u64,
    /// Transient protocol flags.
    pub flags: RecordFlags,
    /// Stored block references.
    pub blocks: Vec<BlockRef>,
}

impl Default for FileRecord {
    fn default() -> Self {
        Self {
            path: None,
            attr: None,
            link: None,
            datapath: None,
            endfile: None,
            stat: Stat::default(),
            index: 0,
            compression: COMPRESSION_UNSET,
            winattr: 0,
            flags: RecordFlags::empty(),
            blocks: Vec::new(),
        }
    }
}

impl FileRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a record holding only a path.
    pub fn with_path(kind: Command, path: &str) -> Self {
        Self {
            path: Some(Record::with_text(kind, path)),
            ..Self::default()
        }
    }

    /// Returns `true` when no path has been captured.
    pub fn is_empty(&self) -> bool {
        self.path.is_none()
    }

    /// Entry kind, taken from the path record.
    pub fn kind(&self) -> Option<Command> {
        self.path.as_ref().map(Record::command)
    }

    /// Raw path bytes, empty when there is no path.
    pub fn path_bytes(&self) -> &[u8] {
        self.path.as_ref().map_or(&[], Record::payload)
    }

    /// Path rendered for logs.
    pub fn display_path(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(self.path_bytes())
    }

    /// Raw data-path bytes, empty when unassigned.
    pub fn datapath_bytes(&self) -> &[u8] {
        self.datapath.as_ref().map_or(&[], Record::payload)
    }

    /// Link kind.
    pub fn is_link(&self) -> bool {
        self.kind().is_some_and(Command::is_link)
    }

    /// Entry whose content travels as file data.
    pub fn is_filedata(&self) -> bool {
        self.kind().is_some_and(Command::is_filedata)
    }

    /// Windows backup-stream entry.
    pub fn is_vssdata(&self) -> bool {
        self.kind().is_some_and(Command::is_vssdata)
    }

    /// Client-encrypted entry.
    pub fn is_encrypted(&self) -> bool {
        self.kind().is_some_and(Command::is_encrypted)
    }

    /// Metadata blob entry.
    pub fn is_metadata(&self) -> bool {
        self.kind().is_some_and(Command::is_metadata)
    }

    /// Parsed end-of-file summary, if present.
    pub fn end_file(&self) -> Result<Option<EndFile>, ManifestError> {
        self.endfile
            .as_ref()
            .map(|record| EndFile::parse(record.payload()))
            .transpose()
    }

    /// Byte count from the end-of-file summary, zero if absent or unreadable.
    pub fn endfile_bytes(&self) -> u64 {
        self.end_file().ok().flatten().map_or(0, |end| end.bytes)
    }

    /// Drops all content, returning the slot to its empty state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Moves the content out, leaving this slot empty.
    pub fn take(&mut self) -> Self {
        std::mem::take(self)
    }
}
