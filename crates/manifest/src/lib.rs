#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! File records and the append-only manifest logs that store them.
//!
//! A [`FileRecord`] groups the framed records describing one filesystem
//! entry: its attributes, its path (whose command is the entry kind), an
//! optional link target, and the storage bookkeeping added by the server
//! (data path, end-of-file summary, block references).
//!
//! Manifests are flat streams of framed records, each followed by a newline.
//! [`ManifestWriter`] appends records; [`ManifestReader`] reassembles them,
//! accepting plain or gzip-compressed input and exposing a resumable
//! [`ManifestOffset`].
//!
//! Entries in a manifest are sorted with [`record_cmp`], which the phase-2
//! merge relies on.
//!
//! # Examples
//!
//! ```
//! use manifest::{AttribCodec, FileRecord, ManifestReader, ManifestWriter, StatAttribs};
//! use protocol::Command;
//!
//! let dir = tempfile::tempdir().unwrap();
//! let path = dir.path().join("manifest");
//!
//! let mut record = FileRecord::with_path(Command::File, "/etc/hosts");
//! record.stat.size = 220;
//! StatAttribs.encode(&mut record).unwrap();
//!
//! let mut writer = ManifestWriter::create(&path).unwrap();
//! writer.write(&record).unwrap();
//! writer.close().unwrap();
//!
//! let mut reader = ManifestReader::open(&path).unwrap();
//! let mut back = reader.read().unwrap().unwrap();
//! StatAttribs.decode(&mut back).unwrap();
//! assert_eq!(back.stat.size, 220);
//! assert!(reader.read().unwrap().is_none());
//! ```

mod attribs;
mod block;
mod endfile;
mod error;
mod flags;
mod path;
mod reader;
mod record;
mod writer;

pub use attribs::{ATTRIB_FIELDS, AttribCodec, AttribError, Stat, StatAttribs};
pub use block::BlockRef;
pub use endfile::{EndFile, SIG_END};
pub use error::ManifestError;
pub use flags::RecordFlags;
pub use path::{pathcmp, record_cmp};
pub use reader::{END_MARKERS, ManifestOffset, ManifestReader};
pub use record::{COMPRESSION_UNSET, FileRecord};
pub use writer::ManifestWriter;
