#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Bounded cache over stored block data files.
//!
//! Deduplicated file contents live in data files: flat sequences of
//! wire-framed data records, one per block. A signature record in a manifest
//! names a block by `<data-file>/<index-hex>`. [`BlockCache`] keeps the
//! decoded blocks of the [`SLOT_COUNT`] most recently loaded data files in
//! memory so that consecutive references into the same file cost one read.
//!
//! Slots are replaced round-robin, starting after the slot that was loaded
//! last, rather than by access recency. A lookup starts scanning at the slot
//! that answered the previous lookup, so repeated references into the same
//! data file are found immediately.
//!
//! [`StoredBlocksReader`] strings blocks together into a [`std::io::Read`]
//! stream, resolving each one through a shared cache as it is reached. That
//! is how a file reconstructed from blocks is fed to the signature engine.
//!
//! # Examples
//!
//! ```
//! use blockcache::BlockCache;
//! use protocol::{Command, Framing, Record, write_record};
//!
//! let dir = tempfile::tempdir().unwrap();
//! std::fs::create_dir_all(dir.path().join("0000/0000")).unwrap();
//! let mut data = Vec::new();
//! write_record(&mut data, &Record::new(Command::Data, b"hello".to_vec()), Framing::Wire).unwrap();
//! write_record(&mut data, &Record::new(Command::Data, b"world".to_vec()), Framing::Wire).unwrap();
//! std::fs::write(dir.path().join("0000/0000/0000"), data).unwrap();
//!
//! let mut cache = BlockCache::new(dir.path());
//! assert_eq!(&cache.retrieve("0000/0000/0000/0001").unwrap()[..], b"world");
//! ```

mod cache;
mod error;
mod reader;

pub use cache::{BlockCache, DATA_FILE_BLOCK_MAX, SLOT_COUNT};
pub use error::CacheError;
pub use reader::StoredBlocksReader;
