//! crates/blockcache/src/error.rs
//! Block lookup failures.

use std::io;
use std::path::PathBuf;

use protocol::FramingError;
use thiserror::Error;

/// Failure while loading a data file or resolving a block in it.
#[derive(Debug, Error)]
pub enum CacheError {
    /// Opening or reading the data file failed.
    #[error("failed to read data file {}: {source}", path.display())]
    Io {
        /// Data file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// A record header in the data file is malformed.
    #[error("malformed block in data file {}: {source}", path.display())]
    Framing {
        /// Data file.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: FramingError,
    },
    /// The requested block index lies beyond the blocks loaded from the file.
    #[error("block index {index} out of range for data file {} ({loaded} blocks)", path.display())]
    IndexOutOfRange {
        /// Data file.
        path: PathBuf,
        /// Requested index.
        index: usize,
        /// Number of blocks loaded.
        loaded: usize,
    },
    /// A save path has no `<data-file>/<index-hex>` shape.
    #[error("cannot parse save path {0:?}")]
    SavePath(String),
}

impl From<CacheError> for io::Error {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Io { source, .. } => source,
            other => Self::new(io::ErrorKind::InvalidData, other),
        }
    }
}
