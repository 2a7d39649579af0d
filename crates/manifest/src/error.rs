//! crates/manifest/src/error.rs
//! Manifest error taxonomy.

use std::io;
use std::path::PathBuf;

use protocol::{Command, FramingError};
use thiserror::Error;

use crate::attribs::AttribError;

/// Failure while reading or writing a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// Opening, reading, writing or syncing the file failed.
    #[error("I/O error on manifest {}: {source}", path.display())]
    Io {
        /// Manifest location.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// A record could not be unframed.
    #[error("malformed record in manifest {}: {source}", path.display())]
    Framing {
        /// Manifest location.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: FramingError,
    },
    /// A record kind that does not belong in a manifest.
    #[error("unexpected '{command}' record in manifest {}", path.display())]
    UnexpectedCommand {
        /// Manifest location.
        path: PathBuf,
        /// Offending command.
        command: Command,
    },
    /// A path record arrived before its attributes.
    #[error("path {entry:?} has no attributes in manifest {}", path.display())]
    MissingAttribs {
        /// Manifest location.
        path: PathBuf,
        /// Path text.
        entry: String,
    },
    /// A link path was not followed by its target.
    #[error("expected link target in manifest {}, got '{command}'", path.display())]
    LinkTargetExpected {
        /// Manifest location.
        path: PathBuf,
        /// Command found instead.
        command: Command,
    },
    /// The stream ended inside a file record.
    #[error("manifest {} ends inside a record", path.display())]
    Truncated {
        /// Manifest location.
        path: PathBuf,
    },
    /// The manifest carries an error record.
    #[error("error recorded in manifest {}: {message}", path.display())]
    ErrorRecord {
        /// Manifest location.
        path: PathBuf,
        /// Error text.
        message: String,
    },
    /// Attribute payload could not be decoded.
    #[error(transparent)]
    Attribs(#[from] AttribError),
    /// Signature record payload could not be parsed.
    #[error("malformed block reference {0:?}")]
    BlockRef(String),
    /// End-of-file payload could not be parsed.
    #[error("malformed end-of-file record {0:?}")]
    EndFile(String),
}

impl ManifestError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn framing(path: impl Into<PathBuf>, source: FramingError) -> Self {
        match source {
            FramingError::Io(source) => Self::io(path, source),
            source => Self::Framing {
                path: path.into(),
                source,
            },
        }
    }
}
