//! crates/transfer/src/error.rs
//!
//! Phase-2 failure taxonomy.
//!
//! Every variant ends the phase. Manifest logs stay exactly as far as they
//! were flushed so a later run can resume from them.

use std::io;
use std::path::PathBuf;

use blockcache::CacheError;
use manifest::ManifestError;
use protocol::{FramingError, TransportError};
use signature::SignatureError;
use thiserror::Error;

/// Error ending a phase-2 run.
#[derive(Debug, Error)]
pub enum Phase2Error {
    /// A record could not be unframed.
    #[error("malformed record from {origin}: {source}")]
    Framing {
        /// Stream the record came from.
        origin: String,
        /// Underlying error.
        #[source]
        source: FramingError,
    },
    /// Reading, writing or renaming a manifest or data file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// File involved.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: io::Error,
    },
    /// The client sent something that makes no sense in the current state.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// The signature job failed.
    #[error("delta engine failed: {0}")]
    DeltaEngine(#[source] SignatureError),
    /// An allocation failed.
    #[error("out of memory: {0}")]
    OutOfMemory(String),
}

impl Phase2Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Returns `true` for failures worth reporting to the client before
    /// giving up.
    pub fn is_out_of_memory(&self) -> bool {
        matches!(self, Self::OutOfMemory(_))
    }
}

impl From<ManifestError> for Phase2Error {
    fn from(err: ManifestError) -> Self {
        match err {
            ManifestError::Io { path, source } => Self::Io { path, source },
            ManifestError::Framing { path, source } => Self::Framing {
                origin: path.display().to_string(),
                source,
            },
            other => Self::Protocol(other.to_string()),
        }
    }
}

impl From<TransportError> for Phase2Error {
    fn from(err: TransportError) -> Self {
        match err {
            TransportError::Framing(source) => Self::Framing {
                origin: "client".to_owned(),
                source,
            },
            TransportError::Io(source) => Self::Io {
                path: PathBuf::from("<client>"),
                source,
            },
            TransportError::Closed => Self::Protocol("client closed the connection".to_owned()),
        }
    }
}

impl From<SignatureError> for Phase2Error {
    fn from(err: SignatureError) -> Self {
        match err {
            SignatureError::OutOfMemory(len) => {
                Self::OutOfMemory(format!("signature block of {len} bytes"))
            }
            other => Self::DeltaEngine(other),
        }
    }
}

impl From<CacheError> for Phase2Error {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::Io { path, source } => Self::Io { path, source },
            CacheError::Framing { path, source } => Self::Framing {
                origin: path.display().to_string(),
                source,
            },
            other => Self::Io {
                path: PathBuf::from("<block data>"),
                source: other.into(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manifest_io_keeps_the_path() {
        let err: Phase2Error = ManifestError::Io {
            path: PathBuf::from("/w/changed"),
            source: io::Error::other("disk full"),
        }
        .into();
        assert_eq!(err.to_string(), "I/O error on /w/changed: disk full");
    }

    #[test]
    fn closed_transport_is_a_protocol_error() {
        let err: Phase2Error = TransportError::Closed.into();
        assert!(matches!(err, Phase2Error::Protocol(_)));
    }

    #[test]
    fn signature_allocation_failure_is_out_of_memory() {
        let err: Phase2Error = SignatureError::OutOfMemory(1 << 24).into();
        assert!(err.is_out_of_memory());
        let err: Phase2Error = SignatureError::NotStarted.into();
        assert!(matches!(err, Phase2Error::DeltaEngine(_)));
    }

    #[test]
    fn cache_failures_map_to_io() {
        let err: Phase2Error = CacheError::SavePath("bogus".into()).into();
        assert!(matches!(err, Phase2Error::Io { .. }));
    }
}
