//! crates/transfer/src/temp_guard.rs
//!
//! RAII cleanup of partially received files.
//!
//! A receive target is created before the first data chunk arrives. If the
//! phase fails before the end-of-file record, the guard removes the partial
//! file so that neither `data.tmp` nor the delta scratch file is mistaken for
//! finished data.

use std::path::{Path, PathBuf};

/// Removes its file on drop unless [`keep`](TempFileGuard::keep) was called.
#[derive(Debug)]
pub(crate) struct TempFileGuard {
    path: PathBuf,
    keep_on_drop: bool,
}

impl TempFileGuard {
    #[inline]
    pub(crate) const fn new(path: PathBuf) -> Self {
        Self {
            path,
            keep_on_drop: false,
        }
    }

    /// Marks the file as finished.
    #[inline]
    pub(crate) const fn keep(&mut self) {
        self.keep_on_drop = true;
    }

    #[inline]
    pub(crate) fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempFileGuard {
    fn drop(&mut self) {
        if !self.keep_on_drop {
            // The file may never have been created.
            let _ = std::fs::remove_file(&self.path);
        }
    }
}
