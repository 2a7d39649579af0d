//! crates/blockcache/src/reader.rs
//! Sequential reads over stored blocks.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::io::{self, Read};
use std::rc::Rc;

use bytes::{Buf, Bytes};

use crate::cache::BlockCache;

/// Presents a list of stored blocks as one contiguous byte stream.
///
/// Save paths are resolved through the shared cache one at a time as the
/// stream is read, so at most one block is held outside the cache. A save
/// path that cannot be resolved surfaces as an [`io::Error`] from `read`.
#[derive(Debug)]
pub struct StoredBlocksReader {
    cache: Rc<RefCell<BlockCache>>,
    pending: VecDeque<String>,
    current: Bytes,
}

impl StoredBlocksReader {
    /// Reader over `save_paths`, in order.
    pub fn new<I, S>(cache: Rc<RefCell<BlockCache>>, save_paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            cache,
            pending: save_paths.into_iter().map(Into::into).collect(),
            current: Bytes::new(),
        }
    }

    /// Blocks not yet resolved.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

impl Read for StoredBlocksReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        while self.current.is_empty() {
            let Some(save_path) = self.pending.pop_front() else {
                return Ok(0);
            };
            self.current = self.cache.borrow_mut().retrieve(&save_path)?;
        }
        let n = self.current.len().min(buf.len());
        buf[..n].copy_from_slice(&self.current[..n]);
        self.current.advance(n);
        Ok(n)
    }
}
