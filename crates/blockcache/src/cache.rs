//! crates/blockcache/src/cache.rs
//!
//! Slot table and replacement policy.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use protocol::{Command, Framing, FramingError, read_record};

use crate::error::CacheError;

/// Number of data files held in memory at once.
pub const SLOT_COUNT: usize = 10;

/// Most blocks read from a single data file.
pub const DATA_FILE_BLOCK_MAX: usize = 4096;

#[derive(Debug, Default)]
struct Slot {
    data_file: Option<PathBuf>,
    blocks: Vec<Bytes>,
}

/// Fixed-size cache of decoded data files.
#[derive(Debug)]
pub struct BlockCache {
    root: PathBuf,
    slots: Vec<Slot>,
    current: usize,
    last_swap: usize,
    loads: u64,
}

impl BlockCache {
    /// Creates an empty cache resolving save paths under `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            slots: (0..SLOT_COUNT).map(|_| Slot::default()).collect(),
            current: 0,
            last_swap: 0,
            loads: 0,
        }
    }

    /// Directory save paths are resolved against.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Number of data files read from disk so far.
    pub fn loads(&self) -> u64 {
        self.loads
    }

    /// Returns `true` when `data_file` is held in a slot.
    pub fn is_resident(&self, data_file: &Path) -> bool {
        self.slots
            .iter()
            .any(|slot| slot.data_file.as_deref() == Some(data_file))
    }

    /// Resolves a `<data-file>/<index-hex>` save path to its block.
    pub fn retrieve(&mut self, save_path: &str) -> Result<Bytes, CacheError> {
        let (data_file, index) = save_path
            .rsplit_once('/')
            .filter(|(file, _)| !file.is_empty())
            .ok_or_else(|| CacheError::SavePath(save_path.to_owned()))?;
        let index = usize::from_str_radix(index, 16)
            .map_err(|_| CacheError::SavePath(save_path.to_owned()))?;
        let data_file = self.root.join(data_file);
        self.block(&data_file, index)
    }

    /// Returns block `index` of `data_file`, loading the file if needed.
    pub fn block(&mut self, data_file: &Path, index: usize) -> Result<Bytes, CacheError> {
        let ind = self.lookup(data_file)?;
        let slot = &self.slots[ind];
        slot.blocks
            .get(index)
            .cloned()
            .ok_or_else(|| CacheError::IndexOutOfRange {
                path: data_file.to_path_buf(),
                index,
                loaded: slot.blocks.len(),
            })
    }

    /// Finds or loads the slot for `data_file`.
    ///
    /// Every slot is checked for a match, starting at the slot used last.
    /// On a miss the first empty slot is filled; when every slot is taken by
    /// another file, the one after the last replaced slot is reloaded.
    fn lookup(&mut self, data_file: &Path) -> Result<usize, CacheError> {
        let mut free = None;
        for offset in 0..SLOT_COUNT {
            let ind = (self.current + offset) % SLOT_COUNT;
            match self.slots[ind].data_file.as_deref() {
                Some(resident) if resident == data_file => {
                    self.current = ind;
                    return Ok(ind);
                }
                Some(_) => {}
                None => {
                    free.get_or_insert(ind);
                }
            }
        }
        let victim = free.unwrap_or((self.last_swap + 1) % SLOT_COUNT);
        self.swap_in(victim, data_file)
    }

    fn swap_in(&mut self, ind: usize, data_file: &Path) -> Result<usize, CacheError> {
        let slot = &mut self.slots[ind];
        slot.data_file = None;
        slot.blocks.clear();
        let blocks = load(data_file)?;
        logging::trace_cache!(
            slot = ind,
            blocks = blocks.len(),
            data_file = %data_file.display(),
            "swapped in data file"
        );
        slot.blocks = blocks;
        slot.data_file = Some(data_file.to_path_buf());
        self.last_swap = ind;
        self.current = ind;
        self.loads += 1;
        Ok(ind)
    }
}

/// Reads every block of a data file, up to [`DATA_FILE_BLOCK_MAX`].
///
/// Loading stops at the end of the file, at a partial header or payload, or
/// at the first record that is not block data. Blocks read before the stop
/// are kept.
fn load(path: &Path) -> Result<Vec<Bytes>, CacheError> {
    let file = File::open(path).map_err(|source| CacheError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    let mut blocks = Vec::new();
    while blocks.len() < DATA_FILE_BLOCK_MAX {
        let record = match read_record(&mut reader, Framing::Wire) {
            Ok(Some(record)) => record,
            Ok(None) | Err(FramingError::TruncatedHeader(_) | FramingError::ShortRead { .. }) => {
                break;
            }
            Err(FramingError::Io(source)) => {
                return Err(CacheError::Io {
                    path: path.to_path_buf(),
                    source,
                });
            }
            Err(source) => {
                return Err(CacheError::Framing {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        let (command, payload) = record.into_parts();
        if command != Command::Data {
            logging::trace_cache!(
                %command,
                blocks = blocks.len(),
                data_file = %path.display(),
                "non-data record ends the data file"
            );
            break;
        }
        blocks.push(Bytes::from(payload));
    }
    Ok(blocks)
}
