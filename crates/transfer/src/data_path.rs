//! crates/transfer/src/data_path.rs
//!
//! Storage names for received file data.
//!
//! New files are stored under a three-level hexadecimal tree,
//! `PPPP/SSSS/TTTT`, with a `.gz` suffix when the client compresses the
//! data. The orchestrator only asks for a name and advances the counter; it
//! never interprets the result.

use std::fs;
use std::io;
use std::path::Path;

use protocol::Command;

/// Source of storage names for new files.
pub trait StoragePathAllocator {
    /// Name for the next file of `kind` stored at `compression`.
    fn make(&self, compression: i32, kind: Command) -> String;

    /// Moves on to the next name.
    fn advance(&mut self);

    /// Position of the next name, for resume.
    fn index(&self) -> u64;

    /// Restores a position returned by [`index`](Self::index).
    fn set_index(&mut self, index: u64);
}

/// Default allocator walking `PPPP/SSSS/TTTT` in order.
///
/// ```
/// use protocol::Command;
/// use transfer::{SequentialAllocator, StoragePathAllocator};
///
/// let mut alloc = SequentialAllocator::new(3);
/// alloc.set_index(4);
/// assert_eq!(alloc.make(0, Command::File), "0000/0001/0001");
/// assert_eq!(alloc.make(9, Command::File), "0000/0001/0001.gz");
/// alloc.advance();
/// assert_eq!(alloc.index(), 5);
/// ```
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SequentialAllocator {
    max: u32,
    prim: u32,
    seco: u32,
    tert: u32,
}

impl SequentialAllocator {
    /// Allocator starting at `0000/0000/0000`.
    pub fn new(max_storage_subdirs: u32) -> Self {
        Self {
            max: max_storage_subdirs.max(1),
            prim: 0,
            seco: 0,
            tert: 0,
        }
    }

    /// Allocator continuing after the highest name stored under `root`.
    ///
    /// A missing `root` starts from the beginning.
    pub fn scan(root: &Path, max_storage_subdirs: u32) -> io::Result<Self> {
        let mut alloc = Self::new(max_storage_subdirs);
        let Some(prim) = highest_component(root)? else {
            return Ok(alloc);
        };
        let prim_dir = root.join(format!("{prim:04X}"));
        let seco = highest_component(&prim_dir)?.unwrap_or(0);
        let seco_dir = prim_dir.join(format!("{seco:04X}"));
        let tert = highest_component(&seco_dir)?;
        alloc.prim = prim;
        alloc.seco = seco;
        alloc.tert = tert.unwrap_or(0);
        if tert.is_some() {
            alloc.advance();
        }
        logging::trace_phase2!(next = %alloc.make(0, Command::File), "storage names resume");
        Ok(alloc)
    }
}

impl StoragePathAllocator for SequentialAllocator {
    fn make(&self, compression: i32, kind: Command) -> String {
        let suffix = if compression > 0 && kind != Command::EfsFile {
            ".gz"
        } else {
            ""
        };
        format!(
            "{:04X}/{:04X}/{:04X}{suffix}",
            self.prim, self.seco, self.tert
        )
    }

    fn advance(&mut self) {
        self.tert += 1;
        if self.tert >= self.max {
            self.tert = 0;
            self.seco += 1;
            if self.seco >= self.max {
                self.seco = 0;
                self.prim += 1;
            }
        }
    }

    fn index(&self) -> u64 {
        let max = u64::from(self.max);
        (u64::from(self.prim) * max + u64::from(self.seco)) * max + u64::from(self.tert)
    }

    fn set_index(&mut self, index: u64) {
        let max = u64::from(self.max);
        self.tert = (index % max) as u32;
        self.seco = (index / max % max) as u32;
        self.prim = (index / max / max) as u32;
    }
}

/// Largest four-digit hex name in `dir`, ignoring a `.gz` suffix.
fn highest_component(dir: &Path) -> io::Result<Option<u32>> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(err),
    };
    let mut highest = None;
    for entry in entries {
        let name = entry?.file_name();
        let Some(name) = name.to_str() else { continue };
        let stem = name.strip_suffix(".gz").unwrap_or(name);
        if stem.len() != 4 {
            continue;
        }
        if let Ok(value) = u32::from_str_radix(stem, 16) {
            highest = highest.max(Some(value));
        }
    }
    Ok(highest)
}

/// Whether stored data at `datapath` is gzip-compressed.
///
/// A positive `compression` level says yes, zero says no, and an unset
/// (negative) level defers to the `.gz` suffix.
pub fn is_compressed(compression: i32, datapath: &str) -> bool {
    match compression {
        c if c > 0 => true,
        0 => false,
        _ => datapath.ends_with(".gz"),
    }
}
