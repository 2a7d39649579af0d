//! Slot replacement across more data files than the cache holds.

use std::cell::RefCell;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use blockcache::{BlockCache, SLOT_COUNT, StoredBlocksReader};
use protocol::{Command, Framing, Record, write_record};

fn write_data_file(root: &Path, index: usize) -> PathBuf {
    let dir = root.join("0000/0000");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join(format!("{index:04X}"));
    let mut out = Vec::new();
    for block in 0..3 {
        let payload = format!("file{index}-block{block}");
        write_record(&mut out, &Record::with_text(Command::Data, &payload), Framing::Wire).unwrap();
    }
    std::fs::write(&path, out).unwrap();
    path
}

fn fixture(count: usize) -> (tempfile::TempDir, Vec<PathBuf>) {
    let dir = tempfile::tempdir().unwrap();
    let files = (0..count).map(|i| write_data_file(dir.path(), i)).collect();
    (dir, files)
}

#[test]
fn eleventh_file_replaces_the_slot_after_the_last_swap() {
    let (dir, files) = fixture(SLOT_COUNT + 1);
    let mut cache = BlockCache::new(dir.path());
    for file in &files[..SLOT_COUNT] {
        cache.block(file, 0).unwrap();
    }
    assert_eq!(cache.loads(), SLOT_COUNT as u64);

    // Touch the first file again; a recency-based policy would now keep it.
    cache.block(&files[0], 1).unwrap();
    assert_eq!(cache.loads(), SLOT_COUNT as u64);

    cache.block(&files[SLOT_COUNT], 0).unwrap();
    assert!(!cache.is_resident(&files[0]));
    for file in &files[1..] {
        assert!(cache.is_resident(file));
    }

    // The next miss replaces the slot after that one.
    let extra = write_data_file(dir.path(), SLOT_COUNT + 1);
    cache.block(&extra, 0).unwrap();
    assert!(!cache.is_resident(&files[1]));
    assert!(cache.is_resident(&files[2]));
}

#[test]
fn resident_file_is_not_reloaded() {
    let (dir, files) = fixture(3);
    let mut cache = BlockCache::new(dir.path());
    let first = cache.block(&files[1], 2).unwrap();
    cache.block(&files[0], 0).unwrap();
    cache.block(&files[2], 0).unwrap();
    let again = cache.block(&files[1], 2).unwrap();
    assert_eq!(first, again);
    assert_eq!(&again[..], b"file1-block2");
    assert_eq!(cache.loads(), 3);
}

#[test]
fn save_paths_resolve_through_the_root() {
    let (dir, _files) = fixture(2);
    let cache = Rc::new(RefCell::new(BlockCache::new(dir.path())));
    let mut reader = StoredBlocksReader::new(
        Rc::clone(&cache),
        ["0000/0000/0001/0000", "0000/0000/0000/0002", "0000/0000/0001/0001"],
    );
    let mut out = String::new();
    reader.read_to_string(&mut out).unwrap();
    assert_eq!(out, "file1-block0file0-block2file1-block1");
    assert_eq!(cache.borrow().loads(), 2);
}

#[test]
fn re_lookup_of_an_early_file_reuses_its_slot() {
    let (dir, files) = fixture(3);
    let mut cache = BlockCache::new(dir.path());
    for file in &files {
        cache.block(file, 0).unwrap();
    }
    cache.block(&files[0], 1).unwrap();
    assert_eq!(cache.loads(), 3);
    for file in &files {
        assert!(cache.is_resident(file));
    }
}

#[test]
fn missing_data_file_is_an_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut cache = BlockCache::new(dir.path());
    let err = cache.retrieve("0000/0000/0000/0000").unwrap_err();
    assert!(matches!(err, blockcache::CacheError::Io { .. }));
}
