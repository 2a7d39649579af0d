//! Workspace helpers shared by the phase-2 scenarios.

#![allow(dead_code)]

use std::fs;
use std::path::PathBuf;

use manifest::FileRecord;
use protocol::Command;
use test_support::{ScriptedClient, entry, read_manifest, scratch, stored, write_manifest};
use transfer::{Phase2, Phase2Config, Phase2Stats, StorageDirs};

/// A backup root with the conventional layout.
pub struct Workspace {
    _root: tempfile::TempDir,
    pub dirs: StorageDirs,
}

impl Workspace {
    pub fn new() -> Self {
        let root = scratch();
        let dirs = StorageDirs::under(root.path());
        Self { _root: root, dirs }
    }

    pub fn previous(&self, entries: &[FileRecord]) {
        write_manifest(&self.dirs.previous, entries);
    }

    pub fn phase1(&self, entries: &[FileRecord]) {
        write_manifest(&self.dirs.phase1, entries);
    }

    /// Places stored data of the previous backup.
    pub fn store(&self, datapath: &str, contents: &[u8]) {
        let path = self.dirs.current_data.join(datapath);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    pub fn run(&self, client: ScriptedClient) -> (Phase2Stats, ScriptedClient) {
        self.run_with(client, Phase2Config::default())
    }

    pub fn run_with(
        &self,
        client: ScriptedClient,
        config: Phase2Config,
    ) -> (Phase2Stats, ScriptedClient) {
        let mut phase2 = Phase2::open(client, config, self.dirs.clone(), None).unwrap();
        let stats = phase2.run().unwrap();
        assert!(phase2.is_finished());
        (stats, phase2.into_transport())
    }

    pub fn unchanged(&self) -> Vec<FileRecord> {
        read_manifest(&self.dirs.unchanged)
    }

    pub fn changed(&self) -> Vec<FileRecord> {
        read_manifest(&self.dirs.changed)
    }

    pub fn received_data(&self, datapath: &str) -> Vec<u8> {
        fs::read(self.dirs.data_tmp.join(datapath)).unwrap()
    }

    pub fn forward_delta(&self, datapath: &str) -> PathBuf {
        self.dirs.forward_delta(datapath)
    }
}

pub fn file(path: &str, mtime: i64) -> FileRecord {
    entry(Command::File, path, mtime, mtime)
}

pub fn dir(path: &str, mtime: i64) -> FileRecord {
    entry(Command::Directory, path, mtime, mtime)
}

pub fn stored_file(path: &str, mtime: i64, datapath: &str, contents: &[u8]) -> FileRecord {
    stored(file(path, mtime), datapath, contents)
}

pub fn paths(records: &[FileRecord]) -> Vec<String> {
    records
        .iter()
        .map(|record| record.display_path().into_owned())
        .collect()
}

pub fn datapath(record: &FileRecord) -> String {
    String::from_utf8_lossy(record.datapath_bytes()).into_owned()
}
