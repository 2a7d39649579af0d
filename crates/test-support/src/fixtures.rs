//! Manifest fixtures.

use std::path::Path;

use manifest::{AttribCodec, FileRecord, ManifestReader, ManifestWriter, StatAttribs};
use protocol::{Command, Record};

/// Builds an encoded entry with the given timestamps.
pub fn entry(kind: Command, path: &str, mtime: i64, ctime: i64) -> FileRecord {
    let mut record = FileRecord::with_path(kind, path);
    record.stat.mode = match kind {
        Command::Directory => 0o040_755,
        Command::SoftLink => 0o120_777,
        _ => 0o100_644,
    };
    record.stat.nlink = 1;
    record.stat.mtime = mtime;
    record.stat.ctime = ctime;
    record.compression = 0;
    if let Err(err) = StatAttribs.encode(&mut record) {
        panic!("encoding fixture attributes for {path}: {err}");
    }
    record
}

/// Builds a soft-link entry pointing at `target`.
pub fn link(path: &str, target: &str, mtime: i64) -> FileRecord {
    let mut record = entry(Command::SoftLink, path, mtime, mtime);
    record.link = Some(Record::with_text(Command::SoftLink, target));
    record
}

/// Adds stored-data bookkeeping, as found in a finished backup's manifest.
pub fn stored(mut record: FileRecord, datapath: &str, contents: &[u8]) -> FileRecord {
    record.datapath = Some(Record::with_text(Command::DataPath, datapath));
    let summary = format!(
        "{}:{}",
        contents.len(),
        checksums::to_hex(&checksums::Md5::digest(contents))
    );
    record.endfile = Some(Record::with_text(Command::EndFile, &summary));
    record
}

/// Writes `records` to a fresh manifest at `path`.
pub fn write_manifest(path: &Path, records: &[FileRecord]) {
    let result = ManifestWriter::create(path).and_then(|mut writer| {
        records.iter().try_for_each(|record| writer.write(record))?;
        writer.close()
    });
    if let Err(err) = result {
        panic!("writing fixture manifest {}: {err}", path.display());
    }
}

/// Reads every entry of the manifest at `path`; a missing file reads as empty.
pub fn read_manifest(path: &Path) -> Vec<FileRecord> {
    if !path.exists() {
        return Vec::new();
    }
    let mut out = Vec::new();
    let mut reader = match ManifestReader::open(path) {
        Ok(reader) => reader,
        Err(err) => panic!("opening manifest {}: {err}", path.display()),
    };
    loop {
        match reader.read() {
            Ok(Some(record)) => out.push(record),
            Ok(None) => return out,
            Err(err) => panic!("reading manifest {}: {err}", path.display()),
        }
    }
}

/// Paths of the entries in the manifest at `path`.
pub fn manifest_paths(path: &Path) -> Vec<String> {
    read_manifest(path)
        .iter()
        .map(|record| record.display_path().into_owned())
        .collect()
}

/// Fresh scratch directory.
pub fn scratch() -> tempfile::TempDir {
    match tempfile::tempdir() {
        Ok(dir) => dir,
        Err(err) => panic!("creating scratch directory: {err}"),
    }
}
