//! crates/manifest/src/writer.rs
//! Append-only manifest writer.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use protocol::{Command, Framing, Record, write_record};

use crate::error::ManifestError;
use crate::record::FileRecord;

/// Appends file records to a manifest.
///
/// Records are written in their canonical order: data path, attributes,
/// path, link target, end-of-file summary, then one signature record per
/// stored block. [`len`](Self::len) tracks the file size so that callers can
/// checkpoint it for resume.
#[derive(Debug)]
pub struct ManifestWriter {
    path: PathBuf,
    out: BufWriter<File>,
    len: u64,
}

impl ManifestWriter {
    /// Creates `path`, truncating any existing manifest.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        Self::open_with(path.as_ref(), false)
    }

    /// Opens `path` for appending, creating it if needed.
    pub fn open_append(path: impl AsRef<Path>) -> Result<Self, ManifestError> {
        Self::open_with(path.as_ref(), true)
    }

    fn open_with(path: &Path, append: bool) -> Result<Self, ManifestError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|err| ManifestError::io(parent, err))?;
        }
        let mut options = OpenOptions::new();
        options.create(true);
        if append {
            options.append(true);
        } else {
            options.write(true).truncate(true);
        }
        let file = options
            .open(path)
            .map_err(|err| ManifestError::io(path, err))?;
        let len = file
            .metadata()
            .map_err(|err| ManifestError::io(path, err))?
            .len();
        logging::trace_manifest!(path = %path.display(), len, append, "opened manifest for writing");
        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
            len,
        })
    }

    /// Location of the manifest.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Bytes written so far, including any pre-existing content.
    pub fn len(&self) -> u64 {
        self.len
    }

    /// Returns `true` when nothing has been written.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends `record`. Records without a path are skipped.
    pub fn write(&mut self, record: &FileRecord) -> Result<(), ManifestError> {
        if record.is_empty() {
            return Ok(());
        }
        let parts = [
            &record.datapath,
            &record.attr,
            &record.path,
            &record.link,
            &record.endfile,
        ];
        for part in parts.into_iter().flatten() {
            self.put(part)?;
        }
        for block in &record.blocks {
            self.put(&block.to_record())?;
        }
        Ok(())
    }

    /// Appends a generic control record such as an end marker.
    pub fn write_gen(&mut self, text: &str) -> Result<(), ManifestError> {
        self.put(&Record::with_text(Command::Gen, text))
    }

    fn put(&mut self, record: &Record) -> Result<(), ManifestError> {
        let written = write_record(&mut self.out, record, Framing::Manifest)
            .map_err(|err| ManifestError::framing(&self.path, err))?;
        self.len += written as u64;
        Ok(())
    }

    /// Flushes buffered records to the file.
    pub fn flush(&mut self) -> Result<(), ManifestError> {
        self.out
            .flush()
            .map_err(|err| ManifestError::io(&self.path, err))
    }

    /// Flushes and syncs the manifest, consuming the writer.
    pub fn close(mut self) -> Result<(), ManifestError> {
        self.flush()?;
        self.out
            .get_ref()
            .sync_data()
            .map_err(|err| ManifestError::io(&self.path, err))?;
        logging::trace_manifest!(path = %self.path.display(), len = self.len, "closed manifest");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::ManifestReader;
    use crate::block::BlockRef;

    #[test]
    fn writes_parts_in_canonical_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log");
        let mut record = FileRecord::with_path(Command::SoftLink, "/l");
        record.attr = Some(Record::with_text(Command::Attribs, "A"));
        record.link = Some(Record::with_text(Command::SoftLink, "/t"));
        record.datapath = Some(Record::with_text(Command::DataPath, "0000/0000/0000"));

        let mut writer = ManifestWriter::create(&path).unwrap();
        writer.write(&record).unwrap();
        writer.close().unwrap();

        let bytes = fs::read(&path).unwrap();
        assert_eq!(
            bytes,
            b"t000E0000/0000/0000\nr0001A\nl0002/l\nl0002/t\n".to_vec()
        );
    }

    #[test]
    fn skips_empty_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log");
        let mut writer = ManifestWriter::create(&path).unwrap();
        writer.write(&FileRecord::new()).unwrap();
        assert!(writer.is_empty());
        writer.close().unwrap();
        assert_eq!(fs::metadata(&path).unwrap().len(), 0);
    }

    #[test]
    fn append_continues_from_existing_length() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/log");
        let mut record = FileRecord::with_path(Command::File, "/a");
        record.attr = Some(Record::with_text(Command::Attribs, "A"));

        let mut writer = ManifestWriter::create(&path).unwrap();
        writer.write(&record).unwrap();
        let first = writer.len();
        writer.close().unwrap();

        let mut writer = ManifestWriter::open_append(&path).unwrap();
        assert_eq!(writer.len(), first);
        record.path = Some(Record::with_text(Command::File, "/b"));
        writer.write(&record).unwrap();
        assert_eq!(writer.len(), 2 * first);
        writer.close().unwrap();

        let mut reader = ManifestReader::open(&path).unwrap();
        assert_eq!(reader.read().unwrap().unwrap().path_bytes(), b"/a");
        assert_eq!(reader.read().unwrap().unwrap().path_bytes(), b"/b");
        assert!(reader.read().unwrap().is_none());
    }

    #[test]
    fn block_references_follow_the_entry() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log");
        let mut record = FileRecord::with_path(Command::File, "/big");
        record.attr = Some(Record::with_text(Command::Attribs, "A"));
        record.endfile = Some(Record::with_text(Command::EndFile, "10"));
        record.blocks.push(BlockRef {
            weak: 1,
            strong: vec![0xab],
            save_path: "0000/0000/0000/0000/0000".into(),
        });

        let mut writer = ManifestWriter::create(&path).unwrap();
        writer.write(&record).unwrap();
        writer.write_gen("phase1end").unwrap();
        writer.close().unwrap();

        let mut reader = ManifestReader::open(&path).unwrap();
        let back = reader.read().unwrap().unwrap();
        assert_eq!(back, record);
        assert!(reader.read().unwrap().is_none());
    }
}
