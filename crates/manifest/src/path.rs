//! crates/manifest/src/path.rs
//!
//! Manifest ordering.
//!
//! Manifests are sorted so that the phase-2 merge can walk the previous
//! backup and the client's list in lockstep. Paths compare byte-wise as
//! signed chars with `/` below every other byte, so a directory's entries
//! sort immediately after it and before any sibling that merely shares its
//! name as a prefix. The end of a path compares as a NUL byte.

use std::cmp::Ordering;

use protocol::Command;

use crate::record::FileRecord;

/// Compares two raw paths in manifest order.
pub fn pathcmp(a: &[u8], b: &[u8]) -> Ordering {
    let mut i = 0;
    loop {
        let x = a.get(i).copied().unwrap_or(0);
        let y = b.get(i).copied().unwrap_or(0);
        if x != y {
            return match (x, y) {
                (b'/', y) if y != 0 => Ordering::Less,
                (x, b'/') if x != 0 => Ordering::Greater,
                (x, y) => (x as i8).cmp(&(y as i8)),
            };
        }
        if x == 0 {
            return Ordering::Equal;
        }
        i += 1;
    }
}

/// Tie-break rank for records sharing a path.
///
/// A backup-stream header sorts before its data, the trailer after it, and
/// metadata blobs after everything else.
const fn kind_rank(kind: Command) -> u8 {
    match kind {
        Command::Vss | Command::EncVss => 0,
        Command::VssTrailer | Command::EncVssTrailer => 2,
        Command::Metadata | Command::EncMetadata => 3,
        _ => 1,
    }
}

/// Compares two file records in manifest order.
///
/// Empty records sort before everything.
pub fn record_cmp(a: &FileRecord, b: &FileRecord) -> Ordering {
    match (a.kind(), b.kind()) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(ka), Some(kb)) => pathcmp(a.path_bytes(), b.path_bytes())
            .then_with(|| kind_rank(ka).cmp(&kind_rank(kb))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_lexicographic_order() {
        assert_eq!(pathcmp(b"/a", b"/b"), Ordering::Less);
        assert_eq!(pathcmp(b"/b", b"/a"), Ordering::Greater);
        assert_eq!(pathcmp(b"/same", b"/same"), Ordering::Equal);
    }

    #[test]
    fn prefix_sorts_first() {
        assert_eq!(pathcmp(b"/a", b"/ab"), Ordering::Less);
        assert_eq!(pathcmp(b"/ab", b"/a"), Ordering::Greater);
    }

    #[test]
    fn slash_sorts_below_other_bytes() {
        // '-' (0x2d) is below '/' (0x2f) in ASCII, but a directory's
        // children still come first.
        assert_eq!(pathcmp(b"/a/b", b"/a-b"), Ordering::Less);
        assert_eq!(pathcmp(b"/a-b", b"/a/b"), Ordering::Greater);
        let mut paths: Vec<&[u8]> = vec![b"/a-b", b"/a/z", b"/a", b"/a/b"];
        paths.sort_by(|x, y| pathcmp(x, y));
        assert_eq!(paths, vec![&b"/a"[..], b"/a/b", b"/a/z", b"/a-b"]);
    }

    #[test]
    fn high_bytes_compare_as_signed() {
        assert_eq!(pathcmp("/é".as_bytes(), b"/z"), Ordering::Less);
        // The end of a path is a NUL, which is above any signed high byte.
        assert_eq!(pathcmp(b"/a", "/aé".as_bytes()), Ordering::Greater);
    }

    #[test]
    fn metadata_sorts_after_data_for_equal_paths() {
        let data = FileRecord::with_path(Command::File, "/x");
        let meta = FileRecord::with_path(Command::Metadata, "/x");
        assert_eq!(record_cmp(&data, &meta), Ordering::Less);
        assert_eq!(record_cmp(&meta, &data), Ordering::Greater);
    }

    #[test]
    fn backup_stream_header_and_trailer_bracket_the_data() {
        let header = FileRecord::with_path(Command::Vss, "/x");
        let data = FileRecord::with_path(Command::File, "/x");
        let trailer = FileRecord::with_path(Command::VssTrailer, "/x");
        let mut records = vec![trailer.clone(), data.clone(), header.clone()];
        records.sort_by(record_cmp);
        assert_eq!(records, vec![header, data, trailer]);
    }

    #[test]
    fn path_difference_wins_over_kind() {
        let meta = FileRecord::with_path(Command::Metadata, "/a");
        let vss = FileRecord::with_path(Command::Vss, "/b");
        assert_eq!(record_cmp(&meta, &vss), Ordering::Less);
    }

    #[test]
    fn empty_record_sorts_first() {
        let empty = FileRecord::new();
        let file = FileRecord::with_path(Command::File, "/a");
        assert_eq!(record_cmp(&empty, &file), Ordering::Less);
        assert_eq!(record_cmp(&empty, &FileRecord::new()), Ordering::Equal);
    }
}
