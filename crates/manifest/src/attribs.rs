//! crates/manifest/src/attribs.rs
//!
//! Stat attributes and their text encoding.
//!
//! The attribute record is opaque to the phase-2 engine: it only asks an
//! [`AttribCodec`] to turn a record's fields into an `attr` payload and back.
//! [`StatAttribs`] is the default codec. It writes the fields as
//! space-separated base-64 integers:
//!
//! ```text
//! dev ino mode nlink uid gid rdev size blksize blocks atime mtime ctime flags winattr compression
//! ```
//!
//! The client's scan index is not part of the encoding, so two manifests that
//! differ only in scan order compare byte-identical. Payloads received from a
//! client may carry the index as an extra leading field; decoding accepts both
//! forms.

use protocol::{Command, Record};
use thiserror::Error;

use crate::record::FileRecord;

/// Number of fields in an encoded attribute payload (without index).
pub const ATTRIB_FIELDS: usize = 16;

const BASE64_TABLE: &[u8; 64] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789+/";

/// Raw file status carried by a record.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stat {
    /// Device id.
    pub dev: u64,
    /// Inode number.
    pub ino: u64,
    /// File type and permission bits.
    pub mode: u32,
    /// Hard link count.
    pub nlink: u64,
    /// Owner.
    pub uid: u32,
    /// Group.
    pub gid: u32,
    /// Device id for specials.
    pub rdev: u64,
    /// Size in bytes.
    pub size: i64,
    /// Preferred I/O block size.
    pub blksize: i64,
    /// Allocated 512-byte blocks.
    pub blocks: i64,
    /// Access time, seconds.
    pub atime: i64,
    /// Modification time, seconds.
    pub mtime: i64,
    /// Status change time, seconds.
    pub ctime: i64,
    /// BSD file flags.
    pub flags: u64,
}

/// Attribute payload could not be produced or parsed.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum AttribError {
    /// The record has no attribute payload to decode.
    #[error("record has no attributes")]
    Missing,
    /// The payload has the wrong number of fields.
    #[error("expected {ATTRIB_FIELDS} attribute fields, found {0}")]
    FieldCount(usize),
    /// A field is not valid base 64.
    #[error("attribute field {field} is not valid base-64: {value:?}")]
    Malformed {
        /// Zero-based field position.
        field: usize,
        /// Offending text.
        value: String,
    },
}

/// Converts between a record's decoded fields and its `attr` payload.
pub trait AttribCodec {
    /// Rebuilds `record.attr` from the record's stat, compression and
    /// Windows attributes.
    fn encode(&self, record: &mut FileRecord) -> Result<(), AttribError>;

    /// Fills the record's stat, compression and Windows attributes from
    /// `record.attr`.
    fn decode(&self, record: &mut FileRecord) -> Result<(), AttribError>;
}

/// Default base-64 stat codec.
#[derive(Clone, Copy, Debug, Default)]
pub struct StatAttribs;

impl AttribCodec for StatAttribs {
    fn encode(&self, record: &mut FileRecord) -> Result<(), AttribError> {
        let st = &record.stat;
        let fields: [i64; ATTRIB_FIELDS] = [
            st.dev as i64,
            st.ino as i64,
            i64::from(st.mode),
            st.nlink as i64,
            i64::from(st.uid),
            i64::from(st.gid),
            st.rdev as i64,
            st.size,
            st.blksize,
            st.blocks,
            st.atime,
            st.mtime,
            st.ctime,
            st.flags as i64,
            record.winattr as i64,
            i64::from(record.compression),
        ];
        let mut out = Vec::with_capacity(ATTRIB_FIELDS * 4);
        for (position, value) in fields.into_iter().enumerate() {
            if position > 0 {
                out.push(b' ');
            }
            push_base64(&mut out, value);
        }
        record.attr = Some(Record::new(Command::Attribs, out));
        Ok(())
    }

    fn decode(&self, record: &mut FileRecord) -> Result<(), AttribError> {
        let payload = record.attr.as_ref().ok_or(AttribError::Missing)?.payload();
        let fields: Vec<&[u8]> = payload
            .split(|&b| b == b' ')
            .filter(|field| !field.is_empty())
            .collect();
        let (index, fields) = match fields.len() {
            ATTRIB_FIELDS => (None, &fields[..]),
            n if n == ATTRIB_FIELDS + 1 => (Some(fields[0]), &fields[1..]),
            n => return Err(AttribError::FieldCount(n)),
        };

        let mut values = [0i64; ATTRIB_FIELDS];
        for (position, (slot, field)) in values.iter_mut().zip(fields).enumerate() {
            *slot = parse_base64(field).ok_or_else(|| AttribError::Malformed {
                field: position,
                value: String::from_utf8_lossy(field).into_owned(),
            })?;
        }
        if let Some(index) = index {
            record.index = parse_base64(index).ok_or_else(|| AttribError::Malformed {
                field: 0,
                value: String::from_utf8_lossy(index).into_owned(),
            })? as u64;
        }

        let [
            dev,
            ino,
            mode,
            nlink,
            uid,
            gid,
            rdev,
            size,
            blksize,
            blocks,
            atime,
            mtime,
            ctime,
            flags,
            winattr,
            compression,
        ] = values;
        record.stat = Stat {
            dev: dev as u64,
            ino: ino as u64,
            mode: mode as u32,
            nlink: nlink as u64,
            uid: uid as u32,
            gid: gid as u32,
            rdev: rdev as u64,
            size,
            blksize,
            blocks,
            atime,
            mtime,
            ctime,
            flags: flags as u64,
        };
        record.winattr = winattr as u64;
        record.compression = compression as i32;
        Ok(())
    }
}

/// Appends `value` in the sign-prefixed base-64 digit form.
fn push_base64(out: &mut Vec<u8>, value: i64) {
    if value < 0 {
        out.push(b'-');
    }
    let mut magnitude = value.unsigned_abs();
    let start = out.len();
    loop {
        out.push(BASE64_TABLE[(magnitude & 0x3F) as usize]);
        magnitude >>= 6;
        if magnitude == 0 {
            break;
        }
    }
    out[start..].reverse();
}

fn parse_base64(field: &[u8]) -> Option<i64> {
    let (negative, digits) = match field.split_first() {
        Some((b'-', rest)) => (true, rest),
        _ => (false, field),
    };
    if digits.is_empty() {
        return None;
    }
    let mut value: u64 = 0;
    for &digit in digits {
        let sextet = BASE64_TABLE.iter().position(|&c| c == digit)? as u64;
        value = value.checked_mul(64)?.checked_add(sextet)?;
    }
    let value = value as i64;
    Some(if negative { value.wrapping_neg() } else { value })
}
