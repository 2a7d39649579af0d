//! crates/manifest/src/flags.rs
//!
//! Transient per-record protocol flags.
//!
//! These bits never reach a manifest. They track what still has to happen for
//! the record held in a slot: which parts must be sent to the client, whether
//! a link target is still expected, and whether incoming data is a delta.

use std::fmt;

/// Bit set of transient record flags.
#[derive(Clone, Copy, Default, Eq, PartialEq, Hash)]
pub struct RecordFlags(u8);

impl RecordFlags {
    /// A link path was read; its target record comes next.
    pub const NEED_LINK: Self = Self(1 << 0);
    /// The data-path record must be sent to the client.
    pub const SEND_DATAPATH: Self = Self(1 << 1);
    /// The attributes record must be sent to the client.
    pub const SEND_STAT: Self = Self(1 << 2);
    /// The path record must be sent to the client.
    pub const SEND_PATH: Self = Self(1 << 3);
    /// The signature is complete; its end marker must be sent.
    pub const SEND_ENDOFSIG: Self = Self(1 << 4);
    /// The file being received is a delta against a stored base.
    pub const RECV_DELTA: Self = Self(1 << 5);

    /// Empty set.
    pub const fn empty() -> Self {
        Self(0)
    }

    /// Raw bits.
    pub const fn bits(self) -> u8 {
        self.0
    }

    /// Returns `true` if every bit of `other` is set.
    pub const fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    /// Returns `true` if no bit is set.
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// Sets the bits of `other`.
    pub fn insert(&mut self, other: Self) {
        self.0 |= other.0;
    }

    /// Clears the bits of `other`.
    pub fn remove(&mut self, other: Self) {
        self.0 &= !other.0;
    }

    /// Returns `true` if any of the three send bits is set.
    pub const fn has_pending_send(self) -> bool {
        self.0 & (Self::SEND_DATAPATH.0 | Self::SEND_STAT.0 | Self::SEND_PATH.0) != 0
    }
}

impl std::ops::BitOr for RecordFlags {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Debug for RecordFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        const NAMES: [(RecordFlags, &str); 6] = [
            (RecordFlags::NEED_LINK, "NEED_LINK"),
            (RecordFlags::SEND_DATAPATH, "SEND_DATAPATH"),
            (RecordFlags::SEND_STAT, "SEND_STAT"),
            (RecordFlags::SEND_PATH, "SEND_PATH"),
            (RecordFlags::SEND_ENDOFSIG, "SEND_ENDOFSIG"),
            (RecordFlags::RECV_DELTA, "RECV_DELTA"),
        ];
        let mut set = f.debug_set();
        for (flag, name) in NAMES {
            if self.contains(flag) {
                set.entry(&format_args!("{name}"));
            }
        }
        set.finish()
    }
}
