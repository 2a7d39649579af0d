//! crates/checksums/src/rolling.rs
//!
//! librsync-compatible rolling checksum.

use core::fmt;

/// Constant added to every byte before it enters the sums.
pub const ROLLSUM_CHAR_OFFSET: u16 = 31;

/// Errors raised while rolling the checksum window.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum RollingError {
    /// A byte was rolled out of an empty window.
    EmptyWindow,
}

impl fmt::Display for RollingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyWindow => write!(f, "rolling checksum requires a non-empty window"),
        }
    }
}

impl std::error::Error for RollingError {}

/// Weak rolling checksum over a byte window (`rs_rollsum`).
///
/// `s1` is the sum of the offset bytes and `s2` the sum of the running `s1`
/// values, both modulo 2^16. The digest packs them as `s2 << 16 | s1`.
#[doc(alias = "rollsum")]
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Rollsum {
    count: usize,
    s1: u16,
    s2: u16,
}

impl Rollsum {
    /// Creates an empty checksum.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            count: 0,
            s1: 0,
            s2: 0,
        }
    }

    /// Number of bytes in the window.
    #[must_use]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns `true` if the window is empty.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Appends `buf` to the window.
    pub fn update(&mut self, buf: &[u8]) {
        for &byte in buf {
            self.s1 = self
                .s1
                .wrapping_add(u16::from(byte).wrapping_add(ROLLSUM_CHAR_OFFSET));
            self.s2 = self.s2.wrapping_add(self.s1);
        }
        self.count += buf.len();
    }

    /// Slides the window one byte: drops `outgoing` from the front and
    /// appends `incoming`.
    pub fn rotate(&mut self, outgoing: u8, incoming: u8) -> Result<(), RollingError> {
        if self.count == 0 {
            return Err(RollingError::EmptyWindow);
        }
        let out = u16::from(outgoing);
        self.s1 = self.s1.wrapping_add(u16::from(incoming)).wrapping_sub(out);
        self.s2 = self.s2.wrapping_add(self.s1).wrapping_sub(
            (self.count as u16).wrapping_mul(out.wrapping_add(ROLLSUM_CHAR_OFFSET)),
        );
        Ok(())
    }

    /// Drops `outgoing` from the front of the window.
    pub fn rollout(&mut self, outgoing: u8) -> Result<(), RollingError> {
        if self.count == 0 {
            return Err(RollingError::EmptyWindow);
        }
        let out = u16::from(outgoing).wrapping_add(ROLLSUM_CHAR_OFFSET);
        self.s1 = self.s1.wrapping_sub(out);
        self.s2 = self
            .s2
            .wrapping_sub((self.count as u16).wrapping_mul(out));
        self.count -= 1;
        Ok(())
    }

    /// Packed 32-bit digest.
    #[must_use]
    pub const fn digest(&self) -> u32 {
        ((self.s2 as u32) << 16) | self.s1 as u32
    }

    /// Digest of `buf` in one call.
    #[must_use]
    pub fn of(buf: &[u8]) -> u32 {
        let mut sum = Self::new();
        sum.update(buf);
        sum.digest()
    }
}
