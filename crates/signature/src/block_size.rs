//! crates/signature/src/block_size.rs
//!
//! Block length selection for delta bases.
//!
//! The block length grows with the square root of the base file's size,
//! rounded up to a multiple of 16 bytes, so the number of blocks (and with it
//! the signature size) also grows with the square root.

/// Smallest block length ever used.
pub const MIN_BLOCK_LEN: u32 = 64;

/// Granularity block lengths are rounded up to.
pub const BLOCK_LEN_ALIGN: u32 = 16;

/// Chooses the signature block length for a base of `bytes` bytes.
///
/// # Examples
///
/// ```
/// use signature::block_len_for;
///
/// assert_eq!(block_len_for(0), 64);
/// assert_eq!(block_len_for(1 << 20), 1024);
/// assert_eq!(block_len_for(1_000_000), 1008);
/// ```
#[must_use]
pub fn block_len_for(bytes: u64) -> u32 {
    let align = f64::from(BLOCK_LEN_ALIGN);
    let len = ((bytes as f64).sqrt() / align).ceil() * align;
    (len as u32).max(MIN_BLOCK_LEN)
}
