#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! Checksum primitives for block signatures and end-of-file verification.
//!
//! - [`Rollsum`] is the weak, rolling checksum stored per block in a
//!   signature stream. It uses the librsync character offset so signatures
//!   are readable by librsync-based clients.
//! - [`Md4`] produces the per-block strong checksum.
//! - [`Md5`] checks the whole-file digest a client reports at end of file.
//!
//! # Examples
//!
//! ```
//! use checksums::{Md5, Rollsum, to_hex};
//!
//! let mut sum = Rollsum::new();
//! sum.update(b"abc");
//! assert_eq!(sum.digest(), 0x0304_0183);
//!
//! assert_eq!(to_hex(&Md5::digest(b"")), "d41d8cd98f00b204e9800998ecf8427e");
//! ```

mod rolling;
mod strong;

pub use rolling::{ROLLSUM_CHAR_OFFSET, RollingError, Rollsum};
pub use strong::{MD4_DIGEST_LEN, MD5_DIGEST_LEN, Md4, Md5, to_hex};
