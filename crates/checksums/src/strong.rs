//! crates/checksums/src/strong.rs
//!
//! Strong digests: MD4 for block signatures, MD5 for whole files.

use digest::Digest;
use std::fmt::Write as _;

/// Length of an MD4 digest in bytes.
pub const MD4_DIGEST_LEN: usize = 16;

/// Length of an MD5 digest in bytes.
pub const MD5_DIGEST_LEN: usize = 16;

/// Streaming MD4 hasher used for per-block strong sums.
#[derive(Clone, Debug, Default)]
pub struct Md4 {
    inner: md4::Md4,
}

impl Md4 {
    /// Creates a hasher with an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds additional bytes into the digest state.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalises the digest.
    #[must_use]
    pub fn finalize(self) -> [u8; MD4_DIGEST_LEN] {
        self.inner.finalize().into()
    }

    /// Convenience helper that computes the MD4 digest of `data`.
    #[must_use]
    pub fn digest(data: &[u8]) -> [u8; MD4_DIGEST_LEN] {
        let mut hasher = Self::new();
        hasher.update(data);
        hasher.finalize()
    }
}

/// Streaming MD5 hasher used to check received file contents.
#[derive(Clone, Debug, Default)]
pub struct Md5 {
    inner: md5::Md5,
}

impl Md5 {
    /// Creates a hasher with an empty state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feeds additional bytes into the digest state.
    pub fn update(&mut self, data: &[u8]) {
        self.inner.update(data);
    }

    /// Finalises the digest.
    #[must_use]
    pub fn finalize(self) -> [u8; MD5_DIGEST_LEN] {
        self.inner.finalize().into()
    }

    /// Convenience helper that computes the MD5 digest of `data`.
    #[must_use]
    pub fn digest(data: &[u8]) -> [u8; MD5_DIGEST_LEN] {
        let mut hasher = Self::new();
        hasher.update(data);
        hasher.finalize()
    }
}

/// Lowercase hexadecimal rendering of `bytes`.
#[must_use]
pub fn to_hex(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn md4_rfc1320_vectors() {
        assert_eq!(to_hex(&Md4::digest(b"")), "31d6cfe0d16ae931b73c59d7e0c089c0");
        assert_eq!(
            to_hex(&Md4::digest(b"abc")),
            "a448017aaf21d8525fc10ae87aa6729d"
        );
    }

    #[test]
    fn md5_rfc1321_vectors() {
        assert_eq!(
            to_hex(&Md5::digest(b"abc")),
            "900150983cd24fb0d6963f7d28e17f72"
        );
    }

    #[test]
    fn streaming_matches_one_shot() {
        let mut hasher = Md5::new();
        hasher.update(b"message ");
        hasher.update(b"digest");
        assert_eq!(hasher.finalize(), Md5::digest(b"message digest"));

        let mut hasher = Md4::new();
        hasher.update(b"a");
        hasher.update(b"bc");
        assert_eq!(hasher.finalize(), Md4::digest(b"abc"));
    }
}
