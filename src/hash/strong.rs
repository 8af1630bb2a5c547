// Strong checksums used to confirm weak-sum matches.
//
// librsync signatures carry either MD4 (16-byte digest) or BLAKE2b with a
// 32-byte output. Signatures store a prefix of the digest whose length is
// recorded in the header; verification truncates the same way.

use blake2::Blake2b;
use digest::Digest;
use digest::consts::U32;

use crate::format::header::{BLAKE2_SIG_MAGIC, MD4_SIG_MAGIC};

/// Largest digest produced by any supported strong hash.
pub const MAX_STRONG_LEN: usize = 32;

/// MD4 digest length.
pub const MD4_LEN: usize = 16;

/// BLAKE2b digest length as configured by librsync.
pub const BLAKE2_LEN: usize = 32;

type Blake2b256 = Blake2b<U32>;

/// Strong hash family, selected by the signature magic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum SignatureKind {
    /// MD4, magic `0x72730136`.
    Md4,
    /// BLAKE2b-256, magic `0x72730137`.
    #[default]
    Blake2,
}

impl SignatureKind {
    /// Full digest length of this hash.
    pub const fn digest_len(self) -> usize {
        match self {
            Self::Md4 => MD4_LEN,
            Self::Blake2 => BLAKE2_LEN,
        }
    }

    /// Signature magic number for this hash.
    pub const fn magic(self) -> u32 {
        match self {
            Self::Md4 => MD4_SIG_MAGIC,
            Self::Blake2 => BLAKE2_SIG_MAGIC,
        }
    }

    /// Hash family for a signature magic, if supported.
    pub const fn from_magic(magic: u32) -> Option<Self> {
        match magic {
            MD4_SIG_MAGIC => Some(Self::Md4),
            BLAKE2_SIG_MAGIC => Some(Self::Blake2),
            _ => None,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Md4 => "md4",
            Self::Blake2 => "blake2",
        }
    }
}

/// A strong sum truncated to at most [`MAX_STRONG_LEN`] bytes.
///
/// Stored inline so that signature records and per-window verification
/// never allocate.
#[derive(Clone, Copy)]
pub struct StrongSum {
    bytes: [u8; MAX_STRONG_LEN],
    len: u8,
}

impl StrongSum {
    /// Build from raw bytes; `bytes.len()` must not exceed [`MAX_STRONG_LEN`].
    pub fn from_slice(bytes: &[u8]) -> Self {
        debug_assert!(bytes.len() <= MAX_STRONG_LEN);
        let len = bytes.len().min(MAX_STRONG_LEN);
        let mut out = [0u8; MAX_STRONG_LEN];
        out[..len].copy_from_slice(&bytes[..len]);
        Self {
            bytes: out,
            len: len as u8,
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.bytes[..self.len as usize]
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl PartialEq for StrongSum {
    fn eq(&self, other: &Self) -> bool {
        self.as_slice() == other.as_slice()
    }
}

impl Eq for StrongSum {}

impl AsRef<[u8]> for StrongSum {
    fn as_ref(&self) -> &[u8] {
        self.as_slice()
    }
}

impl std::fmt::Debug for StrongSum {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for b in self.as_slice() {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

/// Strong sum of `data` truncated to `strong_len` bytes.
pub fn strong_sum(kind: SignatureKind, data: &[u8], strong_len: usize) -> StrongSum {
    let mut hasher = StrongHasher::new(kind);
    hasher.update(data);
    hasher.finalize(strong_len)
}

/// Incremental strong hasher.
#[derive(Clone)]
pub struct StrongHasher {
    inner: Backend,
}

#[derive(Clone)]
enum Backend {
    Md4(md4::Md4),
    Blake2(Blake2b256),
}

impl StrongHasher {
    pub fn new(kind: SignatureKind) -> Self {
        let inner = match kind {
            SignatureKind::Md4 => Backend::Md4(md4::Md4::new()),
            SignatureKind::Blake2 => Backend::Blake2(Blake2b256::new()),
        };
        Self { inner }
    }

    pub fn kind(&self) -> SignatureKind {
        match self.inner {
            Backend::Md4(_) => SignatureKind::Md4,
            Backend::Blake2(_) => SignatureKind::Blake2,
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match &mut self.inner {
            Backend::Md4(h) => h.update(data),
            Backend::Blake2(h) => h.update(data),
        }
    }

    /// Finish and keep the first `strong_len` bytes of the digest.
    pub fn finalize(self, strong_len: usize) -> StrongSum {
        match self.inner {
            Backend::Md4(h) => {
                let full = h.finalize();
                StrongSum::from_slice(&full[..strong_len.min(MD4_LEN)])
            }
            Backend::Blake2(h) => {
                let full = h.finalize();
                StrongSum::from_slice(&full[..strong_len.min(BLAKE2_LEN)])
            }
        }
    }
}

impl std::fmt::Debug for StrongHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StrongHasher")
            .field("kind", &self.kind())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hex(bytes: &[u8]) -> String {
        bytes.iter().map(|b| format!("{b:02x}")).collect()
    }

    #[test]
    fn md4_reference_vectors() {
        // RFC 1320 test suite.
        let empty = strong_sum(SignatureKind::Md4, b"", MD4_LEN);
        assert_eq!(hex(empty.as_slice()), "31d6cfe0d16ae931b73c59d7e0c089c0");
        let abc = strong_sum(SignatureKind::Md4, b"abc", MD4_LEN);
        assert_eq!(hex(abc.as_slice()), "a448017aaf21d8525fc10ae87aa6729d");
    }

    #[test]
    fn md4_truncation_matches_rdiff_block() {
        // First record of `rdiff signature -b 10 -S 5` over "this is a string to be tested".
        let sum = strong_sum(SignatureKind::Md4, b"this is a ", 5);
        assert_eq!(sum.as_slice(), &[0xad, 0x3c, 0xbd, 0x19, 0x09]);
    }

    #[test]
    fn blake2_is_full_width_and_deterministic() {
        let a = strong_sum(SignatureKind::Blake2, b"block", BLAKE2_LEN);
        let b = strong_sum(SignatureKind::Blake2, b"block", BLAKE2_LEN);
        assert_eq!(a.len(), 32);
        assert_eq!(a, b);
        assert_ne!(a, strong_sum(SignatureKind::Blake2, b"blocK", BLAKE2_LEN));
    }

    #[test]
    fn truncation_is_prefix_of_full_digest() {
        for kind in [SignatureKind::Md4, SignatureKind::Blake2] {
            let full = strong_sum(kind, b"prefix check", kind.digest_len());
            let short = strong_sum(kind, b"prefix check", 8);
            assert_eq!(short.as_slice(), &full.as_slice()[..8]);
        }
    }

    #[test]
    fn incremental_equals_one_shot() {
        let data: Vec<u8> = (0..5000u32).map(|i| (i % 251) as u8).collect();
        for kind in [SignatureKind::Md4, SignatureKind::Blake2] {
            let mut h = StrongHasher::new(kind);
            for chunk in data.chunks(77) {
                h.update(chunk);
            }
            assert_eq!(h.finalize(32), strong_sum(kind, &data, 32));
        }
    }

    #[test]
    fn magic_mapping() {
        for kind in [SignatureKind::Md4, SignatureKind::Blake2] {
            assert_eq!(SignatureKind::from_magic(kind.magic()), Some(kind));
        }
        assert_eq!(SignatureKind::from_magic(0x7273_0146), None);
    }
}
