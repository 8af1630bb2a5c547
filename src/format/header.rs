// Magic numbers and the signature header.
//
// Signature: magic, block_len, strong_len as big-endian u32 words, then one
// `{weak u32, strong [strong_len]}` record per basis block.
// Delta: magic, then commands.

use crate::error::{Error, Result};
use crate::hash::config::MAX_BLOCK_LEN;
use crate::hash::strong::SignatureKind;

use super::netint;

/// Delta stream magic ("rs\x026").
pub const DELTA_MAGIC: u32 = 0x7273_0236;

/// MD4 signature magic ("rs\x016").
pub const MD4_SIG_MAGIC: u32 = 0x7273_0136;

/// BLAKE2 signature magic ("rs\x017").
pub const BLAKE2_SIG_MAGIC: u32 = 0x7273_0137;

/// Rabin-Karp rollsum + MD4 signature magic (librsync >= 2.2). Not supported.
pub const RK_MD4_SIG_MAGIC: u32 = 0x7273_0146;

/// Rabin-Karp rollsum + BLAKE2 signature magic (librsync >= 2.2). Not supported.
pub const RK_BLAKE2_SIG_MAGIC: u32 = 0x7273_0147;

/// Encoded size of a signature header.
pub const SIG_HEADER_LEN: usize = 12;

/// Encoded size of the delta magic.
pub const DELTA_HEADER_LEN: usize = 4;

/// Decoded signature header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureHeader {
    pub kind: SignatureKind,
    pub block_len: u32,
    pub strong_len: usize,
}

impl SignatureHeader {
    /// Encoded length of one block record.
    pub fn record_len(&self) -> usize {
        4 + self.strong_len
    }

    pub fn encode(&self, out: &mut Vec<u8>) {
        netint::put_u32(out, self.kind.magic());
        netint::put_u32(out, self.block_len);
        netint::put_u32(out, self.strong_len as u32);
    }

    /// Parse and validate a header from exactly [`SIG_HEADER_LEN`] bytes.
    pub fn decode(data: &[u8]) -> Result<Self> {
        let (Some(magic), Some(block_len), Some(strong_len)) = (
            netint::get_u32(data),
            netint::get_u32(data.get(4..).unwrap_or_default()),
            netint::get_u32(data.get(8..).unwrap_or_default()),
        ) else {
            return Err(Error::malformed_signature("truncated header"));
        };

        let kind = match SignatureKind::from_magic(magic) {
            Some(kind) => kind,
            None if matches!(magic, RK_MD4_SIG_MAGIC | RK_BLAKE2_SIG_MAGIC) => {
                return Err(Error::malformed_signature(format!(
                    "rabin-karp signature {magic:#010x} is not supported"
                )));
            }
            None => {
                return Err(Error::malformed_signature(format!(
                    "unknown magic {magic:#010x}"
                )));
            }
        };

        if block_len == 0 || block_len > MAX_BLOCK_LEN {
            return Err(Error::malformed_signature(format!(
                "block_len {block_len} outside 1..={MAX_BLOCK_LEN}"
            )));
        }

        let max_strong = kind.digest_len();
        let strong_len = strong_len as usize;
        if strong_len == 0 || strong_len > max_strong {
            return Err(Error::malformed_signature(format!(
                "strong_len {strong_len} outside 1..={max_strong} for {}",
                kind.name()
            )));
        }

        Ok(Self {
            kind,
            block_len,
            strong_len,
        })
    }
}
