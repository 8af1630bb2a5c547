// Signature parameters: block length policy and strong sum length.
//
// When the caller does not fix a block length, a `BlockLenPolicy` picks one
// from the basis length (if known). The default policy grows blocks with the
// square root of the basis so that signature size and match granularity grow
// together.

use crate::error::{Error, Result};
use crate::hash::strong::SignatureKind;

/// Block length used when the basis length is unknown (librsync `RS_DEFAULT_BLOCK_LEN`).
pub const DEFAULT_BLOCK_LEN: u32 = 2048;

/// Smallest block length chosen by the default policy.
pub const MIN_POLICY_BLOCK_LEN: u32 = 256;

/// Largest block length chosen by the default policy.
pub const MAX_POLICY_BLOCK_LEN: u32 = 1 << 16;

/// Upper bound for any block length, explicit or loaded from a signature.
///
/// Bounds the per-block buffers a hostile signature can make us allocate.
pub const MAX_BLOCK_LEN: u32 = 1 << 26;

/// Minimum strong length picked by [`StrongLen::Minimal`].
pub const DEFAULT_MIN_STRONG_LEN: usize = 12;

/// Chooses a block length from the (optional) basis length.
pub trait BlockLenPolicy {
    fn block_len(&self, basis_len: Option<u64>) -> u32;
}

/// Default policy: square root of the basis length, in steps of 128 bytes.
///
/// - unknown basis length: [`DEFAULT_BLOCK_LEN`]
/// - basis up to 64 KiB: [`MIN_POLICY_BLOCK_LEN`]
/// - otherwise `ceil(sqrt(len) / 128) * 128`, capped at [`MAX_POLICY_BLOCK_LEN`]
#[derive(Debug, Clone, Copy, Default)]
pub struct SqrtBlockLen;

impl BlockLenPolicy for SqrtBlockLen {
    fn block_len(&self, basis_len: Option<u64>) -> u32 {
        let Some(len) = basis_len else {
            return DEFAULT_BLOCK_LEN;
        };
        let min = u64::from(MIN_POLICY_BLOCK_LEN);
        if len <= min * min {
            return MIN_POLICY_BLOCK_LEN;
        }
        let root = isqrt(len);
        let rounded = root.div_ceil(128) * 128;
        rounded.min(u64::from(MAX_POLICY_BLOCK_LEN)) as u32
    }
}

/// Floor of the square root, exact for all `u64`.
fn isqrt(n: u64) -> u64 {
    if n < 2 {
        return n;
    }
    let mut x = (n as f64).sqrt() as u64;
    // Correct the float estimate in either direction.
    while x.checked_mul(x).is_none_or(|sq| sq > n) {
        x -= 1;
    }
    while (x + 1).checked_mul(x + 1).is_some_and(|sq| sq <= n) {
        x += 1;
    }
    x
}

/// Block length request for a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BlockLen {
    /// Let [`SqrtBlockLen`] pick from the basis length hint.
    #[default]
    Auto,
    /// Exactly this many bytes.
    Fixed(u32),
}

/// Strong sum length request for a signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrongLen {
    /// Full digest of the chosen hash.
    #[default]
    Full,
    /// Shortest length that keeps false matches unlikely for the basis size.
    Minimal,
    /// Exactly this many bytes.
    Bytes(usize),
}

/// Options for building a signature.
#[derive(Debug, Clone, Copy, Default)]
pub struct SignatureOptions {
    pub kind: SignatureKind,
    pub block_len: BlockLen,
    pub strong_len: StrongLen,
    /// Basis length when known in advance; feeds the automatic choices.
    pub basis_len_hint: Option<u64>,
}

/// Resolved, validated signature parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignatureParams {
    pub kind: SignatureKind,
    pub block_len: u32,
    pub strong_len: usize,
}

impl SignatureOptions {
    pub fn new(kind: SignatureKind) -> Self {
        Self {
            kind,
            ..Self::default()
        }
    }

    pub fn block_len(mut self, block_len: u32) -> Self {
        self.block_len = BlockLen::Fixed(block_len);
        self
    }

    pub fn strong_len(mut self, strong_len: usize) -> Self {
        self.strong_len = StrongLen::Bytes(strong_len);
        self
    }

    pub fn basis_len_hint(mut self, len: u64) -> Self {
        self.basis_len_hint = Some(len);
        self
    }

    /// Resolve with the default block length policy.
    pub fn resolve(&self) -> Result<SignatureParams> {
        self.resolve_with(&SqrtBlockLen)
    }

    /// Resolve automatic choices with `policy` and validate the result.
    pub fn resolve_with<P: BlockLenPolicy + ?Sized>(&self, policy: &P) -> Result<SignatureParams> {
        let block_len = match self.block_len {
            BlockLen::Fixed(n) => n,
            BlockLen::Auto => policy.block_len(self.basis_len_hint),
        };
        if block_len == 0 || block_len > MAX_BLOCK_LEN {
            return Err(Error::config(format!(
                "block_len {block_len} outside 1..={MAX_BLOCK_LEN}"
            )));
        }

        let max_strong = self.kind.digest_len();
        let strong_len = match self.strong_len {
            StrongLen::Full => max_strong,
            StrongLen::Minimal => min_strong_len(self.basis_len_hint, block_len).min(max_strong),
            StrongLen::Bytes(n) => n,
        };
        if strong_len == 0 || strong_len > max_strong {
            return Err(Error::config(format!(
                "strong_len {strong_len} outside 1..={max_strong} for {}",
                self.kind.name()
            )));
        }

        Ok(SignatureParams {
            kind: self.kind,
            block_len,
            strong_len,
        })
    }
}

/// librsync's minimum safe strong length:
/// `2 + (log2(len + 2^24) + log2(len / block_len + 1) + 7) / 8`, at least 12.
fn min_strong_len(basis_len: Option<u64>, block_len: u32) -> usize {
    let Some(len) = basis_len else {
        return DEFAULT_MIN_STRONG_LEN;
    };
    let bits = ilog2(len.saturating_add(1 << 24)) + ilog2(len / u64::from(block_len) + 1);
    let computed = 2 + (bits as usize + 7) / 8;
    computed.max(DEFAULT_MIN_STRONG_LEN)
}

fn ilog2(n: u64) -> u32 {
    if n == 0 { 0 } else { n.ilog2() }
}
