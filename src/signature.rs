// Loaded signatures and the index the delta encoder searches.
//
// `Signature` is the parsed form of a signature stream: header plus one
// `BlockSum` per basis block in block order. `SignatureIndex` owns a
// signature together with its weak-sum bucket table and answers
// "which block does this window equal?".

use crate::error::{Error, Result};
use crate::format::header::{SIG_HEADER_LEN, SignatureHeader};
use crate::format::netint;
use crate::hash::config::MAX_BLOCK_LEN;
use crate::hash::strong::{self, SignatureKind, StrongSum};
use crate::hash::table::BlockTable;

/// Weak and strong sums of one basis block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockSum {
    pub weak: u32,
    pub strong: StrongSum,
}

/// A parsed signature: header fields plus per-block sums.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    header: SignatureHeader,
    blocks: Vec<BlockSum>,
}

impl Signature {
    /// Empty signature with validated parameters.
    pub fn new(kind: SignatureKind, block_len: u32, strong_len: usize) -> Result<Self> {
        if block_len == 0 || block_len > MAX_BLOCK_LEN {
            return Err(Error::config(format!(
                "block_len {block_len} outside 1..={MAX_BLOCK_LEN}"
            )));
        }
        if strong_len == 0 || strong_len > kind.digest_len() {
            return Err(Error::config(format!(
                "strong_len {strong_len} outside 1..={} for {}",
                kind.digest_len(),
                kind.name()
            )));
        }
        Ok(Self::from_header(SignatureHeader {
            kind,
            block_len,
            strong_len,
        }))
    }

    /// Empty signature for an already-validated header.
    pub(crate) fn from_header(header: SignatureHeader) -> Self {
        Self {
            header,
            blocks: Vec::new(),
        }
    }

    /// Parse a complete signature held in memory.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let header = SignatureHeader::decode(data.get(..SIG_HEADER_LEN).unwrap_or(data))?;
        let mut sig = Self::from_header(header);
        let body = &data[SIG_HEADER_LEN..];
        let record_len = header.record_len();
        if body.len() % record_len != 0 {
            return Err(Error::malformed_signature(format!(
                "truncated record ({} trailing bytes)",
                body.len() % record_len
            )));
        }
        sig.blocks.reserve(body.len() / record_len);
        for record in body.chunks_exact(record_len) {
            sig.push_record(record);
        }
        Ok(sig)
    }

    /// Append one encoded `{weak, strong}` record of exactly `record_len` bytes.
    pub(crate) fn push_record(&mut self, record: &[u8]) {
        debug_assert_eq!(record.len(), self.header.record_len());
        let weak = netint::get_u32(record).unwrap_or_default();
        let strong = StrongSum::from_slice(&record[4..]);
        self.blocks.push(BlockSum { weak, strong });
    }

    /// Append the sums of the next basis block.
    pub fn push(&mut self, weak: u32, strong: StrongSum) {
        debug_assert_eq!(strong.len(), self.header.strong_len);
        self.blocks.push(BlockSum { weak, strong });
    }

    /// Serialize to the signature wire format.
    pub fn encode(&self) -> Vec<u8> {
        let mut out =
            Vec::with_capacity(SIG_HEADER_LEN + self.blocks.len() * self.header.record_len());
        self.header.encode(&mut out);
        for block in &self.blocks {
            netint::put_u32(&mut out, block.weak);
            out.extend_from_slice(block.strong.as_slice());
        }
        out
    }

    pub fn header(&self) -> SignatureHeader {
        self.header
    }

    pub fn kind(&self) -> SignatureKind {
        self.header.kind
    }

    pub fn block_len(&self) -> u32 {
        self.header.block_len
    }

    pub fn strong_len(&self) -> usize {
        self.header.strong_len
    }

    pub fn blocks(&self) -> &[BlockSum] {
        &self.blocks
    }

    /// Number of basis blocks.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Basis offset of block `index`.
    #[inline]
    pub fn block_offset(&self, index: usize) -> u64 {
        index as u64 * u64::from(self.header.block_len)
    }
}

/// A signature plus its weak-sum lookup table.
///
/// Built once, read-only afterwards.
#[derive(Debug, Clone)]
pub struct SignatureIndex {
    sig: Signature,
    table: BlockTable,
}

/// Result of [`SignatureIndex::find_match`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Lookup {
    /// Block whose weak and strong sums both equal the window's.
    pub block: Option<usize>,
    /// Candidates whose weak sum matched but strong sum did not.
    pub false_matches: u32,
}

impl SignatureIndex {
    pub fn new(sig: Signature) -> Self {
        let weak: Vec<u32> = sig.blocks.iter().map(|b| b.weak).collect();
        let table = BlockTable::build(&weak);
        Self { sig, table }
    }

    pub fn signature(&self) -> &Signature {
        &self.sig
    }

    pub fn into_signature(self) -> Signature {
        self.sig
    }

    /// Blocks with exactly this weak sum, in block order.
    pub fn candidates(&self, weak: u32) -> impl Iterator<Item = usize> + '_ {
        self.table
            .bucket_entries(weak)
            .iter()
            .copied()
            .filter(move |&i| self.sig.blocks[i].weak == weak)
    }

    /// Find the block equal to `window`, whose rolling checksum is `weak`.
    ///
    /// The strong sum of `window` is computed at most once and only when a
    /// candidate has the same weak sum. `prefer` (the block after the last
    /// match) is tried first; otherwise the lowest verified block wins.
    pub fn find_match(&self, weak: u32, window: &[u8], prefer: Option<usize>) -> Lookup {
        let mut lookup = Lookup::default();
        let mut window_sum: Option<StrongSum> = None;
        let header = self.sig.header;
        let mut verify = |block: &BlockSum| {
            let sum = window_sum
                .get_or_insert_with(|| strong::strong_sum(header.kind, window, header.strong_len));
            *sum == block.strong
        };

        if let Some(p) = prefer {
            if let Some(block) = self.sig.blocks.get(p).filter(|b| b.weak == weak) {
                if verify(block) {
                    lookup.block = Some(p);
                    return lookup;
                }
                lookup.false_matches += 1;
            }
        }

        for i in self.candidates(weak) {
            if Some(i) == prefer {
                continue;
            }
            if verify(&self.sig.blocks[i]) {
                lookup.block = Some(i);
                return lookup;
            }
            lookup.false_matches += 1;
        }
        lookup
    }
}
