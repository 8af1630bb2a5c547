// Weak-sum bucket table for signature lookups.
//
// Built once from the weak sums of a loaded signature:
//   - bucket count is the next power of two >= block count (at least 16),
//   - `bucket(weak)` folds the high bits into the mask range,
//   - block indices are stored contiguously per bucket (`starts[b]..starts[b+1]`),
//     in ascending block order.
//
// A bucket holds every block whose weak sum folds to it; callers compare the
// exact weak sum before doing anything expensive.

// ---------------------------------------------------------------------------
// Bucket configuration
// ---------------------------------------------------------------------------

const MIN_BITS: u32 = 4;
const MAX_BITS: u32 = 28;

/// Bucket count and fold parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BucketCfg {
    /// Number of buckets (power of 2).
    pub size: usize,
    /// `32 - log2(size)`.
    pub shift: u32,
    /// `size - 1`.
    pub mask: u32,
}

impl BucketCfg {
    /// Configuration for `blocks` entries.
    pub fn new(blocks: usize) -> Self {
        let bits = blocks
            .next_power_of_two()
            .trailing_zeros()
            .clamp(MIN_BITS, MAX_BITS);
        let size = 1usize << bits;
        Self {
            size,
            shift: 32 - bits,
            mask: (size - 1) as u32,
        }
    }

    /// `(weak >> shift) ^ (weak & mask)`.
    #[inline(always)]
    pub fn bucket(&self, weak: u32) -> usize {
        ((weak >> self.shift) ^ (weak & self.mask)) as usize
    }
}

// ---------------------------------------------------------------------------
// Block table
// ---------------------------------------------------------------------------

/// Read-only map from weak sum bucket to block indices.
#[derive(Debug, Clone)]
pub struct BlockTable {
    cfg: BucketCfg,
    /// `size + 1` offsets into `entries`.
    starts: Vec<usize>,
    /// Block indices grouped by bucket.
    entries: Vec<usize>,
}

impl BlockTable {
    /// Build from per-block weak sums (index = block number).
    pub fn build(weak_sums: &[u32]) -> Self {
        let cfg = BucketCfg::new(weak_sums.len());

        let mut starts = vec![0usize; cfg.size + 1];
        for &weak in weak_sums {
            starts[cfg.bucket(weak) + 1] += 1;
        }
        for b in 0..cfg.size {
            starts[b + 1] += starts[b];
        }

        // Counting sort; blocks are visited in order, so each bucket stays sorted.
        let mut fill = starts[..cfg.size].to_vec();
        let mut entries = vec![0usize; weak_sums.len()];
        for (block, &weak) in weak_sums.iter().enumerate() {
            let b = cfg.bucket(weak);
            entries[fill[b]] = block;
            fill[b] += 1;
        }

        Self {
            cfg,
            starts,
            entries,
        }
    }

    pub fn cfg(&self) -> BucketCfg {
        self.cfg
    }

    /// Blocks whose weak sum shares a bucket with `weak`, in block order.
    #[inline]
    pub fn bucket_entries(&self, weak: u32) -> &[usize] {
        let b = self.cfg.bucket(weak);
        &self.entries[self.starts[b]..self.starts[b + 1]]
    }

    /// Number of indexed blocks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cfg_sizes() {
        assert_eq!(BucketCfg::new(0).size, 16);
        assert_eq!(BucketCfg::new(3).size, 16);
        assert_eq!(BucketCfg::new(16).size, 16);
        assert_eq!(BucketCfg::new(17).size, 32);
        assert_eq!(BucketCfg::new(1000).size, 1024);
        let cfg = BucketCfg::new(1000);
        assert_eq!(cfg.shift, 22);
        assert_eq!(cfg.mask, 1023);
    }

    #[test]
    fn bucket_in_range() {
        for blocks in [0usize, 1, 100, 5000, 1 << 20] {
            let cfg = BucketCfg::new(blocks);
            for weak in [0u32, 1, 127, 0xdead_beef, u32::MAX] {
                assert!(cfg.bucket(weak) < cfg.size);
            }
        }
    }

    #[test]
    fn entries_keep_block_order() {
        let weak = [7u32, 3, 7, 0x1000_0007, 3, 7];
        let table = BlockTable::build(&weak);
        assert_eq!(table.len(), 6);

        let sevens: Vec<usize> = table
            .bucket_entries(7)
            .iter()
            .copied()
            .filter(|&i| weak[i] == 7)
            .collect();
        assert_eq!(sevens, [0, 2, 5]);

        let bucket = table.bucket_entries(3);
        assert!(bucket.windows(2).all(|w| w[0] < w[1]));
        assert!(bucket.contains(&1) && bucket.contains(&4));
    }

    #[test]
    fn every_block_is_reachable() {
        let weak: Vec<u32> = (0..500u32).map(|i| i.wrapping_mul(0x9e37_79b9)).collect();
        let table = BlockTable::build(&weak);
        for (i, &w) in weak.iter().enumerate() {
            assert!(table.bucket_entries(w).contains(&i));
        }
    }

    #[test]
    fn empty_table() {
        let table = BlockTable::build(&[]);
        assert!(table.is_empty());
        assert!(table.bucket_entries(42).is_empty());
    }
}
