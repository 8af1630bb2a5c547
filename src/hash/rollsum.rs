// Rolling (weak) checksum matching librsync's `Rollsum` exactly.
//
// Two 16-bit sums over a window of bytes, each byte offset by
// `CHAR_OFFSET` before summing:
//   s1 = sum(b + 31)              (mod 2^16)
//   s2 = sum of prefix sums of s1 (mod 2^16)
// Digest is `(s2 << 16) | s1`.
//
// All arithmetic wraps at 16 bits, which is what librsync's digest
// truncation amounts to. Any other width breaks signature compatibility.

/// Constant added to every byte before summing (librsync `ROLLSUM_CHAR_OFFSET`).
pub const CHAR_OFFSET: u16 = 31;

/// Rolling checksum state over a window of `count` bytes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Rollsum {
    count: usize,
    s1: u16,
    s2: u16,
}

impl Rollsum {
    /// Empty checksum (zero-length window).
    pub const fn new() -> Self {
        Self {
            count: 0,
            s1: 0,
            s2: 0,
        }
    }

    /// Checksum seeded with a full window.
    pub fn from_window(window: &[u8]) -> Self {
        let mut sum = Self::new();
        sum.update(window);
        sum
    }

    /// Extend the window with `buf`.
    ///
    /// Equivalent to calling [`rollin`](Self::rollin) for every byte, but
    /// adds the character offsets in closed form afterwards.
    pub fn update(&mut self, buf: &[u8]) {
        let mut s1 = self.s1;
        let mut s2 = self.s2;

        let mut chunks = buf.chunks_exact(16);
        for chunk in &mut chunks {
            for &b in chunk {
                s1 = s1.wrapping_add(u16::from(b));
                s2 = s2.wrapping_add(s1);
            }
        }
        for &b in chunks.remainder() {
            s1 = s1.wrapping_add(u16::from(b));
            s2 = s2.wrapping_add(s1);
        }

        // len * (len + 1) / 2 can overflow u64 only for absurd lengths;
        // only the low 16 bits matter, so compute it wrapping.
        let len = buf.len() as u64;
        let tri = if len % 2 == 0 {
            (len / 2).wrapping_mul(len.wrapping_add(1))
        } else {
            len.wrapping_mul(len.wrapping_add(1) / 2)
        };
        s1 = s1.wrapping_add((len as u16).wrapping_mul(CHAR_OFFSET));
        s2 = s2.wrapping_add((tri as u16).wrapping_mul(CHAR_OFFSET));

        self.count += buf.len();
        self.s1 = s1;
        self.s2 = s2;
    }

    /// Slide the window by one byte: drop `out`, append `inb`.
    #[inline(always)]
    pub fn rotate(&mut self, out: u8, inb: u8) {
        let out = u16::from(out);
        self.s1 = self.s1.wrapping_add(u16::from(inb)).wrapping_sub(out);
        self.s2 = self.s2.wrapping_add(self.s1).wrapping_sub(
            (self.count as u16).wrapping_mul(out.wrapping_add(CHAR_OFFSET)),
        );
    }

    /// Append one byte, growing the window.
    #[inline(always)]
    pub fn rollin(&mut self, inb: u8) {
        self.s1 = self.s1.wrapping_add(u16::from(inb).wrapping_add(CHAR_OFFSET));
        self.s2 = self.s2.wrapping_add(self.s1);
        self.count += 1;
    }

    /// Drop the oldest byte, shrinking the window.
    #[inline(always)]
    pub fn rollout(&mut self, out: u8) {
        debug_assert!(self.count > 0, "rollout from empty window");
        let out = u16::from(out).wrapping_add(CHAR_OFFSET);
        self.s1 = self.s1.wrapping_sub(out);
        self.s2 = self
            .s2
            .wrapping_sub((self.count as u16).wrapping_mul(out));
        self.count -= 1;
    }

    /// Slide by one byte and return the new digest.
    #[inline]
    pub fn roll(&mut self, out: u8, inb: u8) -> u32 {
        self.rotate(out, inb);
        self.digest()
    }

    /// 32-bit weak sum of the current window.
    #[inline(always)]
    pub fn digest(&self) -> u32 {
        (u32::from(self.s2) << 16) | u32::from(self.s1)
    }

    /// Current window length in bytes.
    #[inline]
    pub fn count(&self) -> usize {
        self.count
    }
}

/// One-shot weak sum of `data`.
pub fn weak_sum(data: &[u8]) -> u32 {
    Rollsum::from_window(data).digest()
}
