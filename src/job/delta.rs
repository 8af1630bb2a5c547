// Delta generation.
//
// Scoop layout while scanning:
//
//   [ pending literal (lit) | window (win) | lookahead ... ]
//
// The window's rolling checksum is kept in `sum`. Each window position is
// looked up once (`checked`); a verified block flushes the literal, extends
// or replaces the pending copy and jumps past the window. A miss flushes the
// pending copy and slides the window one byte, or at end of input shrinks it
// from the front so the short final basis block can still match.
//
// Every decision is made from the scoop contents and the eof flag alone, so
// the output does not depend on how the input was chunked.

use std::sync::Arc;

use log::trace;

use crate::error::Result;
use crate::format::codec::{self, TRAILER_DIGEST_LEN, TRAILER_KIND};
use crate::hash::rollsum::Rollsum;
use crate::hash::strong::StrongHasher;
use crate::signature::SignatureIndex;

use super::{Ctx, Step};

/// Longest literal run emitted as one command.
pub(crate) const MAX_LITERAL_RUN: usize = 32 * 1024;

/// Options for delta jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeltaOptions {
    /// Append the BLAKE2b-256 of the whole new data after `End`.
    ///
    /// Off gives output byte-identical to `rdiff delta`.
    pub trailer: bool,
}

impl Default for DeltaOptions {
    fn default() -> Self {
        Self { trailer: true }
    }
}

impl DeltaOptions {
    /// librsync-compatible output (no trailer).
    pub fn rdiff() -> Self {
        Self { trailer: false }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Header,
    Scan,
    Finish,
}

/// Copy not yet emitted; grows while matches stay contiguous in the basis.
#[derive(Debug, Clone, Copy)]
struct PendingCopy {
    offset: u64,
    len: u64,
}

pub(crate) struct DeltaState {
    index: Arc<SignatureIndex>,
    phase: Phase,
    block_len: usize,
    lit: usize,
    win: usize,
    sum: Rollsum,
    seeded: bool,
    checked: bool,
    pending: Option<PendingCopy>,
    last_block: Option<usize>,
    whole: Option<StrongHasher>,
}

impl DeltaState {
    pub(crate) fn new(index: Arc<SignatureIndex>, opts: DeltaOptions) -> Self {
        let block_len = index.signature().block_len() as usize;
        Self {
            index,
            phase: Phase::Header,
            block_len,
            lit: 0,
            win: 0,
            sum: Rollsum::new(),
            seeded: false,
            checked: false,
            pending: None,
            last_block: None,
            whole: opts.trailer.then(|| StrongHasher::new(TRAILER_KIND)),
        }
    }

    pub(crate) fn step(&mut self, ctx: &mut Ctx<'_>) -> Result<Step> {
        match self.phase {
            Phase::Header => {
                codec::encode_magic(ctx.tube.buf());
                ctx.stats.block_len = self.block_len as u32;
                ctx.stats.sig_blocks = self.index.signature().len() as u64;
                self.phase = Phase::Scan;
                Ok(Step::Continue)
            }
            Phase::Scan => self.scan(ctx),
            Phase::Finish => {
                self.flush_copy(ctx);
                self.flush_literal(ctx);
                codec::encode_end(ctx.tube.buf());
                trace!("END");
                if let Some(whole) = self.whole.take() {
                    let digest = whole.finalize(TRAILER_DIGEST_LEN);
                    codec::encode_trailer(ctx.tube.buf(), &digest);
                    trace!("trailer {digest:?}");
                }
                Ok(Step::Done)
            }
        }
    }

    fn scan(&mut self, ctx: &mut Ctx<'_>) -> Result<Step> {
        loop {
            if !self.seeded {
                let ahead = ctx.scoop.avail() - self.lit;
                let win = if ahead >= self.block_len {
                    self.block_len
                } else if !ctx.eof {
                    return Ok(Step::Need(self.lit + self.block_len));
                } else {
                    ahead
                };
                let window = &ctx.scoop.data()[self.lit..self.lit + win];
                self.sum = Rollsum::from_window(window);
                self.win = win;
                self.seeded = true;
                self.checked = false;
            }

            if self.win == 0 {
                self.phase = Phase::Finish;
                return Ok(Step::Continue);
            }

            if !self.checked {
                self.checked = true;
                if self.try_match(ctx) {
                    return Ok(Step::Continue);
                }
            }

            // Miss: the pending copy precedes any literal bytes.
            if self.pending.is_some() {
                self.flush_copy(ctx);
                return Ok(Step::Continue);
            }

            let data = ctx.scoop.data();
            let (lit, win) = (self.lit, self.win);
            if lit + win < data.len() {
                self.sum.rotate(data[lit], data[lit + win]);
            } else if ctx.eof {
                self.sum.rollout(data[lit]);
                self.win -= 1;
            } else {
                return Ok(Step::Need(lit + win + 1));
            }
            self.lit += 1;
            self.checked = false;

            if self.lit >= MAX_LITERAL_RUN {
                self.flush_literal(ctx);
                return Ok(Step::Continue);
            }
        }
    }

    /// Look up the current window; on a verified match, emit what precedes it
    /// and move past it.
    fn try_match(&mut self, ctx: &mut Ctx<'_>) -> bool {
        let (lit, win) = (self.lit, self.win);
        let window = &ctx.scoop.data()[lit..lit + win];
        let prefer = self.last_block.map(|b| b + 1);
        let lookup = self.index.find_match(self.sum.digest(), window, prefer);
        ctx.stats.false_matches += u64::from(lookup.false_matches);
        let Some(block) = lookup.block else {
            return false;
        };

        self.flush_literal(ctx);
        let window = &ctx.scoop.data()[..win];
        if let Some(whole) = &mut self.whole {
            whole.update(window);
        }

        let offset = self.index.signature().block_offset(block);
        let len = win as u64;
        match self.pending {
            Some(ref mut p) if p.offset + p.len == offset => p.len += len,
            _ => {
                self.flush_copy(ctx);
                self.pending = Some(PendingCopy { offset, len });
            }
        }

        ctx.scoop.consume(win);
        self.last_block = Some(block);
        self.seeded = false;
        true
    }

    fn flush_literal(&mut self, ctx: &mut Ctx<'_>) {
        let n = self.lit;
        if n == 0 {
            return;
        }
        let data = &ctx.scoop.data()[..n];
        let out = ctx.tube.buf();
        let before = out.len();
        codec::encode_literal(out, n as u64);
        ctx.stats.lit_cmdbytes += (out.len() - before) as u64;
        out.extend_from_slice(data);
        if let Some(whole) = &mut self.whole {
            whole.update(data);
        }
        trace!("LITERAL len={n}");

        ctx.stats.lit_cmds += 1;
        ctx.stats.lit_bytes += n as u64;
        ctx.scoop.consume(n);
        self.lit = 0;
    }

    fn flush_copy(&mut self, ctx: &mut Ctx<'_>) {
        let Some(PendingCopy { offset, len }) = self.pending.take() else {
            return;
        };
        let out = ctx.tube.buf();
        let before = out.len();
        codec::encode_copy(out, offset, len);
        trace!("COPY offset={offset} len={len}");
        ctx.stats.copy_cmds += 1;
        ctx.stats.copy_bytes += len;
        ctx.stats.copy_cmdbytes += (out.len() - before) as u64;
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::format::codec::{Instruction, InstructionIter};
    use crate::hash::config::SignatureOptions;
    use crate::hash::strong::SignatureKind;
    use crate::job::Job;
    use crate::job::tests::drive;
    use crate::signature::Signature;

    const RDIFF_DELTA: [u8; 26] = [
        0x72, 0x73, 0x02, 0x36, 0x41, 0x10, 0x74, 0x68, 0x69, 0x73, 0x20, 0x69, 0x73, 0x20, 0x61,
        0x6e, 0x6f, 0x74, 0x68, 0x65, 0x72, 0x20, 0x45, 0x0a, 0x13, 0x00,
    ];

    fn index_of(basis: &[u8], opts: &SignatureOptions) -> Arc<SignatureIndex> {
        let mut job = Job::signature(opts).unwrap();
        let sig = drive(&mut job, basis, basis.len().max(1), 1 << 16).unwrap();
        Arc::new(SignatureIndex::new(Signature::parse(&sig).unwrap()))
    }

    fn delta(index: &Arc<SignatureIndex>, new: &[u8], opts: DeltaOptions, chunk: usize) -> Vec<u8> {
        let mut job = Job::delta(Arc::clone(index), opts);
        drive(&mut job, new, chunk, 4096).unwrap()
    }

    fn instructions(delta: &[u8]) -> Vec<Instruction<'_>> {
        InstructionIter::new(delta)
            .unwrap()
            .collect::<Result<Vec<_>>>()
            .unwrap()
    }

    fn md4_10_5() -> SignatureOptions {
        SignatureOptions::new(SignatureKind::Md4)
            .block_len(10)
            .strong_len(5)
    }

    #[test]
    fn matches_rdiff() {
        let index = index_of(b"this is a string to be tested", &md4_10_5());
        for chunk in [1, 2, 7, 64] {
            let out = delta(
                &index,
                b"this is another string to be tested",
                DeltaOptions::rdiff(),
                chunk,
            );
            assert_eq!(out, RDIFF_DELTA, "chunk {chunk}");
        }
    }

    #[test]
    fn trailer_follows_end() {
        let index = index_of(b"this is a string to be tested", &md4_10_5());
        let new = b"this is another string to be tested";
        let out = delta(&index, new, DeltaOptions::default(), 5);
        assert_eq!(out[..RDIFF_DELTA.len()], RDIFF_DELTA);
        let mut it = InstructionIter::new(&out).unwrap();
        while it.next().is_some() {}
        let expected = crate::hash::strong::strong_sum(TRAILER_KIND, new, TRAILER_DIGEST_LEN);
        assert_eq!(it.trailer().unwrap(), Some(expected));
    }

    #[test]
    fn identical_input_is_one_copy() {
        let basis: Vec<u8> = (0..10_000u32).map(|i| (i * 31 % 251) as u8).collect();
        let index = index_of(&basis, &SignatureOptions::default().block_len(512));
        let out = delta(&index, &basis, DeltaOptions::rdiff(), 333);
        assert_eq!(
            instructions(&out),
            [
                Instruction::Copy {
                    offset: 0,
                    len: 10_000
                },
                Instruction::End
            ]
        );
    }

    #[test]
    fn empty_signature_gives_literals() {
        let index = index_of(b"", &md4_10_5());
        let out = delta(&index, b"fresh data", DeltaOptions::rdiff(), 3);
        assert_eq!(
            instructions(&out),
            [Instruction::Literal(b"fresh data"), Instruction::End]
        );
    }

    #[test]
    fn empty_new_data_is_end_only() {
        let index = index_of(b"some basis", &md4_10_5());
        let out = delta(&index, b"", DeltaOptions::rdiff(), 1);
        assert_eq!(out, [0x72, 0x73, 0x02, 0x36, 0x00]);
    }

    #[test]
    fn long_literal_runs_are_split() {
        let index = index_of(b"", &md4_10_5());
        let new: Vec<u8> = (0..MAX_LITERAL_RUN * 2 + 5).map(|i| (i % 253) as u8).collect();
        let out = delta(&index, &new, DeltaOptions::rdiff(), 4096);
        let lens: Vec<u64> = instructions(&out)
            .iter()
            .map(Instruction::output_len)
            .collect();
        assert_eq!(
            lens,
            [MAX_LITERAL_RUN as u64, MAX_LITERAL_RUN as u64, 5, 0]
        );
    }

    #[test]
    fn reordered_blocks_become_copies() {
        let a = [b'a'; 16];
        let b = [b'b'; 16];
        let c = [b'c'; 16];
        let basis = [a, b, c].concat();
        let index = index_of(&basis, &SignatureOptions::default().block_len(16));
        let new = [c, a, b].concat();
        let out = delta(&index, &new, DeltaOptions::rdiff(), 5);
        assert_eq!(
            instructions(&out),
            [
                Instruction::Copy { offset: 32, len: 16 },
                Instruction::Copy { offset: 0, len: 32 },
                Instruction::End
            ]
        );
    }

    #[test]
    fn stats_are_counted() {
        let index = index_of(b"this is a string to be tested", &md4_10_5());
        let mut job = Job::delta(index, DeltaOptions::rdiff());
        let out = drive(&mut job, b"this is another string to be tested", 8, 8).unwrap();
        let stats = job.stats();
        assert_eq!(stats.lit_cmds, 1);
        assert_eq!(stats.lit_bytes, 16);
        assert_eq!(stats.lit_cmdbytes, 2);
        assert_eq!(stats.copy_cmds, 1);
        assert_eq!(stats.copy_bytes, 19);
        assert_eq!(stats.copy_cmdbytes, 3);
        assert_eq!(stats.in_bytes, 35);
        assert_eq!(stats.out_bytes, out.len() as u64);
    }
}
