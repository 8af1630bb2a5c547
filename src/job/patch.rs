// Patch application: replay a delta against a random-access basis.
//
// Literal payloads and copies are streamed through the tube in bounded
// chunks, so neither a huge literal nor a huge copy is ever buffered whole.
// The whole output is hashed as it is produced and checked against the
// trailer, when the delta carries one.

use log::{debug, trace};

use crate::basis::Basis;
use crate::error::{Error, Result};
use crate::format::codec::{self, Command, TRAILER_DIGEST_LEN, TRAILER_KIND};
use crate::format::header::DELTA_HEADER_LEN;
use crate::hash::strong::{StrongHasher, StrongSum};

use super::{Ctx, Step};

/// Largest piece of a literal or copy moved per step.
const CHUNK: usize = 64 * 1024;

/// Options for patch jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PatchOptions {
    /// Check the output against the delta's trailer, when present.
    pub verify: bool,
}

impl Default for PatchOptions {
    fn default() -> Self {
        Self { verify: true }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Header,
    Command,
    Literal { remaining: u64 },
    Copy { offset: u64, remaining: u64 },
    Trailer,
    Tail,
}

pub(crate) struct PatchState<B> {
    basis: B,
    verify: bool,
    phase: Phase,
    whole: StrongHasher,
    copy_buf: Vec<u8>,
}

impl<B: Basis> PatchState<B> {
    pub(crate) fn new(basis: B, opts: PatchOptions) -> Self {
        Self {
            basis,
            verify: opts.verify,
            phase: Phase::Header,
            whole: StrongHasher::new(TRAILER_KIND),
            copy_buf: Vec::new(),
        }
    }

    pub(crate) fn truncated(&self) -> Error {
        let what = match self.phase {
            Phase::Header => "truncated header",
            Phase::Command => "truncated command",
            Phase::Literal { .. } => "truncated literal",
            Phase::Copy { .. } => "truncated copy",
            Phase::Trailer => "truncated trailer",
            Phase::Tail => "truncated delta",
        };
        Error::malformed_delta(what)
    }

    pub(crate) fn step(&mut self, ctx: &mut Ctx<'_>) -> Result<Step> {
        match self.phase {
            Phase::Header => {
                if ctx.scoop.avail() < DELTA_HEADER_LEN {
                    return Ok(Step::Need(DELTA_HEADER_LEN));
                }
                codec::check_magic(ctx.scoop.data())?;
                ctx.scoop.consume(DELTA_HEADER_LEN);
                self.phase = Phase::Command;
                Ok(Step::Continue)
            }
            Phase::Command => self.command(ctx),
            Phase::Literal { remaining } => self.literal(ctx, remaining),
            Phase::Copy { offset, remaining } => self.copy(ctx, offset, remaining),
            Phase::Trailer => self.trailer(ctx),
            Phase::Tail => {
                if ctx.scoop.avail() > 0 {
                    Err(Error::malformed_delta("trailing bytes after trailer"))
                } else if ctx.eof {
                    Ok(Step::Done)
                } else {
                    Ok(Step::Need(1))
                }
            }
        }
    }

    fn command(&mut self, ctx: &mut Ctx<'_>) -> Result<Step> {
        let Some((cmd, used)) = codec::parse_command(ctx.scoop.data())? else {
            return Ok(Step::Need(ctx.scoop.avail() + 1));
        };
        ctx.scoop.consume(used);
        trace!("{cmd:?}");

        self.phase = match cmd {
            Command::End => Phase::Trailer,
            Command::Literal { len } => {
                ctx.stats.lit_cmds += 1;
                ctx.stats.lit_bytes += len;
                ctx.stats.lit_cmdbytes += used as u64;
                Phase::Literal { remaining: len }
            }
            Command::Copy { offset, len } => {
                let basis_len = self.basis.len();
                if offset.checked_add(len).is_none_or(|end| end > basis_len) {
                    return Err(Error::OutOfRangeCopy {
                        offset,
                        len,
                        basis_len,
                    });
                }
                ctx.stats.copy_cmds += 1;
                ctx.stats.copy_bytes += len;
                ctx.stats.copy_cmdbytes += used as u64;
                Phase::Copy {
                    offset,
                    remaining: len,
                }
            }
        };
        Ok(Step::Continue)
    }

    fn literal(&mut self, ctx: &mut Ctx<'_>, remaining: u64) -> Result<Step> {
        if remaining == 0 {
            self.phase = Phase::Command;
            return Ok(Step::Continue);
        }
        let avail = ctx.scoop.avail();
        if avail == 0 {
            return Ok(Step::Need(1));
        }
        let n = remaining.min(avail.min(CHUNK) as u64) as usize;
        let data = &ctx.scoop.data()[..n];
        self.whole.update(data);
        ctx.tube.extend(data);
        ctx.scoop.consume(n);
        self.phase = Phase::Literal {
            remaining: remaining - n as u64,
        };
        Ok(Step::Continue)
    }

    fn copy(&mut self, ctx: &mut Ctx<'_>, offset: u64, remaining: u64) -> Result<Step> {
        if remaining == 0 {
            self.phase = Phase::Command;
            return Ok(Step::Continue);
        }
        let n = remaining.min(CHUNK as u64) as usize;
        match self.basis.slice(offset, n) {
            Some(data) => {
                self.whole.update(data);
                ctx.tube.extend(data);
            }
            None => {
                self.copy_buf.resize(n, 0);
                self.basis.read_at(offset, &mut self.copy_buf)?;
                self.whole.update(&self.copy_buf);
                ctx.tube.extend(&self.copy_buf);
            }
        }
        self.phase = Phase::Copy {
            offset: offset + n as u64,
            remaining: remaining - n as u64,
        };
        Ok(Step::Continue)
    }

    fn trailer(&mut self, ctx: &mut Ctx<'_>) -> Result<Step> {
        let data = ctx.scoop.data();
        let Some(&len) = data.first() else {
            if ctx.eof {
                debug!("delta has no trailer; output not verified");
                return Ok(Step::Done);
            }
            return Ok(Step::Need(1));
        };
        if len as usize != TRAILER_DIGEST_LEN {
            return Err(Error::malformed_delta(format!("bad trailer length {len}")));
        }
        let total = 1 + TRAILER_DIGEST_LEN;
        if data.len() < total {
            return Ok(Step::Need(total));
        }

        let expected = StrongSum::from_slice(&data[1..total]);
        ctx.scoop.consume(total);
        if self.verify {
            let actual = self.whole.clone().finalize(TRAILER_DIGEST_LEN);
            if actual != expected {
                debug!("trailer mismatch: expected {expected:?}, got {actual:?}");
                return Err(Error::CorruptPatch);
            }
            trace!("trailer verified");
        }
        self.phase = Phase::Tail;
        Ok(Step::Continue)
    }
}
