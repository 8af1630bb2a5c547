// Signature generation: header, then one `{weak, strong}` record per block.

use log::trace;

use crate::error::Result;
use crate::format::header::SignatureHeader;
use crate::format::netint;
use crate::hash::config::SignatureParams;
use crate::hash::rollsum::weak_sum;
use crate::hash::strong::strong_sum;

use super::{Ctx, Step};

pub(crate) struct SignState {
    params: SignatureParams,
    header_done: bool,
}

impl SignState {
    pub(crate) fn new(params: SignatureParams) -> Self {
        Self {
            params,
            header_done: false,
        }
    }

    pub(crate) fn step(&mut self, ctx: &mut Ctx<'_>) -> Result<Step> {
        let p = self.params;
        if !self.header_done {
            SignatureHeader {
                kind: p.kind,
                block_len: p.block_len,
                strong_len: p.strong_len,
            }
            .encode(ctx.tube.buf());
            ctx.stats.block_len = p.block_len;
            self.header_done = true;
            return Ok(Step::Continue);
        }

        let block_len = p.block_len as usize;
        let avail = ctx.scoop.avail();
        let len = if avail >= block_len {
            block_len
        } else if !ctx.eof {
            return Ok(Step::Need(block_len));
        } else if avail > 0 {
            // Short final block.
            avail
        } else {
            return Ok(Step::Done);
        };

        let block = &ctx.scoop.data()[..len];
        let weak = weak_sum(block);
        let strong = strong_sum(p.kind, block, p.strong_len);
        trace!("block {}: weak={weak:#010x} strong={strong:?}", ctx.stats.sig_blocks);

        let out = ctx.tube.buf();
        netint::put_u32(out, weak);
        out.extend_from_slice(strong.as_slice());
        ctx.scoop.consume(len);
        ctx.stats.sig_blocks += 1;
        Ok(Step::Continue)
    }
}
