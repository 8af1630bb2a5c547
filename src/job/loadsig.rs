// Signature loading: parse the header, then append records as they arrive.
//
// Nothing is sized from the header's block count (there is none) or from
// any other untrusted length; the block list grows one record at a time.

use log::debug;

use crate::error::{Error, Result};
use crate::format::header::{SIG_HEADER_LEN, SignatureHeader};
use crate::signature::Signature;

use super::{Ctx, Step};

pub(crate) struct LoadSigState {
    sig: Option<Signature>,
}

impl LoadSigState {
    pub(crate) fn new() -> Self {
        Self { sig: None }
    }

    pub(crate) fn into_signature(self) -> Option<Signature> {
        self.sig
    }

    pub(crate) fn truncated(&self) -> Error {
        match self.sig {
            None => Error::malformed_signature("truncated header"),
            Some(_) => Error::malformed_signature("truncated block record"),
        }
    }

    pub(crate) fn step(&mut self, ctx: &mut Ctx<'_>) -> Result<Step> {
        let Some(sig) = &mut self.sig else {
            if ctx.scoop.avail() < SIG_HEADER_LEN {
                return Ok(Step::Need(SIG_HEADER_LEN));
            }
            let header = SignatureHeader::decode(&ctx.scoop.data()[..SIG_HEADER_LEN])?;
            debug!(
                "loading {} signature: block_len={} strong_len={}",
                header.kind.name(),
                header.block_len,
                header.strong_len
            );
            ctx.scoop.consume(SIG_HEADER_LEN);
            ctx.stats.block_len = header.block_len;
            self.sig = Some(Signature::from_header(header));
            return Ok(Step::Continue);
        };

        let record_len = sig.header().record_len();
        while ctx.scoop.avail() >= record_len {
            sig.push_record(&ctx.scoop.data()[..record_len]);
            ctx.scoop.consume(record_len);
            ctx.stats.sig_blocks += 1;
        }

        if ctx.scoop.avail() == 0 && ctx.eof {
            Ok(Step::Done)
        } else {
            Ok(Step::Need(record_len))
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::Error;
    use crate::hash::strong::SignatureKind;
    use crate::job::Job;
    use crate::job::tests::drive;

    const RDIFF_SIG: [u8; 39] = [
        0x72, 0x73, 0x01, 0x36, 0x00, 0x00, 0x00, 0x0a, 0x00, 0x00, 0x00, 0x05, 0x1b, 0x21, 0x04,
        0x8b, 0xad, 0x3c, 0xbd, 0x19, 0x09, 0x1d, 0x1b, 0x04, 0xf0, 0x9d, 0x1f, 0x64, 0x31, 0xde,
        0x15, 0xf4, 0x04, 0x87, 0x60, 0x96, 0x19, 0x50, 0x39,
    ];

    #[test]
    fn loads_in_any_chunking() {
        for chunk in [1, 2, 5, 12, 13, 39] {
            let mut job = Job::load_signature();
            let out = drive(&mut job, &RDIFF_SIG, chunk, 16).unwrap();
            assert!(out.is_empty());
            assert_eq!(job.stats().sig_blocks, 3);
            let sig = job.into_signature().unwrap();
            assert_eq!(sig.kind(), SignatureKind::Md4);
            assert_eq!(sig.len(), 3);
            assert_eq!(sig.encode(), RDIFF_SIG);
        }
    }

    #[test]
    fn header_only_is_empty_signature() {
        let mut job = Job::load_signature();
        drive(&mut job, &RDIFF_SIG[..12], 4, 16).unwrap();
        assert!(job.into_signature().unwrap().is_empty());
    }

    #[test]
    fn truncation_is_malformed() {
        for cut in [0, 5, 11, 13, 20, 38] {
            let mut job = Job::load_signature();
            let err = drive(&mut job, &RDIFF_SIG[..cut], 4, 16).unwrap_err();
            assert!(matches!(err, Error::MalformedSignature(_)), "cut {cut}: {err}");
        }
    }

    #[test]
    fn bad_magic_is_malformed() {
        let mut bad = RDIFF_SIG;
        bad[3] = 0x46;
        let mut job = Job::load_signature();
        let err = drive(&mut job, &bad, 64, 16).unwrap_err();
        assert!(matches!(err, Error::MalformedSignature(_)));
    }

    #[test]
    fn unfinished_job_has_no_signature() {
        assert!(Job::load_signature().into_signature().is_none());
    }
}
