// Whole-stream entry points over the job engine.
//
// Provides:
//   - in-memory helpers (`build_signature`, `load_signature`,
//     `compute_delta`, `apply_patch`) for buffers that fit in memory
//   - `Read`/`Write` pumps (`signature`, `delta`, `patch`) that stream
//     through fixed-size buffers and return the job's statistics

use std::io::{self, Read, Write};
use std::sync::Arc;

use crate::basis::Basis;
use crate::error::{Error, Result};
use crate::hash::config::SignatureOptions;
use crate::job::{Buffers, DeltaOptions, Job, JobStatus, PatchOptions};
use crate::signature::SignatureIndex;
use crate::stats::Stats;
use crate::stream;

/// Size of the input and output buffers used by the pumps.
const BUF_SIZE: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// In-memory
// ---------------------------------------------------------------------------

/// Signature of `basis`.
///
/// When `opts` has no length hint, the basis length is used for the
/// automatic block and strong length choices.
pub fn build_signature(basis: &[u8], opts: &SignatureOptions) -> Result<Vec<u8>> {
    let opts = SignatureOptions {
        basis_len_hint: opts.basis_len_hint.or(Some(basis.len() as u64)),
        ..*opts
    };
    run_in_memory(Job::signature(&opts)?, basis)
}

/// Parse and index a signature held in memory.
pub fn load_signature(signature: &[u8]) -> Result<SignatureIndex> {
    stream::load_signature(signature)
}

/// Delta of `new_data` against an indexed signature.
pub fn compute_delta(
    index: impl Into<Arc<SignatureIndex>>,
    new_data: &[u8],
    opts: DeltaOptions,
) -> Result<Vec<u8>> {
    run_in_memory(Job::delta(index, opts), new_data)
}

/// Rebuild the new data from `basis` and `delta`.
pub fn apply_patch(basis: &[u8], delta: &[u8], opts: PatchOptions) -> Result<Vec<u8>> {
    run_in_memory(Job::patch(basis, opts), delta)
}

fn run_in_memory<B: Basis>(mut job: Job<B>, input: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::new();
    let mut chunk = vec![0u8; BUF_SIZE];
    let mut pos = 0;
    loop {
        let mut bufs = Buffers::new(&input[pos..], true, &mut chunk);
        let status = job.iter(&mut bufs)?;
        pos += bufs.consumed();
        let written = bufs.written();
        out.extend_from_slice(&chunk[..written]);
        match status {
            JobStatus::Done => return Ok(out),
            JobStatus::NeedOutput => {}
            JobStatus::NeedInput => return Err(Error::Io(io::ErrorKind::UnexpectedEof.into())),
        }
    }
}

// ---------------------------------------------------------------------------
// Streaming
// ---------------------------------------------------------------------------

/// Write the signature of everything read from `basis` to `out`.
pub fn signature<R: Read, W: Write>(basis: R, out: W, opts: &SignatureOptions) -> Result<Stats> {
    pump(Job::signature(opts)?, basis, out)
}

/// Write the delta of everything read from `new_data` to `out`.
pub fn delta<R: Read, W: Write>(
    index: impl Into<Arc<SignatureIndex>>,
    new_data: R,
    out: W,
    opts: DeltaOptions,
) -> Result<Stats> {
    pump(Job::delta(index, opts), new_data, out)
}

/// Apply the delta read from `delta` to `basis`, writing the result to `out`.
pub fn patch<B: Basis, R: Read, W: Write>(
    basis: B,
    delta: R,
    out: W,
    opts: PatchOptions,
) -> Result<Stats> {
    pump(Job::patch(basis, opts), delta, out)
}

fn pump<B: Basis, R: Read, W: Write>(mut job: Job<B>, mut input: R, mut out: W) -> Result<Stats> {
    let mut in_buf = vec![0u8; BUF_SIZE];
    let mut out_buf = vec![0u8; BUF_SIZE];
    let (mut start, mut end) = (0, 0);
    let mut eof = false;

    loop {
        if start == end && !eof {
            start = 0;
            end = read_some(&mut input, &mut in_buf)?;
            eof = end == 0;
        }
        let mut bufs = Buffers::new(&in_buf[start..end], eof, &mut out_buf);
        let status = job.iter(&mut bufs)?;
        start += bufs.consumed();
        let written = bufs.written();
        out.write_all(&out_buf[..written])?;

        if status == JobStatus::Done {
            break;
        }
    }
    out.flush()?;
    Ok(job.stats().clone())
}

fn read_some<R: Read>(input: &mut R, buf: &mut [u8]) -> Result<usize> {
    loop {
        match input.read(buf) {
            Ok(n) => return Ok(n),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
}
