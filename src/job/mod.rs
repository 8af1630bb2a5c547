// Streaming job engine.
//
// A `Job` runs one operation (sign, load signature, delta, patch) over
// caller-supplied buffers and suspends whenever it needs more input or more
// output space:
//
//   caller ──input──▶ scoop ──stage──▶ tube ──output──▶ caller
//
// - The scoop accumulates just enough input for the stage's next decision.
// - The tube holds output the stage produced but the caller has not taken
//   yet; it is always drained before the stage runs again.
// - A stage step either makes progress or asks for `n` buffered bytes.
//
// Because stages see only the scoop contents and the end-of-input flag,
// feeding the same stream in different chunk sizes gives identical output.

mod delta;
mod loadsig;
mod patch;
mod sign;

use std::sync::Arc;

use log::{debug, info};

use crate::basis::{Basis, NoBasis};
use crate::error::{Error, Result};
use crate::hash::config::SignatureOptions;
use crate::signature::{Signature, SignatureIndex};
use crate::stats::{JobKind, Stats};

pub use delta::DeltaOptions;
pub use patch::PatchOptions;

/// Extra input pulled into the scoop beyond what a stage asked for.
const READAHEAD: usize = 64 * 1024;

/// Consumed scoop prefix size that triggers compaction.
const COMPACT_AT: usize = 64 * 1024;

// ---------------------------------------------------------------------------
// Caller buffers
// ---------------------------------------------------------------------------

/// Input and output windows for one call to [`Job::iter`].
///
/// After the call, [`consumed`](Self::consumed) input bytes may be discarded
/// and the first [`written`](Self::written) output bytes are valid.
#[derive(Debug)]
pub struct Buffers<'a> {
    input: &'a [u8],
    eof: bool,
    output: &'a mut [u8],
    consumed: usize,
    written: usize,
}

impl<'a> Buffers<'a> {
    /// `eof` says that `input` is the last of the stream.
    pub fn new(input: &'a [u8], eof: bool, output: &'a mut [u8]) -> Self {
        Self {
            input,
            eof,
            output,
            consumed: 0,
            written: 0,
        }
    }

    pub fn consumed(&self) -> usize {
        self.consumed
    }

    pub fn written(&self) -> usize {
        self.written
    }

    pub fn eof(&self) -> bool {
        self.eof
    }

    /// True once the caller has declared end of input and all of it was taken.
    fn at_eof(&self) -> bool {
        self.eof && self.consumed == self.input.len()
    }

    fn take_input(&mut self, max: usize) -> &'a [u8] {
        let input = self.input;
        let rest = &input[self.consumed..];
        let n = rest.len().min(max);
        self.consumed += n;
        &rest[..n]
    }

    fn put_output(&mut self, data: &[u8]) -> usize {
        let space = &mut self.output[self.written..];
        let n = space.len().min(data.len());
        space[..n].copy_from_slice(&data[..n]);
        self.written += n;
        n
    }
}

/// Why [`Job::iter`] returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// All input was consumed; call again with more (or with `eof` set).
    NeedInput,
    /// The output buffer is full; drain it and call again.
    NeedOutput,
    /// The job finished and all of its output has been written.
    Done,
}

// ---------------------------------------------------------------------------
// Scoop and tube
// ---------------------------------------------------------------------------

/// Accumulated, not yet consumed input.
#[derive(Debug, Default)]
pub(crate) struct Scoop {
    buf: Vec<u8>,
    start: usize,
}

impl Scoop {
    #[inline]
    pub(crate) fn avail(&self) -> usize {
        self.buf.len() - self.start
    }

    #[inline]
    pub(crate) fn data(&self) -> &[u8] {
        &self.buf[self.start..]
    }

    #[inline]
    pub(crate) fn consume(&mut self, n: usize) {
        debug_assert!(n <= self.avail());
        self.start += n;
    }

    /// Top up from `bufs` until `want` bytes are buffered or input runs out.
    /// Returns the number of bytes taken.
    fn fill(&mut self, bufs: &mut Buffers<'_>, want: usize) -> usize {
        let avail = self.avail();
        if avail >= want {
            return 0;
        }
        if self.start == self.buf.len() {
            self.buf.clear();
            self.start = 0;
        } else if self.start >= COMPACT_AT {
            self.buf.drain(..self.start);
            self.start = 0;
        }
        let chunk = bufs.take_input((want - avail).max(READAHEAD));
        self.buf.extend_from_slice(chunk);
        chunk.len()
    }
}

/// Output produced by a stage but not yet handed to the caller.
#[derive(Debug, Default)]
pub(crate) struct Tube {
    buf: Vec<u8>,
    pos: usize,
}

impl Tube {
    pub(crate) fn buf(&mut self) -> &mut Vec<u8> {
        &mut self.buf
    }

    pub(crate) fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    fn is_empty(&self) -> bool {
        self.pos == self.buf.len()
    }

    fn drain(&mut self, bufs: &mut Buffers<'_>) -> usize {
        let n = bufs.put_output(&self.buf[self.pos..]);
        self.pos += n;
        if self.is_empty() {
            self.buf.clear();
            self.pos = 0;
        }
        n
    }
}

// ---------------------------------------------------------------------------
// Stages
// ---------------------------------------------------------------------------

/// Outcome of one stage step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Step {
    /// Progress was made; run again.
    Continue,
    /// At least this many bytes must be in the scoop before the next step.
    Need(usize),
    Done,
}

/// What a stage step may touch.
pub(crate) struct Ctx<'a> {
    pub scoop: &'a mut Scoop,
    pub tube: &'a mut Tube,
    pub stats: &'a mut Stats,
    /// No input exists beyond what is in the scoop.
    pub eof: bool,
}

pub(crate) enum Stage<B> {
    Sign(sign::SignState),
    LoadSignature(loadsig::LoadSigState),
    Delta(delta::DeltaState),
    Patch(patch::PatchState<B>),
}

impl<B: Basis> Stage<B> {
    fn step(&mut self, ctx: &mut Ctx<'_>) -> Result<Step> {
        match self {
            Self::Sign(s) => s.step(ctx),
            Self::LoadSignature(s) => s.step(ctx),
            Self::Delta(s) => s.step(ctx),
            Self::Patch(s) => s.step(ctx),
        }
    }

    /// Error for input that ended while the stage still needed bytes.
    fn truncated(&self) -> Error {
        match self {
            Self::LoadSignature(s) => s.truncated(),
            Self::Patch(s) => s.truncated(),
            Self::Sign(_) | Self::Delta(_) => Error::Io(std::io::ErrorKind::UnexpectedEof.into()),
        }
    }
}

// ---------------------------------------------------------------------------
// Job
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Running,
    Done,
    Failed,
}

/// One streaming operation.
///
/// Create with [`Job::signature`], [`Job::load_signature`], [`Job::delta`]
/// or [`Job::patch`], then call [`iter`](Self::iter) until it returns
/// [`JobStatus::Done`]. Dropping a job cancels it.
pub struct Job<B = NoBasis> {
    stage: Stage<B>,
    scoop: Scoop,
    tube: Tube,
    stats: Stats,
    state: State,
}

impl Job<NoBasis> {
    /// Build a signature of the basis fed as input.
    pub fn signature(opts: &SignatureOptions) -> Result<Self> {
        let params = opts.resolve()?;
        debug!(
            "signature job: {} block_len={} strong_len={}",
            params.kind.name(),
            params.block_len,
            params.strong_len
        );
        Ok(Self::with_stage(
            Stage::Sign(sign::SignState::new(params)),
            JobKind::Signature,
        ))
    }

    /// Parse a signature stream fed as input; see [`into_signature`](Self::into_signature).
    pub fn load_signature() -> Self {
        debug!("loadsig job");
        Self::with_stage(
            Stage::LoadSignature(loadsig::LoadSigState::new()),
            JobKind::LoadSignature,
        )
    }

    /// Compute a delta of the new data fed as input against `index`.
    pub fn delta(index: impl Into<Arc<SignatureIndex>>, opts: DeltaOptions) -> Self {
        let index = index.into();
        debug!(
            "delta job: {} blocks of {} bytes, trailer={}",
            index.signature().len(),
            index.signature().block_len(),
            opts.trailer
        );
        Self::with_stage(
            Stage::Delta(delta::DeltaState::new(index, opts)),
            JobKind::Delta,
        )
    }

    /// The loaded signature, once a [`load_signature`](Self::load_signature)
    /// job is done.
    pub fn into_signature(self) -> Option<Signature> {
        match (self.state, self.stage) {
            (State::Done, Stage::LoadSignature(s)) => s.into_signature(),
            _ => None,
        }
    }
}

impl<B: Basis> Job<B> {
    /// Apply the delta fed as input to `basis`.
    pub fn patch(basis: B, opts: PatchOptions) -> Self {
        debug!(
            "patch job: basis_len={} verify={}",
            basis.len(),
            opts.verify
        );
        Self::with_stage(
            Stage::Patch(patch::PatchState::new(basis, opts)),
            JobKind::Patch,
        )
    }

    fn with_stage(stage: Stage<B>, kind: JobKind) -> Self {
        Self {
            stage,
            scoop: Scoop::default(),
            tube: Tube::default(),
            stats: Stats::new(kind),
            state: State::Running,
        }
    }

    pub fn stats(&self) -> &Stats {
        &self.stats
    }

    pub fn is_done(&self) -> bool {
        self.state == State::Done
    }

    /// Run until the job needs input, needs output space, or is done.
    ///
    /// Any error ends the job; later calls return [`Error::JobFailed`].
    pub fn iter(&mut self, bufs: &mut Buffers<'_>) -> Result<JobStatus> {
        if self.state == State::Failed {
            return Err(Error::JobFailed);
        }
        let res = self.run(bufs);
        if let Err(e) = &res {
            debug!("{} job failed: {e}", self.stats.kind.name());
            self.state = State::Failed;
        }
        res
    }

    fn run(&mut self, bufs: &mut Buffers<'_>) -> Result<JobStatus> {
        loop {
            self.stats.out_bytes += self.tube.drain(bufs) as u64;
            if !self.tube.is_empty() {
                return Ok(JobStatus::NeedOutput);
            }
            if self.state == State::Done {
                return Ok(JobStatus::Done);
            }

            let eof = bufs.at_eof();
            let mut ctx = Ctx {
                scoop: &mut self.scoop,
                tube: &mut self.tube,
                stats: &mut self.stats,
                eof,
            };
            match self.stage.step(&mut ctx)? {
                Step::Continue => {}
                Step::Done => {
                    self.state = State::Done;
                    info!("{}", self.stats);
                }
                Step::Need(n) => {
                    if eof {
                        return Err(self.stage.truncated());
                    }
                    self.stats.in_bytes += self.scoop.fill(bufs, n) as u64;
                    if self.scoop.avail() < n && !bufs.at_eof() {
                        return Ok(JobStatus::NeedInput);
                    }
                }
            }
        }
    }
}

impl<B> std::fmt::Debug for Job<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Job")
            .field("kind", &self.stats.kind)
            .field("state", &self.state)
            .field("buffered", &self.scoop.avail())
            .finish()
    }
}
