// Blocking adapters over the job engine.
//
// Each reader pulls from a `BufRead` and yields the job's output through
// `Read`, so jobs compose with `io::copy`, `BufReader` and friends. Job
// errors surface as `io::Error`s wrapping the crate `Error`; use
// `Error::from_io` to get it back.

use std::io::{self, BufRead, Read};
use std::sync::Arc;

use crate::basis::{Basis, NoBasis};
use crate::error::{Error, Result};
use crate::hash::config::SignatureOptions;
use crate::job::{Buffers, DeltaOptions, Job, JobStatus, PatchOptions};
use crate::signature::SignatureIndex;
use crate::stats::Stats;

// ---------------------------------------------------------------------------
// Driver
// ---------------------------------------------------------------------------

struct Driver<R, B> {
    job: Job<B>,
    input: R,
    done: bool,
}

impl<R: BufRead, B: Basis> Driver<R, B> {
    fn new(job: Job<B>, input: R) -> Self {
        Self {
            job,
            input,
            done: false,
        }
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<usize> {
        if self.done || buf.is_empty() {
            return Ok(0);
        }
        loop {
            let input = self.input.fill_buf()?;
            let eof = input.is_empty();
            let mut bufs = Buffers::new(input, eof, buf);
            let status = self.job.iter(&mut bufs)?;
            let (consumed, written) = (bufs.consumed(), bufs.written());
            self.input.consume(consumed);

            match status {
                JobStatus::Done => {
                    self.done = true;
                    return Ok(written);
                }
                JobStatus::NeedOutput => return Ok(written),
                JobStatus::NeedInput if written > 0 => return Ok(written),
                JobStatus::NeedInput if eof => {
                    return Err(Error::Io(io::ErrorKind::UnexpectedEof.into()));
                }
                JobStatus::NeedInput => {}
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Readers
// ---------------------------------------------------------------------------

/// Reads the signature of the basis read from `R`.
pub struct SignatureReader<R> {
    driver: Driver<R, NoBasis>,
}

impl<R: BufRead> SignatureReader<R> {
    pub fn new(basis: R, opts: &SignatureOptions) -> Result<Self> {
        Ok(Self {
            driver: Driver::new(Job::signature(opts)?, basis),
        })
    }

    pub fn stats(&self) -> &Stats {
        self.driver.job.stats()
    }
}

impl<R: BufRead> Read for SignatureReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.driver.read(buf)?)
    }
}

/// Reads the delta of the new data read from `R` against a signature.
pub struct DeltaReader<R> {
    driver: Driver<R, NoBasis>,
}

impl<R: BufRead> DeltaReader<R> {
    pub fn new(index: impl Into<Arc<SignatureIndex>>, new_data: R, opts: DeltaOptions) -> Self {
        Self {
            driver: Driver::new(Job::delta(index, opts), new_data),
        }
    }

    pub fn stats(&self) -> &Stats {
        self.driver.job.stats()
    }
}

impl<R: BufRead> Read for DeltaReader<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.driver.read(buf)?)
    }
}

/// Reads the output of applying the delta read from `R` to a basis.
pub struct PatchReader<R, B> {
    driver: Driver<R, B>,
}

impl<R: BufRead, B: Basis> PatchReader<R, B> {
    pub fn new(basis: B, delta: R, opts: PatchOptions) -> Self {
        Self {
            driver: Driver::new(Job::patch(basis, opts), delta),
        }
    }

    pub fn stats(&self) -> &Stats {
        self.driver.job.stats()
    }
}

impl<R: BufRead, B: Basis> Read for PatchReader<R, B> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        Ok(self.driver.read(buf)?)
    }
}

// ---------------------------------------------------------------------------
// Signature loading
// ---------------------------------------------------------------------------

/// Load and index a signature read from `input`.
pub fn load_signature<R: BufRead>(mut input: R) -> Result<SignatureIndex> {
    let mut job = Job::load_signature();
    let mut no_output = [0u8; 0];
    loop {
        let data = input.fill_buf()?;
        let eof = data.is_empty();
        let mut bufs = Buffers::new(data, eof, &mut no_output);
        let status = job.iter(&mut bufs)?;
        let consumed = bufs.consumed();
        input.consume(consumed);

        match status {
            JobStatus::Done => break,
            JobStatus::NeedInput if eof => {
                return Err(Error::Io(io::ErrorKind::UnexpectedEof.into()));
            }
            JobStatus::NeedInput | JobStatus::NeedOutput => {}
        }
    }
    job.into_signature()
        .map(SignatureIndex::new)
        .ok_or(Error::JobFailed)
}
