// Error type shared by every job and convenience API.
//
// Each variant is raised at the point the problem is first observed and
// ends the job that observed it. Nothing is retried internally.

use std::io;

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Signature stream has a bad header or ends mid-record.
    #[error("malformed signature: {0}")]
    MalformedSignature(String),

    /// Delta stream has a bad magic, an unknown command or ends early.
    #[error("malformed delta: {0}")]
    MalformedDelta(String),

    /// A copy command reaches past the end of the basis.
    #[error("copy of {len} bytes at offset {offset} exceeds basis length {basis_len}")]
    OutOfRangeCopy { offset: u64, len: u64, basis_len: u64 },

    /// The patched output does not hash to the checksum carried by the delta.
    #[error("patch output checksum mismatch (wrong basis or corrupted delta)")]
    CorruptPatch,

    /// Invalid block or strong length requested for a signature.
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The job already failed; it cannot make further progress.
    #[error("job already failed")]
    JobFailed,
}

impl Error {
    pub(crate) fn malformed_signature(msg: impl Into<String>) -> Self {
        Self::MalformedSignature(msg.into())
    }

    pub(crate) fn malformed_delta(msg: impl Into<String>) -> Self {
        Self::MalformedDelta(msg.into())
    }

    pub(crate) fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Recover the crate error from an `io::Error` produced by the `Read`
    /// adapters; other I/O errors become [`Error::Io`].
    pub fn from_io(e: io::Error) -> Self {
        if e.get_ref().is_some_and(|inner| inner.is::<Error>()) {
            if let Some(inner) = e.into_inner() {
                if let Ok(err) = inner.downcast::<Error>() {
                    return *err;
                }
            }
            return Error::JobFailed;
        }
        Error::Io(e)
    }
}

impl From<Error> for io::Error {
    fn from(e: Error) -> io::Error {
        match e {
            Error::Io(inner) => inner,
            Error::Config(_) => io::Error::new(io::ErrorKind::InvalidInput, e),
            other => io::Error::new(io::ErrorKind::InvalidData, other),
        }
    }
}
