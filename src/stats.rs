// Per-job counters, modeled on librsync's `rs_stats_t`.

use std::fmt;

/// Which operation a [`Stats`] record belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobKind {
    Signature,
    LoadSignature,
    Delta,
    Patch,
}

impl JobKind {
    pub fn name(self) -> &'static str {
        match self {
            Self::Signature => "signature",
            Self::LoadSignature => "loadsig",
            Self::Delta => "delta",
            Self::Patch => "patch",
        }
    }
}

/// Counters collected while a job runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stats {
    pub kind: JobKind,
    /// Literal commands emitted or applied.
    pub lit_cmds: u64,
    /// Literal payload bytes.
    pub lit_bytes: u64,
    /// Bytes spent on literal command headers.
    pub lit_cmdbytes: u64,
    pub copy_cmds: u64,
    /// Bytes copied from the basis.
    pub copy_bytes: u64,
    /// Bytes spent on copy command headers.
    pub copy_cmdbytes: u64,
    /// Weak-sum hits rejected by the strong sum.
    pub false_matches: u64,
    /// Blocks hashed or loaded.
    pub sig_blocks: u64,
    pub block_len: u32,
    /// Bytes consumed from the job's input.
    pub in_bytes: u64,
    /// Bytes written to the job's output.
    pub out_bytes: u64,
}

impl Stats {
    pub fn new(kind: JobKind) -> Self {
        Self {
            kind,
            lit_cmds: 0,
            lit_bytes: 0,
            lit_cmdbytes: 0,
            copy_cmds: 0,
            copy_bytes: 0,
            copy_cmdbytes: 0,
            false_matches: 0,
            sig_blocks: 0,
            block_len: 0,
            in_bytes: 0,
            out_bytes: 0,
        }
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} statistics:", self.kind.name())?;
        if self.lit_cmds > 0 {
            write!(
                f,
                " literal[{} cmds, {} bytes, {} cmdbytes]",
                self.lit_cmds, self.lit_bytes, self.lit_cmdbytes
            )?;
        }
        if self.copy_cmds > 0 {
            write!(
                f,
                " copy[{} cmds, {} bytes, {} cmdbytes]",
                self.copy_cmds, self.copy_bytes, self.copy_cmdbytes
            )?;
        }
        if self.false_matches > 0 {
            write!(f, " false_matches[{}]", self.false_matches)?;
        }
        if self.sig_blocks > 0 {
            write!(
                f,
                " signature[{} blocks, {} bytes per block]",
                self.sig_blocks, self.block_len
            )?;
        }
        write!(f, " in[{}] out[{}]", self.in_bytes, self.out_bytes)
    }
}
