//! rsdelta: rsync-style signatures, deltas and patches in pure Rust,
//! wire-compatible with librsync 2.x (`rdiff`).
//!
//! The crate provides:
//! - The rolling and strong checksums (`hash`)
//! - The librsync signature and delta formats (`format`)
//! - A streaming, bounded-memory job engine (`job`)
//! - Blocking `Read` adapters (`stream`) and whole-stream helpers (`engine`)
//! - Parallel batch helpers (`batch`, `parallel` feature)
//!
//! # Quick Start
//!
//! ```
//! use rsdelta::engine;
//! use rsdelta::{DeltaOptions, PatchOptions, SignatureOptions};
//!
//! let old = b"hello old world, hello old world".repeat(100);
//! let new = b"hello new world, hello old world".repeat(100);
//!
//! let sig = engine::build_signature(&old, &SignatureOptions::default()).unwrap();
//! let index = engine::load_signature(&sig).unwrap();
//! let delta = engine::compute_delta(index, &new, DeltaOptions::default()).unwrap();
//! let patched = engine::apply_patch(&old, &delta, PatchOptions::default()).unwrap();
//! assert_eq!(patched, new);
//! ```

pub mod basis;
pub mod engine;
pub mod error;
pub mod format;
pub mod hash;
pub mod job;
pub mod signature;
pub mod stats;
pub mod stream;

#[cfg(feature = "parallel")]
pub mod batch;

pub use basis::{Basis, SeekBasis};
pub use error::{Error, Result};
pub use hash::config::{BlockLen, SignatureOptions, StrongLen};
pub use hash::strong::SignatureKind;
pub use job::{Buffers, DeltaOptions, Job, JobStatus, PatchOptions};
pub use signature::{Signature, SignatureIndex};
pub use stats::Stats;
