// Independent jobs on the rayon pool.
//
// Every job stays single-threaded; parallelism comes only from running
// several of them at once. The shared signature index is read-only.

use std::sync::Arc;

use rayon::prelude::*;

use crate::engine;
use crate::error::Result;
use crate::hash::config::SignatureOptions;
use crate::job::DeltaOptions;
use crate::signature::SignatureIndex;

/// Signatures of several bases, in input order.
pub fn signatures(bases: &[&[u8]], opts: &SignatureOptions) -> Vec<Result<Vec<u8>>> {
    bases
        .par_iter()
        .map(|basis| engine::build_signature(basis, opts))
        .collect()
}

/// Deltas of several new versions against one signature, in input order.
pub fn deltas(
    index: impl Into<Arc<SignatureIndex>>,
    targets: &[&[u8]],
    opts: DeltaOptions,
) -> Vec<Result<Vec<u8>>> {
    let index = index.into();
    targets
        .par_iter()
        .map(|target| engine::compute_delta(Arc::clone(&index), target, opts))
        .collect()
}
