use proptest::prelude::*;
use rsdelta::engine;
use rsdelta::job::{Buffers, Job, JobStatus};
use rsdelta::{Basis, DeltaOptions, PatchOptions, SignatureKind, SignatureOptions};

fn kind_strategy() -> impl Strategy<Value = SignatureKind> {
    prop_oneof![Just(SignatureKind::Md4), Just(SignatureKind::Blake2)]
}

/// Run a job over `input` split at the given chunk size, with a small
/// output window.
fn drive_chunked<B: Basis>(mut job: Job<B>, input: &[u8], chunk: usize, out_chunk: usize) -> Vec<u8> {
    let mut out = Vec::new();
    let mut obuf = vec![0u8; out_chunk];
    let mut pos = 0;
    loop {
        let end = (pos + chunk).min(input.len());
        let eof = end == input.len();
        let mut bufs = Buffers::new(&input[pos..end], eof, &mut obuf);
        let status = job.iter(&mut bufs).unwrap();
        pos += bufs.consumed();
        let written = bufs.written();
        out.extend_from_slice(&obuf[..written]);
        if status == JobStatus::Done {
            return out;
        }
    }
}

/// Basis plus a few random edits of it.
fn basis_and_edit() -> impl Strategy<Value = (Vec<u8>, Vec<u8>)> {
    (
        proptest::collection::vec(0u8..4, 0..3000),
        proptest::collection::vec((any::<prop::sample::Index>(), 0usize..8, proptest::collection::vec(0u8..4, 0..8)), 0..6),
    )
        .prop_map(|(basis, edits)| {
            let mut new = basis.clone();
            for (at, remove, insert) in edits {
                let start = if new.is_empty() { 0 } else { at.index(new.len()) };
                let end = (start + remove).min(new.len());
                new.splice(start..end, insert);
            }
            (basis, new)
        })
}

proptest! {
    #[test]
    fn prop_roundtrip(
        (basis, new) in basis_and_edit(),
        block_len in 1u32..300,
        kind in kind_strategy(),
        trailer in any::<bool>(),
    ) {
        let opts = SignatureOptions::new(kind).block_len(block_len);
        let sig = engine::build_signature(&basis, &opts).unwrap();
        let index = engine::load_signature(&sig).unwrap();
        let delta = engine::compute_delta(index, &new, DeltaOptions { trailer }).unwrap();
        let out = engine::apply_patch(&basis, &delta, PatchOptions::default()).unwrap();
        prop_assert_eq!(out, new);
    }

    #[test]
    fn prop_roundtrip_unrelated(
        basis in proptest::collection::vec(any::<u8>(), 0..2048),
        new in proptest::collection::vec(any::<u8>(), 0..2048),
        block_len in 1u32..128,
    ) {
        let opts = SignatureOptions::default().block_len(block_len);
        let index = engine::load_signature(&engine::build_signature(&basis, &opts).unwrap()).unwrap();
        let delta = engine::compute_delta(index, &new, DeltaOptions::default()).unwrap();
        prop_assert_eq!(engine::apply_patch(&basis, &delta, PatchOptions::default()).unwrap(), new);
    }

    #[test]
    fn prop_signature_chunking_invariant(
        basis in proptest::collection::vec(any::<u8>(), 0..4000),
        block_len in 1u32..200,
        chunk in 1usize..97,
        out_chunk in 1usize..64,
    ) {
        let opts = SignatureOptions::new(SignatureKind::Md4).block_len(block_len);
        let whole = engine::build_signature(&basis, &opts).unwrap();
        let chunked = drive_chunked(Job::signature(&opts).unwrap(), &basis, chunk, out_chunk);
        prop_assert_eq!(whole, chunked);
    }

    #[test]
    fn prop_delta_chunking_invariant(
        (basis, new) in basis_and_edit(),
        block_len in 1u32..64,
        chunk in 1usize..50,
        out_chunk in 1usize..40,
    ) {
        let opts = SignatureOptions::default().block_len(block_len);
        let index = engine::load_signature(&engine::build_signature(&basis, &opts).unwrap()).unwrap();
        let whole = engine::compute_delta(index.clone(), &new, DeltaOptions::default()).unwrap();
        let chunked = drive_chunked(Job::delta(index, DeltaOptions::default()), &new, chunk, out_chunk);
        prop_assert_eq!(&whole, &chunked);

        let patched = drive_chunked(Job::patch(basis.as_slice(), PatchOptions::default()), &whole, chunk, out_chunk);
        prop_assert_eq!(patched, new);
    }

    #[test]
    fn prop_delta_is_deterministic(
        (basis, new) in basis_and_edit(),
        block_len in 1u32..64,
    ) {
        let opts = SignatureOptions::default().block_len(block_len);
        let sig = engine::build_signature(&basis, &opts).unwrap();
        let a = engine::compute_delta(engine::load_signature(&sig).unwrap(), &new, DeltaOptions::default()).unwrap();
        let b = engine::compute_delta(engine::load_signature(&sig).unwrap(), &new, DeltaOptions::default()).unwrap();
        prop_assert_eq!(a, b);
    }

    #[test]
    fn prop_identical_data_has_no_literals(
        basis in proptest::collection::vec(any::<u8>(), 1..5000),
        block_len in 1u32..256,
    ) {
        let opts = SignatureOptions::default().block_len(block_len);
        let index = engine::load_signature(&engine::build_signature(&basis, &opts).unwrap()).unwrap();
        let delta = engine::compute_delta(index, &basis, DeltaOptions::rdiff()).unwrap();
        let literal: u64 = rsdelta::format::InstructionIter::new(&delta)
            .unwrap()
            .map(Result::unwrap)
            .filter(|i| matches!(i, rsdelta::format::Instruction::Literal(_)))
            .map(|i| i.output_len())
            .sum();
        prop_assert_eq!(literal, 0);
    }

    #[test]
    fn prop_patch_never_panics_on_garbage(
        basis in proptest::collection::vec(any::<u8>(), 0..256),
        mut delta in proptest::collection::vec(any::<u8>(), 0..512),
        with_magic in any::<bool>(),
    ) {
        if with_magic {
            delta.splice(0..0, [0x72, 0x73, 0x02, 0x36]);
        }
        let _ = engine::apply_patch(&basis, &delta, PatchOptions::default());
    }

    #[test]
    fn prop_load_signature_never_panics_on_garbage(
        mut sig in proptest::collection::vec(any::<u8>(), 0..512),
        magic in prop_oneof![Just(0x7273_0136u32), Just(0x7273_0137u32)],
    ) {
        if sig.len() >= 4 {
            sig[..4].copy_from_slice(&magic.to_be_bytes());
        }
        let _ = engine::load_signature(&sig);
    }
}
