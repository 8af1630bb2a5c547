#![no_main]
use libfuzzer_sys::fuzz_target;
use rsdelta::{DeltaOptions, PatchOptions, SignatureKind, SignatureOptions, engine};

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    // Use first byte as control flags.
    let flags = data[0];
    let payload = &data[1..];
    let kind = if flags & 1 != 0 {
        SignatureKind::Blake2
    } else {
        SignatureKind::Md4
    };
    let block_len = u32::from(flags >> 1).max(1);

    // Split payload into "basis" and "new".
    let split = payload.len() / 2;
    let (basis, new) = payload.split_at(split);

    let opts = SignatureOptions::new(kind).block_len(block_len);
    let sig = engine::build_signature(basis, &opts).unwrap();
    let index = engine::load_signature(&sig).unwrap();
    let delta = engine::compute_delta(index, new, DeltaOptions::default()).unwrap();
    let out = engine::apply_patch(basis, &delta, PatchOptions::default()).unwrap();
    assert_eq!(out, new);
});
