#![no_main]
use libfuzzer_sys::fuzz_target;
use rsdelta::{DeltaOptions, engine};

fuzz_target!(|data: &[u8]| {
    let Ok(index) = engine::load_signature(data) else {
        return;
    };
    // A signature that loads must be usable for a delta.
    let _ = engine::compute_delta(index, data, DeltaOptions::default())
        .expect("delta against a loaded signature");
});
