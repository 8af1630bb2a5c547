#![no_main]
use libfuzzer_sys::fuzz_target;
use rsdelta::format::InstructionIter;
use rsdelta::{PatchOptions, engine};

fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    // First byte picks the basis length; the rest is the delta.
    let basis_len = data[0] as usize * 16;
    let basis: Vec<u8> = (0..basis_len).map(|i| i as u8).collect();
    let delta = &data[1..];

    let _ = engine::apply_patch(&basis, delta, PatchOptions::default());
    let _ = engine::apply_patch(&basis, delta, PatchOptions { verify: false });
    if let Ok(iter) = InstructionIter::new(delta) {
        for ins in iter {
            if ins.is_err() {
                break;
            }
        }
    }
});
