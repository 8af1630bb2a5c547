// Byte-level compatibility with librsync's `rdiff`.
//
// Vectors were produced with:
//   rdiff signature -b 10 -S 5 -H md4 old.txt old.sig
//   rdiff delta old.sig new.txt new.delta
// where old.txt = "this is a string to be tested"
//   and new.txt = "this is another string to be tested".

use rsdelta::engine;
use rsdelta::format::{Instruction, InstructionIter};
use rsdelta::{DeltaOptions, Error, PatchOptions, SignatureKind, SignatureOptions};

const OLD: &[u8] = b"this is a string to be tested";
const NEW: &[u8] = b"this is another string to be tested";

fn hex_to_bytes(s: &str) -> Vec<u8> {
    let s: String = s.split_whitespace().collect();
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).unwrap())
        .collect()
}

fn rdiff_signature() -> Vec<u8> {
    hex_to_bytes(
        "72730136 0000000a 00000005
         1b21048b ad3cbd1909
         1d1b04f0 9d1f6431de
         15f40487 6096195039",
    )
}

fn rdiff_delta() -> Vec<u8> {
    let mut delta = hex_to_bytes("72730236 4110");
    delta.extend_from_slice(b"this is another ");
    delta.extend_from_slice(&hex_to_bytes("450a13 00"));
    delta
}

fn rdiff_opts() -> SignatureOptions {
    SignatureOptions::new(SignatureKind::Md4)
        .block_len(10)
        .strong_len(5)
}

#[test]
fn signature_is_byte_identical() {
    let sig = engine::build_signature(OLD, &rdiff_opts()).unwrap();
    assert_eq!(sig, rdiff_signature());
}

#[test]
fn delta_without_trailer_is_byte_identical() {
    let index = engine::load_signature(&rdiff_signature()).unwrap();
    let delta = engine::compute_delta(index, NEW, DeltaOptions::rdiff()).unwrap();
    assert_eq!(delta, rdiff_delta());
}

#[test]
fn rdiff_delta_patches() {
    let out = engine::apply_patch(OLD, &rdiff_delta(), PatchOptions::default()).unwrap();
    assert_eq!(out, NEW);
}

#[test]
fn trailer_is_pure_suffix() {
    let index = engine::load_signature(&rdiff_signature()).unwrap();
    let with = engine::compute_delta(index, NEW, DeltaOptions::default()).unwrap();
    let plain = rdiff_delta();
    assert_eq!(&with[..plain.len()], &plain[..]);
    assert_eq!(with.len(), plain.len() + 33);
    assert_eq!(with[plain.len()], 32);
}

#[test]
fn delta_decodes_to_expected_instructions() {
    let delta = rdiff_delta();
    let ins: Vec<Instruction<'_>> = InstructionIter::new(&delta)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap();
    assert_eq!(
        ins,
        [
            Instruction::Literal(b"this is another "),
            Instruction::Copy { offset: 10, len: 19 },
            Instruction::End,
        ]
    );
}

#[test]
fn rabin_karp_signatures_are_rejected() {
    let mut sig = rdiff_signature();
    sig[3] = 0x46;
    let err = engine::load_signature(&sig).unwrap_err();
    assert!(matches!(err, Error::MalformedSignature(_)));
    assert!(err.to_string().contains("not supported"));
}
