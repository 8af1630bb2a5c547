// Checksums and lookup structures for rsync-style matching.
//
// This module provides:
// - The librsync rolling (weak) checksum
// - MD4 / BLAKE2b strong sums, truncatable to the signature's strong length
// - Block and strong length selection for new signatures
// - The weak-sum bucket table behind `SignatureIndex`

pub mod config;
pub mod rollsum;
pub mod strong;
pub mod table;
