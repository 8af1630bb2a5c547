// Network-order integers as used by the librsync formats.
//
// Header fields are fixed 4-byte big-endian words. Command parameters use
// the smallest of 1, 2, 4 or 8 bytes that can hold the value, still
// big-endian (librsync `rs_int_len` / `rs_squirt_netint`).

/// Byte width of the smallest parameter encoding for `val`.
#[inline]
pub fn int_len(val: u64) -> usize {
    if val <= 0xff {
        1
    } else if val <= 0xffff {
        2
    } else if val <= 0xffff_ffff {
        4
    } else {
        8
    }
}

/// Append `val` as a `width`-byte big-endian integer.
///
/// `width` must be 1, 2, 4 or 8 and large enough for `val`.
pub fn put_uint(out: &mut Vec<u8>, val: u64, width: usize) {
    debug_assert!(matches!(width, 1 | 2 | 4 | 8));
    debug_assert!(width == 8 || val >> (width * 8) == 0);
    out.extend_from_slice(&val.to_be_bytes()[8 - width..]);
}

/// Read a `width`-byte big-endian integer from the front of `data`.
///
/// Returns `None` if `data` is shorter than `width`.
#[inline]
pub fn get_uint(data: &[u8], width: usize) -> Option<u64> {
    let bytes = data.get(..width)?;
    Some(bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b)))
}

/// Append a 4-byte big-endian word.
#[inline]
pub fn put_u32(out: &mut Vec<u8>, val: u32) {
    out.extend_from_slice(&val.to_be_bytes());
}

/// Read a 4-byte big-endian word from the front of `data`.
#[inline]
pub fn get_u32(data: &[u8]) -> Option<u32> {
    let bytes: [u8; 4] = data.get(..4)?.try_into().ok()?;
    Some(u32::from_be_bytes(bytes))
}
