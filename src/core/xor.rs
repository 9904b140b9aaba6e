#![forbid(unsafe_code)]
// Constant-time XOR engine.
// - Processes data in 8-byte words followed by a byte tail.
// - No secret-dependent branching; length checks are enforced by callers or by `xor_exact`.
// - Shared by the OTP engine, the cascade cipher and the network keystream.

use super::codec::CodecError;

/// XOR `input` with `keystream`, writing into `out`.
/// Requires: `out.len() == input.len()` and `keystream.len() >= input.len()`.
#[inline(always)]
pub fn xor(input: &[u8], keystream: &[u8], out: &mut [u8]) {
    let len = out.len();
    let words = len / 8;

    for w in 0..words {
        let i = w * 8;
        let mut a = [0u8; 8];
        let mut b = [0u8; 8];
        a.copy_from_slice(&input[i..i + 8]);
        b.copy_from_slice(&keystream[i..i + 8]);
        let x = u64::from_ne_bytes(a) ^ u64::from_ne_bytes(b);
        out[i..i + 8].copy_from_slice(&x.to_ne_bytes());
    }

    for i in words * 8..len {
        out[i] = input[i] ^ keystream[i];
    }
}

/// XOR two equal-length slices into a fresh buffer.
pub fn xor_exact(a: &[u8], b: &[u8]) -> Result<Vec<u8>, CodecError> {
    if a.len() != b.len() {
        return Err(CodecError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    let mut out = vec![0u8; a.len()];
    xor(a, b, &mut out);
    Ok(out)
}

/// XOR `keystream` into `data` in place. `keystream` must be at least as long as `data`.
#[inline(always)]
pub fn xor_in_place(data: &mut [u8], keystream: &[u8]) {
    for (d, k) in data.iter_mut().zip(keystream.iter()) {
        *d ^= *k;
    }
}

/// Constant-time equality. Lengths are public, so a length mismatch returns early.
#[inline(never)]
pub fn ct_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff: u8 = 0;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}
