//! Bit combination and randomness extraction.

/// XORs two bit strings after truncating the longer one to the shorter's length.
pub fn get_xored_least_sig_bits(bits_a: &str, bits_b: &str) -> String {
    bits_a
        .bytes()
        .zip(bits_b.bytes())
        .map(|(a, b)| if a == b { '0' } else { '1' })
        .collect()
}

/// Von Neumann extractor over non-overlapping pairs: `01 -> 0`, `10 -> 1`,
/// `00` and `11` are discarded. A trailing odd bit is dropped.
pub fn von_neumann_extractor(bits: &str) -> String {
    bits.as_bytes()
        .chunks_exact(2)
        .filter_map(|pair| match pair {
            [b'0', b'1'] => Some('0'),
            [b'1', b'0'] => Some('1'),
            _ => None,
        })
        .collect()
}

/// Packs whole bytes from a bit string. Trailing bits that do not fill a byte are dropped.
pub fn pack_bits(bits: &str) -> Vec<u8> {
    bits.as_bytes()
        .chunks_exact(8)
        .map(|chunk| chunk.iter().fold(0u8, |acc, &c| (acc << 1) | u8::from(c == b'1')))
        .collect()
}

/// Takes exactly `len` bytes of extracted material.
///
/// Returns `None` if there is not enough material. Never returns a short key.
pub fn extract_bytes(bits: &str, len: usize) -> Option<Vec<u8>> {
    if bits.len() / 8 < len {
        return None;
    }
    Some(pack_bits(&bits[..len * 8]))
}
