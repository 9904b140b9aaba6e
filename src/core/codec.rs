//! Bit-level codec.
//!
//! Lossless conversions between text (UTF-8), raw bytes, hexadecimal,
//! binary strings (`'0'`/`'1'`), base64 and unsigned integers, plus XOR
//! over equal-length binary or hex strings.
//!
//! Every function is pure. Malformed input is rejected with a [`CodecError`]
//! and never produces partial output.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use thiserror::Error;

use super::xor::xor_exact;

/// Malformed input to one of the codec conversions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A character other than `0-9a-fA-F` in a hex string.
    #[error("invalid hexadecimal input")]
    InvalidHex,
    /// A character other than `0`/`1`, or a bit count that is not a whole number of bytes.
    #[error("invalid binary input")]
    InvalidBinary,
    /// Base64 input that does not decode.
    #[error("invalid base64 input")]
    InvalidBase64,
    /// Decoded bytes are not valid UTF-8.
    #[error("invalid UTF-8 text")]
    InvalidUtf8,
    /// XOR operands of different lengths.
    #[error("length mismatch: {left} vs {right}")]
    LengthMismatch {
        /// Length of the left operand.
        left: usize,
        /// Length of the right operand.
        right: usize,
    },
    /// Value does not fit in the requested width.
    #[error("value does not fit in {width} bits")]
    Overflow {
        /// Requested width in bits.
        width: usize,
    },
}

/// Encodes text as UTF-8 and returns its bit string (8 bits per byte, MSB first).
pub fn text_to_binary(text: &str) -> String {
    bytes_to_binary(text.as_bytes())
}

/// Decodes a bit string back into UTF-8 text.
pub fn binary_to_text(bits: &str) -> Result<String, CodecError> {
    let bytes = binary_to_bytes(bits)?;
    String::from_utf8(bytes).map_err(|_| CodecError::InvalidUtf8)
}

/// Renders bytes as a bit string.
pub fn bytes_to_binary(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 8);
    for byte in bytes {
        for shift in (0..8).rev() {
            out.push(if (byte >> shift) & 1 == 1 { '1' } else { '0' });
        }
    }
    out
}

/// Parses a bit string whose length is a multiple of 8.
pub fn binary_to_bytes(bits: &str) -> Result<Vec<u8>, CodecError> {
    if bits.len() % 8 != 0 {
        return Err(CodecError::InvalidBinary);
    }
    bits.as_bytes()
        .chunks(8)
        .map(|chunk| {
            chunk.iter().try_fold(0u8, |acc, &c| match c {
                b'0' => Ok(acc << 1),
                b'1' => Ok((acc << 1) | 1),
                _ => Err(CodecError::InvalidBinary),
            })
        })
        .collect()
}

/// Converts a bit string to lowercase hex, four bits per digit.
///
/// Input whose length is not a multiple of four is left-padded with `0` bits.
pub fn binary_to_hex(bits: &str) -> Result<String, CodecError> {
    let pad = (4 - bits.len() % 4) % 4;
    let mut padded = String::with_capacity(bits.len() + pad);
    padded.extend(std::iter::repeat('0').take(pad));
    padded.push_str(bits);

    padded
        .as_bytes()
        .chunks(4)
        .map(|nibble| {
            let value = nibble.iter().try_fold(0u32, |acc, &c| match c {
                b'0' => Ok(acc << 1),
                b'1' => Ok((acc << 1) | 1),
                _ => Err(CodecError::InvalidBinary),
            })?;
            char::from_digit(value, 16).ok_or(CodecError::InvalidBinary)
        })
        .collect()
}

/// Expands each hex digit into four bits.
pub fn hex_to_binary(hex: &str) -> Result<String, CodecError> {
    let mut out = String::with_capacity(hex.len() * 4);
    for c in hex.chars() {
        let value = c.to_digit(16).ok_or(CodecError::InvalidHex)?;
        for shift in (0..4).rev() {
            out.push(if (value >> shift) & 1 == 1 { '1' } else { '0' });
        }
    }
    Ok(out)
}

/// Decodes an even-length hex string.
pub fn hex_to_bytes(hex: &str) -> Result<Vec<u8>, CodecError> {
    hex::decode(hex).map_err(|_| CodecError::InvalidHex)
}

/// Lowercase hex encoding.
pub fn bytes_to_hex(bytes: &[u8]) -> String {
    hex::encode(bytes)
}

/// Re-encodes hex as standard, padded base64.
pub fn hex_to_base64(hex: &str) -> Result<String, CodecError> {
    Ok(STANDARD.encode(hex_to_bytes(hex)?))
}

/// Decodes standard base64 to lowercase hex.
pub fn base64_to_hex(encoded: &str) -> Result<String, CodecError> {
    STANDARD
        .decode(encoded)
        .map(|bytes| bytes_to_hex(&bytes))
        .map_err(|_| CodecError::InvalidBase64)
}

/// Hex representation of `value`, always an even number of digits.
///
/// `10000` renders as `2710`, `123456789` as `075bcd15`.
pub fn integer_to_hex(value: u64) -> String {
    integer_to_hex_width(value, 2)
}

/// Hex representation left-padded to at least `min_digits` (rounded up to even).
pub fn integer_to_hex_width(value: u64, min_digits: usize) -> String {
    let mut hex = format!("{value:x}");
    let mut width = hex.len().max(min_digits);
    if width % 2 == 1 {
        width += 1;
    }
    while hex.len() < width {
        hex.insert(0, '0');
    }
    hex
}

/// Parses hex into an unsigned integer.
pub fn hex_to_integer(hex: &str) -> Result<u64, CodecError> {
    if hex.is_empty() {
        return Err(CodecError::InvalidHex);
    }
    u64::from_str_radix(hex, 16).map_err(|_| CodecError::InvalidHex)
}

/// Fixed-width bit string of `value`, left-padded with `0`.
pub fn integer_to_binary(value: u64, width: usize) -> Result<String, CodecError> {
    let bits = format!("{value:b}");
    if bits.len() > width {
        return Err(CodecError::Overflow { width });
    }
    Ok(format!("{bits:0>width$}"))
}

/// Parses a bit string into an unsigned integer.
pub fn binary_to_integer(bits: &str) -> Result<u64, CodecError> {
    if bits.is_empty() || bits.len() > 64 {
        return Err(CodecError::InvalidBinary);
    }
    u64::from_str_radix(bits, 2).map_err(|_| CodecError::InvalidBinary)
}

/// XOR of two equal-length bit strings.
pub fn xor_bits(a: &str, b: &str) -> Result<String, CodecError> {
    if a.len() != b.len() {
        return Err(CodecError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    a.bytes()
        .zip(b.bytes())
        .map(|pair| match pair {
            (b'0', b'0') | (b'1', b'1') => Ok('0'),
            (b'0', b'1') | (b'1', b'0') => Ok('1'),
            _ => Err(CodecError::InvalidBinary),
        })
        .collect()
}

/// XOR of two equal-length hex strings, lowercase output.
pub fn xor_hex(a: &str, b: &str) -> Result<String, CodecError> {
    if a.len() != b.len() {
        return Err(CodecError::LengthMismatch {
            left: a.len(),
            right: b.len(),
        });
    }
    if a.len() % 2 == 0 {
        let out = xor_exact(&hex_to_bytes(a)?, &hex_to_bytes(b)?)?;
        return Ok(bytes_to_hex(&out));
    }
    a.chars()
        .zip(b.chars())
        .map(|(x, y)| {
            let x = x.to_digit(16).ok_or(CodecError::InvalidHex)?;
            let y = y.to_digit(16).ok_or(CodecError::InvalidHex)?;
            char::from_digit(x ^ y, 16).ok_or(CodecError::InvalidHex)
        })
        .collect()
}

/// Reverses the bit order of a whole byte string (last bit becomes first).
pub fn reverse_bits(bytes: &[u8]) -> Vec<u8> {
    bytes.iter().rev().map(|b| b.reverse_bits()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_xor_hex_vectors() {
        assert_eq!(xor_hex("a7d9", "c72a").unwrap(), "60f3");
        assert_eq!(
            xor_hex("0123456789abcdef", "fedcba0987654321").unwrap(),
            "ffffff6e0ece8ece"
        );
    }

    #[test]
    fn test_xor_hex_odd_length() {
        assert_eq!(xor_hex("a7d", "c72").unwrap(), "60f");
    }

    #[test]
    fn test_xor_mismatch_is_error() {
        assert!(matches!(xor_hex("ab", "abcd"), Err(CodecError::LengthMismatch { .. })));
        assert!(matches!(xor_bits("01", "011"), Err(CodecError::LengthMismatch { .. })));
        assert_eq!(xor_bits("0x", "01"), Err(CodecError::InvalidBinary));
    }

    #[test]
    fn test_integer_to_hex_even_length() {
        assert_eq!(integer_to_hex(10000), "2710");
        assert_eq!(integer_to_hex(123456789), "075bcd15");
        assert_eq!(integer_to_hex(0), "00");
        assert_eq!(integer_to_hex_width(5, 4), "0005");
        assert_eq!(hex_to_integer("075bcd15").unwrap(), 123456789);
    }

    #[test]
    fn test_integer_binary_width() {
        assert_eq!(integer_to_binary(5, 8).unwrap(), "00000101");
        assert_eq!(integer_to_binary(256, 8), Err(CodecError::Overflow { width: 8 }));
        assert_eq!(binary_to_integer("00000101").unwrap(), 5);
    }

    #[test]
    fn test_text_binary_multibyte() {
        // 1-, 2- and 3-byte UTF-8 sequences
        let text = "a\u{e9}\u{20ac}";
        let bits = text_to_binary(text);
        assert_eq!(bits.len(), (1 + 2 + 3) * 8);
        assert_eq!(&bits[..8], "01100001");
        assert_eq!(binary_to_text(&bits).unwrap(), text);
    }

    #[test]
    fn test_binary_to_hex_left_pads() {
        assert_eq!(binary_to_hex("101").unwrap(), "5");
        assert_eq!(binary_to_hex("11111111").unwrap(), "ff");
        assert_eq!(binary_to_hex("12"), Err(CodecError::InvalidBinary));
    }

    #[test]
    fn test_base64_roundtrip() {
        let b64 = hex_to_base64("48656c6c6f").unwrap();
        assert_eq!(b64, "SGVsbG8=");
        assert_eq!(base64_to_hex(&b64).unwrap(), "48656c6c6f");
        assert_eq!(base64_to_hex("***"), Err(CodecError::InvalidBase64));
    }

    #[test]
    fn test_malformed_hex_rejected() {
        assert_eq!(hex_to_binary("zz"), Err(CodecError::InvalidHex));
        assert_eq!(hex_to_bytes("abc"), Err(CodecError::InvalidHex));
    }

    #[test]
    fn test_reverse_bits() {
        assert_eq!(reverse_bits(&[0b1000_0000, 0b0000_0011]), vec![0b1100_0000, 0b0000_0001]);
        let bits = bytes_to_binary(&[0x12, 0x34]);
        let reversed: String = bits.chars().rev().collect();
        assert_eq!(bytes_to_binary(&reverse_bits(&[0x12, 0x34])), reversed);
    }

    proptest! {
        #[test]
        fn prop_xor_bits_involution(pairs in proptest::collection::vec((any::<bool>(), any::<bool>()), 0..256)) {
            let a: String = pairs.iter().map(|(x, _)| if *x { '1' } else { '0' }).collect();
            let b: String = pairs.iter().map(|(_, y)| if *y { '1' } else { '0' }).collect();
            let ab = xor_bits(&a, &b).unwrap();
            prop_assert_eq!(xor_bits(&a, &ab).unwrap(), b);
        }

        #[test]
        fn prop_hex_binary_roundtrip(h in "[0-9a-f]{0,64}") {
            let bits = hex_to_binary(&h).unwrap();
            prop_assert_eq!(binary_to_hex(&bits).unwrap(), h);
        }
    }
}
