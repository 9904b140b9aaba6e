//! Message-level cryptography.
//!
//! - `codec`: bit/hex/base64/text conversions.
//! - `xor`: constant-time XOR and comparison.
//! - `digest`: facade over the hash primitives.
//! - `framer`: fixed-size message framing with explicit length and timestamp.
//! - `otp_engine`: the one-time pad encrypt/authenticate protocol.
//!
//! # Packet layout
//! Every pad is exactly [`TOTAL_PAD_SIZE`] bytes and produces one packet of the same size:
//!
//! ```text
//! | pad identifier (7) | message parts (130) | encrypted MAC (64) |
//!                        | message (125) | length (1) | timestamp (4) |
//! ```

pub mod codec;
pub mod digest;
pub mod framer;
pub mod otp_engine;
pub mod xor;

/// Cleartext pad identifier prefix, in bytes.
pub const PAD_IDENTIFIER_SIZE: usize = 7;
/// Maximum plaintext message size, in bytes.
pub const MESSAGE_SIZE: usize = 125;
/// Explicit message length field, in bytes.
pub const MESSAGE_LENGTH_SIZE: usize = 1;
/// UTC timestamp field (unix seconds, big-endian), in bytes.
pub const MESSAGE_TIMESTAMP_SIZE: usize = 4;
/// Padded message, length field and timestamp together.
pub const TOTAL_MESSAGE_PARTS_SIZE: usize = MESSAGE_SIZE + MESSAGE_LENGTH_SIZE + MESSAGE_TIMESTAMP_SIZE;
/// MAC size (Skein-512 / Keccak-512), in bytes.
pub const MAC_SIZE: usize = 64;
/// Size of one pad and of one message packet.
pub const TOTAL_PAD_SIZE: usize = PAD_IDENTIFIER_SIZE + TOTAL_MESSAGE_PARTS_SIZE + MAC_SIZE;

pub const PAD_IDENTIFIER_SIZE_BINARY: usize = PAD_IDENTIFIER_SIZE * 8;
pub const PAD_IDENTIFIER_SIZE_HEX: usize = PAD_IDENTIFIER_SIZE * 2;
pub const MESSAGE_SIZE_BINARY: usize = MESSAGE_SIZE * 8;
pub const TOTAL_MESSAGE_PARTS_SIZE_BINARY: usize = TOTAL_MESSAGE_PARTS_SIZE * 8;
pub const TOTAL_MESSAGE_PARTS_SIZE_HEX: usize = TOTAL_MESSAGE_PARTS_SIZE * 2;
pub const MAC_SIZE_HEX: usize = MAC_SIZE * 2;
pub const TOTAL_PAD_SIZE_HEX: usize = TOTAL_PAD_SIZE * 2;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_sizes() {
        assert_eq!(TOTAL_MESSAGE_PARTS_SIZE, 130);
        assert_eq!(TOTAL_PAD_SIZE, 201);
        assert_eq!(TOTAL_PAD_SIZE_HEX, 402);
        assert_eq!(TOTAL_MESSAGE_PARTS_SIZE_BINARY, 1040);
    }
}
