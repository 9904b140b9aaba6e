#![forbid(unsafe_code)]
//! One-time pad message protocol.
//!
//! A pad of [`TOTAL_PAD_SIZE`] bytes is split into three segments:
//! - the identifier prefix, sent in cleartext so the receiver can find the pad,
//! - the message-parts keystream, XORed with the framed message,
//! - the trailing MAC keystream, XORed with the MAC.
//!
//! The MAC algorithm and the bit-reversal decision are pure functions of pad
//! bytes, so the receiver reconstructs them from the same pad with no extra
//! shared state. The whole pad is the MAC key. Verification happens before any
//! plaintext is released.

use thiserror::Error;
use zeroize::Zeroizing;

use super::codec::reverse_bits;
use super::digest::{keccak512_keyed, skein512_keyed, Algorithm};
use super::framer::{
    pad_message, parse_message_parts, prepare_message_for_encryption, remove_padding_from_message,
    truncate_at_char_boundary,
};
use super::xor::{ct_eq, xor};
use super::{
    MAC_SIZE, MESSAGE_SIZE, PAD_IDENTIFIER_SIZE, PAD_IDENTIFIER_SIZE_HEX, TOTAL_MESSAGE_PARTS_SIZE,
    TOTAL_PAD_SIZE, TOTAL_PAD_SIZE_HEX,
};
use crate::entropy::{EntropyError, EntropySource};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum OtpError {
    /// The pad is not exactly [`TOTAL_PAD_SIZE`] bytes.
    #[error("pad must be 201 bytes, got {0}")]
    InvalidPadSize(usize),
    /// Message parts are not exactly [`TOTAL_MESSAGE_PARTS_SIZE`] bytes.
    #[error("message parts must be 130 bytes, got {0}")]
    InvalidMessagePartsSize(usize),
    /// Padding bytes could not be drawn.
    #[error("entropy source failed: {0}")]
    Entropy(#[from] EntropyError),
}

/// MAC algorithm selected by the last pad byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MacAlgorithm {
    Skein512,
    Keccak512,
}

impl MacAlgorithm {
    /// Bit 0 of the last pad byte: `0` selects Skein-512, `1` Keccak-512.
    pub fn from_pad(pad: &[u8]) -> Self {
        match pad.last().map(|b| b & 1) {
            Some(1) => MacAlgorithm::Keccak512,
            _ => MacAlgorithm::Skein512,
        }
    }

    /// The digest facade algorithm this selector maps to.
    pub fn algorithm(self) -> Algorithm {
        match self {
            MacAlgorithm::Skein512 => Algorithm::Skein512,
            MacAlgorithm::Keccak512 => Algorithm::Keccak512,
        }
    }
}

/// Bit 0 of the second-to-last pad byte decides whether message parts are bit-reversed.
pub fn should_reverse_message(pad: &[u8]) -> bool {
    pad.len() >= 2 && pad[pad.len() - 2] & 1 == 1
}

pub fn get_pad_identifier_from_pad(pad: &[u8]) -> &[u8] {
    &pad[..PAD_IDENTIFIER_SIZE.min(pad.len())]
}

/// Hex identifier at the front of a hex ciphertext, if present and well formed.
pub fn get_pad_identifier_from_ciphertext(ciphertext_hex: &str) -> Option<String> {
    let prefix = ciphertext_hex.get(..PAD_IDENTIFIER_SIZE_HEX)?;
    hex::decode(prefix).ok()?;
    Some(prefix.to_ascii_lowercase())
}

pub fn get_pad_message_parts(pad: &[u8]) -> &[u8] {
    &pad[PAD_IDENTIFIER_SIZE..PAD_IDENTIFIER_SIZE + TOTAL_MESSAGE_PARTS_SIZE]
}

/// Trailing [`MAC_SIZE`] bytes of the pad. Used only to encrypt the MAC.
pub fn get_pad_for_mac(pad: &[u8]) -> &[u8] {
    &pad[pad.len() - MAC_SIZE..]
}

fn check_pad(pad: &[u8]) -> Result<(), OtpError> {
    if pad.len() != TOTAL_PAD_SIZE {
        return Err(OtpError::InvalidPadSize(pad.len()));
    }
    Ok(())
}

/// XORs (optionally reversed) message parts with the pad and prefixes the identifier.
pub fn encrypt_message_parts(pad: &[u8], message_parts: &[u8]) -> Result<Vec<u8>, OtpError> {
    check_pad(pad)?;
    if message_parts.len() != TOTAL_MESSAGE_PARTS_SIZE {
        return Err(OtpError::InvalidMessagePartsSize(message_parts.len()));
    }

    let parts = if should_reverse_message(pad) {
        Zeroizing::new(reverse_bits(message_parts))
    } else {
        Zeroizing::new(message_parts.to_vec())
    };

    let mut ciphertext = vec![0u8; PAD_IDENTIFIER_SIZE + TOTAL_MESSAGE_PARTS_SIZE];
    ciphertext[..PAD_IDENTIFIER_SIZE].copy_from_slice(get_pad_identifier_from_pad(pad));
    xor(
        &parts,
        get_pad_message_parts(pad),
        &mut ciphertext[PAD_IDENTIFIER_SIZE..],
    );
    Ok(ciphertext)
}

/// Keyed MAC over `identifier ‖ ciphertextParts`, keyed with the full pad.
pub fn create_mac(algorithm: MacAlgorithm, pad: &[u8], ciphertext: &[u8]) -> [u8; MAC_SIZE] {
    match algorithm {
        MacAlgorithm::Skein512 => skein512_keyed(pad, &[ciphertext]),
        MacAlgorithm::Keccak512 => keccak512_keyed(pad, &[ciphertext]),
    }
}

/// XORs a MAC with the pad's trailing MAC segment. Self-inverse.
pub fn encrypt_or_decrypt_mac(pad: &[u8], mac: &[u8; MAC_SIZE]) -> [u8; MAC_SIZE] {
    let mut out = [0u8; MAC_SIZE];
    xor(mac, get_pad_for_mac(pad), &mut out);
    out
}

/// Encrypts framed message parts and appends the encrypted MAC. Returns packet hex.
pub fn encrypt_and_authenticate(pad: &[u8], message_parts: &[u8]) -> Result<String, OtpError> {
    let ciphertext = encrypt_message_parts(pad, message_parts)?;
    let algorithm = MacAlgorithm::from_pad(pad);
    let mac = create_mac(algorithm, pad, &ciphertext);
    let encrypted_mac = encrypt_or_decrypt_mac(pad, &mac);

    let mut packet = ciphertext;
    packet.extend_from_slice(&encrypted_mac);
    Ok(hex::encode(packet))
}

/// Frames, encrypts and authenticates `plaintext` under `pad`.
///
/// Text longer than [`MESSAGE_SIZE`] bytes is cut at the last whole character.
pub fn encrypt_message<R: EntropySource + ?Sized>(
    pad: &[u8],
    plaintext: &str,
    timestamp: u32,
    rng: &mut R,
) -> Result<String, OtpError> {
    check_pad(pad)?;
    let text = truncate_at_char_boundary(plaintext, MESSAGE_SIZE);
    let padded = pad_message(text.as_bytes(), rng)?;
    let parts = prepare_message_for_encryption(&padded, timestamp);
    encrypt_and_authenticate(pad, &parts)
}

/// A message whose MAC has verified.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedMessage {
    pub plaintext: String,
    pub timestamp: u32,
    /// `false` when the length field was out of range and the padded text is shown.
    pub length_valid: bool,
}

/// Result of decrypting a packet. Anything short of a verified MAC is `Invalid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageVerification {
    Valid(DecryptedMessage),
    Invalid,
}

impl MessageVerification {
    pub fn is_valid(&self) -> bool {
        matches!(self, MessageVerification::Valid(_))
    }

    pub fn plaintext(&self) -> Option<&str> {
        match self {
            MessageVerification::Valid(msg) => Some(&msg.plaintext),
            MessageVerification::Invalid => None,
        }
    }
}

/// Verifies the packet MAC under `pad`, then decrypts.
pub fn decrypt_and_verify_message(pad: &[u8], ciphertext_hex: &str) -> MessageVerification {
    if pad.len() != TOTAL_PAD_SIZE || ciphertext_hex.len() != TOTAL_PAD_SIZE_HEX {
        return MessageVerification::Invalid;
    }
    let packet = match hex::decode(ciphertext_hex) {
        Ok(bytes) => bytes,
        Err(_) => return MessageVerification::Invalid,
    };

    let (ciphertext, encrypted_mac) = packet.split_at(PAD_IDENTIFIER_SIZE + TOTAL_MESSAGE_PARTS_SIZE);
    if !ct_eq(&ciphertext[..PAD_IDENTIFIER_SIZE], get_pad_identifier_from_pad(pad)) {
        return MessageVerification::Invalid;
    }

    let mut received_mac = [0u8; MAC_SIZE];
    received_mac.copy_from_slice(encrypted_mac);
    let received_mac = encrypt_or_decrypt_mac(pad, &received_mac);
    let expected_mac = create_mac(MacAlgorithm::from_pad(pad), pad, ciphertext);
    if !ct_eq(&received_mac, &expected_mac) {
        return MessageVerification::Invalid;
    }

    let mut parts = Zeroizing::new(vec![0u8; TOTAL_MESSAGE_PARTS_SIZE]);
    xor(&ciphertext[PAD_IDENTIFIER_SIZE..], get_pad_message_parts(pad), &mut parts);
    let parts = if should_reverse_message(pad) {
        Zeroizing::new(reverse_bits(&parts))
    } else {
        parts
    };

    let Some(fields) = parse_message_parts(&parts) else {
        return MessageVerification::Invalid;
    };
    let message = remove_padding_from_message(&fields.padded_message, fields.length);

    MessageVerification::Valid(DecryptedMessage {
        plaintext: String::from_utf8_lossy(message).into_owned(),
        timestamp: fields.timestamp,
        length_valid: message.len() == usize::from(fields.length),
    })
}
