//! Message framing.
//!
//! Packs plaintext, an explicit length and a UTC timestamp into a fixed-size
//! block of [`TOTAL_MESSAGE_PARTS_SIZE`] bytes so every packet on the wire has
//! the same size regardless of message length.

use zeroize::Zeroizing;

use super::{MESSAGE_LENGTH_SIZE, MESSAGE_SIZE, MESSAGE_TIMESTAMP_SIZE, TOTAL_MESSAGE_PARTS_SIZE};
use crate::entropy::{EntropyError, EntropySource};

/// Plaintext padded (or truncated) to exactly [`MESSAGE_SIZE`] bytes.
pub struct PaddedMessage {
    pub bytes: Zeroizing<Vec<u8>>,
    /// Number of real plaintext bytes at the front of `bytes`.
    pub actual_length: usize,
}

/// The three fields recovered from decrypted message parts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageParts {
    pub padded_message: Vec<u8>,
    pub length: u8,
    pub timestamp: u32,
}

/// Right-pads `plaintext` with random bytes up to [`MESSAGE_SIZE`].
///
/// Oversize plaintext is silently truncated to exactly [`MESSAGE_SIZE`] bytes and
/// the truncated length is recorded.
pub fn pad_message<R: EntropySource + ?Sized>(
    plaintext: &[u8],
    rng: &mut R,
) -> Result<PaddedMessage, EntropyError> {
    let actual_length = plaintext.len().min(MESSAGE_SIZE);
    let mut bytes = Zeroizing::new(vec![0u8; MESSAGE_SIZE]);
    bytes[..actual_length].copy_from_slice(&plaintext[..actual_length]);

    if actual_length < MESSAGE_SIZE {
        rng.fill(&mut bytes[actual_length..])?;
    } else if plaintext.len() > MESSAGE_SIZE {
        log::debug!("Truncating {} byte message to {}", plaintext.len(), MESSAGE_SIZE);
    }

    Ok(PaddedMessage {
        bytes,
        actual_length,
    })
}

/// Longest prefix of `text` that fits in `max_bytes` without splitting a character.
pub fn truncate_at_char_boundary(text: &str, max_bytes: usize) -> &str {
    if text.len() <= max_bytes {
        return text;
    }
    let mut end = max_bytes;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

/// Concatenates `padded ‖ u8 length ‖ u32_be timestamp`.
pub fn prepare_message_for_encryption(
    padded: &PaddedMessage,
    timestamp: u32,
) -> Zeroizing<Vec<u8>> {
    let mut parts = Zeroizing::new(Vec::with_capacity(TOTAL_MESSAGE_PARTS_SIZE));
    parts.extend_from_slice(&padded.bytes);
    parts.push(padded.actual_length as u8);
    parts.extend_from_slice(&timestamp.to_be_bytes());
    parts
}

/// Splits decrypted message parts into padded message, length and timestamp.
pub fn parse_message_parts(parts: &[u8]) -> Option<MessageParts> {
    if parts.len() != TOTAL_MESSAGE_PARTS_SIZE {
        return None;
    }
    let (padded_message, rest) = parts.split_at(MESSAGE_SIZE);
    let (length, timestamp) = rest.split_at(MESSAGE_LENGTH_SIZE);
    let mut ts = [0u8; MESSAGE_TIMESTAMP_SIZE];
    ts.copy_from_slice(timestamp);

    Some(MessageParts {
        padded_message: padded_message.to_vec(),
        length: length[0],
        timestamp: u32::from_be_bytes(ts),
    })
}

/// Strips padding using the explicit length field.
///
/// If `length` is outside `[1, MESSAGE_SIZE]` the padded message is returned
/// unchanged. Callers treat an unchanged-length result as ambiguous.
pub fn remove_padding_from_message(padded: &[u8], length: u8) -> &[u8] {
    let length = usize::from(length);
    if (1..=MESSAGE_SIZE).contains(&length) && length <= padded.len() {
        &padded[..length]
    } else {
        padded
    }
}

/// Current UTC time as unix seconds, saturated into the 32-bit timestamp field.
pub fn current_utc_timestamp() -> u32 {
    let now = chrono::Utc::now().timestamp();
    u32::try_from(now.max(0)).unwrap_or(u32::MAX)
}
