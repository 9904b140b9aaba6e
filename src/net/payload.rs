//! Plaintext request and response layouts.
//!
//! Request:  `[u16 padding len][padding][packets][ts 5][from user][action]`
//! Response: `[u16 padding len][padding][code][ts 5][(from user ‖ packet)*]`
//!
//! Integers are big-endian. Timestamps are unix seconds in 40 bits.

use serde::Deserialize;

use super::{
    ApiAction, NetError, ResponseCode, ACTION_SIZE, PADDING_LENGTH_SIZE, TIMESTAMP_SIZE,
    USER_CODE_SIZE,
};
use crate::core::TOTAL_PAD_SIZE;
use crate::entropy::{uniform_in_range, EntropySource};
use crate::pad::CALL_SIGNS;

/// Traffic padding bounds in bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct PaddingConfig {
    pub min_padding_bits: u32,
    pub max_padding_bits: u32,
}

impl Default for PaddingConfig {
    fn default() -> Self {
        Self {
            min_padding_bits: 0,
            max_padding_bits: 8 * 1024 * 8,
        }
    }
}

/// One packet relayed from another member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayedPacket {
    pub from_user: u8,
    pub packet: Vec<u8>,
}

/// A decoded request, as the relay sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestPayload {
    pub from_user: u8,
    pub action: ApiAction,
    pub timestamp: u64,
    pub packets: Vec<Vec<u8>>,
}

/// A decoded response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsePayload {
    pub response_code: ResponseCode,
    pub timestamp: u64,
    pub messages: Vec<RelayedPacket>,
}

/// Wire code for a call sign: its position in [`CALL_SIGNS`].
pub fn user_code(call_sign: &str) -> Result<u8, NetError> {
    CALL_SIGNS
        .iter()
        .position(|c| *c == call_sign)
        .map(|i| i as u8)
        .ok_or(NetError::UnknownUser)
}

pub fn call_sign_from_code(code: u8) -> Option<&'static str> {
    CALL_SIGNS.get(usize::from(code)).copied()
}

fn encode_timestamp(timestamp: u64) -> [u8; TIMESTAMP_SIZE] {
    let bytes = timestamp.to_be_bytes();
    let mut out = [0u8; TIMESTAMP_SIZE];
    out.copy_from_slice(&bytes[8 - TIMESTAMP_SIZE..]);
    out
}

fn decode_timestamp(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, &b| (acc << 8) | u64::from(b))
}

fn push_padding(out: &mut Vec<u8>, padding: &[u8]) -> Result<(), NetError> {
    let len = u16::try_from(padding.len()).map_err(|_| NetError::PaddingTooLong(padding.len()))?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(padding);
    Ok(())
}

fn skip_padding(data: &[u8]) -> Result<&[u8], NetError> {
    if data.len() < PADDING_LENGTH_SIZE {
        return Err(NetError::Malformed("padding length"));
    }
    let len = usize::from(u16::from_be_bytes([data[0], data[1]]));
    data.get(PADDING_LENGTH_SIZE + len..)
        .ok_or(NetError::Malformed("padding"))
}

/// Random padding whose bit length lies in `[min_padding_bits, max_padding_bits]`.
pub fn get_padding_bytes<R: EntropySource + ?Sized>(
    config: &PaddingConfig,
    rng: &mut R,
) -> Result<Vec<u8>, NetError> {
    let min_bytes = config.min_padding_bits.div_ceil(8);
    let max_bytes = (config.max_padding_bits / 8).min(u32::from(u16::MAX));
    if config.min_padding_bits > config.max_padding_bits || min_bytes > max_bytes {
        return Err(NetError::InvalidPaddingRange);
    }

    let len = uniform_in_range(rng, min_bytes, max_bytes)? as usize;
    let mut padding = vec![0u8; len];
    rng.fill(&mut padding)?;
    Ok(padding)
}

pub fn serialise_payload_for_encryption(
    from_user: u8,
    api_action: ApiAction,
    padding: &[u8],
    timestamp: u64,
    packets: &[Vec<u8>],
) -> Result<Vec<u8>, NetError> {
    let packet_bytes: usize = packets.iter().map(Vec::len).sum();
    let mut out = Vec::with_capacity(
        PADDING_LENGTH_SIZE + padding.len() + packet_bytes + TIMESTAMP_SIZE + USER_CODE_SIZE + ACTION_SIZE,
    );
    push_padding(&mut out, padding)?;
    for packet in packets {
        if packet.len() != TOTAL_PAD_SIZE {
            return Err(NetError::Malformed("message packet"));
        }
        out.extend_from_slice(packet);
    }
    out.extend_from_slice(&encode_timestamp(timestamp));
    out.push(from_user);
    out.push(api_action.code());
    Ok(out)
}

/// Relay side of [`serialise_payload_for_encryption`].
pub fn deserialise_request_payload(data: &[u8]) -> Result<RequestPayload, NetError> {
    let rest = skip_padding(data)?;
    let trailer = TIMESTAMP_SIZE + USER_CODE_SIZE + ACTION_SIZE;
    if rest.len() < trailer || (rest.len() - trailer) % TOTAL_PAD_SIZE != 0 {
        return Err(NetError::Malformed("request payload"));
    }

    let (packets, trailer) = rest.split_at(rest.len() - trailer);
    Ok(RequestPayload {
        from_user: trailer[TIMESTAMP_SIZE],
        action: ApiAction::try_from(trailer[TIMESTAMP_SIZE + USER_CODE_SIZE])?,
        timestamp: decode_timestamp(&trailer[..TIMESTAMP_SIZE]),
        packets: packets.chunks_exact(TOTAL_PAD_SIZE).map(<[u8]>::to_vec).collect(),
    })
}

/// Relay side: builds the plaintext response.
pub fn serialise_response_for_encryption(
    response_code: ResponseCode,
    padding: &[u8],
    timestamp: u64,
    messages: &[RelayedPacket],
) -> Result<Vec<u8>, NetError> {
    let mut out = Vec::new();
    push_padding(&mut out, padding)?;
    out.push(response_code.code());
    out.extend_from_slice(&encode_timestamp(timestamp));
    for message in messages {
        if message.packet.len() != TOTAL_PAD_SIZE {
            return Err(NetError::Malformed("message packet"));
        }
        out.push(message.from_user);
        out.extend_from_slice(&message.packet);
    }
    Ok(out)
}

pub fn deserialise_decrypted_data(data: &[u8]) -> Result<ResponsePayload, NetError> {
    let rest = skip_padding(data)?;
    let header = 1 + TIMESTAMP_SIZE;
    let entry = USER_CODE_SIZE + TOTAL_PAD_SIZE;
    if rest.len() < header || (rest.len() - header) % entry != 0 {
        return Err(NetError::Malformed("response payload"));
    }

    let (head, body) = rest.split_at(header);
    Ok(ResponsePayload {
        response_code: ResponseCode::from(head[0]),
        timestamp: decode_timestamp(&head[1..]),
        messages: body
            .chunks_exact(entry)
            .map(|chunk| RelayedPacket {
                from_user: chunk[0],
                packet: chunk[USER_CODE_SIZE..].to_vec(),
            })
            .collect(),
    })
}
