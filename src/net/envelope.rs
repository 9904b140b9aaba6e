//! Wire encodings.
//!
//! Requests travel as `base64(group_identifier ‖ nonce ‖ payload ‖ mac)`.
//! Responses come back as `hex(nonce ‖ payload ‖ mac)`; the relay already
//! knows the group from the request.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;

use super::crypto::{compute_mac, encrypt_or_decrypt_payload, verify_response_mac, NetworkKeys};
use super::{NetError, GROUP_IDENTIFIER_SIZE, NETWORK_MAC_SIZE, NONCE_SIZE};

const NONCE_SIZE_HEX: usize = NONCE_SIZE * 2;
const MAC_SIZE_HEX: usize = NETWORK_MAC_SIZE * 2;

/// A request as decoded by the relay.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestEnvelope {
    pub group_identifier: [u8; GROUP_IDENTIFIER_SIZE],
    pub nonce: [u8; NONCE_SIZE],
    pub payload: Vec<u8>,
    pub mac: [u8; NETWORK_MAC_SIZE],
}

/// An authenticated, decrypted response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecryptedResponse {
    pub nonce: [u8; NONCE_SIZE],
    pub plaintext: Vec<u8>,
}

pub fn serialise_and_encode_request_data(
    group_identifier: &[u8; GROUP_IDENTIFIER_SIZE],
    nonce: &[u8; NONCE_SIZE],
    payload: &[u8],
    mac: &[u8; NETWORK_MAC_SIZE],
) -> String {
    let mut data = Vec::with_capacity(GROUP_IDENTIFIER_SIZE + NONCE_SIZE + payload.len() + NETWORK_MAC_SIZE);
    data.extend_from_slice(group_identifier);
    data.extend_from_slice(nonce);
    data.extend_from_slice(payload);
    data.extend_from_slice(mac);
    STANDARD.encode(data)
}

/// Relay side of [`serialise_and_encode_request_data`].
pub fn decode_request_data(encoded: &str) -> Result<RequestEnvelope, NetError> {
    let data = STANDARD
        .decode(encoded.trim())
        .map_err(|_| NetError::Malformed("request encoding"))?;
    if data.len() < GROUP_IDENTIFIER_SIZE + NONCE_SIZE + NETWORK_MAC_SIZE {
        return Err(NetError::Malformed("request length"));
    }

    let (group_identifier, rest) = data.split_at(GROUP_IDENTIFIER_SIZE);
    let (nonce, rest) = rest.split_at(NONCE_SIZE);
    let (payload, mac) = rest.split_at(rest.len() - NETWORK_MAC_SIZE);
    Ok(RequestEnvelope {
        group_identifier: to_array(group_identifier)?,
        nonce: to_array(nonce)?,
        payload: payload.to_vec(),
        mac: to_array(mac)?,
    })
}

/// Relay side: `hex(nonce ‖ payload ‖ mac)`.
pub fn serialise_and_encode_response_data(
    nonce: &[u8; NONCE_SIZE],
    payload: &[u8],
    mac: &[u8; NETWORK_MAC_SIZE],
) -> String {
    let mut out = String::with_capacity(NONCE_SIZE_HEX + payload.len() * 2 + MAC_SIZE_HEX);
    out.push_str(&hex::encode(nonce));
    out.push_str(&hex::encode(payload));
    out.push_str(&hex::encode(mac));
    out
}

fn to_array<const N: usize>(bytes: &[u8]) -> Result<[u8; N], NetError> {
    bytes.try_into().map_err(|_| NetError::Malformed("field length"))
}

fn checked_response_hex(response_hex: &str) -> Result<&str, NetError> {
    let response_hex = response_hex.trim();
    if response_hex.len() < NONCE_SIZE_HEX + MAC_SIZE_HEX
        || response_hex.len() % 2 != 0
        || !response_hex.is_ascii()
    {
        return Err(NetError::Malformed("response length"));
    }
    Ok(response_hex)
}

fn decode_hex(hex_str: &str, field: &'static str) -> Result<Vec<u8>, NetError> {
    hex::decode(hex_str).map_err(|_| NetError::Malformed(field))
}

pub fn parse_nonce_from_hex(response_hex: &str) -> Result<[u8; NONCE_SIZE], NetError> {
    let response_hex = checked_response_hex(response_hex)?;
    to_array(&decode_hex(&response_hex[..NONCE_SIZE_HEX], "nonce")?)
}

/// The encrypted payload between the nonce and the MAC.
pub fn parse_encrypted_data_from_response_data(response_hex: &str) -> Result<Vec<u8>, NetError> {
    let response_hex = checked_response_hex(response_hex)?;
    decode_hex(
        &response_hex[NONCE_SIZE_HEX..response_hex.len() - MAC_SIZE_HEX],
        "response payload",
    )
}

/// `nonce ‖ payload`, everything the MAC does not cover itself.
pub fn parse_response_data_without_mac_from_hex(response_hex: &str) -> Result<Vec<u8>, NetError> {
    let response_hex = checked_response_hex(response_hex)?;
    decode_hex(&response_hex[..response_hex.len() - MAC_SIZE_HEX], "response data")
}

pub fn parse_mac_from_response_hex(response_hex: &str) -> Result<[u8; NETWORK_MAC_SIZE], NetError> {
    let response_hex = checked_response_hex(response_hex)?;
    to_array(&decode_hex(&response_hex[response_hex.len() - MAC_SIZE_HEX..], "mac")?)
}

/// Verifies the MAC, then decrypts. Nothing is decrypted on a MAC failure.
pub fn decrypt_response(
    keys: &NetworkKeys,
    group_identifier: &[u8; GROUP_IDENTIFIER_SIZE],
    response_hex: &str,
) -> Result<DecryptedResponse, NetError> {
    let nonce = parse_nonce_from_hex(response_hex)?;
    let ciphertext = parse_encrypted_data_from_response_data(response_hex)?;
    let mac = parse_mac_from_response_hex(response_hex)?;

    if !verify_response_mac(&*keys.mac_key, &nonce, &ciphertext, group_identifier, &mac) {
        log::warn!("Relay response failed authentication");
        return Err(NetError::AuthenticationFailed);
    }

    Ok(DecryptedResponse {
        nonce,
        plaintext: encrypt_or_decrypt_payload(&*keys.encryption_key, &nonce, &ciphertext),
    })
}

/// Relay side: encrypts and authenticates a plaintext response.
pub fn encrypt_response(
    keys: &NetworkKeys,
    group_identifier: &[u8; GROUP_IDENTIFIER_SIZE],
    nonce: &[u8; NONCE_SIZE],
    plaintext: &[u8],
) -> String {
    let ciphertext = encrypt_or_decrypt_payload(&*keys.encryption_key, nonce, plaintext);
    let mac = compute_mac(&*keys.mac_key, nonce, &ciphertext, group_identifier);
    serialise_and_encode_response_data(nonce, &ciphertext, &mac)
}
