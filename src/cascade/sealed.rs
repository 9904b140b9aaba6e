//! Per-pad sealing for storage.
//!
//! Each pad is cascade-encrypted under nonces derived from its owner's call
//! sign and pad number, then authenticated together with those coordinates and
//! the cleartext identifier. A row moved to another user or slot, or paired
//! with another identifier, fails verification.

use zeroize::Zeroizing;

use super::cipher::{cascade_decrypt, cascade_encrypt};
use super::mac::{cascade_mac_parts, cascade_verify_mac_parts};
use super::{length_prefix, CascadeError, DerivedKeySet, AES_NONCE_SIZE, SALSA_NONCE_SIZE};
use crate::core::digest::{keccak512, skein512};
use crate::core::xor::ct_eq;
use crate::core::PAD_IDENTIFIER_SIZE;

const AES_NONCE_LABEL: &[u8] = b"padcomms/aes-nonce";
const SALSA_NONCE_LABEL: &[u8] = b"padcomms/salsa-nonce";

/// Sealed pad as persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedPad {
    pub ciphertext_hex: String,
    pub mac_hex: String,
}

fn nonce_input(label: &[u8], call_sign: &str, pad_num: u32) -> Result<Vec<u8>, CascadeError> {
    let mut input = Vec::with_capacity(label.len() + 4 + call_sign.len() + 4);
    input.extend_from_slice(label);
    input.extend_from_slice(&length_prefix(call_sign.as_bytes())?);
    input.extend_from_slice(call_sign.as_bytes());
    input.extend_from_slice(&pad_num.to_be_bytes());
    Ok(input)
}

/// `(aes_nonce, salsa_nonce)` for one pad slot.
pub fn derive_nonces(
    call_sign: &str,
    pad_num: u32,
) -> Result<([u8; AES_NONCE_SIZE], [u8; SALSA_NONCE_SIZE]), CascadeError> {
    let aes_hash = keccak512(&nonce_input(AES_NONCE_LABEL, call_sign, pad_num)?);
    let salsa_hash = skein512(&nonce_input(SALSA_NONCE_LABEL, call_sign, pad_num)?);

    let mut aes_nonce = [0u8; AES_NONCE_SIZE];
    aes_nonce.copy_from_slice(&aes_hash[..AES_NONCE_SIZE]);
    let mut salsa_nonce = [0u8; SALSA_NONCE_SIZE];
    salsa_nonce.copy_from_slice(&salsa_hash[..SALSA_NONCE_SIZE]);
    Ok((aes_nonce, salsa_nonce))
}

/// Fixed-width framing around the call sign in the MAC input.
struct Coordinates {
    call_sign_len: [u8; 4],
    pad_num: [u8; 4],
}

impl Coordinates {
    fn new(call_sign: &str, pad_num: u32) -> Result<Self, CascadeError> {
        Ok(Self {
            call_sign_len: length_prefix(call_sign.as_bytes())?,
            pad_num: pad_num.to_be_bytes(),
        })
    }
}

fn mac_parts<'a>(
    coordinates: &'a Coordinates,
    call_sign: &'a str,
    pad_identifier: &'a [u8],
    ciphertext: &'a [u8],
) -> [&'a [u8]; 5] {
    [
        &coordinates.call_sign_len,
        call_sign.as_bytes(),
        &coordinates.pad_num,
        pad_identifier,
        ciphertext,
    ]
}

/// Encrypts `pad` and MACs
/// `u32_be(len) ‖ call_sign ‖ u32_be(pad_num) ‖ pad_identifier ‖ ciphertext`.
pub fn cascade_encrypt_and_mac(
    keys: &DerivedKeySet,
    call_sign: &str,
    pad_num: u32,
    pad: &[u8],
) -> Result<SealedPad, CascadeError> {
    let (aes_nonce, salsa_nonce) = derive_nonces(call_sign, pad_num)?;
    let ciphertext = cascade_encrypt(&keys.aes_key, &keys.salsa_key, &aes_nonce, &salsa_nonce, pad)?;

    let pad_identifier = &pad[..PAD_IDENTIFIER_SIZE.min(pad.len())];
    let coordinates = Coordinates::new(call_sign, pad_num)?;
    let mac = cascade_mac_parts(
        &keys.keccak_mac_key,
        &keys.skein_mac_key,
        &mac_parts(&coordinates, call_sign, pad_identifier, &ciphertext),
    )?;

    Ok(SealedPad {
        ciphertext_hex: hex::encode(ciphertext),
        mac_hex: hex::encode(mac),
    })
}

/// Verifies the MAC, decrypts, and checks the pad starts with `pad_identifier`.
///
/// Any mismatch or malformed field yields `None`.
pub fn cascade_verify_mac_and_decrypt(
    keys: &DerivedKeySet,
    call_sign: &str,
    pad_num: u32,
    pad_identifier: &[u8],
    ciphertext_hex: &str,
    mac_hex: &str,
) -> Option<Zeroizing<Vec<u8>>> {
    let ciphertext = hex::decode(ciphertext_hex).ok()?;
    let mac = hex::decode(mac_hex).ok()?;

    let coordinates = Coordinates::new(call_sign, pad_num).ok()?;
    let authentic = cascade_verify_mac_parts(
        &keys.keccak_mac_key,
        &keys.skein_mac_key,
        &mac_parts(&coordinates, call_sign, pad_identifier, &ciphertext),
        &mac,
    );
    if !authentic {
        log::warn!("Pad {} of {} failed authentication", pad_num, call_sign);
        return None;
    }

    let (aes_nonce, salsa_nonce) = derive_nonces(call_sign, pad_num).ok()?;
    let pad = Zeroizing::new(
        cascade_decrypt(&keys.aes_key, &keys.salsa_key, &aes_nonce, &salsa_nonce, &ciphertext).ok()?,
    );

    if pad.len() < PAD_IDENTIFIER_SIZE || !ct_eq(&pad[..PAD_IDENTIFIER_SIZE], pad_identifier) {
        log::warn!("Pad {} of {} does not match its identifier", pad_num, call_sign);
        return None;
    }
    Some(pad)
}
