//! Cascade MAC: keyed Keccak-512 XOR keyed Skein-512.

use super::{CascadeError, CASCADE_MAC_SIZE};
use crate::core::digest::{keccak512_keyed, skein512_keyed};
use crate::core::xor::{ct_eq, xor};

fn check_keys(keccak_key: &[u8], skein_key: &[u8]) -> Result<(), CascadeError> {
    for key in [keccak_key, skein_key] {
        if key.is_empty() {
            return Err(CascadeError::InvalidKeyLength {
                expected: super::MAC_KEY_SIZE,
                actual: 0,
            });
        }
    }
    if ct_eq(keccak_key, skein_key) {
        return Err(CascadeError::NonDistinctKeys);
    }
    Ok(())
}

/// MAC over the concatenation of `parts`.
pub fn cascade_mac_parts(
    keccak_key: &[u8],
    skein_key: &[u8],
    parts: &[&[u8]],
) -> Result<[u8; CASCADE_MAC_SIZE], CascadeError> {
    check_keys(keccak_key, skein_key)?;
    let keccak = keccak512_keyed(keccak_key, parts);
    let skein = skein512_keyed(skein_key, parts);
    let mut mac = [0u8; CASCADE_MAC_SIZE];
    xor(&keccak, &skein, &mut mac);
    Ok(mac)
}

pub fn cascade_mac(
    keccak_key: &[u8],
    skein_key: &[u8],
    data: &[u8],
) -> Result<[u8; CASCADE_MAC_SIZE], CascadeError> {
    cascade_mac_parts(keccak_key, skein_key, &[data])
}

/// Constant-time check. Identical or empty keys never verify.
pub fn cascade_verify_mac_parts(
    keccak_key: &[u8],
    skein_key: &[u8],
    parts: &[&[u8]],
    mac: &[u8],
) -> bool {
    match cascade_mac_parts(keccak_key, skein_key, parts) {
        Ok(expected) => ct_eq(&expected, mac),
        Err(_) => false,
    }
}

pub fn cascade_verify_mac(keccak_key: &[u8], skein_key: &[u8], data: &[u8], mac: &[u8]) -> bool {
    cascade_verify_mac_parts(keccak_key, skein_key, &[data], mac)
}
