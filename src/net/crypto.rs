//! Network layer encryption and authentication.
//!
//! Keystream blocks are `Skein512(key ‖ nonce ‖ u64_be(counter))`, counting
//! from zero. The MAC is keyed Skein-512 over
//! `group_identifier ‖ nonce ‖ ciphertext`.

use zeroize::Zeroizing;

use super::{NetError, GROUP_IDENTIFIER_SIZE, NETWORK_MAC_SIZE, NONCE_SIZE};
use crate::core::digest::{skein512, skein512_keyed};
use crate::core::xor::{ct_eq, xor};

const ENCRYPTION_KEY_LABEL: &[u8] = b"padcomms/net-encryption";
const MAC_KEY_LABEL: &[u8] = b"padcomms/net-mac";
const BLOCK_SIZE: usize = 64;

/// Keys derived from the group key.
pub struct NetworkKeys {
    pub encryption_key: Zeroizing<[u8; 64]>,
    pub mac_key: Zeroizing<[u8; 64]>,
}

impl std::fmt::Debug for NetworkKeys {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("NetworkKeys { .. }")
    }
}

/// Two domain-separated 512-bit keys from the shared group key.
pub fn derive_encryption_and_mac_keys(group_key: &[u8]) -> Result<NetworkKeys, NetError> {
    if group_key.is_empty() {
        return Err(NetError::InvalidKey);
    }
    Ok(NetworkKeys {
        encryption_key: Zeroizing::new(skein512_keyed(group_key, &[ENCRYPTION_KEY_LABEL])),
        mac_key: Zeroizing::new(skein512_keyed(group_key, &[MAC_KEY_LABEL])),
    })
}

pub fn generate_keystream(key: &[u8], nonce: &[u8; NONCE_SIZE], len: usize) -> Zeroizing<Vec<u8>> {
    let mut keystream = Zeroizing::new(Vec::with_capacity(len.next_multiple_of(BLOCK_SIZE)));
    let mut block_input = Zeroizing::new(Vec::with_capacity(key.len() + NONCE_SIZE + 8));
    let mut counter = 0u64;

    while keystream.len() < len {
        block_input.clear();
        block_input.extend_from_slice(key);
        block_input.extend_from_slice(nonce);
        block_input.extend_from_slice(&counter.to_be_bytes());
        keystream.extend_from_slice(&skein512(&block_input));
        counter += 1;
    }
    keystream.truncate(len);
    keystream
}

/// Symmetric: the same call encrypts and decrypts.
pub fn encrypt_or_decrypt_payload(key: &[u8], nonce: &[u8; NONCE_SIZE], data: &[u8]) -> Vec<u8> {
    let keystream = generate_keystream(key, nonce, data.len());
    let mut out = vec![0u8; data.len()];
    xor(data, &keystream, &mut out);
    out
}

pub fn serialise_data_for_authentication(
    nonce: &[u8; NONCE_SIZE],
    payload: &[u8],
    group_identifier: &[u8; GROUP_IDENTIFIER_SIZE],
) -> Vec<u8> {
    let mut data = Vec::with_capacity(GROUP_IDENTIFIER_SIZE + NONCE_SIZE + payload.len());
    data.extend_from_slice(group_identifier);
    data.extend_from_slice(nonce);
    data.extend_from_slice(payload);
    data
}

pub fn compute_mac(
    mac_key: &[u8],
    nonce: &[u8; NONCE_SIZE],
    payload: &[u8],
    group_identifier: &[u8; GROUP_IDENTIFIER_SIZE],
) -> [u8; NETWORK_MAC_SIZE] {
    let data = serialise_data_for_authentication(nonce, payload, group_identifier);
    skein512_keyed(mac_key, &[data.as_slice()])
}

/// Constant-time comparison against a freshly computed MAC.
pub fn verify_response_mac(
    mac_key: &[u8],
    nonce: &[u8; NONCE_SIZE],
    payload: &[u8],
    group_identifier: &[u8; GROUP_IDENTIFIER_SIZE],
    mac: &[u8],
) -> bool {
    let expected = compute_mac(mac_key, nonce, payload, group_identifier);
    mac.len() == NETWORK_MAC_SIZE && ct_eq(&expected, mac)
}

#[cfg(test)]
mod tests {
    use super::*;

    const NONCE: [u8; NONCE_SIZE] = [7; NONCE_SIZE];
    const GROUP: [u8; GROUP_IDENTIFIER_SIZE] = [1, 2, 3, 4, 5, 6, 7, 8];

    #[test]
    fn test_keys_are_domain_separated() {
        let keys = derive_encryption_and_mac_keys(b"group key").unwrap();
        assert_ne!(*keys.encryption_key, *keys.mac_key);

        let again = derive_encryption_and_mac_keys(b"group key").unwrap();
        assert_eq!(*keys.encryption_key, *again.encryption_key);

        let other = derive_encryption_and_mac_keys(b"other key").unwrap();
        assert_ne!(*keys.encryption_key, *other.encryption_key);

        assert_eq!(derive_encryption_and_mac_keys(&[]).unwrap_err(), NetError::InvalidKey);
        assert_eq!(format!("{:?}", keys), "NetworkKeys { .. }");
    }

    #[test]
    fn test_keystream_blocks() {
        let key = [9u8; 64];
        let keystream = generate_keystream(&key, &NONCE, 150);
        assert_eq!(keystream.len(), 150);

        let mut first = key.to_vec();
        first.extend_from_slice(&NONCE);
        first.extend_from_slice(&0u64.to_be_bytes());
        assert_eq!(&keystream[..64], &skein512(&first)[..]);

        let mut third = key.to_vec();
        third.extend_from_slice(&NONCE);
        third.extend_from_slice(&2u64.to_be_bytes());
        assert_eq!(&keystream[128..], &skein512(&third)[..22]);

        // Prefix property
        let short = generate_keystream(&key, &NONCE, 10);
        assert_eq!(&short[..], &keystream[..10]);
        assert!(generate_keystream(&key, &NONCE, 0).is_empty());
    }

    #[test]
    fn test_keystream_known_answer() {
        let keystream = generate_keystream(&[9u8; 64], &NONCE, 150);
        assert_eq!(
            hex::encode(&keystream[..]),
            concat!(
                "30f503acfc83163f5a2ac626af88032c5bee3fb1470cb8354a9dfe1dc3e8af7c",
                "e7eb44904fcb09678377caed81eeaad4944beeff523b15966b1c290599899c8f",
                "af2b7239a01ae67de5c0e48a8c0139e2c086485ae2dcb503ea8ec0c91040cf34",
                "c7a594382519201932105ef03bbc2e28ab2cdbe39f6eb86370476ecc270a360f",
                "46ddbcaafdcfd752acff68f922f022a62c8edd0ec8f4"
            )
        );
    }

    #[test]
    fn test_mac_known_answer() {
        let mac = compute_mac(&[5u8; 64], &NONCE, b"payload", &GROUP);
        assert_eq!(
            hex::encode(mac),
            concat!(
                "60d8eb5c40f423c86585e4946914442f06705737707b2d75097aa55da8df1bfe",
                "9800266056071fb11fe5f36b40be91e4470165f476f3bc91d2ed420c1b5e65ad"
            )
        );
    }

    #[test]
    fn test_payload_encryption_is_symmetric() {
        let key = [3u8; 64];
        let payload = b"relay payload that spans more than one keystream block, easily so".to_vec();
        let ciphertext = encrypt_or_decrypt_payload(&key, &NONCE, &payload);
        assert_ne!(ciphertext, payload);
        assert_eq!(encrypt_or_decrypt_payload(&key, &NONCE, &ciphertext), payload);

        let other_nonce = [8u8; NONCE_SIZE];
        assert_ne!(encrypt_or_decrypt_payload(&key, &other_nonce, &payload), ciphertext);
    }

    #[test]
    fn test_authentication_layout() {
        let data = serialise_data_for_authentication(&NONCE, b"xyz", &GROUP);
        assert_eq!(&data[..8], &GROUP);
        assert_eq!(&data[8..40], &NONCE);
        assert_eq!(&data[40..], b"xyz");
    }

    #[test]
    fn test_mac_verification() {
        let key = [5u8; 64];
        let mac = compute_mac(&key, &NONCE, b"payload", &GROUP);
        assert!(verify_response_mac(&key, &NONCE, b"payload", &GROUP, &mac));
        assert!(!verify_response_mac(&key, &NONCE, b"payloaD", &GROUP, &mac));
        assert!(!verify_response_mac(&key, &[0; NONCE_SIZE], b"payload", &GROUP, &mac));
        assert!(!verify_response_mac(&key, &NONCE, b"payload", &[0; 8], &mac));
        assert!(!verify_response_mac(&[6u8; 64], &NONCE, b"payload", &GROUP, &mac));
        assert!(!verify_response_mac(&key, &NONCE, b"payload", &GROUP, &mac[..63]));
    }
}
