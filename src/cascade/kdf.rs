//! Password-based key derivation.
//!
//! Two independent iterated hashes (Keccak-512 and Skein-512) each take half
//! of the salt; their outputs are XORed into the master key. Subkeys are then
//! expanded from the master key under fixed labels.

use serde::Deserialize;
use zeroize::Zeroizing;

use super::strength::IterationCount;
#[cfg(feature = "worker")]
use super::CascadeError;
use super::{DerivedKeySet, AES_KEY_SIZE, MAC_KEY_SIZE, SALSA_KEY_SIZE};
use crate::core::digest::{keccak512, skein512};
use crate::core::xor::xor;

pub const MASTER_KEY_SIZE: usize = 64;

const AES_KEY_LABEL: &[u8] = b"padcomms/aes-256-ctr";
const SALSA_KEY_LABEL: &[u8] = b"padcomms/salsa20";
const KECCAK_MAC_KEY_LABEL: &[u8] = b"padcomms/keccak-512-mac";
const SKEIN_MAC_KEY_LABEL: &[u8] = b"padcomms/skein-512-mac";

/// Work factors for password derivation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct KdfConfig {
    pub keccak_iterations: IterationCount,
    pub skein_iterations: IterationCount,
    /// Total salt bytes; each hash gets half.
    pub salt_size: usize,
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            keccak_iterations: IterationCount::new(10_000),
            skein_iterations: IterationCount::new(10_000),
            salt_size: 64,
        }
    }
}

fn iterate(
    hash: fn(&[u8]) -> [u8; 64],
    password: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Zeroizing<[u8; MASTER_KEY_SIZE]> {
    let mut buf = Zeroizing::new(Vec::with_capacity(MASTER_KEY_SIZE + password.len() + salt.len()));
    buf.extend_from_slice(password);
    buf.extend_from_slice(salt);
    let mut state = Zeroizing::new(hash(&buf));

    // 0 and 1 both mean a single round.
    for _ in 1..iterations.max(1) {
        buf.clear();
        buf.extend_from_slice(&*state);
        buf.extend_from_slice(password);
        buf.extend_from_slice(salt);
        *state = hash(&buf);
    }
    state
}

/// `h1 = Keccak512(password ‖ salt)`, `hi = Keccak512(h(i-1) ‖ password ‖ salt)`.
pub fn keccak_password_derivation(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Zeroizing<[u8; MASTER_KEY_SIZE]> {
    iterate(keccak512, password, salt, iterations)
}

/// Same construction as [`keccak_password_derivation`] with Skein-512.
pub fn skein_password_derivation(
    password: &[u8],
    salt: &[u8],
    iterations: u32,
) -> Zeroizing<[u8; MASTER_KEY_SIZE]> {
    iterate(skein512, password, salt, iterations)
}

/// Master key: Keccak over the first half of `salt` XOR Skein over the second half.
pub fn cascade_password_derivation(
    password: &[u8],
    salt: &[u8],
    keccak_iterations: u32,
    skein_iterations: u32,
) -> Zeroizing<[u8; MASTER_KEY_SIZE]> {
    let (keccak_salt, skein_salt) = salt.split_at(salt.len() / 2);
    let keccak = keccak_password_derivation(password, keccak_salt, keccak_iterations);
    let skein = skein_password_derivation(password, skein_salt, skein_iterations);

    let mut master = Zeroizing::new([0u8; MASTER_KEY_SIZE]);
    xor(&*keccak, &*skein, &mut *master);
    master
}

fn expand(label: &[u8], master_key: &[u8], out: &mut [u8]) {
    let mut input = Zeroizing::new(Vec::with_capacity(label.len() + master_key.len()));
    input.extend_from_slice(label);
    input.extend_from_slice(master_key);
    let keccak = Zeroizing::new(keccak512(&input));
    let skein = Zeroizing::new(skein512(&input));
    let len = out.len();
    xor(&keccak[..len], &skein[..len], out);
}

/// Expands the four subkeys from `master_key` under distinct labels.
pub fn derive_keys_from_master_key(master_key: &[u8]) -> DerivedKeySet {
    let mut keys = DerivedKeySet {
        aes_key: [0u8; AES_KEY_SIZE],
        salsa_key: [0u8; SALSA_KEY_SIZE],
        keccak_mac_key: [0u8; MAC_KEY_SIZE],
        skein_mac_key: [0u8; MAC_KEY_SIZE],
    };
    expand(AES_KEY_LABEL, master_key, &mut keys.aes_key);
    expand(SALSA_KEY_LABEL, master_key, &mut keys.salsa_key);
    expand(KECCAK_MAC_KEY_LABEL, master_key, &mut keys.keccak_mac_key);
    expand(SKEIN_MAC_KEY_LABEL, master_key, &mut keys.skein_mac_key);
    keys
}

/// Password straight to subkeys.
pub fn derive_keys_from_password(
    password: &[u8],
    salt: &[u8],
    keccak_iterations: u32,
    skein_iterations: u32,
) -> DerivedKeySet {
    let master = cascade_password_derivation(password, salt, keccak_iterations, skein_iterations);
    derive_keys_from_master_key(&*master)
}

/// Runs [`derive_keys_from_password`] on the blocking thread pool.
#[cfg(feature = "worker")]
pub async fn derive_keys_from_password_in_worker(
    password: Zeroizing<Vec<u8>>,
    salt: Vec<u8>,
    keccak_iterations: u32,
    skein_iterations: u32,
) -> Result<DerivedKeySet, CascadeError> {
    tokio::task::spawn_blocking(move || {
        derive_keys_from_password(&password, &salt, keccak_iterations, skein_iterations)
    })
    .await
    .map_err(|_| CascadeError::WorkerFailed)
}

/// Runs [`cascade_password_derivation`] on the blocking thread pool.
#[cfg(feature = "worker")]
pub async fn cascade_password_derivation_in_worker(
    password: Zeroizing<Vec<u8>>,
    salt: Vec<u8>,
    keccak_iterations: u32,
    skein_iterations: u32,
) -> Result<Zeroizing<[u8; MASTER_KEY_SIZE]>, CascadeError> {
    tokio::task::spawn_blocking(move || {
        cascade_password_derivation(&password, &salt, keccak_iterations, skein_iterations)
    })
    .await
    .map_err(|_| CascadeError::WorkerFailed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_round_definition() {
        let out = keccak_password_derivation(b"pw", b"salt", 1);
        assert_eq!(*out, keccak512(b"pwsalt"));
        let out = skein_password_derivation(b"pw", b"salt", 1);
        assert_eq!(*out, skein512(b"pwsalt"));
    }

    #[test]
    fn test_zero_and_one_iterations_match() {
        assert_eq!(
            *keccak_password_derivation(b"pw", b"salt", 0),
            *keccak_password_derivation(b"pw", b"salt", 1)
        );
        assert_eq!(
            *skein_password_derivation(b"pw", b"salt", 0),
            *skein_password_derivation(b"pw", b"salt", 1)
        );
    }

    #[test]
    fn test_two_rounds_chain() {
        let h1 = keccak512(b"pwsalt");
        let mut second = h1.to_vec();
        second.extend_from_slice(b"pwsalt");
        assert_eq!(*keccak_password_derivation(b"pw", b"salt", 2), keccak512(&second));
        assert_ne!(
            *keccak_password_derivation(b"pw", b"salt", 2),
            *keccak_password_derivation(b"pw", b"salt", 3)
        );
    }

    #[test]
    fn test_cascade_splits_salt() {
        let salt = b"0123456789abcdef";
        let master = cascade_password_derivation(b"pw", salt, 5, 7);
        let keccak = keccak_password_derivation(b"pw", &salt[..8], 5);
        let skein = skein_password_derivation(b"pw", &salt[8..], 7);
        for i in 0..MASTER_KEY_SIZE {
            assert_eq!(master[i], keccak[i] ^ skein[i]);
        }
    }

    #[test]
    fn test_subkeys_are_distinct_and_deterministic() {
        let master = [0x42u8; 64];
        let keys = derive_keys_from_master_key(&master);
        let again = derive_keys_from_master_key(&master);
        assert_eq!(keys.aes_key, again.aes_key);
        assert_ne!(keys.aes_key, keys.salsa_key);
        assert_ne!(keys.keccak_mac_key, keys.skein_mac_key);
        assert_ne!(&keys.keccak_mac_key[..32], &keys.aes_key[..]);
    }

    #[test]
    fn test_subkey_is_truncated_xor() {
        let master = [0x17u8; 64];
        let keys = derive_keys_from_master_key(&master);
        let mut input = AES_KEY_LABEL.to_vec();
        input.extend_from_slice(&master);
        let k = keccak512(&input);
        let s = skein512(&input);
        for i in 0..AES_KEY_SIZE {
            assert_eq!(keys.aes_key[i], k[i] ^ s[i]);
        }
    }

    #[cfg(feature = "worker")]
    #[tokio::test]
    async fn test_worker_matches_inline() {
        let inline = derive_keys_from_password(b"pw", b"salt-salt", 10, 20);
        let worker = derive_keys_from_password_in_worker(
            Zeroizing::new(b"pw".to_vec()),
            b"salt-salt".to_vec(),
            10,
            20,
        )
        .await
        .unwrap();
        assert_eq!(inline.aes_key, worker.aes_key);
        assert_eq!(inline.skein_mac_key, worker.skein_mac_key);
    }
}
