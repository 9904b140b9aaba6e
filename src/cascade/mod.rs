//! Cascade encryption for pads at rest.
//!
//! Pads waiting to be used are sealed under two independent primitives so a
//! break in either one alone does not expose them:
//! - `cipher`: AES-256-CTR followed by Salsa20.
//! - `mac`: keyed Keccak-512 XOR keyed Skein-512.
//! - `sealed`: per-pad sealing with nonces bound to the owning user and pad number.
//! - `kdf`: iterated password derivation and subkey expansion.
//! - `strength`: passphrase strength estimate including KDF work.

pub mod cipher;
pub mod kdf;
pub mod mac;
pub mod sealed;
pub mod strength;

use thiserror::Error;
use zeroize::{Zeroize, ZeroizeOnDrop};

pub const AES_KEY_SIZE: usize = 32;
pub const AES_NONCE_SIZE: usize = 16;
pub const SALSA_KEY_SIZE: usize = 32;
pub const SALSA_NONCE_SIZE: usize = 8;
pub const MAC_KEY_SIZE: usize = 64;
pub const CASCADE_MAC_SIZE: usize = 64;

/// Errors from the at-rest cascade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CascadeError {
    #[error("key must be {expected} bytes, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },
    #[error("nonce must be {expected} bytes, got {actual}")]
    InvalidNonceLength { expected: usize, actual: usize },
    /// The Keccak and Skein MAC keys are equal.
    #[error("cascade MAC keys must be distinct")]
    NonDistinctKeys,
    #[error("iteration count must be a non-negative integer")]
    InvalidIterationCount,
    #[error("sealed field is not valid hex")]
    InvalidHex,
    #[error("key derivation worker did not complete")]
    WorkerFailed,
    /// A length-prefixed field does not fit a 32-bit length.
    #[error("field of {0} bytes is too long to authenticate")]
    FieldTooLong(usize),
}

/// `u32_be(field.len())`, framing a variable-length field inside MAC input.
pub fn length_prefix(field: &[u8]) -> Result<[u8; 4], CascadeError> {
    u32::try_from(field.len())
        .map(u32::to_be_bytes)
        .map_err(|_| CascadeError::FieldTooLong(field.len()))
}

/// Subkeys expanded from the master key. Wiped on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct DerivedKeySet {
    pub aes_key: [u8; AES_KEY_SIZE],
    pub salsa_key: [u8; SALSA_KEY_SIZE],
    pub keccak_mac_key: [u8; MAC_KEY_SIZE],
    pub skein_mac_key: [u8; MAC_KEY_SIZE],
}

impl std::fmt::Debug for DerivedKeySet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("DerivedKeySet { .. }")
    }
}
