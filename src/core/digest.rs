//! Digest facade.
//!
//! A single entry point, [`digest`], over the hash primitives used by the
//! protocol. Primitives come from the RustCrypto crates and are treated as
//! black boxes.
//!
//! Keyed mode:
//! - Merkle–Damgård hashes (MD4, MD5, SHA-1, SHA-2, RIPEMD) use HMAC.
//! - Keccak and Skein are not length-extendable, so they are keyed by
//!   prefixing `u32_be(key.len()) || key` to the data.

use hmac::digest::KeyInit;
use hmac::{Hmac, Mac};
use sha2::Digest;
use skein::digest::consts::{U128, U32, U64};
use thiserror::Error;

/// Supported digest algorithms.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Algorithm {
    Md4,
    Md5,
    Sha1,
    Sha224,
    Sha256,
    Sha384,
    Sha512,
    Ripemd128,
    Ripemd160,
    Keccak512,
    Skein256,
    Skein512,
    Skein1024,
}

/// Errors from the digest facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DigestError {
    /// Requested truncation is longer than the algorithm's output.
    #[error("requested {requested} bytes but {algorithm:?} produces {available}")]
    OutputTooLong {
        algorithm: Algorithm,
        requested: usize,
        available: usize,
    },
    /// Unknown algorithm name.
    #[error("unknown digest algorithm")]
    UnknownAlgorithm,
    /// The keyed construction rejected the key.
    #[error("invalid MAC key")]
    InvalidKey,
}

impl Algorithm {
    /// Native output size in bytes.
    pub const fn output_size(self) -> usize {
        match self {
            Algorithm::Md4 | Algorithm::Md5 | Algorithm::Ripemd128 => 16,
            Algorithm::Sha1 | Algorithm::Ripemd160 => 20,
            Algorithm::Sha224 => 28,
            Algorithm::Sha256 | Algorithm::Skein256 => 32,
            Algorithm::Sha384 => 48,
            Algorithm::Sha512 | Algorithm::Keccak512 | Algorithm::Skein512 => 64,
            Algorithm::Skein1024 => 128,
        }
    }

    /// Parses the lowercase algorithm name used in persisted settings.
    pub fn from_name(name: &str) -> Result<Self, DigestError> {
        Ok(match name {
            "md4" => Algorithm::Md4,
            "md5" => Algorithm::Md5,
            "sha1" => Algorithm::Sha1,
            "sha224" => Algorithm::Sha224,
            "sha256" => Algorithm::Sha256,
            "sha384" => Algorithm::Sha384,
            "sha512" => Algorithm::Sha512,
            "ripemd128" => Algorithm::Ripemd128,
            "ripemd160" => Algorithm::Ripemd160,
            "keccak-512" | "keccak512" => Algorithm::Keccak512,
            "skein-256" | "skein256" => Algorithm::Skein256,
            "skein-512" | "skein512" => Algorithm::Skein512,
            "skein-1024" | "skein1024" => Algorithm::Skein1024,
            _ => return Err(DigestError::UnknownAlgorithm),
        })
    }
}

/// Hashes `data`, optionally keyed, optionally truncated to `out_len` bytes.
pub fn digest(
    algorithm: Algorithm,
    data: &[u8],
    key: Option<&[u8]>,
    out_len: Option<usize>,
) -> Result<Vec<u8>, DigestError> {
    let available = algorithm.output_size();
    let wanted = out_len.unwrap_or(available);
    if wanted > available {
        return Err(DigestError::OutputTooLong {
            algorithm,
            requested: wanted,
            available,
        });
    }

    let mut out = match key {
        None => unkeyed(algorithm, data),
        Some(key) => keyed(algorithm, key, data)?,
    };
    out.truncate(wanted);
    Ok(out)
}

/// Unkeyed Keccak-512.
pub fn keccak512(data: &[u8]) -> [u8; 64] {
    to_array(&sha3::Keccak512::digest(data))
}

/// Unkeyed Skein-512 with a 512-bit output.
pub fn skein512(data: &[u8]) -> [u8; 64] {
    to_array(&skein::Skein512::<U64>::digest(data))
}

/// Keyed Keccak-512 over several data parts.
pub fn keccak512_keyed(key: &[u8], parts: &[&[u8]]) -> [u8; 64] {
    let mut hasher = sha3::Keccak512::new();
    hasher.update(key_prefix(key));
    hasher.update(key);
    for part in parts {
        hasher.update(part);
    }
    to_array(&hasher.finalize())
}

/// Keyed Skein-512 over several data parts.
pub fn skein512_keyed(key: &[u8], parts: &[&[u8]]) -> [u8; 64] {
    let mut hasher = skein::Skein512::<U64>::new();
    hasher.update(key_prefix(key));
    hasher.update(key);
    for part in parts {
        hasher.update(part);
    }
    to_array(&hasher.finalize())
}

fn to_array(output: &[u8]) -> [u8; 64] {
    let mut out = [0u8; 64];
    out.copy_from_slice(output);
    out
}

fn key_prefix(key: &[u8]) -> [u8; 4] {
    (key.len() as u32).to_be_bytes()
}

fn unkeyed(algorithm: Algorithm, data: &[u8]) -> Vec<u8> {
    match algorithm {
        Algorithm::Md4 => md4::Md4::digest(data).to_vec(),
        Algorithm::Md5 => md5::Md5::digest(data).to_vec(),
        Algorithm::Sha1 => sha1::Sha1::digest(data).to_vec(),
        Algorithm::Sha224 => sha2::Sha224::digest(data).to_vec(),
        Algorithm::Sha256 => sha2::Sha256::digest(data).to_vec(),
        Algorithm::Sha384 => sha2::Sha384::digest(data).to_vec(),
        Algorithm::Sha512 => sha2::Sha512::digest(data).to_vec(),
        Algorithm::Ripemd128 => ripemd::Ripemd128::digest(data).to_vec(),
        Algorithm::Ripemd160 => ripemd::Ripemd160::digest(data).to_vec(),
        Algorithm::Keccak512 => keccak512(data).to_vec(),
        Algorithm::Skein256 => skein::Skein256::<U32>::digest(data).to_vec(),
        Algorithm::Skein512 => skein512(data).to_vec(),
        Algorithm::Skein1024 => skein::Skein1024::<U128>::digest(data).to_vec(),
    }
}

fn keyed(algorithm: Algorithm, key: &[u8], data: &[u8]) -> Result<Vec<u8>, DigestError> {
    Ok(match algorithm {
        Algorithm::Md4 => hmac_digest::<Hmac<md4::Md4>>(key, data)?,
        Algorithm::Md5 => hmac_digest::<Hmac<md5::Md5>>(key, data)?,
        Algorithm::Sha1 => hmac_digest::<Hmac<sha1::Sha1>>(key, data)?,
        Algorithm::Sha224 => hmac_digest::<Hmac<sha2::Sha224>>(key, data)?,
        Algorithm::Sha256 => hmac_digest::<Hmac<sha2::Sha256>>(key, data)?,
        Algorithm::Sha384 => hmac_digest::<Hmac<sha2::Sha384>>(key, data)?,
        Algorithm::Sha512 => hmac_digest::<Hmac<sha2::Sha512>>(key, data)?,
        Algorithm::Ripemd128 => hmac_digest::<Hmac<ripemd::Ripemd128>>(key, data)?,
        Algorithm::Ripemd160 => hmac_digest::<Hmac<ripemd::Ripemd160>>(key, data)?,
        Algorithm::Keccak512 => keccak512_keyed(key, &[data]).to_vec(),
        Algorithm::Skein256 => {
            let mut hasher = skein::Skein256::<U32>::new();
            hasher.update(key_prefix(key));
            hasher.update(key);
            hasher.update(data);
            hasher.finalize().to_vec()
        }
        Algorithm::Skein512 => skein512_keyed(key, &[data]).to_vec(),
        Algorithm::Skein1024 => {
            let mut hasher = skein::Skein1024::<U128>::new();
            hasher.update(key_prefix(key));
            hasher.update(key);
            hasher.update(data);
            hasher.finalize().to_vec()
        }
    })
}

fn hmac_digest<M: Mac + KeyInit>(key: &[u8], data: &[u8]) -> Result<Vec<u8>, DigestError> {
    let mut mac = <M as KeyInit>::new_from_slice(key).map_err(|_| DigestError::InvalidKey)?;
    Mac::update(&mut mac, data);
    Ok(mac.finalize().into_bytes().to_vec())
}
