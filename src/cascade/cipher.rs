//! AES-256-CTR then Salsa20.

use ::cipher::{KeyIvInit, StreamCipher};

use super::{CascadeError, AES_KEY_SIZE, AES_NONCE_SIZE, SALSA_KEY_SIZE, SALSA_NONCE_SIZE};

type Aes256Ctr = ctr::Ctr128BE<aes::Aes256>;

fn check_lengths(
    aes_key: &[u8],
    salsa_key: &[u8],
    aes_nonce: &[u8],
    salsa_nonce: &[u8],
) -> Result<(), CascadeError> {
    for (key, expected) in [(aes_key, AES_KEY_SIZE), (salsa_key, SALSA_KEY_SIZE)] {
        if key.len() != expected {
            return Err(CascadeError::InvalidKeyLength {
                expected,
                actual: key.len(),
            });
        }
    }
    for (nonce, expected) in [(aes_nonce, AES_NONCE_SIZE), (salsa_nonce, SALSA_NONCE_SIZE)] {
        if nonce.len() != expected {
            return Err(CascadeError::InvalidNonceLength {
                expected,
                actual: nonce.len(),
            });
        }
    }
    Ok(())
}

fn apply_aes(key: &[u8], nonce: &[u8], data: &mut [u8]) -> Result<(), CascadeError> {
    let mut cipher = Aes256Ctr::new_from_slices(key, nonce).map_err(|_| {
        CascadeError::InvalidKeyLength {
            expected: AES_KEY_SIZE,
            actual: key.len(),
        }
    })?;
    cipher.apply_keystream(data);
    Ok(())
}

fn apply_salsa(key: &[u8], nonce: &[u8], data: &mut [u8]) -> Result<(), CascadeError> {
    let mut cipher = salsa20::Salsa20::new_from_slices(key, nonce).map_err(|_| {
        CascadeError::InvalidKeyLength {
            expected: SALSA_KEY_SIZE,
            actual: key.len(),
        }
    })?;
    cipher.apply_keystream(data);
    Ok(())
}

/// Encrypts with AES-256-CTR, then encrypts that with Salsa20.
pub fn cascade_encrypt(
    aes_key: &[u8],
    salsa_key: &[u8],
    aes_nonce: &[u8],
    salsa_nonce: &[u8],
    data: &[u8],
) -> Result<Vec<u8>, CascadeError> {
    check_lengths(aes_key, salsa_key, aes_nonce, salsa_nonce)?;
    let mut out = data.to_vec();
    apply_aes(aes_key, aes_nonce, &mut out)?;
    apply_salsa(salsa_key, salsa_nonce, &mut out)?;
    Ok(out)
}

/// Removes the Salsa20 layer, then the AES-256-CTR layer.
pub fn cascade_decrypt(
    aes_key: &[u8],
    salsa_key: &[u8],
    aes_nonce: &[u8],
    salsa_nonce: &[u8],
    data: &[u8],
) -> Result<Vec<u8>, CascadeError> {
    check_lengths(aes_key, salsa_key, aes_nonce, salsa_nonce)?;
    let mut out = data.to_vec();
    apply_salsa(salsa_key, salsa_nonce, &mut out)?;
    apply_aes(aes_key, aes_nonce, &mut out)?;
    Ok(out)
}
