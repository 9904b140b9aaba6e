//! Password-protected key vault.
//!
//! Stores the KDF salt and work factors next to a key-check MAC so a password
//! can be tested without touching any pad. The derived key set itself is never
//! persisted.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use zeroize::Zeroizing;

use super::{KeyValueStore, StorageError};
use crate::cascade::kdf::{derive_keys_from_password, KdfConfig};
use crate::cascade::mac::{cascade_mac, cascade_verify_mac};
use crate::cascade::{CascadeError, DerivedKeySet};
use crate::entropy::{EntropyError, EntropySource};

const VAULT_KEY: &str = "vault";
const KEY_CHECK_LABEL: &[u8] = b"padcomms/key-check";
/// Shortest salt accepted when creating a vault.
pub const MIN_SALT_SIZE: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VaultError {
    #[error("wrong password")]
    WrongPassword,
    #[error("vault has not been created")]
    NotInitialised,
    #[error("vault already exists")]
    AlreadyInitialised,
    #[error("salt must be at least 16 bytes, got {0}")]
    SaltTooShort(usize),
    #[error("vault record is corrupt")]
    Corrupt,
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
    #[error("cascade error: {0}")]
    Cascade(#[from] CascadeError),
    #[error("entropy error: {0}")]
    Entropy(#[from] EntropyError),
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct VaultRecord {
    salt: String,
    keccak_iterations: u32,
    skein_iterations: u32,
    key_check: String,
}

/// Creates and unlocks the vault record inside a [`KeyValueStore`].
pub struct KeyVault;

impl KeyVault {
    pub fn exists<S: KeyValueStore + ?Sized>(store: &S) -> Result<bool, VaultError> {
        Ok(store.get(VAULT_KEY)?.is_some())
    }

    /// Derives a fresh key set from `password` with a random salt and records it.
    pub fn create<S, R>(
        store: &mut S,
        password: &[u8],
        config: &KdfConfig,
        rng: &mut R,
    ) -> Result<DerivedKeySet, VaultError>
    where
        S: KeyValueStore + ?Sized,
        R: EntropySource + ?Sized,
    {
        if Self::exists(store)? {
            return Err(VaultError::AlreadyInitialised);
        }
        if config.salt_size < MIN_SALT_SIZE {
            return Err(VaultError::SaltTooShort(config.salt_size));
        }

        let mut salt = vec![0u8; config.salt_size];
        rng.fill(&mut salt)?;

        let keccak_iterations = config.keccak_iterations.get();
        let skein_iterations = config.skein_iterations.get();
        let keys = derive_keys_from_password(password, &salt, keccak_iterations, skein_iterations);
        let key_check = cascade_mac(&keys.keccak_mac_key, &keys.skein_mac_key, KEY_CHECK_LABEL)?;

        let record = VaultRecord {
            salt: hex::encode(&salt),
            keccak_iterations,
            skein_iterations,
            key_check: hex::encode(key_check),
        };
        let bytes = serde_json::to_vec(&record).map_err(|_| VaultError::Corrupt)?;
        store.set(VAULT_KEY, &bytes)?;

        log::info!(
            "Vault created ({} / {} iterations)",
            keccak_iterations,
            skein_iterations
        );
        Ok(keys)
    }

    /// Re-derives the key set and checks it against the stored key-check MAC.
    pub fn unlock<S: KeyValueStore + ?Sized>(
        store: &S,
        password: &[u8],
    ) -> Result<DerivedKeySet, VaultError> {
        let bytes = store.get(VAULT_KEY)?.ok_or(VaultError::NotInitialised)?;
        let record: VaultRecord = serde_json::from_slice(&bytes).map_err(|_| VaultError::Corrupt)?;
        let salt = Zeroizing::new(hex::decode(&record.salt).map_err(|_| VaultError::Corrupt)?);
        let key_check = hex::decode(&record.key_check).map_err(|_| VaultError::Corrupt)?;

        let keys = derive_keys_from_password(
            password,
            &salt,
            record.keccak_iterations,
            record.skein_iterations,
        );
        if !cascade_verify_mac(&keys.keccak_mac_key, &keys.skein_mac_key, KEY_CHECK_LABEL, &key_check) {
            log::warn!("Vault unlock failed");
            return Err(VaultError::WrongPassword);
        }
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cascade::strength::IterationCount;
    use crate::entropy::os::OsSource;
    use crate::storage::memory::MemoryStore;

    fn fast_config() -> KdfConfig {
        KdfConfig {
            keccak_iterations: IterationCount::new(8),
            skein_iterations: IterationCount::new(16),
            salt_size: 32,
        }
    }

    #[test]
    fn test_create_then_unlock() {
        let mut store = MemoryStore::new();
        let created = KeyVault::create(&mut store, b"correct horse", &fast_config(), &mut OsSource::new()).unwrap();
        let unlocked = KeyVault::unlock(&store, b"correct horse").unwrap();
        assert_eq!(created.aes_key, unlocked.aes_key);
        assert_eq!(created.skein_mac_key, unlocked.skein_mac_key);
    }

    #[test]
    fn test_wrong_password() {
        let mut store = MemoryStore::new();
        KeyVault::create(&mut store, b"correct horse", &fast_config(), &mut OsSource::new()).unwrap();
        assert_eq!(
            KeyVault::unlock(&store, b"battery staple").unwrap_err(),
            VaultError::WrongPassword
        );
    }

    #[test]
    fn test_lifecycle_errors() {
        let mut store = MemoryStore::new();
        assert_eq!(
            KeyVault::unlock(&store, b"pw").unwrap_err(),
            VaultError::NotInitialised
        );
        KeyVault::create(&mut store, b"pw", &fast_config(), &mut OsSource::new()).unwrap();
        assert_eq!(
            KeyVault::create(&mut store, b"pw", &fast_config(), &mut OsSource::new()).unwrap_err(),
            VaultError::AlreadyInitialised
        );

        let mut short = fast_config();
        short.salt_size = 8;
        assert_eq!(
            KeyVault::create(&mut MemoryStore::new(), b"pw", &short, &mut OsSource::new()).unwrap_err(),
            VaultError::SaltTooShort(8)
        );
    }

    #[test]
    fn test_corrupt_record() {
        let mut store = MemoryStore::new();
        store.set(VAULT_KEY, b"{}").unwrap();
        assert_eq!(KeyVault::unlock(&store, b"pw").unwrap_err(), VaultError::Corrupt);
    }
}
