//! Storage Module.
//!
//! Handles persistent storage of sealed pads and their index MACs:
//! - `memory`: in-process map, used by tests and ephemeral sessions.
//! - `raw_files`: a JSON key-value file written atomically (write-sync-rename).
//! - `vault`: password unlock of the at-rest key set.
//!
//! Everything stored here is already sealed; this layer never sees pad plaintext.

pub mod memory;
pub mod raw_files;
pub mod vault;

use thiserror::Error;

/// Errors related to storage operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum StorageError {
    /// File not found.
    #[error("not found")]
    NotFound,
    /// Permission denied.
    #[error("permission denied")]
    PermissionDenied,
    /// IO error (generic).
    #[error("I/O error")]
    IoError,
    /// Stored bytes did not parse.
    #[error("stored data is corrupt")]
    Corruption,
    /// Invalid path or filename.
    #[error("invalid path")]
    InvalidPath,
}

impl From<std::io::Error> for StorageError {
    fn from(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => StorageError::NotFound,
            std::io::ErrorKind::PermissionDenied => StorageError::PermissionDenied,
            _ => StorageError::IoError,
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(_: serde_json::Error) -> Self {
        StorageError::Corruption
    }
}

/// Persisted store collaborator.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;
    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError>;
    fn remove(&mut self, key: &str) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for &mut T {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}
