//! Raw File Storage.
//!
//! A key-value store kept as one JSON object on disk. Values are base64.
//!
//! # Security
//! - Ensures files are written atomically (write-sync-rename).
//! - Sets restrictive permissions (where supported).

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

use super::{KeyValueStore, StorageError};

/// Upper bound on a store file.
const MAX_FILE_SIZE: u64 = 256 * 1024 * 1024;

/// Writes data to a file atomically.
pub fn write_atomic<P: AsRef<Path>>(path: P, data: &[u8]) -> Result<(), StorageError> {
    let path = path.as_ref();
    let filename = path.file_name().ok_or(StorageError::InvalidPath)?;
    let mut temp_path = path.to_path_buf();
    temp_path.set_file_name(format!("{}.tmp", filename.to_string_lossy()));

    let mut file = File::create(&temp_path)?;
    restrict_permissions(&file);
    file.write_all(data)?;
    file.sync_all()?;

    // Rename to final path (atomic on POSIX)
    fs::rename(&temp_path, path)?;
    Ok(())
}

#[cfg(unix)]
fn restrict_permissions(file: &File) {
    use std::os::unix::fs::PermissionsExt;
    if let Err(err) = file.set_permissions(fs::Permissions::from_mode(0o600)) {
        log::warn!("Could not restrict store file permissions: {}", err);
    }
}

#[cfg(not(unix))]
fn restrict_permissions(_file: &File) {}

/// Reads data from a file.
pub fn read_file<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, StorageError> {
    let mut file = File::open(path)?;
    let len = file.metadata()?.len();
    if len > MAX_FILE_SIZE {
        return Err(StorageError::IoError);
    }

    let mut buffer = Vec::with_capacity(len as usize);
    file.read_to_end(&mut buffer)?;
    Ok(buffer)
}

/// JSON-file backed [`KeyValueStore`]. Every mutation rewrites the file.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    data: BTreeMap<String, String>,
}

impl FileStore {
    /// Opens `path`, starting empty if it does not exist yet.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref().to_path_buf();
        let data = match read_file(&path) {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(StorageError::NotFound) => BTreeMap::new(),
            Err(err) => return Err(err),
        };
        Ok(Self { path, data })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(&self.data)?;
        write_atomic(&self.path, &bytes)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        self.data
            .get(key)
            .map(|encoded| STANDARD.decode(encoded).map_err(|_| StorageError::Corruption))
            .transpose()
    }

    fn set(&mut self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.data.insert(key.to_owned(), STANDARD.encode(value));
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StorageError> {
        if self.data.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}
