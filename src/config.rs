//! Configuration management.
//!
//! A single JSON document with optional `kdf`, `network` and `trng` sections.
//! Missing sections and fields take their defaults.
//!
//! ```json
//! {
//!   "kdf": { "keccak_iterations": "20000", "skein_iterations": 20000, "salt_size": 64 },
//!   "network": { "server_url": "https://relay.example/api", "group_identifier": "0011223344556677" },
//!   "trng": { "max_attempts": 5 }
//! }
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use crate::cascade::kdf::KdfConfig;
use crate::entropy::trng::TrngConfig;
use crate::net::client::parse_group_identifier;
use crate::net::NetworkConfig;
use crate::storage::raw_files::read_file;
use crate::storage::StorageError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read config: {0}")]
    Read(#[from] StorageError),
    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid config value: {0}")]
    Invalid(&'static str),
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub kdf: KdfConfig,
    pub network: NetworkConfig,
    pub trng: TrngConfig,
}

impl Config {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let bytes = read_file(path.as_ref())?;
        let config: Config = serde_json::from_slice(&bytes)?;
        config.validate()?;
        log::debug!("Loaded config from {}", path.as_ref().display());
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.kdf.salt_size < crate::storage::vault::MIN_SALT_SIZE {
            return Err(ConfigError::Invalid("kdf.salt_size"));
        }
        if parse_group_identifier(&self.network.group_identifier).is_err() {
            return Err(ConfigError::Invalid("network.group_identifier"));
        }
        if self.network.padding.min_padding_bits > self.network.padding.max_padding_bits {
            return Err(ConfigError::Invalid("network padding bounds"));
        }
        if self.trng.max_attempts == 0 || self.trng.max_captures_per_attempt == 0 {
            return Err(ConfigError::Invalid("trng limits"));
        }
        Ok(())
    }
}
