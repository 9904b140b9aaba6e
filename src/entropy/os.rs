//! Operating-system RNG wrapper.
//!
//! Used for values that need to be unpredictable but never become pad
//! material: message padding, traffic padding, nonces and salts.

use rand_core::{OsRng, RngCore};

use super::{EntropyError, EntropySource};

/// Entropy from the OS CSPRNG (`getrandom`).
#[derive(Debug, Default, Clone, Copy)]
pub struct OsSource;

impl OsSource {
    pub fn new() -> Self {
        Self
    }
}

impl EntropySource for OsSource {
    fn name(&self) -> &'static str {
        "OsRng"
    }

    fn fill(&mut self, dest: &mut [u8]) -> Result<(), EntropyError> {
        OsRng
            .try_fill_bytes(dest)
            .map_err(|_| EntropyError::CollectionFailed)
    }

    fn entropy_estimate(&self) -> f64 {
        8.0
    }
}
