//! Camera TRNG pipeline.
//!
//! capture two frames → per-pixel LSB → XOR of both frames → Von Neumann →
//! FIPS 140-2 self-test on every 20,000-bit block → packed bytes.
//!
//! A batch that fails any test is discarded in full and regenerated. After
//! `max_attempts` rejected batches generation fails with
//! [`EntropyError::SelfTestFailed`].

use serde::Deserialize;
use zeroize::Zeroizing;

use super::camera::{check_for_repeating_pixels, get_least_sig_bits_from_array, Camera};
use super::extractor::{extract_bytes, get_xored_least_sig_bits, von_neumann_extractor};
use super::fips::{self, BLOCK_BITS};
use super::{EntropyError, EntropySource};

/// Pipeline limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct TrngConfig {
    /// Batches to try before giving up.
    pub max_attempts: u32,
    /// Frame pairs to capture per batch before treating it as too short.
    pub max_captures_per_attempt: u32,
}

impl Default for TrngConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            max_captures_per_attempt: 64,
        }
    }
}

/// Turns camera frames into self-tested random bytes.
pub struct TrngPipeline<C: Camera> {
    camera: C,
    config: TrngConfig,
}

impl<C: Camera> TrngPipeline<C> {
    pub fn new(camera: C, config: TrngConfig) -> Self {
        Self { camera, config }
    }

    /// Generates exactly `len` bytes, every bit of which came from a tested block.
    pub fn generate(&mut self, len: usize) -> Result<Zeroizing<Vec<u8>>, EntropyError> {
        let blocks = (len * 8).div_ceil(BLOCK_BITS).max(1);
        let needed_bits = blocks * BLOCK_BITS;

        for attempt in 1..=self.config.max_attempts {
            let Some(bits) = self.collect_bits(needed_bits)? else {
                log::warn!(
                    "TRNG attempt {}/{}: camera produced too few unbiased bits",
                    attempt,
                    self.config.max_attempts
                );
                continue;
            };

            if fips::all_blocks_pass(&bits[..needed_bits]) {
                log::info!("TRNG produced {} bytes after {} attempt(s)", len, attempt);
                return extract_bytes(&bits[..needed_bits], len)
                    .map(Zeroizing::new)
                    .ok_or(EntropyError::Exhausted);
            }

            log::warn!(
                "TRNG attempt {}/{}: batch failed self-test, discarding",
                attempt,
                self.config.max_attempts
            );
        }

        Err(EntropyError::SelfTestFailed)
    }

    /// Captures frame pairs until `needed_bits` extracted bits are available.
    fn collect_bits(&mut self, needed_bits: usize) -> Result<Option<Zeroizing<String>>, EntropyError> {
        let mut bits = Zeroizing::new(String::with_capacity(needed_bits));

        for _ in 0..self.config.max_captures_per_attempt {
            let first = self.camera.capture()?;
            let second = self.camera.capture()?;

            let repeating = check_for_repeating_pixels(&first.pixels, &second.pixels);
            if !repeating.is_empty() {
                log::warn!(
                    "{} of {} pixels identical across captures",
                    repeating.len(),
                    first.pixel_count()
                );
            }

            let lsb_a = Zeroizing::new(get_least_sig_bits_from_array(&first.pixels));
            let lsb_b = Zeroizing::new(get_least_sig_bits_from_array(&second.pixels));
            let xored = Zeroizing::new(get_xored_least_sig_bits(&lsb_a, &lsb_b));
            bits.push_str(&von_neumann_extractor(&xored));

            if bits.len() >= needed_bits {
                return Ok(Some(bits));
            }
        }

        Ok(None)
    }
}

#[cfg(feature = "worker")]
impl<C: Camera + Send + 'static> TrngPipeline<C> {
    /// Runs [`TrngPipeline::generate`] on the blocking thread pool.
    pub async fn generate_in_worker(mut self, len: usize) -> Result<Zeroizing<Vec<u8>>, EntropyError> {
        tokio::task::spawn_blocking(move || self.generate(len))
            .await
            .map_err(|_| EntropyError::WorkerFailed)?
    }
}

impl<C: Camera> EntropySource for TrngPipeline<C> {
    fn name(&self) -> &'static str {
        "CameraTrng"
    }

    fn fill(&mut self, dest: &mut [u8]) -> Result<(), EntropyError> {
        let bytes = self.generate(dest.len())?;
        dest.copy_from_slice(&bytes);
        Ok(())
    }

    fn entropy_estimate(&self) -> f64 {
        // Post-extraction, post-self-test.
        7.9
    }
}
