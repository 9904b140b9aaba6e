//! Entropy collection and the camera TRNG.
//!
//! This module defines the [`EntropySource`] interface used wherever the
//! protocol needs non-secret randomness (message padding, network padding,
//! nonces, salts) and the camera pipeline that produces one-time pad material.
//!
//! # Design
//! - **Dual capture**: two independent frames are reduced to one bit per pixel
//!   and XORed, so a defect in one capture cannot bias the output alone.
//! - **Debiasing**: a Von Neumann extractor removes first-order bias.
//! - **Fail-closed self-test**: every 20,000-bit block must pass the FIPS 140-2
//!   statistical tests or the whole batch is discarded and regenerated.

pub mod camera;
pub mod custom;
pub mod extractor;
pub mod fips;
pub mod os;
pub mod trng;

use thiserror::Error;

/// Error types for entropy collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum EntropyError {
    /// Source initialization failed.
    #[error("entropy source initialization failed")]
    InitFailed,
    /// Failed to collect sufficient entropy bytes.
    #[error("entropy collection failed")]
    CollectionFailed,
    /// Source is exhausted (e.g., fixed buffer).
    #[error("entropy source exhausted")]
    Exhausted,
    /// Every attempt produced a batch that failed the statistical self-test.
    #[error("random data failed the statistical self-test")]
    SelfTestFailed,
    /// The camera could not deliver a frame.
    #[error("camera capture failed")]
    CaptureFailed,
    /// The background worker was cancelled or panicked.
    #[error("entropy worker did not complete")]
    WorkerFailed,
}

/// A trait for entropy sources.
pub trait EntropySource {
    /// Returns a unique identifier for the source.
    fn name(&self) -> &'static str;

    /// Fills `dest` with random bytes from the source.
    ///
    /// # Returns
    /// * `Ok(())` on success.
    /// * `Err(EntropyError)` if the source fails. `dest` content is then unspecified.
    fn fill(&mut self, dest: &mut [u8]) -> Result<(), EntropyError>;

    /// Returns the estimated entropy per byte (in bits, 0.0-8.0).
    ///
    /// This is a conservative estimate used for health monitoring.
    fn entropy_estimate(&self) -> f64;
}

/// Draws a uniformly distributed integer in `[low, high]` by rejection sampling.
pub fn uniform_in_range<R: EntropySource + ?Sized>(
    rng: &mut R,
    low: u32,
    high: u32,
) -> Result<u32, EntropyError> {
    if low >= high {
        return Ok(low);
    }
    let span = u64::from(high - low) + 1;
    // Largest multiple of `span` that fits in u32 space.
    let zone = (1u64 << 32) - ((1u64 << 32) % span);
    loop {
        let mut buf = [0u8; 4];
        rng.fill(&mut buf)?;
        let value = u64::from(u32::from_be_bytes(buf));
        if value < zone {
            return Ok(low + (value % span) as u32);
        }
    }
}
