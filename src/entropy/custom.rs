//! Custom caller-provided entropy source.
//!
//! Buffers bytes supplied by the host (an injected hardware RNG, a previously
//! extracted TRNG batch) and hands them out strictly once, in order.

use super::{EntropyError, EntropySource};

/// Source that buffers injected entropy.
pub struct CustomSource {
    buffer: Vec<u8>,
}

impl CustomSource {
    /// Creates a new empty CustomSource.
    pub fn new() -> Self {
        Self { buffer: Vec::new() }
    }

    /// Add entropy bytes to the pool.
    pub fn add_bytes(&mut self, bytes: &[u8]) {
        self.buffer.extend_from_slice(bytes);
    }

    /// Bytes still available.
    pub fn available(&self) -> usize {
        self.buffer.len()
    }
}

impl Default for CustomSource {
    fn default() -> Self {
        Self::new()
    }
}

impl EntropySource for CustomSource {
    fn name(&self) -> &'static str {
        "CustomInput"
    }

    fn fill(&mut self, dest: &mut [u8]) -> Result<(), EntropyError> {
        if self.buffer.len() < dest.len() {
            return Err(EntropyError::Exhausted);
        }

        let n = dest.len();
        for (d, s) in dest.iter_mut().zip(self.buffer.drain(..n)) {
            *d = s;
        }
        Ok(())
    }

    fn entropy_estimate(&self) -> f64 {
        // Quality of injected bytes is unknown to us.
        2.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_custom_source() {
        let mut source = CustomSource::new();
        source.add_bytes(&[0x01, 0x02, 0x03, 0x04]);

        let mut buf = [0u8; 2];
        assert!(source.fill(&mut buf).is_ok());
        assert_eq!(buf, [0x01, 0x02]);
        assert_eq!(source.available(), 2);

        assert!(source.fill(&mut buf).is_ok());
        assert_eq!(buf, [0x03, 0x04]);

        assert_eq!(source.fill(&mut buf), Err(EntropyError::Exhausted));
    }
}
