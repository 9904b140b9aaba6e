//! Camera entropy capture.
//!
//! Harvests sensor noise from raw RGBA frames. Only the least significant bit
//! of each colour channel carries noise worth keeping; alpha is ignored.

use super::EntropyError;

/// Bytes per RGBA pixel.
pub const BYTES_PER_PIXEL: usize = 4;

/// One raw RGBA frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RgbaFrame {
    pub width: u32,
    pub height: u32,
    /// `width * height * 4` bytes, row-major RGBA.
    pub pixels: Vec<u8>,
}

impl RgbaFrame {
    pub fn new(width: u32, height: u32, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn pixel_count(&self) -> usize {
        self.pixels.len() / BYTES_PER_PIXEL
    }
}

/// Camera collaborator. Platform capture code implements this.
pub trait Camera {
    /// Captures one frame. Consecutive captures must be independent exposures.
    fn capture(&mut self) -> Result<RgbaFrame, EntropyError>;
}

/// One output bit per pixel: `lsb(R) ^ lsb(G) ^ lsb(B)`.
///
/// A trailing partial pixel is ignored.
pub fn get_least_sig_bits_from_array(rgba: &[u8]) -> String {
    rgba.chunks_exact(BYTES_PER_PIXEL)
        .map(|px| {
            if (px[0] ^ px[1] ^ px[2]) & 1 == 1 {
                '1'
            } else {
                '0'
            }
        })
        .collect()
}

/// Indexes of pixels whose R, G and B values are identical in both frames.
///
/// Identical pixels point at a stuck sensor or overexposure. The result is
/// advisory and does not block pad acceptance.
pub fn check_for_repeating_pixels(rgba_a: &[u8], rgba_b: &[u8]) -> Vec<usize> {
    rgba_a
        .chunks_exact(BYTES_PER_PIXEL)
        .zip(rgba_b.chunks_exact(BYTES_PER_PIXEL))
        .enumerate()
        .filter(|(_, (a, b))| a[..3] == b[..3])
        .map(|(index, _)| index)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_least_sig_bits_vectors() {
        assert_eq!(get_least_sig_bits_from_array(&[0, 1, 2, 3]), "1");
        assert_eq!(
            get_least_sig_bits_from_array(&[11, 52, 143, 0, 14, 222, 167, 0]),
            "01"
        );
    }

    #[test]
    fn test_alpha_is_ignored() {
        assert_eq!(get_least_sig_bits_from_array(&[0, 0, 0, 255]), "0");
        assert_eq!(get_least_sig_bits_from_array(&[0, 0, 0, 1, 9]), "0");
    }

    #[test]
    fn test_repeating_pixels() {
        let a = [1, 2, 3, 255, 9, 9, 9, 255, 4, 5, 6, 0];
        let b = [1, 2, 3, 0, 9, 9, 8, 255, 4, 5, 6, 255];
        assert_eq!(check_for_repeating_pixels(&a, &b), vec![0, 2]);
    }

    #[test]
    fn test_frame_pixel_count() {
        let frame = RgbaFrame::new(2, 1, vec![0; 8]);
        assert_eq!(frame.pixel_count(), 2);
    }
}
