//! Irreversible pad destruction.
//!
//! Used pads and their sealed rows are burned as they leave the store.
//!
//! # Security
//! - **Volatile Writes**: Uses `ptr::write_volatile` in paranoid mode to prevent optimization.
//! - **Paranoid Mode**: Optional multi-pass overwriting (0xFF -> pattern -> 0x00)
//!   when the `paranoid` feature is enabled.

use zeroize::Zeroize;

/// Irreversibly destroys the provided memory slice.
#[inline(never)]
pub fn burn_slice(slice: &mut [u8]) {
    #[cfg(feature = "paranoid")]
    {
        for byte in slice.iter_mut() {
            // SAFETY: `byte` is a valid, aligned, exclusive reference.
            unsafe { std::ptr::write_volatile(byte, 0xFF) };
        }
        std::sync::atomic::compiler_fence(std::sync::atomic::Ordering::SeqCst);

        for (i, byte) in slice.iter_mut().enumerate() {
            // SAFETY: as above.
            unsafe { std::ptr::write_volatile(byte, (i % 255) as u8) };
        }
        std::sync::atomic::compiler_fence(std::sync::atomic::Ordering::SeqCst);
    }

    slice.zeroize();
    std::sync::atomic::compiler_fence(std::sync::atomic::Ordering::SeqCst);
}

/// Trait for objects that can be burned.
pub trait Burnable {
    /// Destroys the object's sensitive contents.
    fn burn(&mut self);
}

impl<T: Zeroize> Burnable for T {
    fn burn(&mut self) {
        self.zeroize();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pad::PadRow;

    #[test]
    fn test_burn_slice() {
        let mut secret = vec![0xCA, 0xFE, 0xBA, 0xBE];
        burn_slice(&mut secret);
        assert_eq!(secret, vec![0, 0, 0, 0]);
    }

    #[test]
    fn test_burn_row() {
        let mut row = PadRow {
            pad_num: 9,
            pad_identifier: "00112233445566".into(),
            pad: "abcd".into(),
            mac: "ef".into(),
        };
        row.burn();
        assert_eq!(row.pad_num, 0);
        assert!(row.pad.is_empty());
        assert!(row.mac.is_empty());
    }
}
