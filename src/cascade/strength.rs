//! Passphrase strength estimate.
//!
//! Brute-force bits are `length * log2(pool)` where the pool is the sum of the
//! alphanumeric classes present (lowercase 26, uppercase 26, digits 10);
//! symbols do not enlarge it. A passphrase with no alphanumerics is scored
//! against a pool of 33. Each KDF adds `log2(iterations)` bits of work.

use std::str::FromStr;

use serde::Deserialize;

use super::CascadeError;

const LOWERCASE_POOL: u32 = 26;
const UPPERCASE_POOL: u32 = 26;
const DIGIT_POOL: u32 = 10;
const SYMBOL_ONLY_POOL: u32 = 33;

/// KDF iteration count, parsed from an integer or a numeric string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Deserialize)]
#[serde(try_from = "IterationInput")]
pub struct IterationCount(u32);

impl IterationCount {
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    pub const fn get(self) -> u32 {
        self.0
    }

    /// Work factor contributed by this KDF, zero for 0 or 1 iterations.
    pub fn work_bits(self) -> f64 {
        if self.0 == 0 {
            0.0
        } else {
            f64::from(self.0).log2()
        }
    }
}

impl From<u32> for IterationCount {
    fn from(value: u32) -> Self {
        Self(value)
    }
}

impl FromStr for IterationCount {
    type Err = CascadeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(CascadeError::InvalidIterationCount);
        }
        s.parse::<u32>()
            .map(Self)
            .map_err(|_| CascadeError::InvalidIterationCount)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum IterationInput {
    Number(u32),
    Text(String),
}

impl TryFrom<IterationInput> for IterationCount {
    type Error = CascadeError;

    fn try_from(input: IterationInput) -> Result<Self, Self::Error> {
        match input {
            IterationInput::Number(n) => Ok(Self(n)),
            IterationInput::Text(s) => s.parse(),
        }
    }
}

fn character_pool(passphrase: &str) -> u32 {
    let mut pool = 0;
    if passphrase.chars().any(|c| c.is_ascii_lowercase()) {
        pool += LOWERCASE_POOL;
    }
    if passphrase.chars().any(|c| c.is_ascii_uppercase()) {
        pool += UPPERCASE_POOL;
    }
    if passphrase.chars().any(|c| c.is_ascii_digit()) {
        pool += DIGIT_POOL;
    }
    if pool == 0 {
        SYMBOL_ONLY_POOL
    } else {
        pool
    }
}

/// Estimated strength in whole bits.
pub fn calculate_passphrase_strength_in_bits(
    passphrase: &str,
    keccak_iterations: IterationCount,
    skein_iterations: IterationCount,
) -> u32 {
    let length = passphrase.chars().count();
    if length == 0 {
        return 0;
    }
    let passphrase_bits = length as f64 * f64::from(character_pool(passphrase)).log2();
    let total = passphrase_bits + keccak_iterations.work_bits() + skein_iterations.work_bits();
    total.floor() as u32
}
