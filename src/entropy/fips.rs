//! FIPS 140-2 statistical self-tests.
//!
//! Applied to every 20,000-bit block of extracted TRNG output before it may
//! become pad material.
//!
//! # Tests
//! - Monobit: the count of ones must lie strictly inside (9725, 10275).
//! - Runs: runs of each length 1..=5 and 6+ must fall inside fixed intervals,
//!   separately for runs of zeros and runs of ones.
//! - Long run: no run of 26 or more identical bits.

/// Bits per self-test block.
pub const BLOCK_BITS: usize = 20_000;

/// Inclusive run-count bounds for run lengths 1, 2, 3, 4, 5 and 6+.
pub const RUN_BOUNDS: [(usize, usize); 6] = [
    (2315, 2685),
    (1114, 1386),
    (527, 723),
    (240, 384),
    (103, 209),
    (103, 209),
];

const MONOBIT_LOW: usize = 9725;
const MONOBIT_HIGH: usize = 10275;
const LONG_RUN: usize = 26;

/// Counts for one run length bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunBucket {
    /// Run length; the last bucket (6) counts every run of 6 or more.
    pub run_length: usize,
    pub zeros: usize,
    pub ones: usize,
}

impl RunBucket {
    fn within(&self, (low, high): (usize, usize)) -> bool {
        (low..=high).contains(&self.zeros) && (low..=high).contains(&self.ones)
    }
}

/// Outcome of [`randomness_runs_test`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunsTestResult {
    pub buckets: [RunBucket; 6],
    pub test_passed: bool,
}

/// Counts runs of zeros and ones by length and checks them against [`RUN_BOUNDS`].
///
/// Characters other than `'0'` and `'1'` are treated as `'0'`.
pub fn randomness_runs_test(bits: &str) -> RunsTestResult {
    let mut buckets: [RunBucket; 6] = std::array::from_fn(|i| RunBucket {
        run_length: i + 1,
        zeros: 0,
        ones: 0,
    });

    for (bit, length) in runs(bits) {
        let bucket = &mut buckets[length.min(6) - 1];
        if bit {
            bucket.ones += 1;
        } else {
            bucket.zeros += 1;
        }
    }

    let test_passed = buckets
        .iter()
        .zip(RUN_BOUNDS.iter())
        .all(|(bucket, &bounds)| bucket.within(bounds));

    RunsTestResult {
        buckets,
        test_passed,
    }
}

/// Passes when the number of ones lies strictly between 9725 and 10275.
pub fn monobit_test(bits: &str) -> bool {
    let ones = bits.bytes().filter(|&b| b == b'1').count();
    ones > MONOBIT_LOW && ones < MONOBIT_HIGH
}

/// Fails on any run of 26 or more identical bits.
pub fn long_run_test(bits: &str) -> bool {
    runs(bits).all(|(_, length)| length < LONG_RUN)
}

/// All three tests on one block.
pub fn block_passes(bits: &str) -> bool {
    let passed = monobit_test(bits) && long_run_test(bits) && randomness_runs_test(bits).test_passed;
    if !passed {
        log::warn!("FIPS 140-2 self-test failed on {} bit block", bits.len());
    }
    passed
}

/// Every complete block of `bits` must pass. A trailing partial block is not tested.
///
/// Returns `false` when there is not even one complete block.
pub fn all_blocks_pass(bits: &str) -> bool {
    let blocks = bits.len() / BLOCK_BITS;
    if blocks == 0 {
        return false;
    }
    (0..blocks).all(|i| block_passes(&bits[i * BLOCK_BITS..(i + 1) * BLOCK_BITS]))
}

/// Iterator over `(bit, run_length)` pairs.
fn runs(bits: &str) -> impl Iterator<Item = (bool, usize)> + '_ {
    let mut iter = bits.bytes().map(|b| b == b'1').peekable();
    std::iter::from_fn(move || {
        let bit = iter.next()?;
        let mut length = 1;
        while iter.peek() == Some(&bit) {
            iter.next();
            length += 1;
        }
        Some((bit, length))
    })
}
