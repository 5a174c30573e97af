//! Shared internal utilities for epsilon-prep.

use rand_mt::Mt19937GenRand32;

/// Maximum supported feature index.
pub const MAX_FEATURE_INDEX: usize = 10_000_000;

/// Uniform draw from `[0, max]` by masking the generator output to the
/// smallest covering power of two and rejecting values above `max`.
fn bounded(rng: &mut Mt19937GenRand32, max: u64) -> u64 {
    if max == 0 {
        return 0;
    }
    let mut mask = max;
    for shift in [1, 2, 4, 8, 16, 32] {
        mask |= mask >> shift;
    }
    loop {
        let value = if max <= u64::from(u32::MAX) {
            u64::from(rng.next_u32()) & mask
        } else {
            let hi = u64::from(rng.next_u32());
            let lo = u64::from(rng.next_u32());
            ((hi << 32) | lo) & mask
        };
        if value <= max {
            return value;
        }
    }
}

/// Fisher-Yates shuffle from the back: slot `i` swaps with a draw from
/// `[0, i]`.
fn shuffle(index: &mut [usize], rng: &mut Mt19937GenRand32) {
    for i in (1..index.len()).rev() {
        let j = bounded(rng, i as u64) as usize;
        index.swap(i, j);
    }
}

/// Return a permutation of `0..len` from an MT19937 stream seeded with
/// `seed`.
///
/// Same draws as NumPy's `RandomState(seed).permutation(len)`, so a seeded
/// split selects the rows scikit-learn's `train_test_split` would.
pub(crate) fn permutation(len: usize, seed: u32) -> Vec<usize> {
    let mut index: Vec<usize> = (0..len).collect();
    let mut rng = Mt19937GenRand32::new(seed);
    shuffle(&mut index, &mut rng);
    index
}

/// Parse and validate a feature index according to the shared hard limit.
pub fn parse_feature_index(idx_str: &str, max_feature_index: usize) -> Result<usize, String> {
    let index = idx_str
        .parse::<i64>()
        .map_err(|_| format!("invalid feature index: {}", idx_str))?;

    if index < 0 || index as u64 > max_feature_index as u64 {
        Err(format!(
            "feature index {} out of valid range [0, {}]",
            index, max_feature_index
        ))
    } else {
        Ok(index as usize)
    }
}
