//! Deterministic train/test splitting.
//!
//! Row counts follow the usual convention: `n_test = ceil(test_size * n)`
//! and the train partition gets the rest. With shuffling on, a seeded
//! permutation is drawn and its first `n_test` entries become the test
//! rows, which is what scikit-learn does for the same `random_state`.

use crate::error::PrepError;
use crate::types::Dataset;
use crate::util::permutation;

/// Train/test split settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitConfig {
    /// Fraction of rows assigned to the test partition, in `(0, 1)`.
    pub test_size: f64,
    /// Seed of the MT19937 row permutation.
    pub seed: u32,
    /// Whether to permute rows before splitting. When off, the train
    /// partition is the head of the file and the test partition its tail.
    pub shuffle: bool,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: 0.25,
            seed: 42,
            shuffle: true,
        }
    }
}

impl SplitConfig {
    /// Check `test_size` alone, before any rows are known.
    pub fn validate(&self) -> Result<(), PrepError> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(PrepError::InvalidParameter(format!(
                "test_size must be in (0, 1), got {}",
                self.test_size
            )));
        }
        Ok(())
    }

    /// Partition sizes `(n_train, n_test)` for `n_samples` rows.
    pub fn sizes(&self, n_samples: usize) -> Result<(usize, usize), PrepError> {
        self.validate()?;
        let n_test = (self.test_size * n_samples as f64).ceil() as usize;
        let n_train = n_samples.saturating_sub(n_test);
        if n_train == 0 || n_test == 0 {
            return Err(PrepError::InvalidParameter(format!(
                "with n_samples={}, test_size={} the resulting train set has {} rows \
                 and the test set {}; both must be non-empty",
                n_samples, self.test_size, n_train, n_test
            )));
        }
        Ok((n_train, n_test))
    }
}

/// Row positions of each partition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// A dataset split into train and test partitions.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainTestSplit {
    pub train: Dataset,
    pub test: Dataset,
}

/// Compute which rows go to train and which to test.
pub fn split_indices(n_samples: usize, config: &SplitConfig) -> Result<SplitIndices, PrepError> {
    let (n_train, n_test) = config.sizes(n_samples)?;

    if !config.shuffle {
        return Ok(SplitIndices {
            train: (0..n_train).collect(),
            test: (n_train..n_samples).collect(),
        });
    }

    let mut perm = permutation(n_samples, config.seed);
    let train = perm.split_off(n_test);
    Ok(SplitIndices { train, test: perm })
}

/// Split a dataset into train and test partitions.
///
/// Both partitions keep the parent's column count, so they densify to
/// matrices of the same width.
pub fn train_test_split(
    dataset: &Dataset,
    config: &SplitConfig,
) -> Result<TrainTestSplit, PrepError> {
    let indices = split_indices(dataset.len(), config)?;
    crate::info(&format!(
        "split {} rows into {} train / {} test (test_size={}, seed={})\n",
        dataset.len(),
        indices.train.len(),
        indices.test.len(),
        crate::io::format_g(config.test_size),
        config.seed
    ));
    Ok(TrainTestSplit {
        train: dataset.subset(&indices.train),
        test: dataset.subset(&indices.test),
    })
}
