//! The two end-to-end pipelines.
//!
//! `run_preprocess` turns `<data_path>/data/<input_name>` into four `.npy`
//! files; `run_transform` turns those four files into `.csv` files next to
//! them. Both are stateless and communicate only through the file names
//! derived by [`ArtifactPaths`].

use std::fmt;
use std::path::{Path, PathBuf};

use crate::error::PrepError;
use crate::io::{load_delimited, load_svmlight, save_delimited, LoadOptions};
use crate::npy::{load_npy, npy_file_name, save_npy};
use crate::split::{train_test_split, SplitConfig};
use crate::types::Array;

/// Name of the dataset the artifacts are prefixed with.
pub const DEFAULT_DATASET: &str = "epsilon";
/// File name of the SVM-light input under `<data_path>/data/`.
pub const DEFAULT_INPUT_NAME: &str = "epsilon_normalized";
/// Largest relative error tolerated by `verify` after a text round-trip.
const VERIFY_TOLERANCE: f64 = 1e-15;

/// One of the four persisted arrays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Partition {
    XTrain,
    XTest,
    YTrain,
    YTest,
}

impl Partition {
    /// All partitions in the order they are written.
    pub const ALL: [Partition; 4] = [
        Partition::XTrain,
        Partition::XTest,
        Partition::YTrain,
        Partition::YTest,
    ];

    /// File-name stem, e.g. `X_train`.
    pub fn stem(self) -> &'static str {
        match self {
            Partition::XTrain => "X_train",
            Partition::XTest => "X_test",
            Partition::YTrain => "y_train",
            Partition::YTest => "y_test",
        }
    }
}

impl fmt::Display for Partition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.stem())
    }
}

/// Where each partition lives on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactPaths {
    dir: PathBuf,
    dataset: String,
}

impl ArtifactPaths {
    /// Artifacts for `dataset` under `<data_path>/data/`.
    pub fn new(data_path: &Path, dataset: &str) -> Self {
        Self {
            dir: data_path.join("data"),
            dataset: dataset.to_string(),
        }
    }

    fn base(&self, part: Partition) -> PathBuf {
        self.dir.join(format!("{}.{}", self.dataset, part.stem()))
    }

    /// `<dir>/<dataset>.<stem>.npy`
    pub fn npy(&self, part: Partition) -> PathBuf {
        npy_file_name(self.base(part))
    }

    /// `<dir>/<dataset>.<stem>.csv`
    pub fn csv(&self, part: Partition) -> PathBuf {
        let mut name = self.base(part).into_os_string();
        name.push(".csv");
        PathBuf::from(name)
    }
}

/// Settings for the ingest/split pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessConfig {
    /// Root directory; input and outputs live in its `data/` subdirectory.
    pub data_path: PathBuf,
    pub dataset: String,
    pub input_name: String,
    pub split: SplitConfig,
    pub load: LoadOptions,
}

impl Default for PreprocessConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("."),
            dataset: DEFAULT_DATASET.to_string(),
            input_name: DEFAULT_INPUT_NAME.to_string(),
            split: SplitConfig::default(),
            load: LoadOptions::default(),
        }
    }
}

impl PreprocessConfig {
    pub fn input_path(&self) -> PathBuf {
        self.data_path.join("data").join(&self.input_name)
    }

    pub fn artifacts(&self) -> ArtifactPaths {
        ArtifactPaths::new(&self.data_path, &self.dataset)
    }
}

/// A file written by a pipeline together with the array's shape.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenArray {
    pub partition: Partition,
    pub path: PathBuf,
    pub shape: Vec<usize>,
}

/// Summary of a preprocessing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreprocessReport {
    pub n_samples: usize,
    pub n_features: usize,
    pub outputs: Vec<WrittenArray>,
}

fn shape_str(shape: &[usize]) -> String {
    let dims: Vec<String> = shape.iter().map(|d| d.to_string()).collect();
    format!("({})", dims.join(", "))
}

/// Load the SVM-light input, split it, densify both halves and save the
/// four arrays as `.npy`.
pub fn run_preprocess(config: &PreprocessConfig) -> Result<PreprocessReport, PrepError> {
    // Reject a bad test_size before parsing the input.
    config.split.validate()?;

    let input = config.input_path();
    crate::info(&format!("loading {}\n", input.display()));
    let dataset = load_svmlight(&input, &config.load)?;
    crate::info(&format!(
        "loaded {} rows, {} features, {} stored values\n",
        dataset.len(),
        dataset.n_features,
        dataset.nnz()
    ));

    let split = train_test_split(&dataset, &config.split)?;

    let artifacts = config.artifacts();
    let arrays = [
        (Partition::XTrain, split.train.to_dense()),
        (Partition::XTest, split.test.to_dense()),
        (Partition::YTrain, split.train.labels_array()),
        (Partition::YTest, split.test.labels_array()),
    ];

    let mut outputs = Vec::with_capacity(arrays.len());
    for (partition, array) in arrays {
        let path = artifacts.npy(partition);
        save_npy(&path, &array)?;
        crate::info(&format!(
            "wrote {} {} to {}\n",
            partition,
            shape_str(array.shape()),
            path.display()
        ));
        outputs.push(WrittenArray {
            partition,
            path,
            shape: array.shape().to_vec(),
        });
    }

    Ok(PreprocessReport {
        n_samples: dataset.len(),
        n_features: dataset.n_features,
        outputs,
    })
}

/// Settings for the reformat pipeline.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformConfig {
    /// Root directory; arrays are read from and written to its `data/`.
    pub data_path: PathBuf,
    pub dataset: String,
    /// Field separator of the text output.
    pub delimiter: String,
    /// Re-read every text file and compare it against the binary array.
    pub verify: bool,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            data_path: PathBuf::from("."),
            dataset: DEFAULT_DATASET.to_string(),
            delimiter: ",".to_string(),
            verify: false,
        }
    }
}

impl TransformConfig {
    pub fn artifacts(&self) -> ArtifactPaths {
        ArtifactPaths::new(&self.data_path, &self.dataset)
    }
}

/// Summary of a transform run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformReport {
    pub outputs: Vec<WrittenArray>,
    /// Whether the outputs were read back and checked.
    pub verified: bool,
}

fn values_match(expected: f64, actual: f64) -> bool {
    if expected.is_nan() || actual.is_nan() {
        return expected.is_nan() && actual.is_nan();
    }
    if expected == actual {
        return true;
    }
    (expected - actual).abs() <= VERIFY_TOLERANCE * expected.abs().max(actual.abs())
}

/// Compare a text round-trip against the array it was written from.
///
/// A 2-D array with one column reads back 1-D, so only the element
/// count and values are compared for that case. A zero-width matrix is
/// written as blank lines and reads back empty.
fn verify_text_copy(path: &Path, expected: &Array, actual: &Array) -> Result<(), PrepError> {
    let same_shape = expected.shape() == actual.shape()
        || (expected.len() == actual.len() && expected.shape().last() == Some(&1))
        || (expected.is_empty() && actual.is_empty());
    if !same_shape {
        return Err(PrepError::Shape(format!(
            "{} reads back as {}, expected {}",
            path.display(),
            shape_str(actual.shape()),
            shape_str(expected.shape())
        )));
    }
    for (i, (&e, &a)) in expected.as_slice().iter().zip(actual.as_slice()).enumerate() {
        if !values_match(e, a) {
            return Err(PrepError::Shape(format!(
                "{} element {} reads back as {}, expected {}",
                path.display(),
                i,
                a,
                e
            )));
        }
    }
    Ok(())
}

/// Convert the four `.npy` arrays into delimited text files.
pub fn run_transform(config: &TransformConfig) -> Result<TransformReport, PrepError> {
    if config.delimiter.is_empty() {
        return Err(PrepError::InvalidParameter("delimiter must not be empty".into()));
    }

    let artifacts = config.artifacts();
    let mut outputs = Vec::with_capacity(Partition::ALL.len());
    for partition in Partition::ALL {
        let source = artifacts.npy(partition);
        let array = load_npy(&source)?;
        let target = artifacts.csv(partition);
        save_delimited(&target, &array, &config.delimiter)?;
        crate::info(&format!(
            "wrote {} {} to {}\n",
            partition,
            shape_str(array.shape()),
            target.display()
        ));

        if config.verify {
            let back = load_delimited(&target, &config.delimiter)?;
            verify_text_copy(&target, &array, &back)?;
        }

        outputs.push(WrittenArray {
            partition,
            path: target,
            shape: array.shape().to_vec(),
        });
    }

    if config.verify {
        crate::info("verified all text outputs against their binary sources\n");
    }

    Ok(TransformReport {
        outputs,
        verified: config.verify,
    })
}
