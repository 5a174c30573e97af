//! # epsilon-prep
//!
//! Data preparation for the epsilon benchmark dataset: read a sparse
//! SVM-light file, split it into train and test partitions, densify, and
//! persist the four resulting arrays as NumPy `.npy` files, then re-emit
//! those arrays as comma-delimited text.
//!
//! Output files are byte-compatible with NumPy's `save` and `savetxt`
//! defaults, so downstream Python tooling reads them unchanged. The
//! seeded split draws the same MT19937 permutation as NumPy's
//! `RandomState`, so a given seed selects the same rows as scikit-learn.
//!
//! ## Feature Flags
//!
//! - `rayon` — Format text rows in parallel (off by default).

use std::io::Write;
use std::sync::atomic::{AtomicBool, Ordering};

pub mod error;
pub mod io;
pub mod npy;
pub mod pipeline;
pub mod split;
pub mod types;
pub mod util;

pub use error::PrepError;
pub use types::*;

static QUIET: AtomicBool = AtomicBool::new(false);

/// Suppress (or restore) progress messages printed by the pipelines.
pub fn set_quiet(quiet: bool) {
    QUIET.store(quiet, Ordering::Relaxed);
}

/// Print a progress message to stdout unless quiet mode is on.
pub(crate) fn info(msg: &str) {
    if QUIET.load(Ordering::Relaxed) {
        return;
    }
    let mut out = std::io::stdout().lock();
    let _ = out.write_all(msg.as_bytes());
    let _ = out.flush();
}
