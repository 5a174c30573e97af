#![no_main]
use epsilon_prep::io::LoadOptions;
use libfuzzer_sys::fuzz_target;
use std::io::Write;
use tempfile::NamedTempFile;

fuzz_target!(|data: &[u8]| {
    let mut temp = match NamedTempFile::new() {
        Ok(f) => f,
        Err(_) => return,
    };
    if temp.write_all(data).is_err() {
        return;
    }
    if let Ok(dataset) = epsilon_prep::io::load_svmlight(temp.path(), &LoadOptions::default()) {
        // Cap the dense allocation; indices go up to 10M columns.
        if dataset.len().saturating_mul(dataset.n_features) <= 1 << 20 {
            let _ = dataset.to_dense();
        }
    }
});
