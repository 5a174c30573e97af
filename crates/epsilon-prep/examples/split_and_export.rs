//! Load the bundled sample, split it 75/25 and print the partition shapes
//! together with the first text row of the test matrix.
//!
//! Run:
//!   cargo run -p epsilon-prep --example split_and_export

use epsilon_prep::io::{load_svmlight, write_delimited, LoadOptions};
use epsilon_prep::split::{train_test_split, SplitConfig};
use epsilon_prep::{set_quiet, Array};
use std::path::Path;

fn main() {
    set_quiet(true);

    let dataset = load_svmlight(Path::new("data/epsilon_sample"), &LoadOptions::default())
        .expect("failed to load dataset");
    let split = train_test_split(&dataset, &SplitConfig::default()).expect("split failed");

    let x_train = split.train.to_dense();
    let x_test = split.test.to_dense();
    println!("X_train {:?}, X_test {:?}", x_train.shape(), x_test.shape());

    let width = x_test.shape()[1];
    let first = Array::matrix(1, width, x_test.as_slice()[..width].to_vec())
        .expect("row has the matrix width");
    let mut text = Vec::new();
    write_delimited(&mut text, &first, ",").expect("write to memory");
    print!("{}", String::from_utf8_lossy(&text));
}
