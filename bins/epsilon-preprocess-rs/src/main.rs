use clap::error::ErrorKind;
use clap::{Parser, ValueEnum};
use epsilon_prep::io::{LoadOptions, ZeroBased};
use epsilon_prep::pipeline::{run_preprocess, PreprocessConfig, DEFAULT_DATASET, DEFAULT_INPUT_NAME};
use epsilon_prep::split::SplitConfig;
use std::path::PathBuf;
use std::process;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum IndexBase {
    /// zero-based if any feature index is 0
    Auto,
    /// indices are column numbers
    Yes,
    /// indices start at 1
    No,
}

impl From<IndexBase> for ZeroBased {
    fn from(base: IndexBase) -> Self {
        match base {
            IndexBase::Auto => ZeroBased::Auto,
            IndexBase::Yes => ZeroBased::Yes,
            IndexBase::No => ZeroBased::No,
        }
    }
}

/// Split an SVM-light dataset into train/test partitions and save the
/// dense arrays as NumPy files.
///
/// Reads <data_path>/data/<input> and writes
/// <data_path>/data/<dataset>.{X_train,X_test,y_train,y_test}.npy
#[derive(Debug, Parser)]
#[command(name = "epsilon-preprocess", version)]
struct Cli {
    /// Root directory holding the data/ folder
    #[arg(long = "data_path", visible_alias = "data-path", default_value = ".")]
    data_path: PathBuf,

    /// Prefix of the output files
    #[arg(long, default_value = DEFAULT_DATASET)]
    dataset: String,

    /// SVM-light file name under data/
    #[arg(long, default_value = DEFAULT_INPUT_NAME)]
    input: String,

    /// Fraction of rows assigned to the test set
    #[arg(long, default_value_t = 0.25)]
    test_size: f64,

    /// Seed of the row shuffle
    #[arg(long, default_value_t = 42)]
    seed: u32,

    /// Split head/tail in file order instead of shuffling
    #[arg(long)]
    no_shuffle: bool,

    /// Number of columns of the dense arrays (default: largest index in the file)
    #[arg(long)]
    n_features: Option<usize>,

    /// Index base of the input file
    #[arg(long, value_enum, default_value_t = IndexBase::Auto)]
    zero_based: IndexBase,

    /// Quiet mode (no progress output)
    #[arg(short, long)]
    quiet: bool,
}

/// Parse flags; usage errors go through the same `ERROR:` path and exit
/// status as run failures.
fn parse_cli() -> Cli {
    match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => match e.kind() {
            ErrorKind::DisplayHelp | ErrorKind::DisplayVersion => e.exit(),
            _ => {
                eprintln!("ERROR: {}", e);
                process::exit(1);
            }
        },
    }
}

fn main() {
    let cli = parse_cli();

    if cli.quiet {
        epsilon_prep::set_quiet(true);
    }

    let config = PreprocessConfig {
        data_path: cli.data_path,
        dataset: cli.dataset,
        input_name: cli.input,
        split: SplitConfig {
            test_size: cli.test_size,
            seed: cli.seed,
            shuffle: !cli.no_shuffle,
        },
        load: LoadOptions {
            n_features: cli.n_features,
            zero_based: cli.zero_based.into(),
        },
    };

    if let Err(e) = run_preprocess(&config) {
        eprintln!("ERROR: {}", e);
        process::exit(1);
    }
}
