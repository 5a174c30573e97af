use clap::error::ErrorKind;
use clap::Parser;
use epsilon_prep::pipeline::{run_transform, TransformConfig, DEFAULT_DATASET};
use std::path::PathBuf;
use std::process;

/// Re-export the four epsilon NumPy arrays as delimited text.
///
/// Reads <data_path>/data/<dataset>.{X_train,X_test,y_train,y_test}.npy
/// and writes a .csv next to each.
#[derive(Debug, Parser)]
#[command(name = "epsilon-transform", version)]
struct Cli {
    /// Root directory holding the data/ folder
    #[arg(long = "data_path", visible_alias = "data-path", default_value = ".")]
    data_path: PathBuf,

    /// Prefix of the array files
    #[arg(long, default_value = DEFAULT_DATASET)]
    dataset: String,

    /// Field separator
    #[arg(long, default_value = ",")]
    delimiter: String,

    /// Read every text file back and compare it with its binary source
    #[arg(long)]
    verify: bool,

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

    let config = TransformConfig {
        data_path: cli.data_path,
        dataset: cli.dataset,
        delimiter: cli.delimiter,
        verify: cli.verify,
    };

    match run_transform(&config) {
        Ok(report) => {
            if report.verified && !cli.quiet {
                println!("{} files verified", report.outputs.len());
            }
        }
        Err(e) => {
            eprintln!("ERROR: {}", e);
            process::exit(1);
        }
    }
}
