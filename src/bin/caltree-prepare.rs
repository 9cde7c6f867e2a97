//! Prepare the California Housing train/test CSV pair.
//!
//! Values come from the built-in defaults, then the `[prepare]` section of
//! `--config`, then the flags below.

use std::path::PathBuf;

use caltree::config::{PipelineConfig, PrepareOverrides};
use caltree::dataset::prepare::prepare_dataset;
use caltree::logging::{self, LogOptions};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "caltree-prepare")]
#[command(about = "Prepare California Housing regression dataset")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Number of training rows [default: 3000]
    #[arg(long)]
    train_size: Option<usize>,

    /// Number of test rows [default: 300]
    #[arg(long)]
    test_size: Option<usize>,

    /// Random seed [default: 42]
    #[arg(long)]
    random_state: Option<u64>,

    /// Number of quantile bins for stratification [default: 10]
    #[arg(long)]
    bins: Option<usize>,

    /// Output directory for CSV files [default: data]
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Read a local cal_housing.data or cal_housing.tgz instead of the cache
    #[arg(long)]
    source: Option<PathBuf>,

    /// Dataset cache directory
    #[arg(long)]
    data_home: Option<PathBuf>,

    /// Fail instead of downloading when the dataset is not cached
    #[arg(long)]
    offline: bool,

    /// Also write a log file under the application logs directory
    #[arg(long)]
    log_file: bool,
}

impl Cli {
    fn into_overrides(self) -> PrepareOverrides {
        PrepareOverrides {
            train_size: self.train_size,
            test_size: self.test_size,
            random_state: self.random_state,
            bins: self.bins,
            out_dir: self.out_dir,
            source: self.source,
            data_home: self.data_home,
            offline: self.offline,
        }
    }
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{err}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), String> {
    let cli = Cli::parse();
    if let Err(err) = logging::init(LogOptions {
        log_file: cli.log_file,
    }) {
        eprintln!("Logging disabled: {err}");
    }
    let mut config = PipelineConfig::load_or_default(cli.config.as_deref())
        .map_err(|err| err.to_string())?
        .prepare;
    config.apply_overrides(cli.into_overrides());

    let source = config.california_source();
    let summary = prepare_dataset(&source, &config).map_err(|err| err.to_string())?;
    println!(
        "Wrote {} rows to {} and {} rows to {}.",
        summary.train_rows,
        summary.train_path.display(),
        summary.test_rows,
        summary.test_path.display()
    );
    Ok(())
}
