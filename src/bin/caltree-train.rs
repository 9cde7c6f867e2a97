//! Fit a decision-tree regressor on the prepared CSV and export it as JSON.

use std::path::PathBuf;

use caltree::config::{PipelineConfig, TrainOverrides};
use caltree::logging::{self, LogOptions};
use caltree::ml::train::train_and_export;
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "caltree-train")]
#[command(about = "Train a decision-tree regressor and export JSON")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to training CSV [default: data/california_housing_train.csv]
    #[arg(long)]
    train_csv: Option<PathBuf>,

    /// Held-out CSV to score the fitted tree on
    #[arg(long)]
    test_csv: Option<PathBuf>,

    /// Target column [default: MedHouseVal]
    #[arg(long)]
    target: Option<String>,

    /// Max tree depth, 0 or below for unlimited [default: 6]
    #[arg(long, allow_negative_numbers = true)]
    max_depth: Option<i64>,

    /// Minimum samples per leaf [default: 20]
    #[arg(long)]
    min_samples_leaf: Option<usize>,

    /// Random seed [default: 42]
    #[arg(long)]
    random_state: Option<u64>,

    /// Output directory for tree.json and meta.json [default: model]
    #[arg(long)]
    out_dir: Option<PathBuf>,

    /// Also write a log file under the application logs directory
    #[arg(long)]
    log_file: bool,
}

impl Cli {
    fn into_overrides(self) -> TrainOverrides {
        TrainOverrides {
            train_csv: self.train_csv,
            test_csv: self.test_csv,
            target: self.target,
            max_depth: self.max_depth,
            min_samples_leaf: self.min_samples_leaf,
            random_state: self.random_state,
            out_dir: self.out_dir,
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
        .train;
    config.apply_overrides(cli.into_overrides());

    let summary = train_and_export(&config).map_err(|err| err.to_string())?;
    println!(
        "Exported model JSON to {} and meta to {}",
        summary.tree_path.display(),
        summary.meta_path.display()
    );
    Ok(())
}
