//! Load, split and write the train/test CSV pair.

use std::path::PathBuf;

use thiserror::Error;
use tracing::info;

use super::csv_io::stage_table_csv;
use super::split::{SplitError, stratified_fixed_sizes, validate_sizes};
use super::{DatasetError, DatasetSource};
use crate::config::PrepareConfig;

pub const TRAIN_FILE_NAME: &str = "california_housing_train.csv";
pub const TEST_FILE_NAME: &str = "california_housing_test.csv";

/// Errors raised by [`prepare_dataset`].
#[derive(Debug, Error)]
pub enum PrepareError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error("Invalid split: {0}")]
    Split(#[from] SplitError),
    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// What a prepare run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrepareSummary {
    pub total_rows: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub effective_bins: usize,
    pub train_path: PathBuf,
    pub test_path: PathBuf,
}

/// Load `source`, split it per `config`, and write both CSV files into
/// `config.out_dir`.
pub fn prepare_dataset(
    source: &dyn DatasetSource,
    config: &PrepareConfig,
) -> Result<PrepareSummary, PrepareError> {
    let table = source.load()?;
    info!(
        "Loaded {} rows x {} features from {}",
        table.n_rows(),
        table.n_features(),
        source.name()
    );
    validate_sizes(config.train_size, config.test_size, table.n_rows())?;

    let split = stratified_fixed_sizes(&table, &config.split_options())?;
    info!(
        "Split into {} train / {} test rows over {} bins",
        split.train.n_rows(),
        split.test.n_rows(),
        split.effective_bins
    );

    std::fs::create_dir_all(&config.out_dir).map_err(|source| PrepareError::CreateDir {
        path: config.out_dir.clone(),
        source,
    })?;
    let train_path = config.out_dir.join(TRAIN_FILE_NAME);
    let test_path = config.out_dir.join(TEST_FILE_NAME);
    // Both files are fully written before either replaces an older copy.
    let staged_train = stage_table_csv(&split.train, &train_path)?;
    let staged_test = stage_table_csv(&split.test, &test_path)?;
    for staged in [staged_train, staged_test] {
        let path = staged.path().to_path_buf();
        staged.commit().map_err(|source| DatasetError::io(path, source))?;
    }

    Ok(PrepareSummary {
        total_rows: table.n_rows(),
        train_rows: split.train.n_rows(),
        test_rows: split.test.n_rows(),
        effective_bins: split.effective_bins,
        train_path,
        test_path,
    })
}
