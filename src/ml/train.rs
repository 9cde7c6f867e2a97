//! Fit a tree on the prepared training CSV and write `tree.json` + `meta.json`.

use std::path::{Path, PathBuf};

use linfa::ParamGuard;
use linfa::traits::Fit;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

use super::cart::{RegressionTree, TreeError};
use super::export::{ExportError, TreeExport};
use super::meta::{MetaError, ModelMetadata};
use super::metrics::{RegressionMetrics, regression_metrics};
use crate::atomic_file::{self, Staged};
use crate::config::TrainConfig;
use crate::dataset::csv_io::read_table_csv;
use crate::dataset::{DatasetError, Table};

pub const TREE_FILE_NAME: &str = "tree.json";
pub const META_FILE_NAME: &str = "meta.json";

/// Errors raised by [`train_and_export`].
#[derive(Debug, Error)]
pub enum TrainError {
    #[error(transparent)]
    Dataset(#[from] DatasetError),
    #[error("Tree fitting failed: {0}")]
    Tree(#[from] TreeError),
    #[error("Tree export failed: {0}")]
    Export(#[from] ExportError),
    #[error("Metadata failed: {0}")]
    Meta(#[from] MetaError),
    #[error("Test CSV columns {found:?} do not match training columns {expected:?}")]
    TestColumnsMismatch {
        expected: Vec<String>,
        found: Vec<String>,
    },
    #[error("Failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// What a training run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct TrainSummary {
    pub n_train: usize,
    pub node_count: usize,
    pub n_leaves: usize,
    pub depth: usize,
    pub tree_path: PathBuf,
    pub meta_path: PathBuf,
    pub train_metrics: Option<RegressionMetrics>,
    pub test_metrics: Option<RegressionMetrics>,
}

/// Read `config.train_csv`, fit a tree and export it into `config.out_dir`.
pub fn train_and_export(config: &TrainConfig) -> Result<TrainSummary, TrainError> {
    let table = read_table_csv(&config.train_csv, &config.target)?;
    info!(
        "Loaded {} training rows with features {:?}",
        table.n_rows(),
        table.feature_names()
    );

    let params = config.tree_params().check()?;
    let tree = params.fit(&table.to_dataset()).map_err(TrainError::Tree)?;
    info!(
        "Fitted tree: {} nodes, {} leaves, depth {}",
        tree.node_count(),
        tree.n_leaves(),
        tree.depth()
    );

    let export = TreeExport::from_arrays(tree.arrays(), table.feature_names())?;
    let meta = ModelMetadata::from_training_table(&table, &params)?;

    let train_metrics = evaluate(&tree, &table)?;
    if let Some(metrics) = &train_metrics {
        info!(
            "Train MAE {:.4}, RMSE {:.4}, R2 {:.4}",
            metrics.mae, metrics.rmse, metrics.r2
        );
    }
    let test_metrics = match &config.test_csv {
        Some(path) => {
            let test = read_table_csv(path, &config.target)?;
            if test.feature_names() != table.feature_names() {
                return Err(TrainError::TestColumnsMismatch {
                    expected: table.feature_names().to_vec(),
                    found: test.feature_names().to_vec(),
                });
            }
            let metrics = evaluate(&tree, &test)?;
            if let Some(metrics) = &metrics {
                info!(
                    "Test MAE {:.4}, RMSE {:.4}, R2 {:.4} on {} rows",
                    metrics.mae, metrics.rmse, metrics.r2, metrics.n
                );
            }
            metrics
        }
        None => None,
    };

    std::fs::create_dir_all(&config.out_dir).map_err(|source| TrainError::CreateDir {
        path: config.out_dir.clone(),
        source,
    })?;
    let tree_path = config.out_dir.join(TREE_FILE_NAME);
    let meta_path = config.out_dir.join(META_FILE_NAME);
    let staged = [stage_json(&tree_path, &export)?, stage_json(&meta_path, &meta)?];
    for file in staged {
        let path = file.path().to_path_buf();
        file.commit().map_err(|source| TrainError::Write { path, source })?;
    }

    Ok(TrainSummary {
        n_train: table.n_rows(),
        node_count: tree.node_count(),
        n_leaves: tree.n_leaves(),
        depth: tree.depth(),
        tree_path,
        meta_path,
        train_metrics,
        test_metrics,
    })
}

fn evaluate(tree: &RegressionTree, table: &Table) -> Result<Option<RegressionMetrics>, TrainError> {
    let predicted = tree.predict(table.features())?;
    Ok(regression_metrics(table.target(), predicted.view()))
}

fn stage_json<T: Serialize>(path: &Path, value: &T) -> Result<Staged, TrainError> {
    let bytes = serde_json::to_vec(value).map_err(|source| TrainError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;
    atomic_file::stage_bytes(path, &bytes).map_err(|source| TrainError::Write {
        path: path.to_path_buf(),
        source,
    })
}
