//! CART regression tree with a squared-error criterion.
//!
//! Fitting goes through `linfa`: build a [`TreeParams`], then call
//! `Fit::fit` on a single-target `linfa::Dataset<f64, f64, Ix1>`. The fitted
//! tree keeps its nodes as parallel arrays ([`TreeArrays`]) so exporters can
//! walk them without knowing how the tree was grown.

mod builder;
mod params;
mod tree;

use thiserror::Error;

pub use params::{TreeParams, TreeValidParams};
pub use tree::{RegressionTree, TREE_LEAF, TREE_UNDEFINED, TreeArrays};

/// Errors raised while validating parameters, fitting or predicting.
#[derive(Debug, Error)]
pub enum TreeError {
    #[error("min_samples_leaf must be at least 1, got {0}")]
    InvalidMinSamplesLeaf(usize),
    #[error("min_samples_split must be at least 2, got {0}")]
    InvalidMinSamplesSplit(usize),
    #[error("max_depth must be at least 1 when set")]
    InvalidMaxDepth,
    #[error("cannot fit a tree on an empty dataset")]
    EmptyDataset,
    #[error("{records} feature rows but {targets} targets")]
    LengthMismatch { records: usize, targets: usize },
    #[error("feature value at row {row}, column {column} is not finite")]
    NonFiniteFeature { row: usize, column: usize },
    #[error("target value at row {row} is not finite")]
    NonFiniteTarget { row: usize },
    #[error("tree expects {expected} features, input has {found}")]
    FeatureCountMismatch { expected: usize, found: usize },
    #[error(transparent)]
    Linfa(#[from] linfa::Error),
}

#[cfg(test)]
mod tests;
