//! Stratified train/test split to exact row counts.
//!
//! The continuous target is cut into quantile bins, one stratified shuffle
//! split is drawn with proportions `train_size / n` and `test_size / n`, and
//! either side is downsampled if it came out larger than requested.

mod binning;
mod stratified;

use rand::SeedableRng;
use rand::rngs::StdRng;
use thiserror::Error;
use tracing::{debug, warn};

use super::Table;

pub use binning::{QuantileBins, quantile_bins};
pub use stratified::{approximate_mode, stratified_shuffle_split};

/// Snap proportional counts to the nearest integer when they are this close.
const COUNT_SNAP_EPS: f64 = 1e-9;

/// Split request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitOptions {
    /// Exact number of training rows.
    pub train_size: usize,
    /// Exact number of test rows.
    pub test_size: usize,
    /// Seed for every random choice in the split.
    pub random_state: u64,
    /// Requested number of quantile bins on the target.
    pub bins: usize,
}

impl Default for SplitOptions {
    fn default() -> Self {
        Self {
            train_size: 3000,
            test_size: 300,
            random_state: 42,
            bins: 10,
        }
    }
}

/// Errors raised by the splitter.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SplitError {
    #[error("train size ({train_size}) and test size ({test_size}) must both be positive")]
    NonPositiveSize { train_size: usize, test_size: usize },
    #[error(
        "train size ({train_size}) + test size ({test_size}) exceeds the {available} available rows"
    )]
    SizesExceedDataset {
        train_size: usize,
        test_size: usize,
        available: usize,
    },
    #[error("bin count must be at least 1")]
    ZeroBins,
    #[error("target value at row {row} is not finite")]
    NonFiniteTarget { row: usize },
    #[error("stratification bin {bin} has only {count} member; every bin needs at least 2")]
    BinTooSmall { bin: usize, count: usize },
    #[error("{subset} subset of {size} rows is smaller than the {bins} stratification bins")]
    SubsetSmallerThanBins {
        subset: &'static str,
        size: usize,
        bins: usize,
    },
}

/// Outcome of [`stratified_fixed_sizes`].
#[derive(Debug, Clone)]
pub struct SplitResult {
    pub train: Table,
    pub test: Table,
    /// Source row positions, in the order they appear in `train`.
    pub train_rows: Vec<usize>,
    /// Source row positions, in the order they appear in `test`.
    pub test_rows: Vec<usize>,
    /// Number of non-empty bins actually used for stratification.
    pub effective_bins: usize,
}

/// Reject size combinations that cannot be satisfied from `available` rows.
pub fn validate_sizes(
    train_size: usize,
    test_size: usize,
    available: usize,
) -> Result<(), SplitError> {
    if train_size == 0 || test_size == 0 {
        return Err(SplitError::NonPositiveSize {
            train_size,
            test_size,
        });
    }
    if train_size.saturating_add(test_size) > available {
        return Err(SplitError::SizesExceedDataset {
            train_size,
            test_size,
            available,
        });
    }
    Ok(())
}

/// Split `table` into train/test subsets of exactly the requested sizes.
pub fn stratified_fixed_sizes(
    table: &Table,
    options: &SplitOptions,
) -> Result<SplitResult, SplitError> {
    let total = table.n_rows();
    validate_sizes(options.train_size, options.test_size, total)?;
    if options.bins == 0 {
        return Err(SplitError::ZeroBins);
    }

    let bins = quantile_bins(table.target(), options.bins)?;
    let effective_bins = bins.n_bins();
    if effective_bins < options.bins {
        warn!(
            "Quantile edges collapsed: {effective_bins} of {} requested bins are populated",
            options.bins
        );
    }
    debug!("Bin populations: {:?}", bins.counts());

    let (n_train, n_test) = proportional_counts(options.train_size, options.test_size, total);
    let mut rng = StdRng::seed_from_u64(options.random_state);
    let (mut train_rows, mut test_rows) =
        stratified_shuffle_split(bins.codes(), effective_bins, n_train, n_test, &mut rng)?;

    downsample(&mut train_rows, options.train_size, options.random_state);
    downsample(
        &mut test_rows,
        options.test_size,
        options.random_state.wrapping_add(1),
    );

    Ok(SplitResult {
        train: table.select_rows(&train_rows),
        test: table.select_rows(&test_rows),
        train_rows,
        test_rows,
        effective_bins,
    })
}

/// Train and test counts derived from the size proportions: `floor(p * n)`
/// for train and `ceil(q * n)` for test.
fn proportional_counts(train_size: usize, test_size: usize, total: usize) -> (usize, usize) {
    let n = total as f64;
    let train = snapped(train_size as f64 / n * n).floor() as usize;
    let test = snapped(test_size as f64 / n * n).ceil() as usize;
    (train, test)
}

fn snapped(value: f64) -> f64 {
    let rounded = value.round();
    if (value - rounded).abs() < COUNT_SNAP_EPS {
        rounded
    } else {
        value
    }
}

/// Keep a uniform random `size`-subset of `rows` when it is too large.
fn downsample(rows: &mut Vec<usize>, size: usize, seed: u64) {
    if rows.len() <= size {
        return;
    }
    debug!("Downsampling {} rows to {size}", rows.len());
    let mut rng = StdRng::seed_from_u64(seed);
    let picked = rand::seq::index::sample(&mut rng, rows.len(), size);
    *rows = picked.iter().map(|idx| rows[idx]).collect();
}
