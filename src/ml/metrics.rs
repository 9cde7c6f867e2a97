//! Evaluation metrics for regression models.

use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Error summary of predictions against ground truth.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    /// Number of evaluated rows.
    pub n: usize,
    /// Mean absolute error.
    pub mae: f64,
    /// Root mean squared error.
    pub rmse: f64,
    /// Coefficient of determination; `0.0` when the truth is constant.
    pub r2: f64,
}

/// Compare `predicted` to `truth`. Returns `None` for empty or mismatched input.
pub fn regression_metrics(
    truth: ArrayView1<'_, f64>,
    predicted: ArrayView1<'_, f64>,
) -> Option<RegressionMetrics> {
    if truth.is_empty() || truth.len() != predicted.len() {
        return None;
    }
    let n = truth.len() as f64;
    let mean = truth.sum() / n;
    let mut abs_sum = 0.0;
    let mut sq_sum = 0.0;
    let mut total_sq = 0.0;
    for (&y, &p) in truth.iter().zip(predicted.iter()) {
        let err = y - p;
        abs_sum += err.abs();
        sq_sum += err * err;
        total_sq += (y - mean) * (y - mean);
    }
    let r2 = if total_sq > 0.0 {
        1.0 - sq_sum / total_sq
    } else {
        0.0
    };
    Some(RegressionMetrics {
        n: truth.len(),
        mae: abs_sum / n,
        rmse: (sq_sum / n).sqrt(),
        r2,
    })
}
