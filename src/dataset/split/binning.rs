use ndarray::ArrayView1;

use super::SplitError;

/// Equal-frequency bin assignment for one column.
#[derive(Debug, Clone, PartialEq)]
pub struct QuantileBins {
    edges: Vec<f64>,
    codes: Vec<usize>,
    counts: Vec<usize>,
}

impl QuantileBins {
    /// Deduplicated ascending bin edges.
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Dense bin code per input value, in `0..n_bins()`.
    pub fn codes(&self) -> &[usize] {
        &self.codes
    }

    /// Members per bin.
    pub fn counts(&self) -> &[usize] {
        &self.counts
    }

    pub fn n_bins(&self) -> usize {
        self.counts.len()
    }
}

/// Cut `values` at the linear quantiles `k / bins`, dropping repeated edges.
///
/// Bins are `[e0, e1]`, `(e1, e2]`, ... Bins left empty by interpolated edges
/// are removed and the remaining codes renumbered densely, so the bin count
/// may end up below `bins`. A constant column yields a single bin.
pub fn quantile_bins(values: ArrayView1<'_, f64>, bins: usize) -> Result<QuantileBins, SplitError> {
    if bins == 0 {
        return Err(SplitError::ZeroBins);
    }
    if let Some(row) = values.iter().position(|v| !v.is_finite()) {
        return Err(SplitError::NonFiniteTarget { row });
    }
    let mut sorted: Vec<f64> = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut edges: Vec<f64> = (0..=bins)
        .map(|k| linear_quantile(&sorted, k as f64 / bins as f64))
        .collect();
    edges.dedup();

    let raw_bins = edges.len().saturating_sub(1).max(1);
    let raw_codes: Vec<usize> = values
        .iter()
        .map(|v| {
            let below = edges.partition_point(|edge| edge < v);
            (below.max(1) - 1).min(raw_bins - 1)
        })
        .collect();

    let mut raw_counts = vec![0usize; raw_bins];
    for &code in &raw_codes {
        raw_counts[code] += 1;
    }
    let mut remap = vec![usize::MAX; raw_bins];
    let mut counts = Vec::with_capacity(raw_bins);
    for (raw, &count) in raw_counts.iter().enumerate() {
        if count > 0 {
            remap[raw] = counts.len();
            counts.push(count);
        }
    }
    let codes = raw_codes.into_iter().map(|code| remap[code]).collect();
    Ok(QuantileBins {
        edges,
        codes,
        counts,
    })
}

fn linear_quantile(sorted: &[f64], q: f64) -> f64 {
    let Some(last) = sorted.len().checked_sub(1) else {
        return f64::NAN;
    };
    let pos = q * last as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil().min(last as f64) as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}
