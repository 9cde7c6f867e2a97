use ndarray::{ArrayView1, ArrayView2};
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

use super::{TreeArrays, TreeValidParams};

/// Values closer than this are treated as equal during split search.
const FEATURE_THRESHOLD: f64 = 1e-7;

struct Pending {
    start: usize,
    end: usize,
    depth: usize,
    parent: Option<(usize, bool)>,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    proxy: f64,
}

/// Grow a tree depth-first, numbering nodes in pre-order (left before right).
pub(super) fn grow(
    records: ArrayView2<'_, f64>,
    targets: ArrayView1<'_, f64>,
    params: &TreeValidParams,
) -> TreeArrays {
    let mut arrays = TreeArrays::with_features(records.ncols());
    let mut samples: Vec<usize> = (0..records.nrows()).collect();
    let mut features: Vec<usize> = (0..records.ncols()).collect();
    let mut rng = StdRng::seed_from_u64(params.random_state());
    let min_leaf = params.min_samples_leaf();

    let mut stack = vec![Pending {
        start: 0,
        end: samples.len(),
        depth: 0,
        parent: None,
    }];
    while let Some(pending) = stack.pop() {
        let node_samples = &mut samples[pending.start..pending.end];
        let n = node_samples.len();
        let (value, impurity) = mean_and_variance(targets, node_samples);
        let node = arrays.push_leaf(n, impurity, value);
        if let Some((parent, is_left)) = pending.parent {
            arrays.attach_child(parent, node, is_left);
        }

        let stop = params.max_depth().is_some_and(|max| pending.depth >= max)
            || n < params.min_samples_split()
            || n < 2 * min_leaf
            || impurity <= f64::EPSILON;
        if stop {
            continue;
        }
        features.shuffle(&mut rng);
        let Some(best) = best_split(records, targets, node_samples, &features, min_leaf) else {
            continue;
        };
        let n_left = partition(records, node_samples, best.feature, best.threshold);
        arrays.set_split(node, best.feature, best.threshold);

        let mid = pending.start + n_left;
        stack.push(Pending {
            start: mid,
            end: pending.end,
            depth: pending.depth + 1,
            parent: Some((node, false)),
        });
        stack.push(Pending {
            start: pending.start,
            end: mid,
            depth: pending.depth + 1,
            parent: Some((node, true)),
        });
    }
    arrays
}

fn mean_and_variance(targets: ArrayView1<'_, f64>, samples: &[usize]) -> (f64, f64) {
    let n = samples.len() as f64;
    let mean = samples.iter().map(|&s| targets[s]).sum::<f64>() / n;
    let variance = samples
        .iter()
        .map(|&s| {
            let diff = targets[s] - mean;
            diff * diff
        })
        .sum::<f64>()
        / n;
    (mean, variance)
}

/// Best split over `features` in the given order; the first maximum of the
/// `S_l^2 / n_l + S_r^2 / n_r` proxy wins.
fn best_split(
    records: ArrayView2<'_, f64>,
    targets: ArrayView1<'_, f64>,
    samples: &[usize],
    features: &[usize],
    min_leaf: usize,
) -> Option<BestSplit> {
    let n = samples.len();
    let total: f64 = samples.iter().map(|&s| targets[s]).sum();
    let mut sorted: Vec<(f64, f64)> = Vec::with_capacity(n);
    let mut best: Option<BestSplit> = None;

    for &feature in features {
        sorted.clear();
        sorted.extend(samples.iter().map(|&s| (records[[s, feature]], targets[s])));
        sorted.sort_by(|a, b| a.0.total_cmp(&b.0));
        if sorted[n - 1].0 <= sorted[0].0 + FEATURE_THRESHOLD {
            continue;
        }

        let mut left_sum = 0.0;
        for pos in 1..n {
            left_sum += sorted[pos - 1].1;
            if pos < min_leaf || n - pos < min_leaf {
                continue;
            }
            let (lower, upper) = (sorted[pos - 1].0, sorted[pos].0);
            if upper <= lower + FEATURE_THRESHOLD {
                continue;
            }
            let right_sum = total - left_sum;
            let proxy = left_sum * left_sum / pos as f64 + right_sum * right_sum / (n - pos) as f64;
            if best.as_ref().is_none_or(|current| proxy > current.proxy) {
                best = Some(BestSplit {
                    feature,
                    threshold: midpoint(lower, upper),
                    proxy,
                });
            }
        }
    }
    best
}

fn midpoint(lower: f64, upper: f64) -> f64 {
    let mid = lower / 2.0 + upper / 2.0;
    if mid == upper || !mid.is_finite() {
        lower
    } else {
        mid
    }
}

/// Move samples with `x <= threshold` to the front; returns how many there are.
fn partition(
    records: ArrayView2<'_, f64>,
    samples: &mut [usize],
    feature: usize,
    threshold: f64,
) -> usize {
    let (left, right): (Vec<usize>, Vec<usize>) = samples
        .iter()
        .copied()
        .partition(|&s| records[[s, feature]] <= threshold);
    let n_left = left.len();
    for (slot, sample) in samples.iter_mut().zip(left.into_iter().chain(right)) {
        *slot = sample;
    }
    n_left
}
