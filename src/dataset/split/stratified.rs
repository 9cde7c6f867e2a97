use rand::Rng;
use rand::seq::SliceRandom;

use super::SplitError;

/// Most likely per-class draw counts when taking `n_draws` items without
/// replacement from classes of the given sizes.
///
/// Each class first gets the floor of its proportional share; the rows still
/// missing go to the classes with the largest fractional remainders, with
/// ties between equal remainders broken at random.
pub fn approximate_mode<R: Rng + ?Sized>(
    class_counts: &[usize],
    n_draws: usize,
    rng: &mut R,
) -> Vec<usize> {
    let total: usize = class_counts.iter().sum();
    if total == 0 {
        return vec![0; class_counts.len()];
    }
    let continuous: Vec<f64> = class_counts
        .iter()
        .map(|&count| {
            let share = count as f64 / total as f64 * n_draws as f64;
            share.min(count as f64)
        })
        .collect();
    let mut floored: Vec<usize> = continuous.iter().map(|share| share.floor() as usize).collect();
    let mut need = n_draws.saturating_sub(floored.iter().sum());
    if need == 0 {
        return floored;
    }

    let remainders: Vec<f64> = continuous
        .iter()
        .zip(&floored)
        .map(|(share, &floor)| share - floor as f64)
        .collect();
    let mut levels = remainders.clone();
    levels.sort_by(|a, b| b.total_cmp(a));
    levels.dedup();

    for level in levels {
        let candidates: Vec<usize> = remainders
            .iter()
            .enumerate()
            .filter(|&(class, &rem)| rem == level && floored[class] < class_counts[class])
            .map(|(class, _)| class)
            .collect();
        let take = candidates.len().min(need);
        for pick in rand::seq::index::sample(rng, candidates.len(), take) {
            floored[candidates[pick]] += 1;
        }
        need -= take;
        if need == 0 {
            break;
        }
    }
    floored
}

/// One stratified shuffle split over dense class `codes` in `0..n_classes`.
///
/// Returns `(train, test)` row positions, each list shuffled.
pub fn stratified_shuffle_split<R: Rng + ?Sized>(
    codes: &[usize],
    n_classes: usize,
    n_train: usize,
    n_test: usize,
    rng: &mut R,
) -> Result<(Vec<usize>, Vec<usize>), SplitError> {
    let mut members: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
    for (row, &code) in codes.iter().enumerate() {
        members[code].push(row);
    }
    if let Some((bin, rows)) = members
        .iter()
        .enumerate()
        .find(|(_, rows)| rows.len() < 2)
    {
        return Err(SplitError::BinTooSmall {
            bin,
            count: rows.len(),
        });
    }
    if n_train < n_classes {
        return Err(SplitError::SubsetSmallerThanBins {
            subset: "train",
            size: n_train,
            bins: n_classes,
        });
    }
    if n_test < n_classes {
        return Err(SplitError::SubsetSmallerThanBins {
            subset: "test",
            size: n_test,
            bins: n_classes,
        });
    }

    let class_counts: Vec<usize> = members.iter().map(Vec::len).collect();
    let train_alloc = approximate_mode(&class_counts, n_train, rng);
    let remaining: Vec<usize> = class_counts
        .iter()
        .zip(&train_alloc)
        .map(|(&count, &taken)| count - taken)
        .collect();
    let test_alloc = approximate_mode(&remaining, n_test, rng);

    let mut train = Vec::with_capacity(n_train);
    let mut test = Vec::with_capacity(n_test);
    for ((mut rows, &n_tr), &n_te) in members.into_iter().zip(&train_alloc).zip(&test_alloc) {
        rows.shuffle(rng);
        train.extend_from_slice(&rows[..n_tr]);
        test.extend_from_slice(&rows[n_tr..n_tr + n_te]);
    }
    train.shuffle(rng);
    test.shuffle(rng);
    Ok((train, test))
}
