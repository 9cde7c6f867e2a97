use linfa::traits::Fit;
use linfa::{Dataset, ParamGuard};
use ndarray::{Array1, Array2, Ix1, array};

use super::*;
use crate::dataset::synthetic::synthetic_table;

fn fit(
    params: TreeParams,
    dataset: &Dataset<f64, f64, Ix1>,
) -> Result<RegressionTree, TreeError> {
    params.fit(dataset)
}

fn step_dataset() -> Dataset<f64, f64, Ix1> {
    let records = Array2::from_shape_fn((20, 1), |(row, _)| row as f64);
    let targets = Array1::from_iter((0..20).map(|row| if row < 10 { 0.0 } else { 1.0 }));
    Dataset::new(records, targets)
}

#[test]
fn recovers_a_step_function_with_one_split() {
    let tree = fit(TreeParams::new(), &step_dataset()).unwrap();
    let arrays = tree.arrays();
    assert_eq!(tree.node_count(), 3);
    assert_eq!(arrays.children_left[0], 1);
    assert_eq!(arrays.children_right[0], 2);
    assert_eq!(arrays.feature[0], 0);
    assert_eq!(arrays.threshold[0], 9.5);
    assert_eq!(arrays.value[1], 0.0);
    assert_eq!(arrays.value[2], 1.0);
    assert_eq!(arrays.n_node_samples, vec![20, 10, 10]);
    assert_eq!(arrays.impurity[0], 0.25);
    assert!(arrays.is_leaf(1) && arrays.is_leaf(2));
    assert_eq!(arrays.feature[1], TREE_UNDEFINED);
    assert_eq!(arrays.children_left[1], TREE_LEAF);
}

#[test]
fn constant_target_is_a_single_leaf() {
    let dataset = Dataset::new(array![[1.0], [2.0], [3.0]], array![4.0, 4.0, 4.0]);
    let tree = fit(TreeParams::new(), &dataset).unwrap();
    assert_eq!(tree.node_count(), 1);
    assert_eq!(tree.arrays().value[0], 4.0);
    assert_eq!(tree.predict(array![[10.0]].view()).unwrap(), array![4.0]);
}

#[test]
fn constant_features_cannot_split() {
    let dataset = Dataset::new(array![[1.0], [1.0], [1.0], [1.0]], array![0.0, 1.0, 0.0, 1.0]);
    let tree = fit(TreeParams::new(), &dataset).unwrap();
    assert_eq!(tree.node_count(), 1);
    assert_eq!(tree.arrays().value[0], 0.5);
}

#[test]
fn respects_depth_and_leaf_size_limits() {
    let table = synthetic_table(2000, 11);
    let params = TreeParams::new()
        .max_depth(Some(4))
        .min_samples_leaf(25)
        .random_state(3);
    let tree = fit(params, &table.to_dataset()).unwrap();
    assert!(tree.depth() <= 4);
    assert!(tree.node_count() > 1);
    let arrays = tree.arrays();
    for node in 0..tree.node_count() {
        if arrays.is_leaf(node) {
            assert!(arrays.n_node_samples[node] >= 25);
        } else {
            let left = arrays.children_left[node] as usize;
            let right = arrays.children_right[node] as usize;
            assert_eq!(left, node + 1);
            assert!(right > left);
            assert_eq!(
                arrays.n_node_samples[left] + arrays.n_node_samples[right],
                arrays.n_node_samples[node]
            );
        }
    }
    assert_eq!(tree.n_leaves(), tree.node_count().div_ceil(2));
}

#[test]
fn unlimited_depth_fits_training_data_exactly() {
    let table = synthetic_table(300, 12);
    let tree = fit(TreeParams::new(), &table.to_dataset()).unwrap();
    let predictions = tree.predict(table.features()).unwrap();
    for (pred, truth) in predictions.iter().zip(table.target()) {
        assert!((pred - truth).abs() < 1e-12);
    }
}

#[test]
fn same_seed_grows_the_same_tree() {
    let table = synthetic_table(800, 13);
    let params = TreeParams::new().max_depth(Some(6)).min_samples_leaf(5).random_state(42);
    let a = fit(params.clone(), &table.to_dataset()).unwrap();
    let b = fit(params, &table.to_dataset()).unwrap();
    assert_eq!(a, b);
}

#[test]
fn node_values_are_means_and_impurities_variances() {
    let dataset = Dataset::new(array![[0.0], [1.0], [2.0], [3.0]], array![1.0, 3.0, 10.0, 14.0]);
    let tree = fit(TreeParams::new().max_depth(Some(1)), &dataset).unwrap();
    let arrays = tree.arrays();
    assert_eq!(arrays.value[0], 7.0);
    assert_eq!(arrays.impurity[0], 27.5);
    assert_eq!(arrays.threshold[0], 1.5);
    assert_eq!(arrays.value[1], 2.0);
    assert_eq!(arrays.impurity[1], 1.0);
    assert_eq!(arrays.value[2], 12.0);
    assert_eq!(arrays.impurity[2], 4.0);
}

#[test]
fn invalid_params_are_rejected() {
    assert!(matches!(
        TreeParams::new().min_samples_leaf(0).check(),
        Err(TreeError::InvalidMinSamplesLeaf(0))
    ));
    assert!(matches!(
        TreeParams::new().min_samples_split(1).check(),
        Err(TreeError::InvalidMinSamplesSplit(1))
    ));
    assert!(matches!(
        TreeParams::new().max_depth(Some(0)).check(),
        Err(TreeError::InvalidMaxDepth)
    ));
    let result: Result<RegressionTree, TreeError> =
        fit(TreeParams::new().min_samples_leaf(0), &step_dataset());
    assert!(result.is_err());
}

#[test]
fn non_finite_inputs_are_rejected() {
    let dataset = Dataset::new(array![[0.0], [f64::INFINITY]], array![1.0, 2.0]);
    assert!(matches!(
        fit(TreeParams::new(), &dataset),
        Err(TreeError::NonFiniteFeature { row: 1, column: 0 })
    ));
    let dataset = Dataset::new(array![[0.0], [1.0]], array![f64::NAN, 2.0]);
    assert!(matches!(
        fit(TreeParams::new(), &dataset),
        Err(TreeError::NonFiniteTarget { row: 0 })
    ));
}

#[test]
fn predict_checks_feature_count() {
    let tree = fit(TreeParams::new(), &step_dataset()).unwrap();
    assert!(matches!(
        tree.predict(array![[1.0, 2.0]].view()),
        Err(TreeError::FeatureCountMismatch { expected: 1, found: 2 })
    ));
    assert_eq!(tree.predict(array![[3.0], [15.0]].view()).unwrap(), array![0.0, 1.0]);
}
