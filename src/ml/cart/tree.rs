use linfa::dataset::DatasetBase;
use linfa::traits::Fit;
use ndarray::{Array1, ArrayBase, ArrayView1, ArrayView2, Data, Ix2};
use tracing::debug;

use super::builder::grow;
use super::{TreeError, TreeValidParams};

/// Child id stored for "no child".
pub const TREE_LEAF: i64 = -1;
/// Feature id and threshold stored on leaves.
pub const TREE_UNDEFINED: i64 = -2;

/// Fitted tree as parallel arrays indexed by node id.
///
/// Node 0 is the root. A node is a leaf iff its two child ids are equal
/// (both [`TREE_LEAF`]); children always have larger ids than their parent.
#[derive(Debug, Clone, PartialEq)]
pub struct TreeArrays {
    pub n_features: usize,
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub n_node_samples: Vec<usize>,
    pub impurity: Vec<f64>,
    pub value: Vec<f64>,
}

impl TreeArrays {
    pub(super) fn with_features(n_features: usize) -> Self {
        Self {
            n_features,
            children_left: Vec::new(),
            children_right: Vec::new(),
            feature: Vec::new(),
            threshold: Vec::new(),
            n_node_samples: Vec::new(),
            impurity: Vec::new(),
            value: Vec::new(),
        }
    }

    pub fn node_count(&self) -> usize {
        self.value.len()
    }

    pub fn is_leaf(&self, node: usize) -> bool {
        self.children_left[node] == self.children_right[node]
    }

    /// Append a leaf and return its id.
    pub(super) fn push_leaf(&mut self, n_samples: usize, impurity: f64, value: f64) -> usize {
        let id = self.node_count();
        self.children_left.push(TREE_LEAF);
        self.children_right.push(TREE_LEAF);
        self.feature.push(TREE_UNDEFINED);
        self.threshold.push(TREE_UNDEFINED as f64);
        self.n_node_samples.push(n_samples);
        self.impurity.push(impurity);
        self.value.push(value);
        id
    }

    /// Turn leaf `node` into a split; children are attached later.
    pub(super) fn set_split(&mut self, node: usize, feature: usize, threshold: f64) {
        self.feature[node] = feature as i64;
        self.threshold[node] = threshold;
    }

    pub(super) fn attach_child(&mut self, parent: usize, child: usize, is_left: bool) {
        let slot = if is_left {
            &mut self.children_left[parent]
        } else {
            &mut self.children_right[parent]
        };
        *slot = child as i64;
    }
}

/// A fitted regression tree.
#[derive(Debug, Clone, PartialEq)]
pub struct RegressionTree {
    arrays: TreeArrays,
    params: TreeValidParams,
}

impl RegressionTree {
    pub fn arrays(&self) -> &TreeArrays {
        &self.arrays
    }

    pub fn params(&self) -> &TreeValidParams {
        &self.params
    }

    pub fn n_features(&self) -> usize {
        self.arrays.n_features
    }

    pub fn node_count(&self) -> usize {
        self.arrays.node_count()
    }

    pub fn n_leaves(&self) -> usize {
        (0..self.node_count())
            .filter(|&node| self.arrays.is_leaf(node))
            .count()
    }

    /// Length of the longest root-to-leaf path, in edges.
    pub fn depth(&self) -> usize {
        let mut depths = vec![0usize; self.node_count()];
        let mut max_depth = 0;
        for node in 0..self.node_count() {
            if self.arrays.is_leaf(node) {
                max_depth = max_depth.max(depths[node]);
                continue;
            }
            for child in [self.arrays.children_left[node], self.arrays.children_right[node]] {
                depths[child as usize] = depths[node] + 1;
            }
        }
        max_depth
    }

    /// Predict one row; `row.len()` must equal [`Self::n_features`].
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let arrays = &self.arrays;
        let mut node = 0usize;
        while !arrays.is_leaf(node) {
            let feature = arrays.feature[node] as usize;
            node = if row[feature] <= arrays.threshold[node] {
                arrays.children_left[node] as usize
            } else {
                arrays.children_right[node] as usize
            };
        }
        arrays.value[node]
    }

    pub fn predict(&self, records: ArrayView2<'_, f64>) -> Result<Array1<f64>, TreeError> {
        if records.ncols() != self.n_features() {
            return Err(TreeError::FeatureCountMismatch {
                expected: self.n_features(),
                found: records.ncols(),
            });
        }
        Ok(records.rows().into_iter().map(|row| self.predict_row(row)).collect())
    }
}

impl<D> Fit<ArrayBase<D, Ix2>, Array1<f64>, TreeError> for TreeValidParams
where
    D: Data<Elem = f64>,
{
    type Object = RegressionTree;

    fn fit(
        &self,
        dataset: &DatasetBase<ArrayBase<D, Ix2>, Array1<f64>>,
    ) -> Result<Self::Object, TreeError> {
        let records = dataset.records().view();
        let targets = dataset.targets().view();
        validate_inputs(records, targets)?;
        let arrays = grow(records, targets, self);
        debug!(
            "Grew tree with {} nodes from {} samples",
            arrays.node_count(),
            records.nrows()
        );
        Ok(RegressionTree {
            arrays,
            params: self.clone(),
        })
    }
}

fn validate_inputs(records: ArrayView2<'_, f64>, targets: ArrayView1<'_, f64>) -> Result<(), TreeError> {
    if records.nrows() != targets.len() {
        return Err(TreeError::LengthMismatch {
            records: records.nrows(),
            targets: targets.len(),
        });
    }
    if records.nrows() == 0 {
        return Err(TreeError::EmptyDataset);
    }
    if let Some(((row, column), _)) = records.indexed_iter().find(|(_, v)| !v.is_finite()) {
        return Err(TreeError::NonFiniteFeature { row, column });
    }
    if let Some(row) = targets.iter().position(|v| !v.is_finite()) {
        return Err(TreeError::NonFiniteTarget { row });
    }
    Ok(())
}
