use std::collections::HashSet;

use linfa::Dataset;
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis, Ix1};

use super::DatasetError;

/// Immutable column-named table: numeric features plus one numeric target.
///
/// Row identity is the row position; subsets produced by [`Table::select_rows`]
/// get a fresh 0-based sequence.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    feature_names: Vec<String>,
    target_name: String,
    features: Array2<f64>,
    target: Array1<f64>,
}

impl Table {
    /// Build a table, checking the shapes and column names agree.
    pub fn new(
        feature_names: Vec<String>,
        target_name: impl Into<String>,
        features: Array2<f64>,
        target: Array1<f64>,
    ) -> Result<Self, DatasetError> {
        let target_name = target_name.into();
        if features.ncols() != feature_names.len() {
            return Err(DatasetError::Shape(format!(
                "{} feature names for {} feature columns",
                feature_names.len(),
                features.ncols()
            )));
        }
        if features.nrows() != target.len() {
            return Err(DatasetError::Shape(format!(
                "{} feature rows but {} target values",
                features.nrows(),
                target.len()
            )));
        }
        let mut seen = HashSet::new();
        for name in feature_names.iter().chain(std::iter::once(&target_name)) {
            if !seen.insert(name.as_str()) {
                return Err(DatasetError::DuplicateColumn(name.clone()));
            }
        }
        Ok(Self {
            feature_names,
            target_name,
            features,
            target,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.target.len()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn target_name(&self) -> &str {
        &self.target_name
    }

    pub fn features(&self) -> ArrayView2<'_, f64> {
        self.features.view()
    }

    pub fn target(&self) -> ArrayView1<'_, f64> {
        self.target.view()
    }

    /// Header row: feature names followed by the target name.
    pub fn header(&self) -> Vec<&str> {
        self.feature_names
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.target_name.as_str()))
            .collect()
    }

    /// New table holding `rows` in the given order.
    pub fn select_rows(&self, rows: &[usize]) -> Table {
        Table {
            feature_names: self.feature_names.clone(),
            target_name: self.target_name.clone(),
            features: self.features.select(Axis(0), rows),
            target: self.target.select(Axis(0), rows),
        }
    }

    /// Convert into a `linfa` dataset for fitting.
    pub fn to_dataset(&self) -> Dataset<f64, f64, Ix1> {
        Dataset::new(self.features.clone(), self.target.clone())
            .with_feature_names(self.feature_names.clone())
    }
}
