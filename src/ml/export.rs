//! Self-contained JSON description of a fitted regression tree.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::cart::TreeArrays;

/// Errors raised while exporting or loading a tree description.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("{names} feature names given for a tree fitted on {expected} features")]
    FeatureCountMismatch { names: usize, expected: usize },
    #[error("node {node} splits on feature {feature}, outside 0..{n_features}")]
    FeatureIndexOutOfRange {
        node: usize,
        feature: i64,
        n_features: usize,
    },
    #[error("node {node} references child {child}, which is not a later node")]
    ChildOutOfRange { node: usize, child: i64 },
    #[error("tree has no nodes")]
    EmptyTree,
    #[error("node {node} holds {n_samples} samples but its children hold {children}")]
    SampleCountMismatch {
        node: usize,
        n_samples: usize,
        children: usize,
    },
    #[error("node list entry {index} has id {id}")]
    InvalidRecord { index: usize, id: usize },
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Invalid tree JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// One exported node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(into = "NodeRecord", try_from = "NodeRecord")]
pub enum ExportedNode {
    Leaf {
        id: usize,
        n_samples: usize,
        impurity: f64,
        value: f64,
    },
    Split {
        id: usize,
        n_samples: usize,
        impurity: f64,
        value: f64,
        feature: String,
        feature_index: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
}

impl ExportedNode {
    pub fn id(&self) -> usize {
        match self {
            Self::Leaf { id, .. } | Self::Split { id, .. } => *id,
        }
    }

    pub fn is_leaf(&self) -> bool {
        matches!(self, Self::Leaf { .. })
    }

    /// Mean target of the training samples reaching this node.
    pub fn value(&self) -> f64 {
        match self {
            Self::Leaf { value, .. } | Self::Split { value, .. } => *value,
        }
    }

    pub fn n_samples(&self) -> usize {
        match self {
            Self::Leaf { n_samples, .. } | Self::Split { n_samples, .. } => *n_samples,
        }
    }
}

/// Flat wire form: split-only keys are omitted on leaves.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct NodeRecord {
    id: usize,
    is_leaf: bool,
    n_samples: usize,
    impurity: f64,
    value: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    feature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    feature_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    left: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    right: Option<usize>,
}

impl From<ExportedNode> for NodeRecord {
    fn from(node: ExportedNode) -> Self {
        match node {
            ExportedNode::Leaf {
                id,
                n_samples,
                impurity,
                value,
            } => Self {
                id,
                is_leaf: true,
                n_samples,
                impurity,
                value,
                feature: None,
                feature_index: None,
                threshold: None,
                left: None,
                right: None,
            },
            ExportedNode::Split {
                id,
                n_samples,
                impurity,
                value,
                feature,
                feature_index,
                threshold,
                left,
                right,
            } => Self {
                id,
                is_leaf: false,
                n_samples,
                impurity,
                value,
                feature: Some(feature),
                feature_index: Some(feature_index),
                threshold: Some(threshold),
                left: Some(left),
                right: Some(right),
            },
        }
    }
}

impl TryFrom<NodeRecord> for ExportedNode {
    type Error = String;

    fn try_from(record: NodeRecord) -> Result<Self, Self::Error> {
        if record.is_leaf {
            return Ok(Self::Leaf {
                id: record.id,
                n_samples: record.n_samples,
                impurity: record.impurity,
                value: record.value,
            });
        }
        let missing = |key: &str| format!("split node {} is missing '{key}'", record.id);
        Ok(Self::Split {
            id: record.id,
            n_samples: record.n_samples,
            impurity: record.impurity,
            value: record.value,
            feature_index: record.feature_index.ok_or_else(|| missing("featureIndex"))?,
            threshold: record.threshold.ok_or_else(|| missing("threshold"))?,
            left: record.left.ok_or_else(|| missing("left"))?,
            right: record.right.ok_or_else(|| missing("right"))?,
            feature: record.feature.ok_or_else(|| missing("feature"))?,
        })
    }
}

/// Exported tree: `{"root": 0, "nodes": [...]}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeExport {
    pub root: usize,
    pub nodes: Vec<ExportedNode>,
}

impl TreeExport {
    /// Walk the fitted arrays into a node list, resolving feature names.
    pub fn from_arrays(arrays: &TreeArrays, feature_names: &[String]) -> Result<Self, ExportError> {
        if feature_names.len() != arrays.n_features {
            return Err(ExportError::FeatureCountMismatch {
                names: feature_names.len(),
                expected: arrays.n_features,
            });
        }
        let node_count = arrays.node_count();
        if node_count == 0 {
            return Err(ExportError::EmptyTree);
        }
        let child_id = |node: usize, child: i64| {
            usize::try_from(child)
                .ok()
                .filter(|&id| id > node && id < node_count)
                .ok_or(ExportError::ChildOutOfRange { node, child })
        };

        let mut nodes = Vec::with_capacity(node_count);
        for id in 0..node_count {
            let n_samples = arrays.n_node_samples[id];
            let impurity = arrays.impurity[id];
            let value = arrays.value[id];
            if arrays.is_leaf(id) {
                nodes.push(ExportedNode::Leaf {
                    id,
                    n_samples,
                    impurity,
                    value,
                });
                continue;
            }
            let raw_feature = arrays.feature[id];
            let feature_index = usize::try_from(raw_feature)
                .ok()
                .filter(|&idx| idx < feature_names.len())
                .ok_or(ExportError::FeatureIndexOutOfRange {
                    node: id,
                    feature: raw_feature,
                    n_features: feature_names.len(),
                })?;
            nodes.push(ExportedNode::Split {
                id,
                n_samples,
                impurity,
                value,
                feature: feature_names[feature_index].clone(),
                feature_index,
                threshold: arrays.threshold[id],
                left: child_id(id, arrays.children_left[id])?,
                right: child_id(id, arrays.children_right[id])?,
            });
        }
        Ok(Self { root: 0, nodes })
    }

    /// Check ids match positions, every split references later nodes and
    /// splits pass all their samples on to the two children.
    pub fn validate(&self) -> Result<(), ExportError> {
        if self.nodes.is_empty() {
            return Err(ExportError::EmptyTree);
        }
        let node_count = self.nodes.len();
        for (index, node) in self.nodes.iter().enumerate() {
            if node.id() != index {
                return Err(ExportError::InvalidRecord {
                    index,
                    id: node.id(),
                });
            }
            if let ExportedNode::Split { left, right, .. } = node {
                for child in [*left, *right] {
                    if child <= index || child >= node_count {
                        return Err(ExportError::ChildOutOfRange {
                            node: index,
                            child: child as i64,
                        });
                    }
                }
                let children = self.nodes[*left].n_samples() + self.nodes[*right].n_samples();
                if children != node.n_samples() {
                    return Err(ExportError::SampleCountMismatch {
                        node: index,
                        n_samples: node.n_samples(),
                        children,
                    });
                }
            }
        }
        Ok(())
    }

    /// Read and validate a `tree.json`.
    pub fn load_json(path: &Path) -> Result<Self, ExportError> {
        let bytes = std::fs::read(path).map_err(|source| ExportError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let export: Self = serde_json::from_slice(&bytes)?;
        export.validate()?;
        Ok(export)
    }

    /// Follow the splits from the root for one feature row.
    pub fn predict(&self, row: &[f64]) -> Option<f64> {
        let mut node = self.nodes.get(self.root)?;
        loop {
            match node {
                ExportedNode::Leaf { value, .. } => return Some(*value),
                ExportedNode::Split {
                    feature_index,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    let next = if *row.get(*feature_index)? <= *threshold {
                        *left
                    } else {
                        *right
                    };
                    node = self.nodes.get(next)?;
                }
            }
        }
    }
}
