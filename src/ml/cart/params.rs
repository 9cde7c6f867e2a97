use linfa::ParamGuard;

use super::TreeError;

/// Checked tree hyperparameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeValidParams {
    max_depth: Option<usize>,
    min_samples_leaf: usize,
    min_samples_split: usize,
    random_state: u64,
}

impl TreeValidParams {
    /// Depth limit; `None` grows until the other stopping rules apply.
    pub fn max_depth(&self) -> Option<usize> {
        self.max_depth
    }

    pub fn min_samples_leaf(&self) -> usize {
        self.min_samples_leaf
    }

    pub fn min_samples_split(&self) -> usize {
        self.min_samples_split
    }

    /// Seed for the per-node feature visiting order.
    pub fn random_state(&self) -> u64 {
        self.random_state
    }
}

/// Unchecked builder for [`TreeValidParams`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeParams(TreeValidParams);

impl Default for TreeParams {
    fn default() -> Self {
        Self(TreeValidParams {
            max_depth: None,
            min_samples_leaf: 1,
            min_samples_split: 2,
            random_state: 0,
        })
    }
}

impl TreeParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_depth(mut self, max_depth: Option<usize>) -> Self {
        self.0.max_depth = max_depth;
        self
    }

    pub fn min_samples_leaf(mut self, min_samples_leaf: usize) -> Self {
        self.0.min_samples_leaf = min_samples_leaf;
        self
    }

    pub fn min_samples_split(mut self, min_samples_split: usize) -> Self {
        self.0.min_samples_split = min_samples_split;
        self
    }

    pub fn random_state(mut self, random_state: u64) -> Self {
        self.0.random_state = random_state;
        self
    }
}

impl ParamGuard for TreeParams {
    type Checked = TreeValidParams;
    type Error = TreeError;

    fn check_ref(&self) -> Result<&Self::Checked, Self::Error> {
        if self.0.min_samples_leaf < 1 {
            return Err(TreeError::InvalidMinSamplesLeaf(self.0.min_samples_leaf));
        }
        if self.0.min_samples_split < 2 {
            return Err(TreeError::InvalidMinSamplesSplit(self.0.min_samples_split));
        }
        if self.0.max_depth == Some(0) {
            return Err(TreeError::InvalidMaxDepth);
        }
        Ok(&self.0)
    }

    fn check(self) -> Result<Self::Checked, Self::Error> {
        self.check_ref()?;
        Ok(self.0)
    }
}
