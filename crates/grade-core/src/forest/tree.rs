//! CART regression tree

use crate::error::{PredictorError, Result};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// Minimum impurity decrease for a split to be kept
const MIN_GAIN: f64 = 1e-12;

/// Regression tree node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum TreeNode {
    /// Leaf node with the mean target of its samples
    Leaf { value: f64, n_samples: usize },
    /// Internal node; samples with `x[feature_idx] <= threshold` go left
    Split {
        feature_idx: usize,
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
        n_samples: usize,
    },
}

impl TreeNode {
    fn depth(&self) -> usize {
        match self {
            TreeNode::Leaf { .. } => 0,
            TreeNode::Split { left, right, .. } => 1 + left.depth().max(right.depth()),
        }
    }

    fn check(&self, n_features: usize) -> Result<()> {
        match self {
            TreeNode::Leaf { value, .. } if !value.is_finite() => Err(
                PredictorError::ModelNotFound("hoja con valor no finito".into()),
            ),
            TreeNode::Leaf { .. } => Ok(()),
            TreeNode::Split {
                feature_idx,
                threshold,
                left,
                right,
                ..
            } => {
                if *feature_idx >= n_features {
                    return Err(PredictorError::ModelNotFound(format!(
                        "división sobre la característica {} con solo {} disponibles",
                        feature_idx, n_features
                    )));
                }
                if threshold.is_nan() {
                    return Err(PredictorError::ModelNotFound(
                        "división con umbral inválido".into(),
                    ));
                }
                left.check(n_features)?;
                right.check(n_features)
            }
        }
    }
}

/// Regression tree grown with the variance-reduction criterion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegressionTree {
    root: Option<TreeNode>,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    n_features: usize,
    feature_importances: Vec<f64>,
}

impl Default for RegressionTree {
    fn default() -> Self {
        Self::new()
    }
}

impl RegressionTree {
    pub fn new() -> Self {
        Self {
            root: None,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            n_features: 0,
            feature_importances: Vec::new(),
        }
    }

    pub fn with_max_depth(mut self, depth: Option<usize>) -> Self {
        self.max_depth = depth;
        self
    }

    pub fn with_min_samples_split(mut self, min_samples: usize) -> Self {
        self.min_samples_split = min_samples.max(2);
        self
    }

    pub fn with_min_samples_leaf(mut self, min_samples: usize) -> Self {
        self.min_samples_leaf = min_samples.max(1);
        self
    }

    /// Fit on the rows selected by `indices` (duplicates allowed, for bootstrap samples)
    pub fn fit(&mut self, x: &[Vec<f64>], y: &[f64], indices: &[usize]) -> Result<&mut Self> {
        if x.len() != y.len() {
            return Err(PredictorError::Dataset(format!(
                "{} filas de características pero {} valores objetivo",
                x.len(),
                y.len()
            )));
        }
        if indices.is_empty() {
            return Err(PredictorError::Dataset(
                "no hay muestras para entrenar el árbol".into(),
            ));
        }

        self.n_features = x[indices[0]].len();
        let mut importances = vec![0.0; self.n_features];
        let root = self.build_tree(x, y, indices, 0, &mut importances);

        let total: f64 = importances.iter().sum();
        if total > 0.0 {
            for imp in &mut importances {
                *imp /= total;
            }
        }

        self.root = Some(root);
        self.feature_importances = importances;
        Ok(self)
    }

    fn build_tree(
        &self,
        x: &[Vec<f64>],
        y: &[f64],
        indices: &[usize],
        depth: usize,
        importances: &mut [f64],
    ) -> TreeNode {
        let n_samples = indices.len();
        let (sum, sq_sum) = indices
            .iter()
            .fold((0.0, 0.0), |(s, sq), &i| (s + y[i], sq + y[i] * y[i]));
        let mean = sum / n_samples as f64;
        let parent_sse = (sq_sum - sum * sum / n_samples as f64).max(0.0);

        let should_stop = n_samples < self.min_samples_split
            || n_samples < 2 * self.min_samples_leaf
            || self.max_depth.map_or(false, |d| depth >= d)
            || parent_sse <= MIN_GAIN;

        if should_stop {
            return TreeNode::Leaf { value: mean, n_samples };
        }

        let Some(split) = self.find_best_split(x, y, indices, parent_sse) else {
            return TreeNode::Leaf { value: mean, n_samples };
        };

        let (left_indices, right_indices): (Vec<usize>, Vec<usize>) = indices
            .iter()
            .partition(|&&i| x[i][split.feature_idx] <= split.threshold);

        importances[split.feature_idx] += split.gain;

        let left = Box::new(self.build_tree(x, y, &left_indices, depth + 1, importances));
        let right = Box::new(self.build_tree(x, y, &right_indices, depth + 1, importances));

        TreeNode::Split {
            feature_idx: split.feature_idx,
            threshold: split.threshold,
            left,
            right,
            n_samples,
        }
    }

    /// Scan every feature with running sums over the sorted samples
    fn find_best_split(
        &self,
        x: &[Vec<f64>],
        y: &[f64],
        indices: &[usize],
        parent_sse: f64,
    ) -> Option<BestSplit> {
        let n = indices.len();
        let total_sum: f64 = indices.iter().map(|&i| y[i]).sum();
        let total_sq: f64 = indices.iter().map(|&i| y[i] * y[i]).sum();
        let mut best: Option<BestSplit> = None;
        let mut sorted = indices.to_vec();

        for feature_idx in 0..self.n_features {
            sorted.sort_by(|&a, &b| {
                x[a][feature_idx]
                    .partial_cmp(&x[b][feature_idx])
                    .unwrap_or(Ordering::Equal)
            });

            let mut left_sum = 0.0;
            let mut left_sq = 0.0;

            for pos in 0..n - 1 {
                let yi = y[sorted[pos]];
                left_sum += yi;
                left_sq += yi * yi;

                let left_count = pos + 1;
                let right_count = n - left_count;
                if left_count < self.min_samples_leaf || right_count < self.min_samples_leaf {
                    continue;
                }

                let current = x[sorted[pos]][feature_idx];
                let next = x[sorted[pos + 1]][feature_idx];
                if next <= current {
                    continue;
                }

                let right_sum = total_sum - left_sum;
                let right_sq = total_sq - left_sq;
                let left_sse = left_sq - left_sum * left_sum / left_count as f64;
                let right_sse = right_sq - right_sum * right_sum / right_count as f64;
                let gain = parent_sse - (left_sse + right_sse);

                if gain > MIN_GAIN && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(BestSplit {
                        feature_idx,
                        threshold: (current + next) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }

    /// Predict a single row
    pub fn predict(&self, row: &[f64]) -> Result<f64> {
        let mut node = self.root.as_ref().ok_or_else(|| {
            PredictorError::ModelNotFound("el árbol no ha sido entrenado".into())
        })?;

        if row.len() != self.n_features {
            return Err(PredictorError::Validation(format!(
                "se esperaban {} características, se recibieron {}",
                self.n_features,
                row.len()
            )));
        }

        loop {
            match node {
                TreeNode::Leaf { value, .. } => return Ok(*value),
                TreeNode::Split {
                    feature_idx,
                    threshold,
                    left,
                    right,
                    ..
                } => {
                    let value = row.get(*feature_idx).ok_or_else(|| {
                        PredictorError::ModelNotFound(format!(
                            "el árbol usa la característica {} inexistente",
                            feature_idx
                        ))
                    })?;
                    node = if *value <= *threshold {
                        left.as_ref()
                    } else {
                        right.as_ref()
                    };
                }
            }
        }
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }

    /// Structural check of a deserialized tree against the expected feature count
    pub fn validate(&self, n_features: usize) -> Result<()> {
        let root = self.root.as_ref().ok_or_else(|| {
            PredictorError::ModelNotFound("el árbol no ha sido entrenado".into())
        })?;
        if self.n_features != n_features {
            return Err(PredictorError::ModelNotFound(format!(
                "el árbol espera {} características, el bosque {}",
                self.n_features, n_features
            )));
        }
        root.check(n_features)
    }

    pub fn depth(&self) -> usize {
        self.root.as_ref().map_or(0, TreeNode::depth)
    }
}

struct BestSplit {
    feature_idx: usize,
    threshold: f64,
    gain: f64,
}
