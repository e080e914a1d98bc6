//! Random forest regressor
//!
//! Bagged ensemble of CART regression trees. Each tree is grown on a
//! bootstrap sample drawn from a `ChaCha8Rng` seeded with
//! `random_state + tree_index`, so fits are reproducible and independent of
//! how rayon schedules the trees.

mod tree;

pub use tree::{RegressionTree, TreeNode};

use crate::error::{PredictorError, Result};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Ensemble hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestParams {
    pub n_estimators: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub random_state: u64,
    pub bootstrap: bool,
}

impl Default for ForestParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            max_depth: Some(10),
            min_samples_split: 5,
            min_samples_leaf: 2,
            random_state: 42,
            bootstrap: true,
        }
    }
}

/// Random forest regressor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RandomForestRegressor {
    trees: Vec<RegressionTree>,
    params: ForestParams,
    n_features: usize,
    feature_importances: Vec<f64>,
}

impl RandomForestRegressor {
    pub fn new(params: ForestParams) -> Self {
        Self {
            trees: Vec::new(),
            params,
            n_features: 0,
            feature_importances: Vec::new(),
        }
    }

    /// Fit the forest to training data
    pub fn fit(&mut self, x: &[Vec<f64>], y: &[f64]) -> Result<&mut Self> {
        let n_samples = x.len();

        if n_samples != y.len() {
            return Err(PredictorError::Dataset(format!(
                "{} filas de características pero {} valores objetivo",
                n_samples,
                y.len()
            )));
        }
        if n_samples == 0 {
            return Err(PredictorError::Dataset("no hay filas para entrenar".into()));
        }
        if self.params.n_estimators == 0 {
            return Err(PredictorError::Validation(
                "n_estimators debe ser mayor que cero".into(),
            ));
        }

        let n_features = x[0].len();
        if let Some(row) = x.iter().position(|r| r.len() != n_features) {
            return Err(PredictorError::Dataset(format!(
                "la fila {} tiene {} columnas, se esperaban {}",
                row,
                x[row].len(),
                n_features
            )));
        }

        let params = &self.params;
        let trees: Vec<RegressionTree> = (0..params.n_estimators)
            .into_par_iter()
            .map(|tree_idx| -> Result<RegressionTree> {
                let seed = params.random_state.wrapping_add(tree_idx as u64);
                let mut rng = ChaCha8Rng::seed_from_u64(seed);

                let sample_indices: Vec<usize> = if params.bootstrap {
                    (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect()
                } else {
                    (0..n_samples).collect()
                };

                let mut tree = RegressionTree::new()
                    .with_max_depth(params.max_depth)
                    .with_min_samples_split(params.min_samples_split)
                    .with_min_samples_leaf(params.min_samples_leaf);
                tree.fit(x, y, &sample_indices)?;
                Ok(tree)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        self.n_features = n_features;
        self.compute_feature_importances();

        Ok(self)
    }

    fn compute_feature_importances(&mut self) {
        let mut total = vec![0.0; self.n_features];
        for tree in &self.trees {
            for (acc, imp) in total.iter_mut().zip(tree.feature_importances()) {
                *acc += imp;
            }
        }

        let sum: f64 = total.iter().sum();
        if sum > 0.0 {
            for imp in &mut total {
                *imp /= sum;
            }
        }
        self.feature_importances = total;
    }

    /// Individual prediction of every tree for one row
    pub fn predict_per_tree(&self, row: &[f64]) -> Result<Vec<f64>> {
        if self.trees.is_empty() {
            return Err(PredictorError::ModelNotFound(
                "el modelo no ha sido entrenado".into(),
            ));
        }
        self.trees.iter().map(|tree| tree.predict(row)).collect()
    }

    /// Mean prediction across the ensemble for one row
    pub fn predict(&self, row: &[f64]) -> Result<f64> {
        let per_tree = self.predict_per_tree(row)?;
        Ok(per_tree.iter().sum::<f64>() / per_tree.len() as f64)
    }

    /// Mean predictions for many rows
    pub fn predict_batch(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>> {
        rows.par_iter().map(|row| self.predict(row)).collect()
    }

    /// Reject forests whose trees could index outside a row of `n_features`
    pub fn validate(&self) -> Result<()> {
        if self.trees.is_empty() {
            return Err(PredictorError::ModelNotFound(
                "el modelo no ha sido entrenado".into(),
            ));
        }
        self.trees
            .iter()
            .try_for_each(|tree| tree.validate(self.n_features))
    }

    pub fn params(&self) -> &ForestParams {
        &self.params
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn feature_importances(&self) -> &[f64] {
        &self.feature_importances
    }
}
