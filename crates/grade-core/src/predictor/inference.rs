//! Ensemble inference
//!
//! Turns a validated feature vector into a [`PredictionResult`]: the point
//! estimate is the mean of the per-tree predictions and the confidence value
//! is their population standard deviation.

use super::output::{OutputConfig, OutputFormatter};
use crate::error::{PredictorError, Result};
use crate::forest::RandomForestRegressor;
use crate::models::{FeatureVector, PredictionResult};
use crate::store::ModelArtifact;
use std::time::Instant;
use tracing::{debug, warn};

/// Maximum inference latency before warning
const MAX_INFERENCE_MS: u128 = 50;

/// Models that expose the individual predictions of their members
pub trait EnsembleRegressor: Send + Sync {
    fn member_predictions(&self, row: &[f64]) -> Result<Vec<f64>>;
}

impl EnsembleRegressor for RandomForestRegressor {
    fn member_predictions(&self, row: &[f64]) -> Result<Vec<f64>> {
        self.predict_per_tree(row)
    }
}

/// Point estimate and spread of an ensemble for one input
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EnsembleEstimate {
    pub mean: f64,
    pub std_dev: f64,
}

impl EnsembleEstimate {
    /// Mean and population standard deviation of member predictions
    pub fn from_members(members: &[f64]) -> Option<Self> {
        if members.is_empty() {
            return None;
        }
        let n = members.len() as f64;
        let mean = members.iter().sum::<f64>() / n;
        let variance = members.iter().map(|p| (p - mean).powi(2)).sum::<f64>() / n;
        Some(Self {
            mean,
            std_dev: variance.sqrt(),
        })
    }
}

/// Stateless grade predictor
pub struct Predictor {
    formatter: OutputFormatter,
}

impl Default for Predictor {
    fn default() -> Self {
        Self::new(OutputConfig::default())
    }
}

impl Predictor {
    pub fn new(config: OutputConfig) -> Self {
        Self {
            formatter: OutputFormatter::with_config(config),
        }
    }

    /// Predict with the loaded artifact, failing when none is available
    pub fn predict(
        &self,
        features: &FeatureVector,
        artifact: Option<&ModelArtifact>,
    ) -> Result<PredictionResult> {
        let artifact = artifact.ok_or_else(|| {
            PredictorError::ModelNotFound("debe entrenar el modelo primero".into())
        })?;
        artifact.check_compatible()?;
        self.predict_with(&artifact.model, features)
    }

    /// Predict with any ensemble model
    pub fn predict_with<M: EnsembleRegressor + ?Sized>(
        &self,
        model: &M,
        features: &FeatureVector,
    ) -> Result<PredictionResult> {
        let start = Instant::now();

        let members = model.member_predictions(&features.to_array())?;
        let estimate = EnsembleEstimate::from_members(&members).ok_or_else(|| {
            PredictorError::ModelNotFound("el modelo no contiene árboles".into())
        })?;

        let elapsed = start.elapsed();
        if elapsed.as_millis() > MAX_INFERENCE_MS {
            warn!(elapsed_ms = elapsed.as_millis(), "Inference exceeded {}ms target", MAX_INFERENCE_MS);
        } else {
            debug!(elapsed_us = elapsed.as_micros(), "Inference completed");
        }

        Ok(self.formatter.format(estimate.mean, estimate.std_dev))
    }
}
