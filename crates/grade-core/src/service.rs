//! Prediction service
//!
//! The single shared handle behind the HTTP layer and the CLI. It owns the
//! [`ModelStore`], the [`Trainer`] and the [`Predictor`], and records
//! metrics and structured events for every operation.

use crate::error::Result;
use crate::health::{HealthReport, HealthReporter, ReadinessResponse};
use crate::models::{FeatureVector, PredictionResult};
use crate::observability::{GradeMetrics, StructuredLogger};
use crate::predictor::{parse_features, OutputConfig, Predictor};
use crate::store::{ModelArtifact, ModelInfo, ModelStore};
use crate::trainer::{Trainer, TrainingConfig, TrainingReport};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::debug;

/// Paths and tuning for a [`PredictionService`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    pub model_path: PathBuf,
    pub dataset_path: PathBuf,
    pub output: OutputConfig,
    pub training: TrainingConfig,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("ml_models/modelo_notas.json"),
            dataset_path: PathBuf::from("data/notas_dataset.csv"),
            output: OutputConfig::default(),
            training: TrainingConfig::default(),
        }
    }
}

pub struct PredictionService {
    store: ModelStore,
    trainer: Trainer,
    predictor: Predictor,
    training: TrainingConfig,
    health: HealthReporter,
    metrics: GradeMetrics,
    logger: StructuredLogger,
    // Serializes training runs; predictions never take it.
    train_lock: Mutex<()>,
}

impl PredictionService {
    pub fn new(config: ServiceConfig) -> Result<Self> {
        config.output.validate()?;
        config.training.validate()?;

        Ok(Self {
            store: ModelStore::new(config.model_path),
            trainer: Trainer::new(config.dataset_path),
            predictor: Predictor::new(config.output),
            training: config.training,
            health: HealthReporter::default(),
            metrics: GradeMetrics::new(),
            logger: StructuredLogger::new("grade-predictor"),
            train_lock: Mutex::new(()),
        })
    }

    pub fn store(&self) -> &ModelStore {
        &self.store
    }

    pub fn dataset_path(&self) -> &Path {
        self.trainer.dataset_path()
    }

    pub fn training_config(&self) -> &TrainingConfig {
        &self.training
    }

    pub fn logger(&self) -> &StructuredLogger {
        &self.logger
    }

    /// Load the artifact from disk
    pub fn load_model(&self) -> Result<Arc<ModelArtifact>> {
        let path = self.store.path().display().to_string();
        match self.store.load() {
            Ok(artifact) => {
                let checksum = self.store.info().checksum.unwrap_or_default();
                self.logger.log_model_loaded(&path, true, &checksum);
                self.metrics.set_model_loaded(true);
                Ok(artifact)
            }
            Err(e) => {
                self.logger.log_model_loaded(&path, false, &e.to_string());
                self.metrics.set_model_loaded(false);
                Err(e)
            }
        }
    }

    /// Validate an untrusted JSON body and predict
    pub fn predict_json(&self, body: &serde_json::Value) -> Result<PredictionResult> {
        match parse_features(body) {
            Ok(features) => self.predict(&features),
            Err(e) => {
                self.metrics.inc_prediction_errors(e.kind());
                Err(e)
            }
        }
    }

    pub fn predict(&self, features: &FeatureVector) -> Result<PredictionResult> {
        let start = Instant::now();

        // Picks up an artifact written since the last call; cheap when unchanged.
        let artifact = self.store.load().ok();
        self.metrics.set_model_loaded(artifact.is_some());

        let result = self.predictor.predict(features, artifact.as_deref());
        let elapsed = start.elapsed();

        match &result {
            Ok(prediction) => {
                self.metrics.inc_predictions();
                self.metrics.observe_prediction_latency(elapsed.as_secs_f64());
                self.logger.log_prediction(prediction, elapsed.as_micros());
            }
            Err(e) => self.metrics.inc_prediction_errors(e.kind()),
        }
        result
    }

    /// Train with the configured hyperparameters
    pub fn train(&self, force: bool) -> Result<TrainingReport> {
        let config = self.training.clone().forced(force);
        self.train_with(&config)
    }

    pub fn train_with(&self, config: &TrainingConfig) -> Result<TrainingReport> {
        let _guard = self
            .train_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let start = Instant::now();
        let result = self.trainer.train(&self.store, config);
        let elapsed = start.elapsed();

        match &result {
            Ok(report) if report.reentrenado => {
                self.metrics.inc_training_runs("trained");
                self.metrics.observe_training_duration(elapsed.as_secs_f64());
                self.logger
                    .log_training(report.metricas.as_ref(), elapsed.as_millis());
            }
            Ok(_) => {
                self.metrics.inc_training_runs("reused");
                self.logger.log_training(None, elapsed.as_millis());
            }
            Err(_) => self.metrics.inc_training_runs("failed"),
        }
        self.metrics.set_model_loaded(self.store.is_loaded());
        result
    }

    pub fn model_info(&self) -> ModelInfo {
        self.refresh();
        self.store.info()
    }

    pub fn health(&self) -> HealthReport {
        self.refresh();
        self.health.report(&self.store, self.trainer.dataset_path())
    }

    pub fn readiness(&self) -> ReadinessResponse {
        self.refresh();
        self.health.readiness(&self.store)
    }

    /// Sync the cache with the file on disk, ignoring failures
    fn refresh(&self) {
        if self.store.exists() {
            if let Err(e) = self.store.load() {
                debug!(error = %e, "Model refresh failed");
            }
        } else if self.store.is_loaded() {
            self.store.clear();
        }
        self.metrics.set_model_loaded(self.store.is_loaded());
    }
}

impl std::fmt::Debug for PredictionService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PredictionService")
            .field("model_path", &self.store.path())
            .field("dataset_path", &self.trainer.dataset_path())
            .field("loaded", &self.store.is_loaded())
            .finish()
    }
}
