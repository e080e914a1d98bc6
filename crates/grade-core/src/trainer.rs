//! Model training
//!
//! Fits the random forest on the labeled dataset, evaluates it on a
//! deterministic held-out split and persists the artifact through the
//! [`ModelStore`]. An existing artifact is reused unless a retrain is forced.

use crate::dataset::load_dataset;
use crate::error::{PredictorError, Result};
use crate::forest::{ForestParams, RandomForestRegressor};
use crate::models::TrainingMetrics;
use crate::store::{ModelArtifact, ModelInfo, ModelStore};
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// Fewest valid rows that still allow a train/test split
pub const MIN_TRAINING_ROWS: usize = 2;

/// Default fraction of rows held out for evaluation
pub const DEFAULT_TEST_SIZE: f64 = 0.2;

/// Configuration for a training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingConfig {
    pub params: ForestParams,
    pub test_size: f64,
    /// Retrain even if an artifact already exists
    pub force: bool,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            params: ForestParams::default(),
            test_size: DEFAULT_TEST_SIZE,
            force: false,
        }
    }
}

impl TrainingConfig {
    pub fn forced(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.test_size > 0.0 && self.test_size < 1.0) {
            return Err(PredictorError::Validation(format!(
                "test_size debe estar entre 0 y 1, se recibió {}",
                self.test_size
            )));
        }
        if self.params.n_estimators == 0 {
            return Err(PredictorError::Validation(
                "n_estimators debe ser mayor que cero".into(),
            ));
        }
        Ok(())
    }
}

/// Result of a training request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingReport {
    pub mensaje: String,
    pub cargado: bool,
    /// False when an existing artifact was reused
    pub reentrenado: bool,
    #[serde(flatten)]
    pub metricas: Option<TrainingMetrics>,
    pub modelo: ModelInfo,
}

/// Trains models from the dataset at a fixed path
#[derive(Debug, Clone)]
pub struct Trainer {
    dataset_path: PathBuf,
}

impl Trainer {
    pub fn new(dataset_path: impl Into<PathBuf>) -> Self {
        Self {
            dataset_path: dataset_path.into(),
        }
    }

    pub fn dataset_path(&self) -> &Path {
        &self.dataset_path
    }

    /// Train (or reuse) the model and leave it loaded in `store`
    pub fn train(&self, store: &ModelStore, config: &TrainingConfig) -> Result<TrainingReport> {
        config.validate()?;

        if store.exists() && !config.force {
            match store.load() {
                Ok(_) => {
                    info!(path = %store.path().display(), "Model already exists, skipping training");
                    return Ok(TrainingReport {
                        mensaje: "Modelo ya existe y fue cargado".to_string(),
                        cargado: true,
                        reentrenado: false,
                        metricas: None,
                        modelo: store.info(),
                    });
                }
                Err(e) => {
                    warn!(error = %e, "Existing model unusable, retraining");
                }
            }
        }

        let start = Instant::now();
        let dataset = load_dataset(&self.dataset_path)?;
        if dataset.len() < MIN_TRAINING_ROWS {
            return Err(PredictorError::Dataset(format!(
                "se requieren al menos {} filas válidas, el dataset tiene {}",
                MIN_TRAINING_ROWS,
                dataset.len()
            )));
        }

        let (train_idx, test_idx) =
            train_test_split(dataset.len(), config.test_size, config.params.random_state);

        let x_train: Vec<Vec<f64>> = train_idx.iter().map(|&i| dataset.features[i].clone()).collect();
        let y_train: Vec<f64> = train_idx.iter().map(|&i| dataset.targets[i]).collect();
        let x_test: Vec<Vec<f64>> = test_idx.iter().map(|&i| dataset.features[i].clone()).collect();
        let y_test: Vec<f64> = test_idx.iter().map(|&i| dataset.targets[i]).collect();

        let mut model = RandomForestRegressor::new(config.params.clone());
        model.fit(&x_train, &y_train)?;

        let y_pred = model.predict_batch(&x_test)?;
        let metrics = TrainingMetrics {
            mse: mean_squared_error(&y_test, &y_pred),
            r2: r2_score(&y_test, &y_pred),
            n_estimators: model.n_trees(),
            tamano_entrenamiento: x_train.len(),
            tamano_prueba: x_test.len(),
        };

        store.save(ModelArtifact::new(model, Some(metrics.clone())))?;

        info!(
            mse = metrics.mse,
            r2 = metrics.r2,
            train_rows = metrics.tamano_entrenamiento,
            test_rows = metrics.tamano_prueba,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Model trained"
        );

        Ok(TrainingReport {
            mensaje: "Modelo entrenado exitosamente".to_string(),
            cargado: true,
            reentrenado: true,
            metricas: Some(metrics),
            modelo: store.info(),
        })
    }
}

/// Shuffle row indices with a seeded RNG and split off the test set.
///
/// The test set holds `ceil(n * test_size)` rows, kept between 1 and `n - 1`.
/// With fewer than two rows every row goes to training and the test set is empty.
pub fn train_test_split(n: usize, test_size: f64, seed: u64) -> (Vec<usize>, Vec<usize>) {
    let mut indices: Vec<usize> = (0..n).collect();
    if n < MIN_TRAINING_ROWS {
        return (indices, Vec::new());
    }
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_test = ((n as f64 * test_size).ceil() as usize).clamp(1, n - 1);
    let train = indices.split_off(n_test);
    (train, indices)
}

pub fn mean_squared_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum::<f64>()
        / y_true.len() as f64
}

/// Coefficient of determination; a constant target scores 1.0 only on exact predictions
pub fn r2_score(y_true: &[f64], y_pred: &[f64]) -> f64 {
    if y_true.is_empty() {
        return 0.0;
    }
    let mean = y_true.iter().sum::<f64>() / y_true.len() as f64;
    let ss_res: f64 = y_true.iter().zip(y_pred).map(|(t, p)| (t - p).powi(2)).sum();
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();

    if ss_tot == 0.0 {
        if ss_res == 0.0 {
            1.0
        } else {
            0.0
        }
    } else {
        1.0 - ss_res / ss_tot
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::write_sample_dataset;
    use std::fs;
    use tempfile::TempDir;

    fn quick_config() -> TrainingConfig {
        TrainingConfig {
            params: ForestParams {
                n_estimators: 10,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_split_sizes_and_disjointness() {
        let (train, test) = train_test_split(50, 0.2, 42);
        assert_eq!(test.len(), 10);
        assert_eq!(train.len(), 40);

        let mut all: Vec<usize> = train.iter().chain(&test).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_is_deterministic_per_seed() {
        assert_eq!(train_test_split(30, 0.2, 7), train_test_split(30, 0.2, 7));
        assert_ne!(train_test_split(30, 0.2, 7), train_test_split(30, 0.2, 8));
    }

    #[test]
    fn test_split_keeps_both_sides_non_empty() {
        let (train, test) = train_test_split(2, 0.2, 1);
        assert_eq!((train.len(), test.len()), (1, 1));

        let (train, test) = train_test_split(5, 0.95, 1);
        assert_eq!((train.len(), test.len()), (1, 4));
    }

    #[test]
    fn test_split_of_tiny_input_has_empty_test_set() {
        assert_eq!(train_test_split(0, 0.2, 1), (Vec::new(), Vec::new()));
        assert_eq!(train_test_split(1, 0.2, 1), (vec![0], Vec::new()));
    }

    #[test]
    fn test_metrics() {
        assert_eq!(mean_squared_error(&[1.0, 2.0], &[1.0, 4.0]), 2.0);
        assert_eq!(r2_score(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0]), 1.0);
        assert_eq!(r2_score(&[5.0, 5.0], &[5.0, 5.0]), 1.0);
        assert_eq!(r2_score(&[5.0, 5.0], &[4.0, 5.0]), 0.0);
        assert!(r2_score(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]) < 0.0);
    }

    #[test]
    fn test_missing_dataset_is_dataset_error() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path().join("modelo.json"));
        let trainer = Trainer::new(dir.path().join("missing.csv"));

        let err = trainer.train(&store, &quick_config()).unwrap_err();
        assert!(matches!(err, PredictorError::Dataset(_)));
        assert!(!store.exists());
    }

    #[test]
    fn test_too_few_rows_is_dataset_error() {
        let dir = TempDir::new().unwrap();
        let path = write_sample_dataset(dir.path(), 1);
        let store = ModelStore::new(dir.path().join("modelo.json"));

        let err = Trainer::new(path).train(&store, &quick_config()).unwrap_err();
        assert!(matches!(err, PredictorError::Dataset(_)));
    }

    #[test]
    fn test_header_only_dataset_is_dataset_error() {
        let dir = TempDir::new().unwrap();
        let path = write_sample_dataset(dir.path(), 0);
        let store = ModelStore::new(dir.path().join("modelo.json"));

        let err = Trainer::new(path).train(&store, &quick_config()).unwrap_err();
        assert!(matches!(err, PredictorError::Dataset(_)));
    }

    #[test]
    fn test_training_persists_and_loads() {
        let dir = TempDir::new().unwrap();
        let path = write_sample_dataset(dir.path(), 50);
        let store = ModelStore::new(dir.path().join("ml_models").join("modelo.json"));

        let report = Trainer::new(path).train(&store, &quick_config()).unwrap();
        assert!(report.reentrenado);
        assert!(report.cargado);
        assert!(store.exists());
        assert!(store.is_loaded());

        let metrics = report.metricas.unwrap();
        assert_eq!(metrics.tamano_entrenamiento, 40);
        assert_eq!(metrics.tamano_prueba, 10);
        assert_eq!(metrics.n_estimators, 10);
        assert_eq!(report.modelo.n_estimators, Some(10));
    }

    #[test]
    fn test_existing_model_reused_without_write() {
        let dir = TempDir::new().unwrap();
        let path = write_sample_dataset(dir.path(), 50);
        let model_path = dir.path().join("modelo.json");
        let trainer = Trainer::new(path);

        trainer.train(&ModelStore::new(&model_path), &quick_config()).unwrap();
        let bytes_before = fs::read(&model_path).unwrap();
        let mtime_before = fs::metadata(&model_path).unwrap().modified().unwrap();

        let store = ModelStore::new(&model_path);
        let config = TrainingConfig {
            params: ForestParams {
                n_estimators: 3,
                random_state: 7,
                ..Default::default()
            },
            ..Default::default()
        };
        let report = trainer.train(&store, &config).unwrap();

        assert!(!report.reentrenado);
        assert!(report.metricas.is_none());
        assert_eq!(report.mensaje, "Modelo ya existe y fue cargado");
        assert_eq!(report.modelo.n_estimators, Some(10));
        assert_eq!(fs::read(&model_path).unwrap(), bytes_before);
        assert_eq!(fs::metadata(&model_path).unwrap().modified().unwrap(), mtime_before);
    }

    #[test]
    fn test_forced_retrain_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = write_sample_dataset(dir.path(), 50);
        let store = ModelStore::new(dir.path().join("modelo.json"));
        let trainer = Trainer::new(path);

        trainer.train(&store, &quick_config()).unwrap();
        let checksum_before = store.info().checksum;

        let config = TrainingConfig {
            params: ForestParams {
                n_estimators: 4,
                max_depth: Some(3),
                ..Default::default()
            },
            ..Default::default()
        }
        .forced(true);
        let report = trainer.train(&store, &config).unwrap();

        assert!(report.reentrenado);
        let info = store.info();
        assert_eq!(info.n_estimators, Some(4));
        assert_eq!(info.max_depth, Some(3));
        assert_ne!(info.checksum, checksum_before);
    }

    #[test]
    fn test_corrupt_existing_model_triggers_training() {
        let dir = TempDir::new().unwrap();
        let path = write_sample_dataset(dir.path(), 20);
        let model_path = dir.path().join("modelo.json");
        fs::write(&model_path, b"garbage").unwrap();

        let store = ModelStore::new(&model_path);
        let report = Trainer::new(path).train(&store, &quick_config()).unwrap();
        assert!(report.reentrenado);
        assert!(store.load().is_ok());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path().join("modelo.json"));
        let config = TrainingConfig {
            test_size: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            Trainer::new(dir.path().join("x.csv")).train(&store, &config),
            Err(PredictorError::Validation(_))
        ));
    }
}
