//! Server configuration

use anyhow::{Context, Result};
use grade_core::forest::ForestParams;
use grade_core::predictor::{ConfidenceThresholds, GradeThresholds, OutputConfig};
use grade_core::trainer::{TrainingConfig, DEFAULT_TEST_SIZE};
use grade_core::ServiceConfig;
use serde::Deserialize;
use std::path::PathBuf;

/// Server configuration, read from `GRADE_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Labeled CSV used for training
    #[serde(default = "default_dataset_path")]
    pub dataset_path: PathBuf,

    /// Where the trained artifact is stored
    #[serde(default = "default_model_path")]
    pub model_path: PathBuf,

    #[serde(default = "default_grade_low")]
    pub grade_low: f64,

    #[serde(default = "default_grade_high")]
    pub grade_high: f64,

    /// Largest per-tree spread still reported as high confidence
    #[serde(default = "default_confidence_high")]
    pub confidence_high: f64,

    #[serde(default = "default_confidence_medium")]
    pub confidence_medium: f64,

    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,

    /// Maximum tree depth; 0 means unlimited
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,

    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,

    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,

    #[serde(default = "default_random_state")]
    pub random_state: u64,

    #[serde(default = "default_test_size")]
    pub test_size: f64,

    /// Train at startup when no artifact can be loaded
    #[serde(default)]
    pub train_on_startup: bool,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8000
}

fn default_dataset_path() -> PathBuf {
    PathBuf::from("data/notas_dataset.csv")
}

fn default_model_path() -> PathBuf {
    PathBuf::from("ml_models/modelo_notas.json")
}

fn default_grade_low() -> f64 {
    GradeThresholds::default().low
}

fn default_grade_high() -> f64 {
    GradeThresholds::default().high
}

fn default_confidence_high() -> f64 {
    ConfidenceThresholds::default().high
}

fn default_confidence_medium() -> f64 {
    ConfidenceThresholds::default().medium
}

fn default_n_estimators() -> usize {
    ForestParams::default().n_estimators
}

fn default_max_depth() -> usize {
    ForestParams::default().max_depth.unwrap_or(0)
}

fn default_min_samples_split() -> usize {
    ForestParams::default().min_samples_split
}

fn default_min_samples_leaf() -> usize {
    ForestParams::default().min_samples_leaf
}

fn default_random_state() -> u64 {
    ForestParams::default().random_state
}

fn default_test_size() -> f64 {
    DEFAULT_TEST_SIZE
}

impl ServerConfig {
    /// Load configuration from the process environment
    pub fn load() -> Result<Self> {
        Self::from_env(None)
    }

    /// Load configuration from an explicit variable map instead of the process environment
    pub fn from_env(vars: Option<config::Map<String, String>>) -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("GRADE").source(vars))
            .build()
            .context("failed to read GRADE_* environment")?;

        config
            .try_deserialize()
            .context("invalid GRADE_* configuration")
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn service_config(&self) -> ServiceConfig {
        ServiceConfig {
            model_path: self.model_path.clone(),
            dataset_path: self.dataset_path.clone(),
            output: OutputConfig {
                grade: GradeThresholds {
                    low: self.grade_low,
                    high: self.grade_high,
                },
                confidence: ConfidenceThresholds {
                    high: self.confidence_high,
                    medium: self.confidence_medium,
                },
            },
            training: TrainingConfig {
                params: ForestParams {
                    n_estimators: self.n_estimators,
                    max_depth: (self.max_depth > 0).then_some(self.max_depth),
                    min_samples_split: self.min_samples_split,
                    min_samples_leaf: self.min_samples_leaf,
                    random_state: self.random_state,
                    ..Default::default()
                },
                test_size: self.test_size,
                force: false,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Option<config::Map<String, String>> {
        Some(
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        )
    }

    #[test]
    fn test_defaults() {
        let cfg = ServerConfig::from_env(vars(&[])).unwrap();
        assert_eq!(cfg.listen_addr(), "0.0.0.0:8000");
        assert_eq!(cfg.dataset_path, PathBuf::from("data/notas_dataset.csv"));
        assert_eq!(cfg.model_path, PathBuf::from("ml_models/modelo_notas.json"));
        assert_eq!(cfg.grade_low, 65.0);
        assert_eq!(cfg.confidence_medium, 10.0);
        assert_eq!(cfg.max_depth, 10);
        assert_eq!(cfg.service_config().training.params.max_depth, Some(10));
        assert!(!cfg.train_on_startup);
    }

    #[test]
    fn test_env_overrides() {
        let cfg = ServerConfig::from_env(vars(&[
            ("GRADE_PORT", "9100"),
            ("GRADE_CONFIDENCE_HIGH", "3.5"),
            ("GRADE_N_ESTIMATORS", "25"),
            ("GRADE_TRAIN_ON_STARTUP", "true"),
            ("GRADE_MODEL_PATH", "/tmp/modelo.json"),
        ]))
        .unwrap();

        assert_eq!(cfg.port, 9100);
        assert_eq!(cfg.confidence_high, 3.5);
        assert!(cfg.train_on_startup);

        let service = cfg.service_config();
        assert_eq!(service.training.params.n_estimators, 25);
        assert_eq!(service.output.confidence.high, 3.5);
        assert_eq!(service.model_path, PathBuf::from("/tmp/modelo.json"));
    }

    #[test]
    fn test_zero_max_depth_is_unlimited() {
        let cfg = ServerConfig::from_env(vars(&[("GRADE_MAX_DEPTH", "0")])).unwrap();
        assert_eq!(cfg.service_config().training.params.max_depth, None);

        let cfg = ServerConfig::from_env(vars(&[("GRADE_MAX_DEPTH", "4")])).unwrap();
        assert_eq!(cfg.service_config().training.params.max_depth, Some(4));
    }

    #[test]
    fn test_invalid_value_is_an_error() {
        assert!(ServerConfig::from_env(vars(&[("GRADE_PORT", "not-a-port")])).is_err());
    }
}
