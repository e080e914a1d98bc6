//! Core library for the student grade predictor
//!
//! This crate provides the core functionality for:
//! - Input validation of the eight term-1/term-2 performance metrics
//! - Random forest training on the labeled dataset
//! - Model persistence and caching
//! - Third-term grade prediction with qualitative labels
//! - Health checks and observability

pub mod dataset;
pub mod error;
pub mod forest;
pub mod health;
pub mod models;
pub mod observability;
pub mod predictor;
pub mod service;
pub mod store;
pub mod testing;
pub mod trainer;

pub use error::{PredictorError, Result};
pub use health::{
    ComponentHealth, ComponentStatus, HealthReport, HealthReporter, ReadinessResponse,
};
pub use models::*;
pub use observability::{GradeMetrics, StructuredLogger};
pub use predictor::{parse_features, OutputConfig, Predictor};
pub use service::{PredictionService, ServiceConfig};
pub use store::{ModelArtifact, ModelInfo, ModelStore};
pub use trainer::{Trainer, TrainingConfig, TrainingReport};
