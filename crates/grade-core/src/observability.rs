//! Observability infrastructure for the grade predictor
//!
//! Provides:
//! - Prometheus metrics (prediction latency, training duration, request counters, model state)
//! - Structured JSON logging with tracing

use crate::models::{PredictionResult, TrainingMetrics};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for prediction latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.0001, 0.0005, 0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0,
];

/// Histogram buckets for training duration (in seconds)
const TRAINING_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<GradeMetricsInner> = OnceLock::new();

struct GradeMetricsInner {
    prediction_latency_seconds: Histogram,
    training_duration_seconds: Histogram,
    predictions_total: IntCounter,
    prediction_errors_total: IntCounterVec,
    training_runs_total: IntCounterVec,
    model_loaded: IntGauge,
}

impl GradeMetricsInner {
    fn new() -> Self {
        Self {
            prediction_latency_seconds: register_histogram!(
                "grade_predictor_prediction_latency_seconds",
                "Time spent validating input and running ensemble inference",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register prediction_latency_seconds"),

            training_duration_seconds: register_histogram!(
                "grade_predictor_training_duration_seconds",
                "Time spent loading the dataset and fitting the forest",
                TRAINING_BUCKETS.to_vec()
            )
            .expect("Failed to register training_duration_seconds"),

            predictions_total: register_int_counter!(
                "grade_predictor_predictions_total",
                "Total number of predictions served"
            )
            .expect("Failed to register predictions_total"),

            prediction_errors_total: register_int_counter_vec!(
                "grade_predictor_prediction_errors_total",
                "Total number of failed prediction requests by error kind",
                &["kind"]
            )
            .expect("Failed to register prediction_errors_total"),

            training_runs_total: register_int_counter_vec!(
                "grade_predictor_training_runs_total",
                "Training requests by outcome",
                &["outcome"]
            )
            .expect("Failed to register training_runs_total"),

            model_loaded: register_int_gauge!(
                "grade_predictor_model_loaded",
                "1 when a model artifact is loaded, 0 otherwise"
            )
            .expect("Failed to register model_loaded"),
        }
    }
}

/// Handle to the global Prometheus metrics.
///
/// Clones share the same underlying metrics.
#[derive(Clone)]
pub struct GradeMetrics {
    _private: (),
}

impl Default for GradeMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl GradeMetrics {
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(GradeMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &GradeMetricsInner {
        GLOBAL_METRICS.get_or_init(GradeMetricsInner::new)
    }

    pub fn observe_prediction_latency(&self, duration_secs: f64) {
        self.inner().prediction_latency_seconds.observe(duration_secs);
    }

    pub fn observe_training_duration(&self, duration_secs: f64) {
        self.inner().training_duration_seconds.observe(duration_secs);
    }

    pub fn inc_predictions(&self) {
        self.inner().predictions_total.inc();
    }

    /// Count a failed prediction under its error kind
    pub fn inc_prediction_errors(&self, kind: &str) {
        self.inner()
            .prediction_errors_total
            .with_label_values(&[kind])
            .inc();
    }

    /// Count a training request; `outcome` is "trained", "reused" or "failed"
    pub fn inc_training_runs(&self, outcome: &str) {
        self.inner()
            .training_runs_total
            .with_label_values(&[outcome])
            .inc();
    }

    pub fn set_model_loaded(&self, loaded: bool) {
        self.inner().model_loaded.set(i64::from(loaded));
    }
}

/// Structured logger for service events
///
/// Every record carries an `event` tag so log pipelines can filter on it.
#[derive(Clone)]
pub struct StructuredLogger {
    service: String,
}

impl StructuredLogger {
    pub fn new(service: impl Into<String>) -> Self {
        Self {
            service: service.into(),
        }
    }

    /// Log a prediction event
    pub fn log_prediction(&self, result: &PredictionResult, elapsed_us: u128) {
        info!(
            event = "prediction_generated",
            service = %self.service,
            nota_estimada = result.nota_estimada,
            clasificacion = %result.clasificacion,
            nivel_confianza = %result.nivel_confianza,
            confianza_valor = result.confianza_valor,
            elapsed_us = elapsed_us as u64,
            "Generated grade prediction"
        );
    }

    /// Log the outcome of a training request
    pub fn log_training(&self, metrics: Option<&TrainingMetrics>, elapsed_ms: u128) {
        match metrics {
            Some(m) => info!(
                event = "model_trained",
                service = %self.service,
                mse = m.mse,
                r2 = m.r2,
                n_estimators = m.n_estimators,
                train_rows = m.tamano_entrenamiento,
                test_rows = m.tamano_prueba,
                elapsed_ms = elapsed_ms as u64,
                "Model trained and persisted"
            ),
            None => info!(
                event = "model_trained",
                service = %self.service,
                reused = true,
                elapsed_ms = elapsed_ms as u64,
                "Existing model reused, no training performed"
            ),
        }
    }

    /// Log a model load attempt
    pub fn log_model_loaded(&self, path: &str, success: bool, detail: &str) {
        if success {
            info!(
                event = "model_loaded",
                service = %self.service,
                path = %path,
                checksum = %detail,
                "Model artifact loaded"
            );
        } else {
            warn!(
                event = "model_load_failed",
                service = %self.service,
                path = %path,
                error = %detail,
                "Model artifact could not be loaded"
            );
        }
    }

    pub fn log_startup(&self, version: &str, listen_addr: &str, model_loaded: bool) {
        info!(
            event = "service_started",
            service = %self.service,
            version = %version,
            listen_addr = %listen_addr,
            model_loaded = model_loaded,
            "Grade predictor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "service_shutdown",
            service = %self.service,
            reason = %reason,
            "Grade predictor shutting down"
        );
    }
}
