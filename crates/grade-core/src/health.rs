//! Health reporting for the grade predictor
//!
//! Combines the model store state and the dataset state into a status
//! payload for the health endpoint and the liveness/readiness probes.

use crate::dataset::{self, DatasetStatus};
use crate::store::{ModelStore, MODEL_TYPE};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// Public API routes, listed in the health payload
pub const API_ENDPOINTS: [&str; 4] = [
    "/api/v1/predecir/",
    "/api/v1/modelo/info/",
    "/api/v1/modelo/entrenar/",
    "/api/v1/health/",
];

/// Component names for health tracking
pub mod components {
    pub const MODEL: &str = "modelo";
    pub const DATASET: &str = "dataset";
}

/// Health status of a component
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComponentStatus {
    /// Component is functioning normally
    Healthy,
    /// Component is missing or incomplete but the service still answers
    Degraded,
    /// Component has failed
    Unhealthy,
}

impl ComponentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ComponentStatus::Healthy => "healthy",
            ComponentStatus::Degraded => "degraded",
            ComponentStatus::Unhealthy => "unhealthy",
        }
    }

    /// Returns true if the component is at least partially operational
    pub fn is_operational(&self) -> bool {
        matches!(self, ComponentStatus::Healthy | ComponentStatus::Degraded)
    }
}

/// Information about a component's health
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealth {
    pub status: ComponentStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub last_check_timestamp: i64,
}

impl ComponentHealth {
    pub fn healthy() -> Self {
        Self {
            status: ComponentStatus::Healthy,
            message: None,
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn degraded(message: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Degraded,
            message: Some(message.into()),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            status: ComponentStatus::Unhealthy,
            message: Some(message.into()),
            last_check_timestamp: chrono::Utc::now().timestamp(),
        }
    }
}

/// Overall status from component statuses: any unhealthy wins, then any degraded
pub fn compute_status(components: &HashMap<String, ComponentHealth>) -> ComponentStatus {
    let mut has_degraded = false;

    for health in components.values() {
        match health.status {
            ComponentStatus::Unhealthy => return ComponentStatus::Unhealthy,
            ComponentStatus::Degraded => has_degraded = true,
            ComponentStatus::Healthy => {}
        }
    }

    if has_degraded {
        ComponentStatus::Degraded
    } else {
        ComponentStatus::Healthy
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSummary {
    pub cargado: bool,
    pub tipo: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetSummary {
    pub existe: bool,
    pub filas: usize,
}

/// Payload of the health endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: ComponentStatus,
    pub timestamp: String,
    pub version: String,
    pub modelo: ModelSummary,
    pub dataset: DatasetSummary,
    pub components: HashMap<String, ComponentHealth>,
    pub endpoints: Vec<String>,
}

/// Readiness response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReadinessResponse {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Builds health payloads; never fails
#[derive(Debug, Clone)]
pub struct HealthReporter {
    version: String,
}

impl Default for HealthReporter {
    fn default() -> Self {
        Self::new(env!("CARGO_PKG_VERSION"))
    }
}

impl HealthReporter {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            version: version.into(),
        }
    }

    pub fn report(&self, store: &ModelStore, dataset_path: &Path) -> HealthReport {
        let info = store.info();
        let dataset_status = dataset::inspect(dataset_path);

        let mut components = HashMap::new();
        components.insert(
            components::MODEL.to_string(),
            model_health(info.cargado, store.exists()),
        );
        components.insert(
            components::DATASET.to_string(),
            dataset_health(&dataset_status),
        );

        HealthReport {
            status: compute_status(&components),
            timestamp: chrono::Utc::now().to_rfc3339(),
            version: self.version.clone(),
            modelo: ModelSummary {
                cargado: info.cargado,
                tipo: MODEL_TYPE.to_string(),
            },
            dataset: DatasetSummary {
                existe: dataset_status.existe,
                filas: dataset_status.filas_validas,
            },
            components,
            endpoints: API_ENDPOINTS.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Ready only once a model is held in memory
    pub fn readiness(&self, store: &ModelStore) -> ReadinessResponse {
        if store.is_loaded() {
            ReadinessResponse {
                ready: true,
                reason: None,
            }
        } else {
            ReadinessResponse {
                ready: false,
                reason: Some("Modelo no cargado".to_string()),
            }
        }
    }
}

fn model_health(loaded: bool, file_present: bool) -> ComponentHealth {
    match (loaded, file_present) {
        (true, _) => ComponentHealth::healthy(),
        // The caller tries a load first, so a present but unloaded file is broken.
        (false, true) => ComponentHealth::unhealthy("Artefacto de modelo inválido"),
        (false, false) => ComponentHealth::degraded("Modelo no cargado"),
    }
}

fn dataset_health(status: &DatasetStatus) -> ComponentHealth {
    if !status.existe {
        let msg = status
            .mensaje
            .clone()
            .unwrap_or_else(|| "Dataset no disponible".to_string());
        return ComponentHealth::degraded(msg);
    }
    if status.filas_validas < crate::trainer::MIN_TRAINING_ROWS {
        return ComponentHealth::degraded(format!(
            "Dataset con solo {} filas válidas",
            status.filas_validas
        ));
    }
    ComponentHealth::healthy()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::write_sample_dataset;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_compute_status() {
        let mut components = HashMap::new();
        assert_eq!(compute_status(&components), ComponentStatus::Healthy);

        components.insert("a".to_string(), ComponentHealth::healthy());
        components.insert("b".to_string(), ComponentHealth::degraded("slow"));
        assert_eq!(compute_status(&components), ComponentStatus::Degraded);

        components.insert("c".to_string(), ComponentHealth::unhealthy("down"));
        assert_eq!(compute_status(&components), ComponentStatus::Unhealthy);
    }

    #[test]
    fn test_report_without_model_or_dataset_is_degraded() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path().join("modelo.json"));
        let report = HealthReporter::default().report(&store, &dir.path().join("missing.csv"));

        assert_eq!(report.status, ComponentStatus::Degraded);
        assert!(!report.modelo.cargado);
        assert_eq!(report.modelo.tipo, "RandomForestRegressor");
        assert!(!report.dataset.existe);
        assert_eq!(report.dataset.filas, 0);
        assert_eq!(
            report.components[components::MODEL].message.as_deref(),
            Some("Modelo no cargado")
        );
        assert_eq!(report.endpoints.len(), 4);
    }

    #[test]
    fn test_report_counts_dataset_rows() {
        let dir = TempDir::new().unwrap();
        let csv = write_sample_dataset(dir.path(), 12);
        let store = ModelStore::new(dir.path().join("modelo.json"));
        let report = HealthReporter::new("1.2.3").report(&store, &csv);

        assert!(report.dataset.existe);
        assert_eq!(report.dataset.filas, 12);
        assert_eq!(
            report.components[components::DATASET].status,
            ComponentStatus::Healthy
        );
        assert_eq!(report.version, "1.2.3");
    }

    #[test]
    fn test_unloadable_artifact_is_unhealthy() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("modelo.json");
        fs::write(&path, b"not json").unwrap();
        let store = ModelStore::new(&path);

        let report = HealthReporter::default().report(&store, &dir.path().join("missing.csv"));
        assert_eq!(report.status, ComponentStatus::Unhealthy);
        assert!(!report.status.is_operational());
    }

    #[test]
    fn test_readiness_requires_loaded_model() {
        let dir = TempDir::new().unwrap();
        let store = ModelStore::new(dir.path().join("modelo.json"));
        let readiness = HealthReporter::default().readiness(&store);

        assert!(!readiness.ready);
        assert!(readiness.reason.is_some());
    }
}
