//! Model artifact persistence and the in-process model cache
//!
//! The artifact lives in a single JSON file. Loading is cached by file
//! modification time so repeated `load()` calls are cheap, and saving goes
//! through a temp file plus rename so readers never see a torn artifact.

use crate::error::{PredictorError, Result};
use crate::forest::RandomForestRegressor;
use crate::models::{feature_names, TrainingMetrics, NUM_FEATURES, TARGET_COLUMN};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Model type reported in metadata and health checks
pub const MODEL_TYPE: &str = "RandomForestRegressor";

/// Persisted form of a trained model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub model: RandomForestRegressor,
    /// Ordered feature names the model expects
    pub feature_names: Vec<String>,
    pub target: String,
    /// Unix timestamp of the training run
    pub trained_at: i64,
    #[serde(default)]
    pub metrics: Option<TrainingMetrics>,
}

impl ModelArtifact {
    pub fn new(model: RandomForestRegressor, metrics: Option<TrainingMetrics>) -> Self {
        Self {
            model,
            feature_names: feature_names(),
            target: TARGET_COLUMN.to_string(),
            trained_at: chrono::Utc::now().timestamp(),
            metrics,
        }
    }

    /// An artifact is usable only if it was trained on the expected features
    pub fn check_compatible(&self) -> Result<()> {
        let expected = feature_names();
        if self.feature_names != expected {
            return Err(PredictorError::ModelNotFound(format!(
                "el modelo espera las características {:?}, se requieren {:?}",
                self.feature_names, expected
            )));
        }
        if self.model.n_trees() == 0 || self.model.n_features() != NUM_FEATURES {
            return Err(PredictorError::ModelNotFound(
                "el artefacto no contiene un modelo entrenado compatible".into(),
            ));
        }
        self.model.validate()
    }
}

/// Model metadata returned by `info()`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub cargado: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mensaje: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tipo: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_estimators: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_depth: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_samples_split: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min_samples_leaf: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub random_state: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub n_features: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feature_importances: Option<Vec<f64>>,
    pub archivo_modelo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entrenado_en: Option<i64>,
}

impl ModelInfo {
    fn not_loaded(path: &Path) -> Self {
        Self {
            cargado: false,
            mensaje: Some("Modelo no cargado".to_string()),
            tipo: None,
            n_estimators: None,
            max_depth: None,
            min_samples_split: None,
            min_samples_leaf: None,
            random_state: None,
            n_features: None,
            feature_names: None,
            feature_importances: None,
            archivo_modelo: path.display().to_string(),
            checksum: None,
            entrenado_en: None,
        }
    }
}

struct CachedModel {
    artifact: Arc<ModelArtifact>,
    modified: Option<SystemTime>,
    checksum: String,
}

/// Loads, caches and saves the model artifact at a fixed path
pub struct ModelStore {
    path: PathBuf,
    cache: RwLock<Option<CachedModel>>,
}

impl ModelStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether an artifact file is present on disk
    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Whether an artifact is held in memory
    pub fn is_loaded(&self) -> bool {
        self.read_cache().is_some()
    }

    /// Load the artifact from disk, reusing the cache while the file is unchanged
    pub fn load(&self) -> Result<Arc<ModelArtifact>> {
        let metadata = match fs::metadata(&self.path) {
            Ok(m) => m,
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Model artifact not found");
                self.clear();
                return Err(PredictorError::ModelNotFound(format!(
                    "Archivo de modelo no encontrado: {}",
                    self.path.display()
                )));
            }
        };
        let modified = metadata.modified().ok();

        if let Some(cached) = self.read_cache().as_ref() {
            if modified.is_some() && cached.modified == modified {
                debug!(path = %self.path.display(), "Model artifact unchanged, using cache");
                return Ok(cached.artifact.clone());
            }
        }

        match self.read_artifact() {
            Ok((artifact, checksum)) => {
                let artifact = Arc::new(artifact);
                info!(
                    path = %self.path.display(),
                    checksum = %checksum,
                    n_estimators = artifact.model.n_trees(),
                    "Model loaded"
                );
                *self.write_cache() = Some(CachedModel {
                    artifact: artifact.clone(),
                    modified,
                    checksum,
                });
                Ok(artifact)
            }
            Err(e) => {
                warn!(path = %self.path.display(), error = %e, "Failed to load model artifact");
                self.clear();
                Err(e)
            }
        }
    }

    fn read_artifact(&self) -> Result<(ModelArtifact, String)> {
        let bytes = fs::read(&self.path).map_err(|e| {
            PredictorError::ModelNotFound(format!(
                "no se pudo leer {}: {}",
                self.path.display(),
                e
            ))
        })?;

        let artifact: ModelArtifact = serde_json::from_slice(&bytes).map_err(|e| {
            PredictorError::ModelNotFound(format!("artefacto de modelo corrupto: {}", e))
        })?;
        artifact.check_compatible()?;

        Ok((artifact, compute_checksum(&bytes)))
    }

    /// Atomically replace the artifact file and the cached model
    pub fn save(&self, artifact: ModelArtifact) -> Result<Arc<ModelArtifact>> {
        artifact.check_compatible()?;

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }

        let bytes = serde_json::to_vec(&artifact)?;
        let temp_path = self.temp_path();
        {
            let mut file = File::create(&temp_path)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
        }
        if let Err(e) = fs::rename(&temp_path, &self.path) {
            let _ = fs::remove_file(&temp_path);
            return Err(e.into());
        }

        let modified = fs::metadata(&self.path).and_then(|m| m.modified()).ok();
        let checksum = compute_checksum(&bytes);
        let artifact = Arc::new(artifact);

        info!(
            path = %self.path.display(),
            checksum = %checksum,
            size_bytes = bytes.len(),
            "Model saved"
        );

        *self.write_cache() = Some(CachedModel {
            artifact: artifact.clone(),
            modified,
            checksum,
        });

        Ok(artifact)
    }

    /// Metadata of the cached model; never fails
    pub fn info(&self) -> ModelInfo {
        let cache = self.read_cache();
        let Some(cached) = cache.as_ref() else {
            return ModelInfo::not_loaded(&self.path);
        };

        let artifact = &cached.artifact;
        let params = artifact.model.params();
        ModelInfo {
            cargado: true,
            mensaje: None,
            tipo: Some(MODEL_TYPE.to_string()),
            n_estimators: Some(artifact.model.n_trees()),
            max_depth: params.max_depth,
            min_samples_split: Some(params.min_samples_split),
            min_samples_leaf: Some(params.min_samples_leaf),
            random_state: Some(params.random_state),
            n_features: Some(artifact.model.n_features()),
            feature_names: Some(artifact.feature_names.clone()),
            feature_importances: Some(artifact.model.feature_importances().to_vec()),
            archivo_modelo: self.path.display().to_string(),
            checksum: Some(cached.checksum.clone()),
            entrenado_en: Some(artifact.trained_at),
        }
    }

    /// Drop the cached model
    pub fn clear(&self) {
        *self.write_cache() = None;
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "model".to_string());
        self.path.with_file_name(format!(".{}.tmp", file_name))
    }

    // A panic while holding the lock leaves the cached value intact, so
    // poisoning is ignored rather than propagated.
    fn read_cache(&self) -> RwLockReadGuard<'_, Option<CachedModel>> {
        self.cache.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write_cache(&self) -> RwLockWriteGuard<'_, Option<CachedModel>> {
        self.cache.write().unwrap_or_else(|e| e.into_inner())
    }
}

/// Compute SHA256 checksum of data
fn compute_checksum(data: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hex::encode(hasher.finalize())
}
