//! Error types for the prediction core

use thiserror::Error;

/// Errors surfaced by validation, the model store, training and prediction.
///
/// All variants are local, recoverable conditions: none of them should take
/// the process down.
#[derive(Error, Debug)]
pub enum PredictorError {
    /// Malformed or out-of-range input
    #[error("Datos inválidos: {0}")]
    Validation(String),

    /// No usable model artifact is loaded
    #[error("Modelo no disponible: {0}")]
    ModelNotFound(String),

    /// Missing or insufficient training data
    #[error("Error en el dataset: {0}")]
    Dataset(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PredictorError {
    /// Stable machine-readable kind, used in logs and metrics labels
    pub fn kind(&self) -> &'static str {
        match self {
            PredictorError::Validation(_) => "validation",
            PredictorError::ModelNotFound(_) => "model_not_found",
            PredictorError::Dataset(_) => "dataset",
            PredictorError::Io(_) => "io",
            PredictorError::Serialization(_) => "serialization",
        }
    }
}

pub type Result<T> = std::result::Result<T, PredictorError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(PredictorError::Validation("x".into()).kind(), "validation");
        assert_eq!(PredictorError::ModelNotFound("x".into()).kind(), "model_not_found");
        assert_eq!(PredictorError::Dataset("x".into()).kind(), "dataset");
    }

    #[test]
    fn test_error_messages_carry_detail() {
        let err = PredictorError::Dataset("Dataset no encontrado".into());
        assert!(err.to_string().contains("Dataset no encontrado"));
    }
}
