//! HTTP error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use grade_core::PredictorError;
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error(transparent)]
    Predictor(#[from] PredictorError),

    #[error("Solicitud inválida: {0}")]
    BadRequest(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Predictor(PredictorError::Validation(_)) | ApiError::BadRequest(_) => {
                StatusCode::BAD_REQUEST
            }
            ApiError::Predictor(PredictorError::ModelNotFound(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Predictor(PredictorError::Dataset(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Predictor(_) | ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(detail = %self, "Internal server error");
            "Error interno del servidor".to_string()
        } else {
            tracing::warn!(status = status.as_u16(), detail = %self, "Request failed");
            self.to_string()
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;
