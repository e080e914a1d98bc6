//! HTTP API for prediction, model management, health checks and Prometheus metrics

use crate::error::{ApiError, Result};
use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use grade_core::{
    ComponentStatus, HealthReport, ModelInfo, PredictionResult, PredictionService, TrainingReport,
};
use prometheus::{Encoder, TextEncoder};
use serde::Deserialize;
use std::future::Future;
use std::sync::Arc;
use tracing::info;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
}

impl AppState {
    pub fn new(service: Arc<PredictionService>) -> Self {
        Self { service }
    }
}

/// Body of the training endpoint; an empty body means no forced retrain
#[derive(Debug, Default, Deserialize)]
pub struct TrainRequest {
    #[serde(default)]
    pub forzar_reentrenamiento: bool,
}

fn parse_json<T: serde::de::DeserializeOwned>(body: &[u8]) -> Result<T> {
    serde_json::from_slice(body)
        .map_err(|e| ApiError::BadRequest(format!("JSON inválido: {}", e)))
}

/// Run synchronous service work (file reads, CSV parsing, training) off the async workers
async fn blocking<T, F>(service: &Arc<PredictionService>, f: F) -> Result<T>
where
    F: FnOnce(&PredictionService) -> T + Send + 'static,
    T: Send + 'static,
{
    let service = service.clone();
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| ApiError::Internal(format!("blocking task failed: {}", e)))
}

async fn predict(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<PredictionResult>> {
    let value: serde_json::Value = parse_json(&body)?;
    let result = blocking(&state.service, move |service| service.predict_json(&value)).await??;
    Ok(Json(result))
}

async fn model_info(State(state): State<Arc<AppState>>) -> Result<Json<ModelInfo>> {
    let info = blocking(&state.service, |service| service.model_info()).await?;
    Ok(Json(info))
}

async fn train(State(state): State<Arc<AppState>>, body: Bytes) -> Result<Json<TrainingReport>> {
    let request: TrainRequest = if body.iter().all(u8::is_ascii_whitespace) {
        TrainRequest::default()
    } else {
        parse_json(&body)?
    };

    let force = request.forzar_reentrenamiento;
    let report = blocking(&state.service, move |service| service.train(force)).await??;
    Ok(Json(report))
}

/// Health report - 200 while operational, 503 when unhealthy
async fn health(State(state): State<Arc<AppState>>) -> Result<(StatusCode, Json<HealthReport>)> {
    let report = blocking(&state.service, |service| service.health()).await?;

    let status_code = match report.status {
        ComponentStatus::Healthy => StatusCode::OK,
        ComponentStatus::Degraded => StatusCode::OK, // Still answers requests
        ComponentStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };

    Ok((status_code, Json(report)))
}

/// Readiness check - 200 once a model is loaded, 503 otherwise
async fn readyz(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse> {
    let readiness = blocking(&state.service, |service| service.readiness()).await?;

    let status_code = if readiness.ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    Ok((status_code, Json(readiness)))
}

/// Prometheus metrics endpoint
async fn metrics() -> Result<impl IntoResponse> {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    encoder
        .encode(&metric_families, &mut buffer)
        .map_err(|e| ApiError::Internal(format!("metrics encoding failed: {}", e)))?;

    Ok((
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        buffer,
    ))
}

/// Create the API router; every API route also answers without the trailing slash
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/v1/predecir/", post(predict))
        .route("/api/v1/predecir", post(predict))
        .route("/api/v1/modelo/info/", get(model_info))
        .route("/api/v1/modelo/info", get(model_info))
        .route("/api/v1/modelo/entrenar/", post(train))
        .route("/api/v1/modelo/entrenar", post(train))
        .route("/api/v1/health/", get(health))
        .route("/api/v1/health", get(health))
        .route("/healthz", get(health))
        .route("/readyz", get(readyz))
        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Start the API server and run until `shutdown` resolves
pub async fn serve<F>(addr: &str, state: Arc<AppState>, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);

    info!(addr = %addr, "Starting API server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
