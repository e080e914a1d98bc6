//! Integration tests for the grade predictor API endpoints

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use grade_core::forest::ForestParams;
use grade_core::testing::write_sample_dataset;
use grade_core::trainer::TrainingConfig;
use grade_core::{PredictionService, ServiceConfig};
use grade_server::api::{create_router, AppState};
use serde_json::{json, Value};
use std::path::Path;
use std::sync::Arc;
use tempfile::TempDir;
use tower::ServiceExt;

fn setup_test_app(dir: &Path, dataset_rows: usize) -> Router {
    let dataset_path = if dataset_rows > 0 {
        write_sample_dataset(dir, dataset_rows)
    } else {
        dir.join("missing.csv")
    };

    let service = PredictionService::new(ServiceConfig {
        model_path: dir.join("ml_models").join("modelo_notas.json"),
        dataset_path,
        training: TrainingConfig {
            params: ForestParams {
                n_estimators: 30,
                ..Default::default()
            },
            ..Default::default()
        },
        ..Default::default()
    })
    .unwrap();

    create_router(Arc::new(AppState::new(Arc::new(service))))
}

async fn send(app: &Router, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
    let body = match body {
        Some(v) => Body::from(v.to_string()),
        None => Body::empty(),
    };
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(body)
                .unwrap(),
        )
        .await
        .unwrap();

    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

fn student() -> Value {
    json!({
        "prom_tareas_t1": 85, "prom_examenes_t1": 78, "prom_part_t1": 92, "asistencia_t1": 95,
        "prom_tareas_t2": 87, "prom_examenes_t2": 82, "prom_part_t2": 88, "asistencia_t2": 93
    })
}

#[tokio::test]
async fn test_predict_returns_503_without_model() {
    let dir = TempDir::new().unwrap();
    let app = setup_test_app(dir.path(), 50);

    let (status, body) = send(&app, "POST", "/api/v1/predecir/", Some(student())).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert!(body["error"].as_str().unwrap().contains("Modelo no disponible"));
}

#[tokio::test]
async fn test_predict_rejects_out_of_range_field() {
    let dir = TempDir::new().unwrap();
    let app = setup_test_app(dir.path(), 50);

    let mut input = student();
    input["asistencia_t2"] = json!(130);
    let (status, body) = send(&app, "POST", "/api/v1/predecir/", Some(input)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("asistencia_t2"));
}

#[tokio::test]
async fn test_predict_rejects_malformed_json() {
    let dir = TempDir::new().unwrap();
    let app = setup_test_app(dir.path(), 50);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/v1/predecir/")
                .body(Body::from("{not json"))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_train_then_predict() {
    let dir = TempDir::new().unwrap();
    let app = setup_test_app(dir.path(), 50);

    let (status, report) = send(&app, "POST", "/api/v1/modelo/entrenar/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["reentrenado"], true);
    assert_eq!(report["mensaje"], "Modelo entrenado exitosamente");
    assert!(report["r2"].as_f64().unwrap() > 0.8);
    assert_eq!(report["tamano_entrenamiento"], 40);
    assert_eq!(report["tamano_prueba"], 10);
    assert_eq!(report["modelo"]["cargado"], true);

    let (status, prediction) = send(&app, "POST", "/api/v1/predecir", Some(student())).await;
    assert_eq!(status, StatusCode::OK);

    let nota = prediction["nota_estimada"].as_f64().unwrap();
    assert!((0.0..=100.0).contains(&nota));
    let expected = if nota < 65.0 {
        "bajo"
    } else if nota < 85.0 {
        "medio"
    } else {
        "alto"
    };
    assert_eq!(prediction["clasificacion"], expected);
    assert!(prediction["confianza_valor"].as_f64().unwrap() >= 0.0);
    assert!(prediction["mensaje"]
        .as_str()
        .unwrap()
        .contains("Se estima una nota de"));
}

#[tokio::test]
async fn test_train_without_force_reuses_existing_model() {
    let dir = TempDir::new().unwrap();
    let app = setup_test_app(dir.path(), 30);

    let (status, first) = send(&app, "POST", "/api/v1/modelo/entrenar/", None).await;
    assert_eq!(status, StatusCode::OK);

    let artifact = dir.path().join("ml_models").join("modelo_notas.json");
    let bytes_before = std::fs::read(&artifact).unwrap();

    let (status, second) = send(
        &app,
        "POST",
        "/api/v1/modelo/entrenar/",
        Some(json!({"forzar_reentrenamiento": false})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["reentrenado"], false);
    assert_eq!(second["mensaje"], "Modelo ya existe y fue cargado");
    assert_eq!(second["modelo"]["checksum"], first["modelo"]["checksum"]);
    assert_eq!(std::fs::read(&artifact).unwrap(), bytes_before);

    let (status, forced) = send(
        &app,
        "POST",
        "/api/v1/modelo/entrenar",
        Some(json!({"forzar_reentrenamiento": true})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(forced["reentrenado"], true);
}

#[tokio::test]
async fn test_train_returns_422_without_dataset() {
    let dir = TempDir::new().unwrap();
    let app = setup_test_app(dir.path(), 0);

    let (status, body) = send(&app, "POST", "/api/v1/modelo/entrenar/", None).await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn test_model_info_when_not_loaded() {
    let dir = TempDir::new().unwrap();
    let app = setup_test_app(dir.path(), 50);

    let (status, info) = send(&app, "GET", "/api/v1/modelo/info/", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["cargado"], false);
    assert_eq!(info["mensaje"], "Modelo no cargado");
}

#[tokio::test]
async fn test_model_info_after_training() {
    let dir = TempDir::new().unwrap();
    let app = setup_test_app(dir.path(), 30);
    send(&app, "POST", "/api/v1/modelo/entrenar/", None).await;

    let (status, info) = send(&app, "GET", "/api/v1/modelo/info", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(info["cargado"], true);
    assert_eq!(info["tipo"], "RandomForestRegressor");
    assert_eq!(info["n_estimators"], 30);
    assert_eq!(info["max_depth"], 10);
    assert_eq!(info["n_features"], 8);
    assert_eq!(info["feature_names"][0], "prom_tareas_t1");
    assert_eq!(info["checksum"].as_str().unwrap().len(), 64);
}

#[tokio::test]
async fn test_health_degraded_without_model() {
    let dir = TempDir::new().unwrap();
    let app = setup_test_app(dir.path(), 50);

    let (status, health) = send(&app, "GET", "/api/v1/health/", None).await;

    // Degraded still returns 200 (operational)
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");
    assert_eq!(health["modelo"]["cargado"], false);
    assert_eq!(health["modelo"]["tipo"], "RandomForestRegressor");
    assert_eq!(health["dataset"]["existe"], true);
    assert_eq!(health["dataset"]["filas"], 50);
    assert!(health["components"]["modelo"].is_object());
    assert!(health["components"]["dataset"].is_object());
    assert_eq!(health["endpoints"].as_array().unwrap().len(), 4);
}

#[tokio::test]
async fn test_health_returns_503_with_corrupt_artifact() {
    let dir = TempDir::new().unwrap();
    let app = setup_test_app(dir.path(), 50);

    let models_dir = dir.path().join("ml_models");
    std::fs::create_dir_all(&models_dir).unwrap();
    std::fs::write(models_dir.join("modelo_notas.json"), b"{\"broken\": true}").unwrap();

    let (status, health) = send(&app, "GET", "/healthz", None).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(health["status"], "unhealthy");
}

#[tokio::test]
async fn test_readyz_follows_model_state() {
    let dir = TempDir::new().unwrap();
    let app = setup_test_app(dir.path(), 30);

    let (status, readiness) = send(&app, "GET", "/readyz", None).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(readiness["ready"], false);

    send(&app, "POST", "/api/v1/modelo/entrenar/", None).await;

    let (status, readiness) = send(&app, "GET", "/readyz", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);
}

#[tokio::test]
async fn test_metrics_endpoint_returns_prometheus_format() {
    let dir = TempDir::new().unwrap();
    let app = setup_test_app(dir.path(), 30);

    send(&app, "POST", "/api/v1/modelo/entrenar/", None).await;
    send(&app, "POST", "/api/v1/predecir/", Some(student())).await;

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);

    let content_type = response.headers().get("content-type").unwrap();
    assert!(content_type.to_str().unwrap().contains("text/plain"));

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let metrics_text = String::from_utf8(body.to_vec()).unwrap();

    assert!(metrics_text.contains("grade_predictor_predictions_total"));
    assert!(metrics_text.contains("grade_predictor_prediction_latency_seconds_bucket"));
    assert!(metrics_text.contains("grade_predictor_training_duration_seconds_count"));
    assert!(metrics_text.contains("grade_predictor_model_loaded"));
}

#[tokio::test]
async fn test_health_answers_while_training_runs() {
    let dir = TempDir::new().unwrap();
    let app = setup_test_app(dir.path(), 50);

    let (trained, health, info) = tokio::join!(
        send(&app, "POST", "/api/v1/modelo/entrenar/", Some(json!({"forzar_reentrenamiento": true}))),
        send(&app, "GET", "/api/v1/health/", None),
        send(&app, "GET", "/api/v1/modelo/info/", None),
    );

    assert_eq!(trained.0, StatusCode::OK);
    assert_eq!(health.0, StatusCode::OK);
    assert_eq!(health.1["dataset"]["filas"], 50);
    assert_eq!(info.0, StatusCode::OK);
    assert!(info.1["cargado"].is_boolean());
}
