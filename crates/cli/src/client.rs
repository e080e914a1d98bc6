//! API client for communicating with the grade predictor service

use anyhow::{Context, Result};
use grade_core::{FeatureVector, HealthReport, ModelInfo, PredictionResult, TrainingReport};
use reqwest::{Client, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use url::Url;

pub const PREDICT_PATH: &str = "api/v1/predecir/";
pub const MODEL_INFO_PATH: &str = "api/v1/modelo/info/";
pub const TRAIN_PATH: &str = "api/v1/modelo/entrenar/";
pub const HEALTH_PATH: &str = "api/v1/health/";

/// API client for the grade predictor
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        // Training a large forest can take a while
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        parse_response(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        parse_response(response).await
    }

    pub async fn predict(&self, features: &FeatureVector) -> Result<PredictionResult> {
        self.post(PREDICT_PATH, features).await
    }

    pub async fn model_info(&self) -> Result<ModelInfo> {
        self.get(MODEL_INFO_PATH).await
    }

    pub async fn train(&self, force: bool) -> Result<TrainingReport> {
        let request = TrainRequest {
            forzar_reentrenamiento: force,
        };
        self.post(TRAIN_PATH, &request).await
    }

    /// Fetch the health report; an unhealthy service still answers with a body
    pub async fn health(&self) -> Result<HealthReport> {
        let url = self.base_url.join(HEALTH_PATH).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        if response.status() == StatusCode::SERVICE_UNAVAILABLE {
            return response.json().await.context("Failed to parse response");
        }
        parse_response(response).await
    }
}

async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T> {
    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorResponse>(&body)
            .map(|e| e.error)
            .unwrap_or(body);
        anyhow::bail!("API error ({}): {}", status, message);
    }

    response.json().await.context("Failed to parse response")
}

// API request/response types

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainRequest {
    pub forzar_reentrenamiento: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}
