//! Grade predictor service
//!
//! Serves third-term grade predictions over HTTP, backed by a random forest
//! trained on the labeled dataset.

use anyhow::{Context, Result};
use grade_core::PredictionService;
use grade_server::{api, config::ServerConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const SERVICE_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!("Starting grade-server");

    let config = ServerConfig::load()?;
    info!(
        dataset = %config.dataset_path.display(),
        model = %config.model_path.display(),
        "Service configured"
    );

    let service = Arc::new(
        PredictionService::new(config.service_config()).context("invalid service configuration")?,
    );

    if service.load_model().is_err() {
        if config.train_on_startup {
            let trainer = service.clone();
            match tokio::task::spawn_blocking(move || trainer.train(false)).await? {
                Ok(report) => info!(mensaje = %report.mensaje, "Startup training finished"),
                Err(e) => warn!(error = %e, "Startup training failed, serving without a model"),
            }
        } else {
            warn!("No model loaded; POST /api/v1/modelo/entrenar/ to train one");
        }
    }

    let logger = service.logger().clone();
    let addr = config.listen_addr();
    logger.log_startup(SERVICE_VERSION, &addr, service.store().is_loaded());

    let state = Arc::new(api::AppState::new(service));
    api::serve(&addr, state, async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for shutdown signal");
        }
        logger.log_shutdown("SIGINT received");
    })
    .await?;

    info!("Shut down");
    Ok(())
}
