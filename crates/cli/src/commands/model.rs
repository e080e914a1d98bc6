//! Model information and training commands

use anyhow::{Context, Result};
use grade_core::forest::ForestParams;
use grade_core::{ModelInfo, ModelStore, Trainer, TrainingConfig, TrainingReport, FEATURE_COLUMNS};
use std::path::PathBuf;
use tabled::Tabled;

use crate::client::ApiClient;
use crate::output::{
    format_grade, print_info, print_json, print_rows, print_success, print_warning, yes_no,
    FieldRow, OutputFormat,
};

/// Row for the feature importance table
#[derive(Tabled)]
struct ImportanceRow {
    #[tabled(rename = "Variable")]
    feature: String,
    #[tabled(rename = "Importancia")]
    importance: String,
}

/// Paths and hyperparameters for an in-process training run
#[derive(Debug, Clone)]
pub struct LocalTraining {
    pub dataset: PathBuf,
    pub model: PathBuf,
    pub params: ForestParams,
    pub test_size: f64,
}

pub async fn show_info(client: &ApiClient, format: OutputFormat) -> Result<()> {
    let info = client.model_info().await?;

    match format {
        OutputFormat::Json => print_json(&info)?,
        OutputFormat::Table => print_model_info(&info),
    }
    Ok(())
}

pub async fn train(client: &ApiClient, force: bool, format: OutputFormat) -> Result<()> {
    if force {
        print_info("Reentrenando el modelo en el servidor...");
    }
    let report = client.train(force).await?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_report(&report),
    }
    Ok(())
}

/// Train against local files without a running server; always retrains
pub async fn train_local(options: LocalTraining, format: OutputFormat) -> Result<()> {
    let config = TrainingConfig {
        params: options.params,
        test_size: options.test_size,
        force: true,
    };
    let dataset = options.dataset.clone();

    let report = tokio::task::spawn_blocking(move || {
        let store = ModelStore::new(options.model);
        Trainer::new(options.dataset).train(&store, &config)
    })
    .await
    .context("Training task panicked")?
    .with_context(|| format!("Training failed for dataset {}", dataset.display()))?;

    match format {
        OutputFormat::Json => print_json(&report)?,
        OutputFormat::Table => print_report(&report),
    }
    Ok(())
}

fn print_report(report: &TrainingReport) {
    if report.reentrenado {
        print_success(&report.mensaje);
    } else {
        print_info(&report.mensaje);
    }

    if let Some(metrics) = &report.metricas {
        print_rows(vec![
            FieldRow::new("MSE", format!("{:.4}", metrics.mse)),
            FieldRow::new("R²", format!("{:.4}", metrics.r2)),
            FieldRow::new("Árboles", metrics.n_estimators.to_string()),
            FieldRow::new("Filas de entrenamiento", metrics.tamano_entrenamiento.to_string()),
            FieldRow::new("Filas de prueba", metrics.tamano_prueba.to_string()),
        ]);
        println!();
    }

    print_model_info(&report.modelo);
}

fn print_model_info(info: &ModelInfo) {
    if !info.cargado {
        print_warning(info.mensaje.as_deref().unwrap_or("Modelo no cargado"));
        println!("Archivo: {}", info.archivo_modelo);
        return;
    }

    let optional = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
    print_rows(vec![
        FieldRow::new("Cargado", yes_no(info.cargado)),
        FieldRow::new("Tipo", optional(info.tipo.clone())),
        FieldRow::new("Árboles", optional(info.n_estimators.map(|v| v.to_string()))),
        FieldRow::new(
            "Profundidad máxima",
            info.max_depth
                .map(|v| v.to_string())
                .unwrap_or_else(|| "sin límite".to_string()),
        ),
        FieldRow::new(
            "Mín. muestras por división",
            optional(info.min_samples_split.map(|v| v.to_string())),
        ),
        FieldRow::new(
            "Mín. muestras por hoja",
            optional(info.min_samples_leaf.map(|v| v.to_string())),
        ),
        FieldRow::new("Semilla", optional(info.random_state.map(|v| v.to_string()))),
        FieldRow::new("Archivo", info.archivo_modelo.clone()),
        FieldRow::new("SHA-256", optional(info.checksum.clone())),
    ]);

    if let Some(importances) = &info.feature_importances {
        let names: Vec<String> = info
            .feature_names
            .clone()
            .unwrap_or_else(|| FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect());

        let rows: Vec<ImportanceRow> = names
            .into_iter()
            .zip(importances)
            .map(|(feature, importance)| ImportanceRow {
                feature,
                importance: format_grade(importance * 100.0) + "%",
            })
            .collect();

        println!();
        print_rows(rows);
    }
}
