//! Labeled dataset loading
//!
//! Reads the training CSV, checks the required columns are present and
//! drops rows that are incomplete, non-numeric or outside [0,100].

use crate::error::{PredictorError, Result};
use crate::models::{FEATURE_COLUMNS, MAX_PERCENT, MIN_PERCENT, NUM_FEATURES, TARGET_COLUMN};
use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::{debug, info};

/// Cleaned rows of the 8 features plus the target grade
#[derive(Debug, Clone)]
pub struct LabeledDataset {
    pub features: Vec<Vec<f64>>,
    pub targets: Vec<f64>,
    /// Data rows in the file before cleaning
    pub total_rows: usize,
    pub columns: Vec<String>,
}

impl LabeledDataset {
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }
}

/// Dataset state as reported by the health check
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatasetStatus {
    pub existe: bool,
    pub filas_total: usize,
    pub filas_validas: usize,
    pub columnas: Vec<String>,
    pub columnas_requeridas: Vec<String>,
    pub archivo: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mensaje: Option<String>,
}

/// All columns a training file must contain
pub fn required_columns() -> Vec<String> {
    FEATURE_COLUMNS
        .iter()
        .chain(std::iter::once(&TARGET_COLUMN))
        .map(|s| s.to_string())
        .collect()
}

/// Load and clean the dataset at `path`
pub fn load_dataset(path: &Path) -> Result<LabeledDataset> {
    if !path.exists() {
        return Err(PredictorError::Dataset(format!(
            "Dataset no encontrado en {}",
            path.display()
        )));
    }

    let file = File::open(path).map_err(|e| {
        PredictorError::Dataset(format!("no se pudo abrir {}: {}", path.display(), e))
    })?;

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let headers = reader
        .headers()
        .map_err(|e| PredictorError::Dataset(format!("no se pudo leer la cabecera: {}", e)))?
        .clone();
    let columns: Vec<String> = headers.iter().map(str::to_string).collect();
    let positions = column_positions(&columns)?;

    let mut features = Vec::new();
    let mut targets = Vec::new();
    let mut total_rows = 0;

    for (row_idx, record) in reader.records().enumerate() {
        let record = record.map_err(|e| {
            PredictorError::Dataset(format!("no se pudo leer la fila {}: {}", row_idx + 1, e))
        })?;
        total_rows += 1;

        match clean_row(&record, &positions) {
            Some((row, target)) => {
                features.push(row);
                targets.push(target);
            }
            None => debug!(row = row_idx + 1, "Dropping invalid dataset row"),
        }
    }

    info!(
        path = %path.display(),
        total_rows = total_rows,
        valid_rows = targets.len(),
        "Dataset loaded"
    );

    Ok(LabeledDataset {
        features,
        targets,
        total_rows,
        columns,
    })
}

/// Describe the dataset without failing
pub fn inspect(path: &Path) -> DatasetStatus {
    let archivo = path.display().to_string();

    if !path.exists() {
        return DatasetStatus {
            existe: false,
            filas_total: 0,
            filas_validas: 0,
            columnas: Vec::new(),
            columnas_requeridas: required_columns(),
            mensaje: Some(format!("Dataset no encontrado en {}", archivo)),
            archivo,
        };
    }

    match load_dataset(path) {
        Ok(dataset) => DatasetStatus {
            existe: true,
            filas_total: dataset.total_rows,
            filas_validas: dataset.len(),
            columnas: dataset.columns,
            columnas_requeridas: required_columns(),
            archivo,
            mensaje: None,
        },
        Err(e) => DatasetStatus {
            existe: false,
            filas_total: 0,
            filas_validas: 0,
            columnas: Vec::new(),
            columnas_requeridas: required_columns(),
            archivo,
            mensaje: Some(e.to_string()),
        },
    }
}

/// Index of every feature column followed by the target column
fn column_positions(columns: &[String]) -> Result<[usize; NUM_FEATURES + 1]> {
    let mut positions = [0usize; NUM_FEATURES + 1];
    let mut missing = Vec::new();

    for (slot, name) in required_columns().iter().enumerate() {
        match columns.iter().position(|c| c == name) {
            Some(pos) => positions[slot] = pos,
            None => missing.push(name.clone()),
        }
    }

    if missing.is_empty() {
        Ok(positions)
    } else {
        Err(PredictorError::Dataset(format!(
            "Faltan columnas en el dataset: {}",
            missing.join(", ")
        )))
    }
}

fn clean_row(record: &StringRecord, positions: &[usize; NUM_FEATURES + 1]) -> Option<(Vec<f64>, f64)> {
    let mut values = Vec::with_capacity(NUM_FEATURES + 1);
    for &pos in positions {
        let value: f64 = record.get(pos)?.parse().ok()?;
        if !value.is_finite() || !(MIN_PERCENT..=MAX_PERCENT).contains(&value) {
            return None;
        }
        values.push(value);
    }
    let target = values.pop()?;
    Some((values, target))
}
