//! Core data models for the grade predictor

use serde::{Deserialize, Serialize};
use std::fmt;

/// Number of input features expected by the model
pub const NUM_FEATURES: usize = 8;

/// Feature columns, in the order the model consumes them
pub const FEATURE_COLUMNS: [&str; NUM_FEATURES] = [
    "prom_tareas_t1",
    "prom_examenes_t1",
    "prom_part_t1",
    "asistencia_t1",
    "prom_tareas_t2",
    "prom_examenes_t2",
    "prom_part_t2",
    "asistencia_t2",
];

/// Column holding the third-term grade in the training dataset
pub const TARGET_COLUMN: &str = "nota_final_t3";

/// Lower bound of every percentage field
pub const MIN_PERCENT: f64 = 0.0;

/// Upper bound of every percentage field
pub const MAX_PERCENT: f64 = 100.0;

/// Feature names as owned strings, used for artifact metadata
pub fn feature_names() -> Vec<String> {
    FEATURE_COLUMNS.iter().map(|s| s.to_string()).collect()
}

/// Validated first- and second-term performance of a student.
///
/// Only constructed through [`crate::predictor::parse_features`] or
/// [`FeatureVector::new`], both of which enforce the [0,100] range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct FeatureVector {
    pub prom_tareas_t1: f64,
    pub prom_examenes_t1: f64,
    pub prom_part_t1: f64,
    pub asistencia_t1: f64,
    pub prom_tareas_t2: f64,
    pub prom_examenes_t2: f64,
    pub prom_part_t2: f64,
    pub asistencia_t2: f64,
}

impl FeatureVector {
    /// Build from values ordered as [`FEATURE_COLUMNS`]
    pub fn new(values: [f64; NUM_FEATURES]) -> crate::Result<Self> {
        crate::predictor::validate_array(&values)?;
        Ok(Self::from_array_unchecked(values))
    }

    pub(crate) fn from_array_unchecked(values: [f64; NUM_FEATURES]) -> Self {
        Self {
            prom_tareas_t1: values[0],
            prom_examenes_t1: values[1],
            prom_part_t1: values[2],
            asistencia_t1: values[3],
            prom_tareas_t2: values[4],
            prom_examenes_t2: values[5],
            prom_part_t2: values[6],
            asistencia_t2: values[7],
        }
    }

    /// Ordered numeric vector matching the model's feature order
    pub fn to_array(&self) -> [f64; NUM_FEATURES] {
        [
            self.prom_tareas_t1,
            self.prom_examenes_t1,
            self.prom_part_t1,
            self.asistencia_t1,
            self.prom_tareas_t2,
            self.prom_examenes_t2,
            self.prom_part_t2,
            self.asistencia_t2,
        ]
    }
}

/// Performance band derived from the estimated grade
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    Bajo,
    Medio,
    Alto,
}

impl Classification {
    pub fn as_str(&self) -> &'static str {
        match self {
            Classification::Bajo => "bajo",
            Classification::Medio => "medio",
            Classification::Alto => "alto",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Qualitative confidence derived from the spread of per-tree predictions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    Alto,
    Medio,
    Bajo,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::Alto => "alto",
            ConfidenceLevel::Medio => "medio",
            ConfidenceLevel::Bajo => "bajo",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Prediction returned to API callers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    /// Estimated third-term grade, rounded to 2 decimals
    pub nota_estimada: f64,
    pub clasificacion: Classification,
    pub nivel_confianza: ConfidenceLevel,
    /// Standard deviation across the ensemble's trees, rounded to 2 decimals
    pub confianza_valor: f64,
    pub mensaje: String,
}

/// Evaluation of a freshly trained model on the held-out split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub mse: f64,
    pub r2: f64,
    pub n_estimators: usize,
    pub tamano_entrenamiento: usize,
    pub tamano_prueba: usize,
}

/// Round to `decimals` places, as reported to API callers
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_vector_order_matches_columns() {
        let values = [1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0];
        let fv = FeatureVector::new(values).unwrap();
        assert_eq!(fv.to_array(), values);

        let json = serde_json::to_value(fv).unwrap();
        for (i, name) in FEATURE_COLUMNS.iter().enumerate() {
            assert_eq!(json[name], values[i]);
        }
    }

    #[test]
    fn test_feature_vector_rejects_out_of_range() {
        let result = FeatureVector::new([50.0, 50.0, 50.0, 50.0, 50.0, 50.0, 50.0, 100.5]);
        assert!(result.is_err());
    }

    #[test]
    fn test_labels_serialize_lowercase() {
        assert_eq!(serde_json::to_value(Classification::Medio).unwrap(), "medio");
        assert_eq!(serde_json::to_value(ConfidenceLevel::Alto).unwrap(), "alto");
    }

    #[test]
    fn test_round_to() {
        assert_eq!(round_to(84.6789, 2), 84.68);
        assert_eq!(round_to(2.0049, 2), 2.0);
    }
}
