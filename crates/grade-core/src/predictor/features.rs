//! Feature vector validation
//!
//! Parses untrusted request data into a [`FeatureVector`] once, at the edge.
//! Every field must be present, numeric (numeric strings are accepted) and
//! within [0,100]. All offending fields are reported together.

use crate::error::{PredictorError, Result};
use crate::models::{FeatureVector, FEATURE_COLUMNS, MAX_PERCENT, MIN_PERCENT, NUM_FEATURES};
use serde_json::Value;

/// Parse a JSON object into a validated feature vector
pub fn parse_features(data: &Value) -> Result<FeatureVector> {
    let object = data.as_object().ok_or_else(|| {
        PredictorError::Validation("se esperaba un objeto JSON con las 8 características".into())
    })?;

    let mut values = [0.0; NUM_FEATURES];
    let mut problems = Vec::new();

    for (i, name) in FEATURE_COLUMNS.iter().enumerate() {
        match object.get(*name) {
            None | Some(Value::Null) => problems.push(format!("{name}: campo requerido")),
            Some(raw) => match coerce_number(raw) {
                Some(v) if in_range(v) => values[i] = v,
                Some(v) => problems.push(format!(
                    "{name}: {v} fuera de rango ({MIN_PERCENT}-{MAX_PERCENT})"
                )),
                None => problems.push(format!("{name}: debe ser un número válido")),
            },
        }
    }

    if !problems.is_empty() {
        return Err(PredictorError::Validation(problems.join("; ")));
    }

    Ok(FeatureVector::from_array_unchecked(values))
}

/// Check an already-numeric vector ordered as [`FEATURE_COLUMNS`]
pub fn validate_array(values: &[f64; NUM_FEATURES]) -> Result<()> {
    let problems: Vec<String> = FEATURE_COLUMNS
        .iter()
        .zip(values.iter())
        .filter(|(_, v)| !in_range(**v))
        .map(|(name, v)| format!("{name}: {v} fuera de rango ({MIN_PERCENT}-{MAX_PERCENT})"))
        .collect();

    if problems.is_empty() {
        Ok(())
    } else {
        Err(PredictorError::Validation(problems.join("; ")))
    }
}

fn coerce_number(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn in_range(v: f64) -> bool {
    v.is_finite() && (MIN_PERCENT..=MAX_PERCENT).contains(&v)
}
