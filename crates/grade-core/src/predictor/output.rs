//! Prediction output formatting
//!
//! Maps the ensemble's point estimate and spread to qualitative labels and
//! a human-readable message. All cutoffs come from [`OutputConfig`].

use crate::error::{PredictorError, Result};
use crate::models::{
    round_to, Classification, ConfidenceLevel, PredictionResult, MAX_PERCENT, MIN_PERCENT,
};
use serde::{Deserialize, Serialize};

/// Grades below this are classified as "bajo"
pub const THRESHOLD_LOW: f64 = 65.0;

/// Grades at or above this are classified as "alto"
pub const THRESHOLD_HIGH: f64 = 85.0;

/// Spread at or below this gives "alto" confidence
pub const CONFIDENCE_HIGH_THRESHOLD: f64 = 5.0;

/// Spread at or below this (and above the high cutoff) gives "medio" confidence
pub const CONFIDENCE_MEDIUM_THRESHOLD: f64 = 10.0;

/// Grade cutoffs for the classification label
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeThresholds {
    pub low: f64,
    pub high: f64,
}

impl Default for GradeThresholds {
    fn default() -> Self {
        Self {
            low: THRESHOLD_LOW,
            high: THRESHOLD_HIGH,
        }
    }
}

/// Spread cutoffs for the confidence label
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceThresholds {
    pub high: f64,
    pub medium: f64,
}

impl Default for ConfidenceThresholds {
    fn default() -> Self {
        Self {
            high: CONFIDENCE_HIGH_THRESHOLD,
            medium: CONFIDENCE_MEDIUM_THRESHOLD,
        }
    }
}

/// Configuration for output formatting
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct OutputConfig {
    pub grade: GradeThresholds,
    pub confidence: ConfidenceThresholds,
}

impl OutputConfig {
    /// Reject cutoffs that would make a label unreachable
    pub fn validate(&self) -> Result<()> {
        let g = &self.grade;
        if !(MIN_PERCENT..=MAX_PERCENT).contains(&g.low)
            || !(MIN_PERCENT..=MAX_PERCENT).contains(&g.high)
            || g.low > g.high
        {
            return Err(PredictorError::Validation(format!(
                "umbrales de nota inválidos: bajo={} alto={}",
                g.low, g.high
            )));
        }

        let c = &self.confidence;
        if c.high < 0.0 || c.medium < c.high {
            return Err(PredictorError::Validation(format!(
                "umbrales de confianza inválidos: alto={} medio={}",
                c.high, c.medium
            )));
        }
        Ok(())
    }
}

/// Formats raw ensemble output into a [`PredictionResult`]
#[derive(Debug, Clone, Default)]
pub struct OutputFormatter {
    config: OutputConfig,
}

impl OutputFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: OutputConfig) -> Self {
        Self { config }
    }

    /// Build the full response from the point estimate and the per-tree spread
    pub fn format(&self, estimate: f64, spread: f64) -> PredictionResult {
        let nota = estimate.clamp(MIN_PERCENT, MAX_PERCENT);
        let clasificacion = self.classify(nota);
        let nivel_confianza = self.confidence_level(spread);
        let mensaje = message(nota, clasificacion, nivel_confianza);

        PredictionResult {
            nota_estimada: round_to(nota, 2),
            clasificacion,
            nivel_confianza,
            confianza_valor: round_to(spread, 2),
            mensaje,
        }
    }

    pub fn classify(&self, nota: f64) -> Classification {
        if nota < self.config.grade.low {
            Classification::Bajo
        } else if nota < self.config.grade.high {
            Classification::Medio
        } else {
            Classification::Alto
        }
    }

    pub fn confidence_level(&self, spread: f64) -> ConfidenceLevel {
        if spread <= self.config.confidence.high {
            ConfidenceLevel::Alto
        } else if spread <= self.config.confidence.medium {
            ConfidenceLevel::Medio
        } else {
            ConfidenceLevel::Bajo
        }
    }
}

fn message(nota: f64, clasificacion: Classification, confianza: ConfidenceLevel) -> String {
    let base = match clasificacion {
        Classification::Alto => format!(
            "Excelente trabajo! Se estima una nota de {:.1} (rendimiento alto)",
            nota
        ),
        Classification::Medio => format!(
            "Buen rendimiento. Se estima una nota de {:.1} (rendimiento medio)",
            nota
        ),
        Classification::Bajo => format!(
            "Hay oportunidades de mejora. Se estima una nota de {:.1} (rendimiento bajo)",
            nota
        ),
    };

    let confianza = match confianza {
        ConfidenceLevel::Alto => "con alta confianza",
        ConfidenceLevel::Medio => "con confianza moderada",
        ConfidenceLevel::Bajo => "con baja confianza",
    };

    format!("{} {}.", base, confianza)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_boundaries() {
        let f = OutputFormatter::new();
        assert_eq!(f.classify(0.0), Classification::Bajo);
        assert_eq!(f.classify(64.99), Classification::Bajo);
        assert_eq!(f.classify(65.0), Classification::Medio);
        assert_eq!(f.classify(84.99), Classification::Medio);
        assert_eq!(f.classify(85.0), Classification::Alto);
        assert_eq!(f.classify(100.0), Classification::Alto);
    }

    #[test]
    fn test_confidence_boundaries() {
        let f = OutputFormatter::new();
        assert_eq!(f.confidence_level(0.0), ConfidenceLevel::Alto);
        assert_eq!(f.confidence_level(5.0), ConfidenceLevel::Alto);
        assert_eq!(f.confidence_level(5.01), ConfidenceLevel::Medio);
        assert_eq!(f.confidence_level(10.0), ConfidenceLevel::Medio);
        assert_eq!(f.confidence_level(10.01), ConfidenceLevel::Bajo);
    }

    #[test]
    fn test_thresholds_are_configurable() {
        let f = OutputFormatter::with_config(OutputConfig {
            grade: GradeThresholds { low: 50.0, high: 70.0 },
            confidence: ConfidenceThresholds { high: 1.0, medium: 2.0 },
        });
        assert_eq!(f.classify(72.0), Classification::Alto);
        assert_eq!(f.classify(55.0), Classification::Medio);
        assert_eq!(f.confidence_level(1.5), ConfidenceLevel::Medio);
        assert_eq!(f.confidence_level(3.0), ConfidenceLevel::Bajo);
    }

    #[test]
    fn test_format_rounds_and_builds_message() {
        let f = OutputFormatter::new();
        let result = f.format(84.6789, 2.2345);

        assert_eq!(result.nota_estimada, 84.68);
        assert_eq!(result.confianza_valor, 2.23);
        assert_eq!(result.clasificacion, Classification::Medio);
        assert_eq!(result.nivel_confianza, ConfidenceLevel::Alto);
        assert_eq!(
            result.mensaje,
            "Buen rendimiento. Se estima una nota de 84.7 (rendimiento medio) con alta confianza."
        );
    }

    #[test]
    fn test_format_clamps_estimate() {
        let f = OutputFormatter::new();
        assert_eq!(f.format(104.2, 0.5).nota_estimada, 100.0);
        assert_eq!(f.format(-3.0, 0.5).nota_estimada, 0.0);
    }

    #[test]
    fn test_low_messages() {
        let f = OutputFormatter::new();
        let result = f.format(40.0, 12.0);
        assert!(result.mensaje.starts_with("Hay oportunidades de mejora"));
        assert!(result.mensaje.ends_with("con baja confianza."));
    }

    #[test]
    fn test_config_validation() {
        assert!(OutputConfig::default().validate().is_ok());

        let inverted = OutputConfig {
            grade: GradeThresholds { low: 90.0, high: 60.0 },
            ..Default::default()
        };
        assert!(inverted.validate().is_err());

        let bad_confidence = OutputConfig {
            confidence: ConfidenceThresholds { high: 8.0, medium: 4.0 },
            ..Default::default()
        };
        assert!(bad_confidence.validate().is_err());
    }
}
