//! Grade prediction engine

mod features;
mod inference;
mod output;

pub use features::{parse_features, validate_array};
pub use inference::{EnsembleEstimate, EnsembleRegressor, Predictor};
pub use output::{
    ConfidenceThresholds, GradeThresholds, OutputConfig, OutputFormatter,
    CONFIDENCE_HIGH_THRESHOLD, CONFIDENCE_MEDIUM_THRESHOLD, THRESHOLD_HIGH, THRESHOLD_LOW,
};
