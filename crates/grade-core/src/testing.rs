//! Deterministic sample data for tests and local experiments.
//!
//! Rows follow the layout of `data/notas_dataset.csv`: every student has a
//! latent ability level, the eight metrics scatter around it and the final
//! grade is a weighted blend of the metrics, dominated by exam averages.

use crate::models::{FEATURE_COLUMNS, NUM_FEATURES, TARGET_COLUMN};
use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

const TARGET_WEIGHTS: [f64; NUM_FEATURES] = [0.10, 0.20, 0.05, 0.05, 0.15, 0.35, 0.05, 0.05];
const FEATURE_OFFSETS: [f64; NUM_FEATURES] = [2.0, -3.0, 4.0, 6.0, 2.0, -3.0, 4.0, 6.0];

/// Input used throughout the docs and tests
pub const SAMPLE_STUDENT: [f64; NUM_FEATURES] = [85.0, 78.0, 92.0, 95.0, 87.0, 82.0, 88.0, 93.0];

fn clamp_round(v: f64) -> f64 {
    ((v * 10.0).round() / 10.0).clamp(0.0, 100.0)
}

/// Row `i` of the sample dataset: features and target grade
pub fn sample_row(i: usize) -> (Vec<f64>, f64) {
    let base = 45.0 + ((i * 37) % 50) as f64 * 1.1;
    let features: Vec<f64> = (0..NUM_FEATURES)
        .map(|k| clamp_round(base + FEATURE_OFFSETS[k] + 3.0 * (i as f64 * 1.7 + k as f64).sin()))
        .collect();
    let blended: f64 = features.iter().zip(TARGET_WEIGHTS).map(|(f, w)| f * w).sum();
    let target = clamp_round(blended + (i as f64 * 0.9).sin());
    (features, target)
}

/// CSV text with a header and `rows` sample rows
pub fn sample_csv(rows: usize) -> String {
    let mut out = FEATURE_COLUMNS.join(",");
    out.push(',');
    out.push_str(TARGET_COLUMN);
    out.push('\n');

    for i in 0..rows {
        let (features, target) = sample_row(i);
        for f in &features {
            let _ = write!(out, "{:.1},", f);
        }
        let _ = writeln!(out, "{:.1}", target);
    }
    out
}

/// Write `notas_dataset.csv` with `rows` sample rows into `dir`
pub fn write_sample_dataset(dir: &Path, rows: usize) -> PathBuf {
    let path = dir.join("notas_dataset.csv");
    fs::write(&path, sample_csv(rows)).expect("failed to write sample dataset");
    path
}
