//! Academic Performance Predictor CLI
//!
//! A command-line tool for requesting grade predictions, inspecting and
//! training the model, and checking the health of the prediction service.

mod client;
mod commands;
mod output;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use commands::{health, model, predict};
use grade_core::forest::ForestParams;
use grade_core::trainer::DEFAULT_TEST_SIZE;
use grade_core::FeatureVector;
use std::path::PathBuf;

/// Academic Performance Predictor CLI
#[derive(Parser)]
#[command(name = "gradectl")]
#[command(author, version, about = "CLI for the Academic Performance Predictor", long_about = None)]
pub struct Cli {
    /// API endpoint URL (can also be set via GRADE_API_URL env var)
    #[arg(long, env = "GRADE_API_URL", default_value = "http://localhost:8000")]
    pub api_url: String,

    /// Output format
    #[arg(long, short, value_enum, default_value = "table")]
    pub format: output::OutputFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Predict a student's third-term grade
    Predict(StudentArgs),

    /// Show information about the loaded model
    Info,

    /// Train the model on the server
    Train {
        /// Retrain even if a model already exists
        #[arg(long)]
        force: bool,
    },

    /// Show service health
    Health,

    /// Train a model from local files without a running server
    TrainLocal(TrainLocalArgs),
}

/// Term 1 and term 2 metrics, each a percentage in [0, 100]
#[derive(Args)]
pub struct StudentArgs {
    /// Term 1 homework average
    #[arg(long)]
    pub prom_tareas_t1: f64,
    /// Term 1 exam average
    #[arg(long)]
    pub prom_examenes_t1: f64,
    /// Term 1 participation average
    #[arg(long)]
    pub prom_part_t1: f64,
    /// Term 1 attendance
    #[arg(long)]
    pub asistencia_t1: f64,
    /// Term 2 homework average
    #[arg(long)]
    pub prom_tareas_t2: f64,
    /// Term 2 exam average
    #[arg(long)]
    pub prom_examenes_t2: f64,
    /// Term 2 participation average
    #[arg(long)]
    pub prom_part_t2: f64,
    /// Term 2 attendance
    #[arg(long)]
    pub asistencia_t2: f64,
}

impl StudentArgs {
    fn to_features(&self) -> Result<FeatureVector> {
        Ok(FeatureVector::new([
            self.prom_tareas_t1,
            self.prom_examenes_t1,
            self.prom_part_t1,
            self.asistencia_t1,
            self.prom_tareas_t2,
            self.prom_examenes_t2,
            self.prom_part_t2,
            self.asistencia_t2,
        ])?)
    }
}

#[derive(Args)]
pub struct TrainLocalArgs {
    /// Labeled CSV dataset
    #[arg(long, default_value = "data/notas_dataset.csv")]
    pub dataset: PathBuf,

    /// Where to write the model artifact
    #[arg(long, default_value = "ml_models/modelo_notas.json")]
    pub model: PathBuf,

    /// Number of trees
    #[arg(long, default_value_t = 100)]
    pub n_estimators: usize,

    /// Maximum tree depth (0 for unlimited)
    #[arg(long, default_value_t = 10)]
    pub max_depth: usize,

    #[arg(long, default_value_t = 5)]
    pub min_samples_split: usize,

    #[arg(long, default_value_t = 2)]
    pub min_samples_leaf: usize,

    /// Seed for bootstrap sampling and the train/test split
    #[arg(long, default_value_t = 42)]
    pub random_state: u64,

    /// Fraction of rows held out for evaluation
    #[arg(long, default_value_t = DEFAULT_TEST_SIZE)]
    pub test_size: f64,
}

impl From<TrainLocalArgs> for model::LocalTraining {
    fn from(args: TrainLocalArgs) -> Self {
        Self {
            dataset: args.dataset,
            model: args.model,
            params: ForestParams {
                n_estimators: args.n_estimators,
                max_depth: (args.max_depth > 0).then_some(args.max_depth),
                min_samples_split: args.min_samples_split,
                min_samples_leaf: args.min_samples_leaf,
                random_state: args.random_state,
                ..Default::default()
            },
            test_size: args.test_size,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Only remote commands need a client
    let api_url = cli.api_url;
    let client = || client::ApiClient::new(&api_url);

    match cli.command {
        Commands::Predict(student) => {
            predict::predict(&client()?, student.to_features()?, cli.format).await?;
        }
        Commands::Info => {
            model::show_info(&client()?, cli.format).await?;
        }
        Commands::Train { force } => {
            model::train(&client()?, force, cli.format).await?;
        }
        Commands::Health => {
            health::show_health(&client()?, cli.format).await?;
        }
        Commands::TrainLocal(args) => {
            model::train_local(args.into(), cli.format).await?;
        }
    }

    Ok(())
}
