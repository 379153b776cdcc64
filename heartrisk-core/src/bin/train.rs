//! Heart Risk - Offline training entry point
//!
//! Reads the labelled CSV, fits the preprocessor and the logistic regression,
//! and writes `preprocessor.json` + `best_model.json` for the server.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;

use heartrisk_core::logic::dataset::read_csv;
use heartrisk_core::logic::features::schema;
use heartrisk_core::logic::model::TrainerConfig;
use heartrisk_core::logic::training::{train_and_export, TrainingOptions};

#[derive(Debug, Parser)]
#[command(
    name = "heartrisk-train",
    version,
    about = "Train the heart disease risk model",
    long_about = "Fits the preprocessing pipeline and an L2-regularised logistic regression\n\
        on a Framingham-style CSV, then writes the serving artifacts.\n\n\
        EXAMPLE:\n\
        \n  heartrisk-train --input data/framingham.csv --out-dir artifacts"
)]
struct Cli {
    /// Labelled training CSV (target column `TenYearCHD`)
    #[arg(short, long)]
    input: PathBuf,

    /// Directory receiving preprocessor.json and best_model.json
    #[arg(short, long, default_value = "artifacts")]
    out_dir: PathBuf,

    /// Inverse regularization strength
    #[arg(long, default_value_t = 10.0)]
    c: f64,

    /// Newton iterations before giving up on convergence
    #[arg(long, default_value_t = 100)]
    max_iter: usize,

    /// Fraction of rows held out for evaluation
    #[arg(long, default_value_t = 0.2)]
    holdout: f64,

    #[arg(long, default_value_t = 1)]
    seed: u64,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let schema = schema();

    let set = match read_csv(&cli.input, schema) {
        Ok(set) => set,
        Err(e) => {
            log::error!("Failed to read {}: {}", cli.input.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let options = TrainingOptions {
        holdout_fraction: cli.holdout,
        seed: cli.seed,
        trainer: TrainerConfig {
            c: cli.c,
            max_iter: cli.max_iter,
            ..TrainerConfig::default()
        },
    };

    match train_and_export(schema, set, &options, &cli.out_dir) {
        Ok(report) => {
            log::info!("Preprocessor saved to: {}", report.preprocessor_path.display());
            log::info!("Model saved to: {}", report.model_path.display());
            if let Some(acc) = report.metrics.holdout_accuracy {
                log::info!("Holdout accuracy: {:.4}", acc);
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            log::error!("Training failed: {}", e);
            ExitCode::FAILURE
        }
    }
}
