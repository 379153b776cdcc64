//! Training Routine - offline pipeline producing the serving artifacts
//!
//! dataset → holdout split → fit preprocessor → train → evaluate → persist

use std::path::{Path, PathBuf};

use crate::logic::dataset::{DatasetError, TrainingSet};
use crate::logic::features::layout::FeatureSchema;
use crate::logic::model::{
    accuracy, fit_logistic_regression, save_model, FeatureSpace, InferenceError, ModelArtifact, ModelError,
    TrainerConfig, TrainingError, TrainingMetrics,
};
use crate::logic::preprocess::{save_pipeline, PreprocessError, PreprocessingPipeline};

pub const MODEL_FILE: &str = "best_model.json";
pub const PREPROCESSOR_FILE: &str = "preprocessor.json";

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrainingOptions {
    pub holdout_fraction: f64,
    pub seed: u64,
    pub trainer: TrainerConfig,
}

impl Default for TrainingOptions {
    fn default() -> Self {
        Self {
            holdout_fraction: 0.2,
            seed: 1,
            trainer: TrainerConfig::default(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PipelineRunError {
    #[error("dataset: {0}")]
    Dataset(#[from] DatasetError),
    #[error("preprocessing: {0}")]
    Preprocess(#[from] PreprocessError),
    #[error("training: {0}")]
    Training(#[from] TrainingError),
    #[error("evaluation: {0}")]
    Evaluation(#[from] InferenceError),
    #[error("model: {0}")]
    Model(#[from] ModelError),
}

#[derive(Debug, Clone)]
pub struct TrainingReport {
    pub model_path: PathBuf,
    pub preprocessor_path: PathBuf,
    pub metrics: TrainingMetrics,
}

/// Fit preprocessor and model on `set`, writing both artifacts into `out_dir`
pub fn train_and_export(
    schema: &FeatureSchema,
    set: TrainingSet,
    options: &TrainingOptions,
    out_dir: &Path,
) -> Result<TrainingReport, PipelineRunError> {
    log::info!(
        "Training on {} rows ({} positive), holdout {:.0}% seed {}",
        set.len(),
        set.positives(),
        options.holdout_fraction * 100.0,
        options.seed
    );

    let (train, holdout) = set.holdout_split(options.holdout_fraction, options.seed)?;
    log::info!("Split: {} train / {} holdout", train.len(), holdout.len());

    let pipeline = PreprocessingPipeline::from_schema(schema).fit(&train.rows)?;
    let preprocessor_path = out_dir.join(PREPROCESSOR_FILE);
    save_pipeline(&pipeline, &preprocessor_path)?;

    let x_train = pipeline.transform(&train.rows);
    let outcome = fit_logistic_regression(x_train.view(), &train.labels, &options.trainer)?;

    let train_accuracy = accuracy(&outcome.model, x_train.view(), &train.labels)?;
    let holdout_accuracy = if holdout.is_empty() {
        None
    } else {
        let x_holdout = pipeline.transform(&holdout.rows);
        Some(accuracy(&outcome.model, x_holdout.view(), &holdout.labels)?)
    };

    match holdout_accuracy {
        Some(acc) => log::info!("Accuracy: train {:.4}, holdout {:.4}", train_accuracy, acc),
        None => log::info!("Accuracy: train {:.4} (no holdout)", train_accuracy),
    }

    let metrics = TrainingMetrics {
        train_samples: train.len(),
        holdout_samples: holdout.len(),
        train_accuracy,
        holdout_accuracy,
        iterations: outcome.iterations,
        converged: outcome.converged,
        final_loss: outcome.final_loss,
    };

    let mut artifact = ModelArtifact::from_logistic_regression(
        &outcome.model,
        FeatureSpace::Preprocessed,
        pipeline.feature_names_out(),
    );
    artifact.hyperparameters = Some(options.trainer);
    artifact.metrics = Some(metrics.clone());
    artifact.seal();

    let model_path = out_dir.join(MODEL_FILE);
    save_model(&artifact, &model_path)?;

    Ok(TrainingReport {
        model_path,
        preprocessor_path,
        metrics,
    })
}
