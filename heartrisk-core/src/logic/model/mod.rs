//! Model Module - Classifier, training and artifact persistence
//!
//! The service only ever sees a verified [`LoadedModel`]; the artifact
//! format and the training routine stay behind this module.

pub mod inference;
pub mod storage;
pub mod train;

// Re-export common types
pub use inference::{Classifier, InferenceError, LogisticRegression, DEFAULT_THRESHOLD};
pub use storage::{load_model, save_model, FeatureSpace, LoadedModel, ModelArtifact, ModelError, TrainingMetrics};
pub use train::{accuracy, fit_logistic_regression, TrainerConfig, TrainingError, TrainingOutcome};
