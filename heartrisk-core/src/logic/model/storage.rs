//! Model artifact persistence
//!
//! JSON artifact carrying the classifier parameters, the feature space it
//! was trained on, and a SHA-256 checksum over the parameters.

use std::fs;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::logic::features::layout::{layout_hash, validate_layout, LayoutMismatchError, FEATURE_VERSION};

use super::inference::{Classifier, LogisticRegression};
use super::train::TrainerConfig;

pub const MODEL_FORMAT_VERSION: u32 = 1;
pub const LOGISTIC_REGRESSION: &str = "logistic_regression";

/// Representation the model's inputs were trained in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureSpace {
    /// Validated values in schema order, untransformed
    Raw,
    /// Output of the fitted preprocessing pipeline
    Preprocessed,
}

impl FeatureSpace {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureSpace::Raw => "raw",
            FeatureSpace::Preprocessed => "preprocessed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub train_samples: usize,
    pub holdout_samples: usize,
    pub train_accuracy: f64,
    pub holdout_accuracy: Option<f64>,
    pub iterations: usize,
    pub converged: bool,
    pub final_loss: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format_version: u32,
    pub model_type: String,
    pub feature_version: u8,
    pub layout_hash: u32,
    pub feature_space: FeatureSpace,
    /// Input columns, in the order the coefficients apply to
    pub feature_names: Vec<String>,
    pub coefficients: Vec<f64>,
    pub intercept: f64,
    pub threshold: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hyperparameters: Option<TrainerConfig>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<TrainingMetrics>,
    pub trained_at: DateTime<Utc>,
    pub checksum: String,
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization Error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Model {0}")]
    LayoutMismatch(#[from] LayoutMismatchError),
    #[error("unsupported model format version {0}")]
    UnsupportedFormat(u32),
    #[error("unsupported model type '{0}'")]
    UnsupportedModelType(String),
    #[error("checksum mismatch: expected {expected}, computed {actual}")]
    ChecksumMismatch { expected: String, actual: String },
    #[error("malformed model: {0}")]
    Malformed(String),
}

impl ModelArtifact {
    pub fn from_logistic_regression(
        model: &LogisticRegression,
        feature_space: FeatureSpace,
        feature_names: Vec<String>,
    ) -> Self {
        let mut artifact = Self {
            format_version: MODEL_FORMAT_VERSION,
            model_type: LOGISTIC_REGRESSION.to_string(),
            feature_version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            feature_space,
            feature_names,
            coefficients: model.coefficients().to_vec(),
            intercept: model.intercept(),
            threshold: model.threshold(),
            hyperparameters: None,
            metrics: None,
            trained_at: Utc::now(),
            checksum: String::new(),
        };
        artifact.seal();
        artifact
    }

    /// Recompute the checksum after changing parameters
    pub fn seal(&mut self) {
        self.checksum = self.compute_checksum();
    }

    /// SHA-256 over everything that affects a prediction
    pub fn compute_checksum(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.format_version.to_le_bytes());
        hasher.update(self.model_type.as_bytes());
        hasher.update([self.feature_version]);
        hasher.update(self.layout_hash.to_le_bytes());
        hasher.update(self.feature_space.as_str().as_bytes());
        for name in &self.feature_names {
            hasher.update(name.as_bytes());
            hasher.update([0]);
        }
        for c in &self.coefficients {
            hasher.update(c.to_bits().to_le_bytes());
        }
        hasher.update(self.intercept.to_bits().to_le_bytes());
        hasher.update(self.threshold.to_bits().to_le_bytes());
        hex::encode(hasher.finalize())
    }

    /// Structural checks done before the artifact is trusted
    pub fn verify(&self) -> Result<(), ModelError> {
        if self.format_version != MODEL_FORMAT_VERSION {
            return Err(ModelError::UnsupportedFormat(self.format_version));
        }
        if self.model_type != LOGISTIC_REGRESSION {
            return Err(ModelError::UnsupportedModelType(self.model_type.clone()));
        }
        validate_layout(self.feature_version, self.layout_hash)?;

        let actual = self.compute_checksum();
        if actual != self.checksum {
            return Err(ModelError::ChecksumMismatch {
                expected: self.checksum.clone(),
                actual,
            });
        }

        if self.coefficients.len() != self.feature_names.len() {
            return Err(ModelError::Malformed(format!(
                "{} coefficients for {} features",
                self.coefficients.len(),
                self.feature_names.len()
            )));
        }
        let all_finite = self.coefficients.iter().all(|c| c.is_finite())
            && self.intercept.is_finite()
            && self.threshold.is_finite();
        if !all_finite {
            return Err(ModelError::Malformed("non-finite parameter".to_string()));
        }

        Ok(())
    }

    pub fn to_classifier(&self) -> LogisticRegression {
        LogisticRegression::with_threshold(self.coefficients.clone(), self.intercept, self.threshold)
    }
}

/// A verified model ready for prediction
#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub classifier: LogisticRegression,
    pub feature_space: FeatureSpace,
    pub feature_names: Vec<String>,
    pub trained_at: DateTime<Utc>,
    pub loaded_at: DateTime<Utc>,
}

impl LoadedModel {
    pub fn from_artifact(artifact: &ModelArtifact) -> Result<Self, ModelError> {
        artifact.verify()?;

        Ok(Self {
            classifier: artifact.to_classifier(),
            feature_space: artifact.feature_space,
            feature_names: artifact.feature_names.clone(),
            trained_at: artifact.trained_at,
            loaded_at: Utc::now(),
        })
    }
}

/// Save model artifact to disk
pub fn save_model(artifact: &ModelArtifact, path: &Path) -> Result<(), ModelError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_vec_pretty(artifact)?;
    fs::write(path, json)?;

    log::info!("Model saved to {}", path.display());
    Ok(())
}

/// Load and verify a model artifact
pub fn load_model(path: &Path) -> Result<LoadedModel, ModelError> {
    log::info!("Loading model from: {}", path.display());

    let data = fs::read(path)?;
    let artifact: ModelArtifact = serde_json::from_slice(&data)?;
    let model = LoadedModel::from_artifact(&artifact)?;

    log::info!(
        "Model loaded: {} over {} {:?} features (trained {})",
        artifact.model_type,
        model.feature_names.len(),
        model.feature_space,
        model.trained_at
    );
    Ok(model)
}
