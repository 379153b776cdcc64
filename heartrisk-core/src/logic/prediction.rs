//! Prediction Service - request orchestration
//!
//! `payload → validate → vectorize → (transform) → predict → risk label`
//!
//! Built once at startup and shared read-only by every request. A service
//! whose model failed to load stays up in degraded mode and answers every
//! prediction with `ServiceUnavailable`.

use std::path::Path;

use serde::Serialize;
use serde_json::Value;

use crate::logic::features::layout::FeatureSchema;
use crate::logic::features::validate::{validate_record, ValidationResult, Violation};
use crate::logic::features::vector::FeatureVector;
use crate::logic::model::{load_model, Classifier, FeatureSpace, InferenceError, LoadedModel, ModelError};
use crate::logic::preprocess::{load_pipeline, FittedPipeline, PreprocessError};

// ============================================================================
// OUTCOMES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum RiskLevel {
    Low,
    High,
}

impl RiskLevel {
    pub fn from_label(label: u8) -> Option<Self> {
        match label {
            0 => Some(RiskLevel::Low),
            1 => Some(RiskLevel::High),
            _ => None,
        }
    }

    pub fn classification(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low Risk",
            RiskLevel::High => "High Risk",
        }
    }

    pub fn interpretation(&self) -> &'static str {
        match self {
            RiskLevel::Low => {
                "The model predicts a low ten-year risk of coronary heart disease for this patient."
            }
            RiskLevel::High => {
                "The model predicts a high ten-year risk of coronary heart disease for this patient; \
                 clinical follow-up is recommended."
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Prediction {
    pub label: u8,
    pub risk: RiskLevel,
}

/// Why a single request produced no prediction
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PredictionError {
    #[error("model is not loaded")]
    ServiceUnavailable,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("{} validation violation(s)", .0.len())]
    Validation(Vec<Violation>),
    #[error("prediction failed: {0}")]
    Internal(String),
}

/// Why the service could not become ready
#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to load model: {0}")]
    Model(#[from] ModelError),
    #[error("failed to load preprocessor: {0}")]
    Preprocessor(#[from] PreprocessError),
    #[error("feature mismatch: {0}")]
    FeatureMismatch(String),
}

// ============================================================================
// PREDICTOR
// ============================================================================

/// Model plus whatever transform its feature space requires
#[derive(Debug, Clone)]
pub struct Predictor {
    model: LoadedModel,
    pipeline: Option<FittedPipeline>,
}

impl Predictor {
    /// Pair a model with its preprocessor, checking both agree on features
    pub fn new(
        schema: &FeatureSchema,
        model: LoadedModel,
        pipeline: Option<FittedPipeline>,
    ) -> Result<Self, StartupError> {
        let expected: Vec<String> = match (model.feature_space, &pipeline) {
            (FeatureSpace::Raw, _) => schema.names().map(String::from).collect(),
            (FeatureSpace::Preprocessed, Some(pipeline)) => {
                pipeline.verify(schema)?;
                pipeline.feature_names_out()
            }
            (FeatureSpace::Preprocessed, None) => {
                return Err(StartupError::FeatureMismatch(
                    "model expects preprocessed features but no preprocessor is available".to_string(),
                ))
            }
        };

        if model.feature_names != expected {
            return Err(StartupError::FeatureMismatch(format!(
                "model inputs {:?} do not match {} features {:?}",
                model.feature_names,
                model.feature_space.as_str(),
                expected
            )));
        }

        // A raw-space model never goes through the transform
        let pipeline = match model.feature_space {
            FeatureSpace::Raw => None,
            FeatureSpace::Preprocessed => pipeline,
        };

        Ok(Self { model, pipeline })
    }

    /// Load the model and, when its feature space needs it, the preprocessor
    pub fn load(schema: &FeatureSchema, model_path: &Path, preprocessor_path: &Path) -> Result<Self, StartupError> {
        let model = load_model(model_path)?;
        let pipeline = match model.feature_space {
            FeatureSpace::Raw => None,
            FeatureSpace::Preprocessed => Some(load_pipeline(preprocessor_path)?),
        };
        Self::new(schema, model, pipeline)
    }

    pub fn feature_space(&self) -> FeatureSpace {
        self.model.feature_space
    }

    pub fn predict(&self, vector: &FeatureVector) -> Result<u8, InferenceError> {
        let input = match &self.pipeline {
            Some(pipeline) => pipeline.transform_vector(vector),
            None => vector.to_row_matrix(),
        };

        let labels = self.model.classifier.predict(input.view())?;
        Ok(labels.first().copied().unwrap_or(u8::MAX))
    }
}

// ============================================================================
// SERVICE
// ============================================================================

pub struct PredictionService {
    schema: &'static FeatureSchema,
    predictor: Option<Predictor>,
    model_file: String,
}

impl PredictionService {
    pub fn new(schema: &'static FeatureSchema, predictor: Option<Predictor>, model_file: impl Into<String>) -> Self {
        Self {
            schema,
            predictor,
            model_file: model_file.into(),
        }
    }

    /// Load artifacts; any failure leaves the service degraded, never panics
    pub fn load(schema: &'static FeatureSchema, model_path: &Path, preprocessor_path: &Path) -> Self {
        let predictor = match Predictor::load(schema, model_path, preprocessor_path) {
            Ok(predictor) => {
                log::info!(
                    "Prediction service ready ({} feature space)",
                    predictor.feature_space().as_str()
                );
                Some(predictor)
            }
            Err(e) => {
                log::error!("Prediction service degraded: {}", e);
                None
            }
        };

        Self::new(schema, predictor, model_path.display().to_string())
    }

    pub fn is_ready(&self) -> bool {
        self.predictor.is_some()
    }

    pub fn model_file(&self) -> &str {
        &self.model_file
    }

    pub fn schema(&self) -> &'static FeatureSchema {
        self.schema
    }

    /// `None` means the body was absent or not parseable JSON
    pub fn predict(&self, payload: Option<&Value>) -> Result<Prediction, PredictionError> {
        let predictor = self.predictor.as_ref().ok_or(PredictionError::ServiceUnavailable)?;

        let record = payload
            .ok_or_else(|| PredictionError::InvalidRequest("Request body must be valid JSON".to_string()))?
            .as_object()
            .ok_or_else(|| {
                PredictionError::InvalidRequest("Request body must be a JSON object of patient features".to_string())
            })?;

        let validated = match validate_record(self.schema, record) {
            ValidationResult::Valid(validated) => validated,
            ValidationResult::Invalid(violations) => {
                log::debug!("Rejected record with {} violation(s)", violations.len());
                return Err(PredictionError::Validation(violations));
            }
        };

        let vector = FeatureVector::from_record(self.schema, &validated).map_err(|e| {
            log::error!("Vectorization failed for validated record: {}", e);
            PredictionError::Internal(e.to_string())
        })?;

        let label = predictor.predict(&vector).map_err(|e| {
            log::error!("Inference failed: {} (input: {})", e, vector.to_log_entry());
            PredictionError::Internal(e.to_string())
        })?;

        let risk = RiskLevel::from_label(label).ok_or_else(|| {
            log::error!("Model returned label {} outside {{0, 1}}", label);
            PredictionError::Internal(format!("unexpected label {}", label))
        })?;

        log::info!("Prediction: {} ({})", label, risk.classification());
        Ok(Prediction { label, risk })
    }
}

// ============================================================================
// TESTS
// ============================================================================
