//! Inference Engine - Logistic Regression
//!
//! The model is consumed through the [`Classifier`] trait only, so the
//! prediction path doesn't care which algorithm produced the artifact.

use ndarray::{Array1, ArrayView1, ArrayView2};

/// Default probability cut-off between the two classes
pub const DEFAULT_THRESHOLD: f64 = 0.5;

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("expected {expected} input features, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("model produced a non-finite score for row {0}")]
    NonFinite(usize),
}

// ============================================================================
// CLASSIFIER TRAIT
// ============================================================================

/// Binary classifier over a row-major feature matrix
///
/// Implementations hold no mutable state, so one instance is shared by all
/// concurrent requests.
pub trait Classifier: Send + Sync {
    /// Number of columns expected in every input row
    fn input_dim(&self) -> usize;

    /// Probability of the positive class, one per row
    fn predict_proba(&self, features: ArrayView2<'_, f64>) -> Result<Array1<f64>, InferenceError>;

    fn threshold(&self) -> f64 {
        DEFAULT_THRESHOLD
    }

    /// Labels in {0, 1}, one per row
    fn predict(&self, features: ArrayView2<'_, f64>) -> Result<Vec<u8>, InferenceError> {
        let threshold = self.threshold();
        Ok(self
            .predict_proba(features)?
            .iter()
            .map(|&p| u8::from(p >= threshold))
            .collect())
    }
}

// ============================================================================
// LOGISTIC REGRESSION
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct LogisticRegression {
    coefficients: Array1<f64>,
    intercept: f64,
    threshold: f64,
}

impl LogisticRegression {
    pub fn new(coefficients: Vec<f64>, intercept: f64) -> Self {
        Self::with_threshold(coefficients, intercept, DEFAULT_THRESHOLD)
    }

    pub fn with_threshold(coefficients: Vec<f64>, intercept: f64, threshold: f64) -> Self {
        Self {
            coefficients: Array1::from(coefficients),
            intercept,
            threshold,
        }
    }

    pub fn coefficients(&self) -> ArrayView1<'_, f64> {
        self.coefficients.view()
    }

    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Raw log-odds per row
    pub fn decision_function(&self, features: ArrayView2<'_, f64>) -> Result<Array1<f64>, InferenceError> {
        let (_, cols) = features.dim();
        if cols != self.coefficients.len() {
            return Err(InferenceError::DimensionMismatch {
                expected: self.coefficients.len(),
                actual: cols,
            });
        }

        Ok(features.dot(&self.coefficients) + self.intercept)
    }
}

impl Classifier for LogisticRegression {
    fn input_dim(&self) -> usize {
        self.coefficients.len()
    }

    fn predict_proba(&self, features: ArrayView2<'_, f64>) -> Result<Array1<f64>, InferenceError> {
        let scores = self.decision_function(features)?;

        if let Some(row) = scores.iter().position(|z| !z.is_finite()) {
            return Err(InferenceError::NonFinite(row));
        }

        Ok(scores.mapv(sigmoid))
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }
}

/// Numerically stable logistic function
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

// ============================================================================
// TESTS
// ============================================================================
