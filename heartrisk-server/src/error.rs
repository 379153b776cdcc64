//! Error handling

use axum::{
    response::{IntoResponse, Response},
    http::StatusCode,
    Json,
};
use serde_json::json;

use heartrisk_core::logic::features::{FeatureDescription, FeatureSchema, Violation};
use heartrisk_core::PredictionError;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    // Client errors
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("{} validation violation(s)", violations.len())]
    Validation {
        violations: Vec<Violation>,
        expected_features: Vec<FeatureDescription>,
    },

    // Startup errors
    #[error("model not loaded")]
    ServiceUnavailable,

    // Generic errors
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Map a service outcome, attaching the schema description to validation errors
    pub fn from_prediction(err: PredictionError, schema: &FeatureSchema) -> Self {
        match err {
            PredictionError::ServiceUnavailable => ApiError::ServiceUnavailable,
            PredictionError::InvalidRequest(msg) => ApiError::InvalidRequest(msg),
            PredictionError::Validation(violations) => ApiError::Validation {
                violations,
                expected_features: schema.describe(),
            },
            PredictionError::Internal(msg) => ApiError::Internal(msg),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::InvalidRequest(_) | ApiError::Validation { .. } => StatusCode::BAD_REQUEST,
            ApiError::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();

        let body = match self {
            ApiError::InvalidRequest(msg) => {
                tracing::debug!("Invalid request: {}", msg);
                json!({
                    "error": "Invalid Request",
                    "message": msg
                })
            }
            ApiError::Validation { violations, expected_features } => {
                tracing::debug!("Validation failed with {} violation(s)", violations.len());
                let details: Vec<String> = violations.iter().map(ToString::to_string).collect();
                json!({
                    "error": "Validation Error",
                    "message": "Input validation failed",
                    "details": details,
                    "expected_features": expected_features
                })
            }
            ApiError::ServiceUnavailable => json!({
                "error": "Service Unavailable",
                "message": "Model not loaded. Please check server logs."
            }),
            ApiError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                json!({
                    "error": "Prediction Error",
                    "message": "An unexpected error occurred while making the prediction"
                })
            }
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heartrisk_core::schema;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (PredictionError::ServiceUnavailable, StatusCode::SERVICE_UNAVAILABLE),
            (PredictionError::InvalidRequest("x".into()), StatusCode::BAD_REQUEST),
            (PredictionError::Validation(vec![]), StatusCode::BAD_REQUEST),
            (PredictionError::Internal("boom".into()), StatusCode::INTERNAL_SERVER_ERROR),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from_prediction(err, schema()).status(), status);
        }
    }

    #[test]
    fn test_validation_carries_schema() {
        let err = ApiError::from_prediction(PredictionError::Validation(vec![]), schema());
        match err {
            ApiError::Validation { expected_features, .. } => assert_eq!(expected_features.len(), 13),
            other => panic!("Expected Validation, got {:?}", other),
        }
    }
}
