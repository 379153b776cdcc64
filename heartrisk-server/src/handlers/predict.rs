//! Prediction handler

use axum::{
    extract::{rejection::JsonRejection, State},
    Json,
};
use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    prediction: u8,
    risk_classification: &'static str,
    interpretation: &'static str,
}

pub async fn predict(
    State(state): State<AppState>,
    payload: Result<Json<Value>, JsonRejection>,
) -> ApiResult<Json<PredictResponse>> {
    let payload = match payload {
        Ok(Json(value)) => Some(value),
        Err(rejection) => {
            tracing::debug!("Unreadable request body: {}", rejection.body_text());
            None
        }
    };

    let prediction = state
        .service
        .predict(payload.as_ref())
        .map_err(|e| ApiError::from_prediction(e, state.service.schema()))?;

    Ok(Json(PredictResponse {
        prediction: prediction.label,
        risk_classification: prediction.risk.classification(),
        interpretation: prediction.risk.interpretation(),
    }))
}
