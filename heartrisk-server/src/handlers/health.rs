//! Health check handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    service: String,
    status: &'static str,
    model_loaded: bool,
    model_file: String,
    version: &'static str,
    timestamp: i64,
}

/// Always 200; readiness is reported in the body
pub async fn check(State(state): State<AppState>) -> Json<HealthResponse> {
    let model_loaded = state.service.is_ready();

    Json(HealthResponse {
        service: state.config.service_name.clone(),
        status: if model_loaded { "ready" } else { "degraded" },
        model_loaded,
        model_file: state.service.model_file().to_string(),
        version: env!("CARGO_PKG_VERSION"),
        timestamp: chrono::Utc::now().timestamp(),
    })
}
