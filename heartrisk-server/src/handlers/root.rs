//! Service metadata handler

use axum::{extract::State, Json};
use serde::Serialize;

use crate::AppState;

#[derive(Serialize)]
pub struct EndpointInfo {
    method: &'static str,
    path: &'static str,
    description: &'static str,
}

#[derive(Serialize)]
pub struct RootResponse {
    name: String,
    version: &'static str,
    status: &'static str,
    endpoints: Vec<EndpointInfo>,
}

const ENDPOINTS: [(&str, &str, &str); 3] = [
    ("GET", "/", "Service metadata"),
    ("GET", "/health", "Readiness and model status"),
    ("POST", "/predict", "Ten-year CHD risk for one patient record"),
];

pub async fn index(State(state): State<AppState>) -> Json<RootResponse> {
    Json(RootResponse {
        name: state.config.service_name.clone(),
        version: env!("CARGO_PKG_VERSION"),
        status: "running",
        endpoints: ENDPOINTS
            .iter()
            .map(|&(method, path, description)| EndpointInfo { method, path, description })
            .collect(),
    })
}
