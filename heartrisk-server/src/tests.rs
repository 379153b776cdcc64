//! Router tests against in-memory services

use std::sync::Arc;

use axum::{
    body::{to_bytes, Body},
    http::{header, Request, StatusCode},
};
use serde_json::{json, Value};
use tower::ServiceExt;

use heartrisk_core::logic::model::{save_model, FeatureSpace, LoadedModel, LogisticRegression, ModelArtifact};
use heartrisk_core::logic::preprocess::{save_pipeline, PreprocessingPipeline, RawRow};
use heartrisk_core::logic::prediction::Predictor;
use heartrisk_core::{schema, PredictionService};

use super::*;

fn sample_patient() -> Value {
    json!({
        "male": 1, "age": 39, "education": 4, "currentsmoker": 0, "cigsperday": 0,
        "bpmeds": 0, "prevalentstroke": 0, "prevalenthyp": 0, "diabetes": 0,
        "totchol": 195, "bmi": 26.97, "heartrate": 80, "glucose": 77
    })
}

/// Raw-space model: high risk from age 50
fn raw_artifact() -> ModelArtifact {
    let mut coefficients = vec![0.0; 13];
    coefficients[1] = 1.0;
    let model = LogisticRegression::new(coefficients, -50.0);
    let names = schema().names().map(String::from).collect();
    ModelArtifact::from_logistic_regression(&model, FeatureSpace::Raw, names)
}

fn app_with(service: PredictionService) -> Router {
    create_router(AppState {
        service: Arc::new(service),
        config: config::Config::from_lookup(|_| None),
    })
}

fn ready_app() -> Router {
    let model = LoadedModel::from_artifact(&raw_artifact()).unwrap();
    let predictor = Predictor::new(schema(), model, None).unwrap();
    app_with(PredictionService::new(schema(), Some(predictor), "memory"))
}

fn degraded_app() -> Router {
    app_with(PredictionService::new(schema(), None, "artifacts/best_model.json"))
}

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

fn post_predict(body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/predict")
        .header(header::CONTENT_TYPE, "application/json")
        .body(body.into())
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

#[tokio::test]
async fn test_predict_sample_patient() {
    let (status, body) = send(ready_app(), post_predict(sample_patient().to_string())).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], 0);
    assert_eq!(body["risk_classification"], "Low Risk");
    assert!(body["interpretation"].as_str().unwrap().contains("low"));
}

#[tokio::test]
async fn test_predict_high_risk() {
    let mut patient = sample_patient();
    patient["age"] = json!(67);

    let (status, body) = send(ready_app(), post_predict(patient.to_string())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], 1);
    assert_eq!(body["risk_classification"], "High Risk");
}

#[tokio::test]
async fn test_missing_age_is_validation_error() {
    let mut patient = sample_patient();
    patient.as_object_mut().unwrap().remove("age");

    let (status, body) = send(ready_app(), post_predict(patient.to_string())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Validation Error");
    let details = body["details"].as_array().unwrap();
    assert!(details.iter().any(|d| d.as_str().unwrap().contains("age")));

    let expected = body["expected_features"].as_array().unwrap();
    assert_eq!(expected.len(), 13);
    assert_eq!(expected[1]["name"], "age");
    assert_eq!(expected[1]["type"], "numeric");
    assert_eq!(expected[1]["constraints"]["min"], 18.0);
}

#[tokio::test]
async fn test_all_violations_reported() {
    let mut patient = sample_patient();
    patient["male"] = json!("yes");
    patient["glucose"] = json!(900);
    patient["smoker"] = json!(1);

    let (status, body) = send(ready_app(), post_predict(patient.to_string())).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["details"],
        json!([
            "Unexpected features: smoker",
            "'male' must be 0 or 1",
            "'glucose' value 900 is above maximum 500"
        ])
    );
}

#[tokio::test]
async fn test_malformed_body_is_invalid_request() {
    let (status, body) = send(ready_app(), post_predict("{not json")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid Request");

    let (status, body) = send(ready_app(), post_predict("[1, 2, 3]")).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "Invalid Request");
}

#[tokio::test]
async fn test_unloaded_model_is_503_for_any_payload() {
    for body in [sample_patient().to_string(), "{}".to_string(), "garbage".to_string()] {
        let (status, json) = send(degraded_app(), post_predict(body)).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(json["error"], "Service Unavailable");
    }
}

#[tokio::test]
async fn test_health_reports_readiness() {
    let (status, body) = send(ready_app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ready");
    assert_eq!(body["model_loaded"], true);
    assert_eq!(body["service"], "Heart Disease Prediction");

    let (status, body) = send(degraded_app(), get("/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "degraded");
    assert_eq!(body["model_loaded"], false);
    assert_eq!(body["model_file"], "artifacts/best_model.json");
}

#[tokio::test]
async fn test_root_lists_endpoints() {
    let (status, body) = send(degraded_app(), get("/")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["name"], "Heart Disease Prediction");
    assert_eq!(body["status"], "running");
    let paths: Vec<&str> = body["endpoints"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["path"].as_str().unwrap())
        .collect();
    assert_eq!(paths, vec!["/", "/health", "/predict"]);
}

#[tokio::test]
async fn test_service_loaded_from_disk() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("best_model.json");
    save_model(&raw_artifact(), &model_path).unwrap();

    // Raw-space model never reads the preprocessor
    let service = PredictionService::load(schema(), &model_path, &dir.path().join("preprocessor.json"));
    assert!(service.is_ready());

    let (status, body) = send(app_with(service), post_predict(sample_patient().to_string())).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["prediction"], 0);
}

#[tokio::test]
async fn test_panicking_handler_becomes_500_through_layers() {
    async fn explode() -> &'static str {
        panic!("boom")
    }

    let app = with_layers(Router::new().route("/explode", axum::routing::get(explode))).with_state(AppState {
        service: Arc::new(PredictionService::new(schema(), None, "memory")),
        config: config::Config::from_lookup(|_| None),
    });

    let (status, body) = send(app, get("/explode")).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"], "Prediction Error");
    assert!(!body["message"].as_str().unwrap().contains("boom"));
}

#[tokio::test]
async fn test_inconsistent_preprocessor_answers_503() {
    let dir = tempfile::tempdir().unwrap();
    let model_path = dir.path().join("best_model.json");
    let preprocessor_path = dir.path().join("preprocessor.json");

    let rows: Vec<RawRow> = (0..8)
        .map(|i| {
            let mut row = [Some(0.0); 13];
            row[0] = Some((i % 2) as f64);
            row[1] = Some(30.0 + 5.0 * i as f64);
            row
        })
        .collect();
    let mut pipeline = PreprocessingPipeline::from_schema(schema()).fit(&rows).unwrap();

    let names = pipeline.feature_names_out();
    let model = LogisticRegression::new(vec![0.0; names.len()], 0.0);
    save_model(&ModelArtifact::from_logistic_regression(&model, FeatureSpace::Preprocessed, names), &model_path)
        .unwrap();

    pipeline.categorical[0].scales.pop();
    save_pipeline(&pipeline, &preprocessor_path).unwrap();

    let service = PredictionService::load(schema(), &model_path, &preprocessor_path);
    let (status, body) = send(app_with(service), post_predict(sample_patient().to_string())).await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "Service Unavailable");
}

#[test]
fn test_production_logs_quieter() {
    let dev = config::Config::from_lookup(|_| None);
    let prod = config::Config::from_lookup(|key| (key == "ENVIRONMENT").then(|| "production".to_string()));

    assert!(default_log_filter(&dev).contains("heartrisk_server=debug"));
    assert!(default_log_filter(&prod).contains("heartrisk_server=info"));
    assert!(!default_log_filter(&prod).contains("debug"));
}
