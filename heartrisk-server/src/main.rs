//! Heart Disease Prediction Server
//!
//! HTTP front end for the heart disease risk model.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 HEART DISEASE PREDICTION                    │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐    ┌──────────────────────────────────────┐  │
//! │  │  API      │    │  PredictionService (heartrisk-core)  │  │
//! │  │  (Axum)   │───▶│  validate → vectorize → transform    │  │
//! │  │           │    │  → classify → risk label             │  │
//! │  └───────────┘    └──────────────────┬───────────────────┘  │
//! │                                      ▼                      │
//! │                  best_model.json + preprocessor.json        │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod handlers;
mod error;

#[cfg(test)]
mod tests;

use std::any::Any;
use std::sync::Arc;

use axum::{
    Router,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{CorsLayer, Any as AnyOrigin},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use heartrisk_core::{schema, PredictionService};

pub use error::{ApiError, ApiResult};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();
    let config = config::Config::from_env();

    // Initialize logging
    init_tracing(&config);

    tracing::info!("{} server starting ({})...", config.service_name, config.environment);
    tracing::info!("Model: {}", config.model_path.display());
    tracing::info!("Preprocessor: {}", config.preprocessor_path.display());

    // Load artifacts; a failure leaves the service degraded
    let service = PredictionService::load(schema(), &config.model_path, &config.preprocessor_path);
    if !service.is_ready() {
        tracing::warn!("Model not loaded - /predict will return 503");
    }

    // Build application state
    let state = AppState {
        service: Arc::new(service),
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = config.socket_addr()?;
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn init_tracing(config: &config::Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_log_filter(config).into());

    let registry = tracing_subscriber::registry().with(filter);
    match config.log_format {
        config::LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        config::LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

/// Production keeps request tracing at info; development logs everything at debug
fn default_log_filter(config: &config::Config) -> &'static str {
    if config.is_production() {
        "heartrisk_server=info,heartrisk_core=info,tower_http=info"
    } else {
        "heartrisk_server=debug,heartrisk_core=info,tower_http=debug"
    }
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<PredictionService>,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    let routes = Router::new()
        .route("/", get(handlers::root::index))
        .route("/health", get(handlers::health::check))
        .route("/predict", post(handlers::predict::predict));

    with_layers(routes).with_state(state)
}

/// Panic recovery, compression, tracing and CORS around `routes`
fn with_layers(routes: Router<AppState>) -> Router<AppState> {
    routes
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(AnyOrigin)
                .allow_methods(AnyOrigin)
                .allow_headers(AnyOrigin)
        )
}

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");

    ApiError::Internal(format!("handler panicked: {}", detail)).into_response()
}
