//! Heart Risk Core - schema, validation, preprocessing, model and service

pub mod logic;

pub use logic::features::{schema, FeatureSchema};
pub use logic::prediction::{Prediction, PredictionError, PredictionService, RiskLevel};
