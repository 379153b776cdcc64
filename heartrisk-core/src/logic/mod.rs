//! Logic Module - Business Logic & Engines
//!
//! ## Architecture
//! - `features/` - Feature schema, validation, vectorization
//! - `preprocess/` - Fitted imputation / scaling / one-hot pipeline
//! - `model/` - Classifier, training, artifact storage
//! - `dataset/` - Training CSV reader + holdout split
//! - `training` - Offline pipeline producing the serving artifacts
//! - `prediction` - Request orchestration for the HTTP layer

pub mod features;
pub mod preprocess;
pub mod model;
pub mod dataset;
pub mod training;
pub mod prediction;
