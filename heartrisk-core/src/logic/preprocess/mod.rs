//! Preprocessing Module - Training-time feature transform
//!
//! Fitted once offline, persisted as JSON, and reloaded read-only by the
//! prediction service so serving features go through the identical transform.

pub mod pipeline;
pub mod storage;

#[cfg(test)]
mod tests;

use crate::logic::features::layout::LayoutMismatchError;

pub use pipeline::{CategoricalColumn, FittedPipeline, NumericColumn, PreprocessingPipeline, RawRow};
pub use storage::{load_pipeline, save_pipeline};

#[derive(Debug, thiserror::Error)]
pub enum PreprocessError {
    #[error("cannot fit preprocessing pipeline on an empty dataset")]
    EmptyDataset,
    #[error("column '{0}' has no observed values")]
    NoObservedValues(String),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization Error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Preprocessor {0}")]
    LayoutMismatch(#[from] LayoutMismatchError),
    #[error("malformed preprocessor: {0}")]
    Malformed(String),
}
