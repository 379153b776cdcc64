//! Features Module - Schema, Validation & Vectorization
//!
//! Turns an untyped request payload into the model's positional input.
//!
//! - `layout` - Feature schema registry (order, kinds, bounds)
//! - `validate` - Fail-slow input validator
//! - `vector` - Name-keyed projection into a `FeatureVector`

pub mod layout;
pub mod validate;
pub mod vector;


// Re-export common types
pub use layout::{
    schema, FeatureDescription, FeatureKind, FeatureSchema, FeatureSpec, FEATURE_COUNT,
    FEATURE_VERSION,
};
pub use validate::{validate_record, PatientRecord, ValidatedRecord, ValidationResult, Violation};
pub use vector::{FeatureVector, VectorizeError};
