//! Feature Vector - Core data structure for model input
//!
//! **Versioned feature vector with layout validation**
//!
//! Values are always projected by name in schema order, never in the
//! iteration order of the incoming record.

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

use super::layout::{
    layout_hash, validate_layout, FeatureSchema, LayoutMismatchError, FEATURE_COUNT,
    FEATURE_LAYOUT, FEATURE_VERSION,
};
use super::validate::ValidatedRecord;

// ============================================================================
// VERSIONED FEATURE VECTOR
// ============================================================================

/// Versioned Feature Vector with layout metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    /// Feature layout version
    pub version: u8,
    /// CRC32 hash of the feature layout (for mismatch detection)
    pub layout_hash: u32,
    /// Feature values in order defined by FEATURE_LAYOUT
    pub values: [f64; FEATURE_COUNT],
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum VectorizeError {
    #[error("validated record has no value for '{0}'")]
    MissingValue(&'static str),
    #[error("schema has {actual} features, vector holds {expected}")]
    SchemaSize { expected: usize, actual: usize },
}

impl FeatureVector {
    /// Create from raw values with current version
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self {
            version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            values,
        }
    }

    /// Project a validated record into schema order
    ///
    /// `vector[i] = record[schema[i].name]`
    pub fn from_record(schema: &FeatureSchema, record: &ValidatedRecord) -> Result<Self, VectorizeError> {
        if schema.len() != FEATURE_COUNT {
            return Err(VectorizeError::SchemaSize { expected: FEATURE_COUNT, actual: schema.len() });
        }

        let mut values = [0.0f64; FEATURE_COUNT];
        for (slot, spec) in values.iter_mut().zip(schema.specs()) {
            *slot = record.get(spec.name).ok_or(VectorizeError::MissingValue(spec.name))?;
        }

        Ok(Self::from_values(values))
    }

    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn view(&self) -> ArrayView1<'_, f64> {
        ArrayView1::from(&self.values[..])
    }

    /// Single-row matrix for batch-oriented classifiers
    pub fn to_row_matrix(&self) -> Array2<f64> {
        self.view().insert_axis(ndarray::Axis(0)).to_owned()
    }

    /// Get feature by index
    pub fn get(&self, index: usize) -> Option<f64> {
        self.values.get(index).copied()
    }

    /// Get feature by name
    pub fn get_by_name(&self, name: &str) -> Option<f64> {
        FEATURE_LAYOUT
            .iter()
            .position(|spec| spec.name == name)
            .and_then(|i| self.get(i))
    }

    /// Validate that this vector is compatible with current layout
    pub fn validate(&self) -> Result<(), LayoutMismatchError> {
        validate_layout(self.version, self.layout_hash)
    }

    pub fn is_compatible(&self) -> bool {
        self.validate().is_ok()
    }

    /// Convert to JSON-serializable format for logging
    pub fn to_log_entry(&self) -> serde_json::Value {
        serde_json::json!({
            "feature_version": self.version,
            "layout_hash": self.layout_hash,
            "named_values": FEATURE_LAYOUT.iter()
                .zip(self.values.iter())
                .map(|(spec, value)| (spec.name.to_string(), serde_json::json!(value)))
                .collect::<serde_json::Map<_, _>>(),
        })
    }
}

// ============================================================================
// TESTS
// ============================================================================
