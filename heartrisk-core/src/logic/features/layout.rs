//! Feature Layout - Centralized Feature Schema
//!
//! **CRITICAL: This file controls the feature schema**
//!
//! ## Rules (NEVER break these):
//! 1. Add feature → increment FEATURE_VERSION
//! 2. Change order → increment FEATURE_VERSION
//! 3. Remove feature → increment FEATURE_VERSION
//!
//! The order below is the column order the model was trained on. Persisted
//! artifacts record the version and layout hash they were built against and
//! are rejected at load time when either differs.

use std::collections::HashMap;

use crc32fast::Hasher;
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

// ============================================================================
// FEATURE VERSION
// ============================================================================

/// Current feature layout version
/// MUST be incremented when layout changes
pub const FEATURE_VERSION: u8 = 1;

/// Total number of features
pub const FEATURE_COUNT: usize = 13;

// ============================================================================
// FEATURE SPEC
// ============================================================================

/// How a raw value for a feature is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeatureKind {
    /// Literal 0 or 1
    Binary,
    /// Any finite number, optionally bounded
    Numeric,
}

impl FeatureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureKind::Binary => "binary",
            FeatureKind::Numeric => "numeric",
        }
    }
}

/// Inclusive bounds for a numeric feature
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl Bounds {
    pub const NONE: Bounds = Bounds { min: None, max: None };

    pub const fn between(min: f64, max: f64) -> Self {
        Bounds { min: Some(min), max: Some(max) }
    }
}

/// One clinical feature definition
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureSpec {
    pub name: &'static str,
    pub kind: FeatureKind,
    pub bounds: Bounds,
    pub description: &'static str,
}

impl FeatureSpec {
    const fn binary(name: &'static str, description: &'static str) -> Self {
        Self { name, kind: FeatureKind::Binary, bounds: Bounds::NONE, description }
    }

    const fn numeric(name: &'static str, min: f64, max: f64, description: &'static str) -> Self {
        Self { name, kind: FeatureKind::Numeric, bounds: Bounds::between(min, max), description }
    }

    /// Constraints as reported to clients (binary features report 0..=1)
    pub fn constraints(&self) -> Bounds {
        match self.kind {
            FeatureKind::Binary => Bounds::between(0.0, 1.0),
            FeatureKind::Numeric => self.bounds,
        }
    }
}

// ============================================================================
// FEATURE LAYOUT (Authoritative source)
// ============================================================================

/// Features in exact order they appear in the vector
/// This is the SINGLE SOURCE OF TRUTH for feature layout
pub const FEATURE_LAYOUT: [FeatureSpec; FEATURE_COUNT] = [
    FeatureSpec::binary("male", "Sex of the patient (1 = male, 0 = female)"),                      // 0
    FeatureSpec::numeric("age", 18.0, 120.0, "Age in years"),                                        // 1
    FeatureSpec::numeric("education", 1.0, 4.0, "Education level (1-4)"),                           // 2
    FeatureSpec::binary("currentsmoker", "Current smoker (1 = yes, 0 = no)"),                        // 3
    FeatureSpec::numeric("cigsperday", 0.0, 100.0, "Cigarettes smoked per day"),                    // 4
    FeatureSpec::binary("bpmeds", "On blood pressure medication (1 = yes, 0 = no)"),                 // 5
    FeatureSpec::binary("prevalentstroke", "History of stroke (1 = yes, 0 = no)"),                   // 6
    FeatureSpec::binary("prevalenthyp", "Hypertensive (1 = yes, 0 = no)"),                           // 7
    FeatureSpec::binary("diabetes", "Diabetic (1 = yes, 0 = no)"),                                   // 8
    FeatureSpec::numeric("totchol", 100.0, 700.0, "Total cholesterol in mg/dL"),                     // 9
    FeatureSpec::numeric("bmi", 10.0, 70.0, "Body mass index in kg/m2"),                            // 10
    FeatureSpec::numeric("heartrate", 30.0, 220.0, "Resting heart rate in beats per minute"),        // 11
    FeatureSpec::numeric("glucose", 40.0, 500.0, "Fasting glucose in mg/dL"),                       // 12
];

// ============================================================================
// LAYOUT HASH
// ============================================================================

/// Compute CRC32 hash of the feature layout
/// Used to detect layout mismatches at runtime
pub fn compute_layout_hash() -> u32 {
    let mut hasher = Hasher::new();

    hasher.update(&[FEATURE_VERSION]);

    for spec in FEATURE_LAYOUT.iter() {
        hasher.update(spec.name.as_bytes());
        hasher.update(&[0]);
        hasher.update(spec.kind.as_str().as_bytes());
        hasher.update(&[0]);
    }

    hasher.finalize()
}

static LAYOUT_HASH: Lazy<u32> = Lazy::new(compute_layout_hash);

/// Get layout hash (cached)
pub fn layout_hash() -> u32 {
    *LAYOUT_HASH
}

// ============================================================================
// LAYOUT VALIDATION
// ============================================================================

/// Error when an artifact's feature layout doesn't match the running schema
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error(
    "Feature layout mismatch: expected v{expected_version} (hash: {expected_hash:08x}), \
     got v{actual_version} (hash: {actual_hash:08x})"
)]
pub struct LayoutMismatchError {
    pub expected_version: u8,
    pub expected_hash: u32,
    pub actual_version: u8,
    pub actual_hash: u32,
}

/// Validate that incoming data matches current layout
pub fn validate_layout(incoming_version: u8, incoming_hash: u32) -> Result<(), LayoutMismatchError> {
    let current_hash = layout_hash();

    if incoming_version != FEATURE_VERSION || incoming_hash != current_hash {
        return Err(LayoutMismatchError {
            expected_version: FEATURE_VERSION,
            expected_hash: current_hash,
            actual_version: incoming_version,
            actual_hash: incoming_hash,
        });
    }

    Ok(())
}

// ============================================================================
// SCHEMA REGISTRY
// ============================================================================

/// Self-describing entry reported to clients alongside validation errors
#[derive(Debug, Clone, Serialize)]
pub struct FeatureDescription {
    pub name: &'static str,
    #[serde(rename = "type")]
    pub kind: FeatureKind,
    pub description: &'static str,
    pub constraints: Bounds,
}

/// Ordered feature specs with lookup by name
#[derive(Debug)]
pub struct FeatureSchema {
    specs: &'static [FeatureSpec],
    index: HashMap<&'static str, usize>,
}

static SCHEMA: Lazy<FeatureSchema> = Lazy::new(|| FeatureSchema::new(&FEATURE_LAYOUT));

/// Process-wide schema, built once on first use
pub fn schema() -> &'static FeatureSchema {
    &SCHEMA
}

impl FeatureSchema {
    fn new(specs: &'static [FeatureSpec]) -> Self {
        let index: HashMap<_, _> = specs
            .iter()
            .enumerate()
            .map(|(i, spec)| (spec.name, i))
            .collect();

        // Duplicate names collapse in the index
        assert_eq!(index.len(), specs.len(), "duplicate feature name in FEATURE_LAYOUT");

        Self { specs, index }
    }

    pub fn specs(&self) -> &'static [FeatureSpec] {
        self.specs
    }

    pub fn len(&self) -> usize {
        self.specs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.specs.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&'static FeatureSpec> {
        self.index.get(name).map(|&i| &self.specs[i])
    }

    /// Position of a feature in the vector
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.specs.iter().map(|spec| spec.name)
    }

    pub fn describe(&self) -> Vec<FeatureDescription> {
        self.specs
            .iter()
            .map(|spec| FeatureDescription {
                name: spec.name,
                kind: spec.kind,
                description: spec.description,
                constraints: spec.constraints(),
            })
            .collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================
