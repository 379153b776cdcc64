//! Input Validator
//!
//! Checks an untyped field-to-value mapping against the feature schema.
//! Every violation is collected; malformed input is reported, never raised.

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde_json::{Map, Value};

use super::layout::{FeatureKind, FeatureSchema, FeatureSpec};

/// Raw request payload: feature name → untyped value
pub type PatientRecord = Map<String, Value>;

// ============================================================================
// VIOLATIONS
// ============================================================================

/// One reason a record was rejected
#[derive(Debug, Clone, PartialEq)]
pub enum Violation {
    Missing(Vec<String>),
    Unexpected(Vec<String>),
    NotBinary { name: &'static str },
    InvalidNumber { name: &'static str },
    BelowMinimum { name: &'static str, value: f64, min: f64 },
    AboveMaximum { name: &'static str, value: f64, max: f64 },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Missing(names) => write!(f, "Missing required features: {}", names.join(", ")),
            Violation::Unexpected(names) => write!(f, "Unexpected features: {}", names.join(", ")),
            Violation::NotBinary { name } => write!(f, "'{}' must be 0 or 1", name),
            Violation::InvalidNumber { name } => write!(f, "'{}' has invalid numeric format", name),
            Violation::BelowMinimum { name, value, min } => {
                write!(f, "'{}' value {} is below minimum {}", name, value, min)
            }
            Violation::AboveMaximum { name, value, max } => {
                write!(f, "'{}' value {} is above maximum {}", name, value, max)
            }
        }
    }
}

// ============================================================================
// VALIDATION RESULT
// ============================================================================

/// Parsed values of a record that passed validation
///
/// Only constructed by [`validate_record`]; holds exactly one finite value
/// per schema feature.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRecord {
    values: HashMap<&'static str, f64>,
}

impl ValidatedRecord {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ValidationResult {
    Valid(ValidatedRecord),
    Invalid(Vec<Violation>),
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid(_))
    }

    /// Violations in report order (empty when valid)
    pub fn violations(&self) -> &[Violation] {
        match self {
            ValidationResult::Valid(_) => &[],
            ValidationResult::Invalid(violations) => violations,
        }
    }

    /// Human-readable violation strings
    pub fn messages(&self) -> Vec<String> {
        self.violations().iter().map(ToString::to_string).collect()
    }

    pub fn into_result(self) -> Result<ValidatedRecord, Vec<Violation>> {
        match self {
            ValidationResult::Valid(record) => Ok(record),
            ValidationResult::Invalid(violations) => Err(violations),
        }
    }
}

// ============================================================================
// VALIDATION
// ============================================================================

/// Validate a raw record against the schema
///
/// Order of violations: missing features, unexpected features, then one
/// entry per offending field in schema order.
pub fn validate_record(schema: &FeatureSchema, record: &PatientRecord) -> ValidationResult {
    let mut violations = Vec::new();

    let missing: BTreeSet<&str> = schema.names().filter(|name| !record.contains_key(*name)).collect();
    if !missing.is_empty() {
        violations.push(Violation::Missing(missing.into_iter().map(String::from).collect()));
    }

    let extra: BTreeSet<&str> = record
        .keys()
        .map(String::as_str)
        .filter(|key| !schema.contains(key))
        .collect();
    if !extra.is_empty() {
        violations.push(Violation::Unexpected(extra.into_iter().map(String::from).collect()));
    }

    let mut values = HashMap::with_capacity(schema.len());
    for spec in schema.specs() {
        let Some(raw) = record.get(spec.name) else {
            continue;
        };

        match check_value(spec, raw) {
            Ok(value) => {
                values.insert(spec.name, value);
            }
            Err(mut field_violations) => violations.append(&mut field_violations),
        }
    }

    if violations.is_empty() {
        ValidationResult::Valid(ValidatedRecord { values })
    } else {
        ValidationResult::Invalid(violations)
    }
}

fn check_value(spec: &FeatureSpec, raw: &Value) -> Result<f64, Vec<Violation>> {
    match spec.kind {
        FeatureKind::Binary => match raw.as_f64() {
            Some(v) if v == 0.0 || v == 1.0 => Ok(v),
            _ => Err(vec![Violation::NotBinary { name: spec.name }]),
        },
        FeatureKind::Numeric => {
            let value = parse_numeric(raw).ok_or_else(|| vec![Violation::InvalidNumber { name: spec.name }])?;

            let mut out_of_range = Vec::new();
            if let Some(min) = spec.bounds.min {
                if value < min {
                    out_of_range.push(Violation::BelowMinimum { name: spec.name, value, min });
                }
            }
            if let Some(max) = spec.bounds.max {
                if value > max {
                    out_of_range.push(Violation::AboveMaximum { name: spec.name, value, max });
                }
            }

            if out_of_range.is_empty() {
                Ok(value)
            } else {
                Err(out_of_range)
            }
        }
    }
}

/// JSON numbers and numeric strings; booleans, null and non-finite values are rejected
fn parse_numeric(raw: &Value) -> Option<f64> {
    let value = match raw {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };

    value.is_finite().then_some(value)
}

// ============================================================================
// TESTS
// ============================================================================
