//! Preprocessing Pipeline - fit once, transform many
//!
//! Numeric branch: mean imputation → standard scaling.
//! Categorical branch: most-frequent imputation → one-hot (ignore unknown)
//! → scale-only normalization (no centering, indicators stay sparse).
//!
//! Output columns: numeric branch in schema order, then each categorical
//! column's indicators in schema order, categories ascending.

use ndarray::{Array1, Array2};
use serde::{Deserialize, Serialize};

use crate::logic::features::layout::{
    layout_hash, FeatureKind, FeatureSchema, FEATURE_COUNT, FEATURE_VERSION,
};
use crate::logic::features::vector::FeatureVector;

use super::PreprocessError;

/// One raw training/serving row in schema order; `None` marks a missing cell
pub type RawRow = [Option<f64>; FEATURE_COUNT];

// ============================================================================
// UNFITTED PIPELINE
// ============================================================================

/// Column assignment, before any statistics are known
///
/// `fit` consumes the pipeline, so a fitted artifact can't be refit and an
/// unfitted one can't transform.
#[derive(Debug, Clone)]
pub struct PreprocessingPipeline {
    numeric: Vec<(usize, &'static str)>,
    categorical: Vec<(usize, &'static str)>,
}

impl PreprocessingPipeline {
    /// Numeric features → numeric branch, binary features → categorical branch
    pub fn from_schema(schema: &FeatureSchema) -> Self {
        let mut numeric = Vec::new();
        let mut categorical = Vec::new();

        for (index, spec) in schema.specs().iter().enumerate() {
            match spec.kind {
                FeatureKind::Numeric => numeric.push((index, spec.name)),
                FeatureKind::Binary => categorical.push((index, spec.name)),
            }
        }

        log::info!("Numerical columns: {:?}", numeric.iter().map(|c| c.1).collect::<Vec<_>>());
        log::info!("Categorical columns: {:?}", categorical.iter().map(|c| c.1).collect::<Vec<_>>());

        Self { numeric, categorical }
    }

    pub fn fit(self, rows: &[RawRow]) -> Result<FittedPipeline, PreprocessError> {
        if rows.is_empty() {
            return Err(PreprocessError::EmptyDataset);
        }

        let numeric = self
            .numeric
            .iter()
            .map(|&(index, name)| NumericColumn::fit(index, name, rows))
            .collect::<Result<Vec<_>, _>>()?;

        let categorical = self
            .categorical
            .iter()
            .map(|&(index, name)| CategoricalColumn::fit(index, name, rows))
            .collect::<Result<Vec<_>, _>>()?;

        let fitted = FittedPipeline {
            feature_version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            fitted_at: chrono::Utc::now(),
            n_samples: rows.len(),
            numeric,
            categorical,
        };

        log::info!(
            "Preprocessing pipeline fitted on {} rows ({} output features)",
            fitted.n_samples,
            fitted.output_dim()
        );

        Ok(fitted)
    }
}

// ============================================================================
// FITTED PARAMETERS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericColumn {
    pub name: String,
    pub index: usize,
    pub impute_value: f64,
    pub mean: f64,
    pub scale: f64,
}

impl NumericColumn {
    fn fit(index: usize, name: &str, rows: &[RawRow]) -> Result<Self, PreprocessError> {
        let observed: Vec<f64> = observed_values(rows, index).collect();
        if observed.is_empty() {
            return Err(PreprocessError::NoObservedValues(name.to_string()));
        }
        let impute_value = observed.iter().sum::<f64>() / observed.len() as f64;

        let imputed: Vec<f64> = rows.iter().map(|row| cell(row, index).unwrap_or(impute_value)).collect();
        let (mean, std) = mean_std(&imputed);

        Ok(Self {
            name: name.to_string(),
            index,
            impute_value,
            mean,
            scale: non_zero_scale(std),
        })
    }

    fn transform(&self, row: &RawRow) -> f64 {
        let value = cell(row, self.index).unwrap_or(self.impute_value);
        (value - self.mean) / self.scale
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColumn {
    pub name: String,
    pub index: usize,
    pub impute_value: f64,
    /// Observed vocabulary, ascending
    pub categories: Vec<f64>,
    /// One scale per indicator column
    pub scales: Vec<f64>,
}

impl CategoricalColumn {
    fn fit(index: usize, name: &str, rows: &[RawRow]) -> Result<Self, PreprocessError> {
        let mut observed: Vec<f64> = observed_values(rows, index).collect();
        if observed.is_empty() {
            return Err(PreprocessError::NoObservedValues(name.to_string()));
        }
        observed.sort_by(f64::total_cmp);
        let impute_value = most_frequent(&observed);

        let imputed: Vec<f64> = rows.iter().map(|row| cell(row, index).unwrap_or(impute_value)).collect();

        let mut categories = imputed.clone();
        categories.sort_by(f64::total_cmp);
        categories.dedup();

        let scales = categories
            .iter()
            .map(|&category| {
                let indicator: Vec<f64> = imputed.iter().map(|&v| if v == category { 1.0 } else { 0.0 }).collect();
                non_zero_scale(mean_std(&indicator).1)
            })
            .collect();

        Ok(Self {
            name: name.to_string(),
            index,
            impute_value,
            categories,
            scales,
        })
    }

    /// Unknown categories produce an all-zero block
    fn transform_into(&self, row: &RawRow, out: &mut Vec<f64>) {
        let value = cell(row, self.index).unwrap_or(self.impute_value);
        out.extend(
            self.categories
                .iter()
                .zip(&self.scales)
                .map(|(&category, &scale)| if value == category { 1.0 / scale } else { 0.0 }),
        );
    }

    fn output_names(&self) -> impl Iterator<Item = String> + '_ {
        self.categories.iter().map(move |c| format!("{}_{}", self.name, c))
    }
}

// ============================================================================
// FITTED PIPELINE
// ============================================================================

/// Fitted, persisted transform from raw rows to model features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedPipeline {
    pub feature_version: u8,
    pub layout_hash: u32,
    pub fitted_at: chrono::DateTime<chrono::Utc>,
    pub n_samples: usize,
    pub numeric: Vec<NumericColumn>,
    pub categorical: Vec<CategoricalColumn>,
}

impl FittedPipeline {
    /// Width of a transformed row
    pub fn output_dim(&self) -> usize {
        self.numeric.len() + self.categorical.iter().map(|c| c.categories.len()).sum::<usize>()
    }

    pub fn feature_names_out(&self) -> Vec<String> {
        self.numeric
            .iter()
            .map(|c| c.name.clone())
            .chain(self.categorical.iter().flat_map(|c| c.output_names()))
            .collect()
    }

    pub fn transform_row(&self, row: &RawRow) -> Array1<f64> {
        let mut out = Vec::with_capacity(self.output_dim());
        out.extend(self.numeric.iter().map(|c| c.transform(row)));
        for column in &self.categorical {
            column.transform_into(row, &mut out);
        }
        Array1::from(out)
    }

    pub fn transform(&self, rows: &[RawRow]) -> Array2<f64> {
        let mut matrix = Array2::zeros((rows.len(), self.output_dim()));
        for (mut target, row) in matrix.rows_mut().into_iter().zip(rows) {
            target.assign(&self.transform_row(row));
        }
        matrix
    }

    /// Serving path: a complete vector has no missing cells
    pub fn transform_vector(&self, vector: &FeatureVector) -> Array2<f64> {
        let row: RawRow = vector.values.map(Some);
        self.transform(std::slice::from_ref(&row))
    }

    /// Structural checks done before a loaded pipeline is trusted
    ///
    /// Every schema feature must be handled exactly once, by the branch its
    /// kind calls for, with finite parameters and positive scales.
    pub fn verify(&self, schema: &FeatureSchema) -> Result<(), PreprocessError> {
        let mut seen = vec![false; schema.len()];

        let numeric = self.numeric.iter().map(|c| (c.index, c.name.as_str(), FeatureKind::Numeric));
        let categorical = self.categorical.iter().map(|c| (c.index, c.name.as_str(), FeatureKind::Binary));

        for (index, name, kind) in numeric.chain(categorical) {
            let spec = schema.specs().get(index).ok_or_else(|| {
                malformed(format!("column '{}' has index {} outside the schema", name, index))
            })?;
            if spec.name != name || spec.kind != kind {
                return Err(malformed(format!(
                    "column {} is '{}' ({}), schema has '{}' ({})",
                    index,
                    name,
                    kind.as_str(),
                    spec.name,
                    spec.kind.as_str()
                )));
            }
            if std::mem::replace(&mut seen[index], true) {
                return Err(malformed(format!("column '{}' appears more than once", name)));
            }
        }

        if let Some(missing) = schema.specs().iter().zip(&seen).find(|&(_, &s)| !s) {
            return Err(malformed(format!("feature '{}' is not handled", missing.0.name)));
        }

        for column in &self.numeric {
            let finite = column.impute_value.is_finite() && column.mean.is_finite() && column.scale.is_finite();
            if !finite || column.scale <= 0.0 {
                return Err(malformed(format!("numeric column '{}' has invalid parameters", column.name)));
            }
        }

        for column in &self.categorical {
            if column.categories.is_empty() || column.scales.len() != column.categories.len() {
                return Err(malformed(format!(
                    "categorical column '{}' has {} categories and {} scales",
                    column.name,
                    column.categories.len(),
                    column.scales.len()
                )));
            }
            let ascending = column.categories.windows(2).all(|w| w[0] < w[1]);
            let finite = column.impute_value.is_finite()
                && column.categories.iter().all(|c| c.is_finite())
                && column.scales.iter().all(|s| s.is_finite() && *s > 0.0);
            if !ascending || !finite {
                return Err(malformed(format!("categorical column '{}' has invalid parameters", column.name)));
            }
        }

        Ok(())
    }
}

fn malformed(message: String) -> PreprocessError {
    PreprocessError::Malformed(message)
}

// ============================================================================
// HELPERS
// ============================================================================

fn cell(row: &RawRow, index: usize) -> Option<f64> {
    row[index].filter(|v| !v.is_nan())
}

fn observed_values(rows: &[RawRow], index: usize) -> impl Iterator<Item = f64> + '_ {
    rows.iter().filter_map(move |row| cell(row, index))
}

/// Population mean and standard deviation
fn mean_std(values: &[f64]) -> (f64, f64) {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

fn non_zero_scale(std: f64) -> f64 {
    if std > f64::EPSILON { std } else { 1.0 }
}

/// Mode of a sorted slice; ties resolve to the smallest value
fn most_frequent(sorted: &[f64]) -> f64 {
    let mut best = sorted[0];
    let mut best_count = 0;
    let mut i = 0;

    while i < sorted.len() {
        let value = sorted[i];
        let run = sorted[i..].iter().take_while(|&&v| v == value).count();
        if run > best_count {
            best = value;
            best_count = run;
        }
        i += run;
    }

    best
}
