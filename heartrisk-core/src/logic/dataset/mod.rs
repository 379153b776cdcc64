//! Dataset Module - Training data for the offline pipeline
//!
//! Reads the tabular training file into schema-ordered raw rows plus the
//! ten-year CHD label, and produces the seeded train/holdout split.

pub mod reader;


use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use crate::logic::preprocess::RawRow;

pub use reader::{parse_csv, read_csv};

/// Label column in the training file
pub const TARGET_COLUMN: &str = "tenyearchd";

#[derive(Debug, thiserror::Error)]
pub enum DatasetError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("training file has no header row")]
    MissingHeader,
    #[error("training file is missing column '{0}'")]
    MissingColumn(String),
    #[error("column '{0}' appears more than once")]
    DuplicateColumn(String),
    #[error("line {line}: expected {expected} cells, found {actual}")]
    RaggedRow { line: usize, expected: usize, actual: usize },
    #[error("line {line}: column '{column}' has non-numeric value '{value}'")]
    InvalidCell { line: usize, column: String, value: String },
    #[error("training file has no labelled rows")]
    NoRows,
    #[error("holdout fraction {0} must be in [0, 1)")]
    InvalidFraction(f64),
}

/// Raw rows with their labels, index-aligned
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrainingSet {
    pub rows: Vec<RawRow>,
    pub labels: Vec<u8>,
}

impl TrainingSet {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn positives(&self) -> usize {
        self.labels.iter().filter(|&&l| l == 1).count()
    }

    /// Seeded shuffle, then split off `fraction` of the rows as holdout
    pub fn holdout_split(self, fraction: f64, seed: u64) -> Result<(TrainingSet, TrainingSet), DatasetError> {
        if !(0.0..1.0).contains(&fraction) {
            return Err(DatasetError::InvalidFraction(fraction));
        }
        if self.is_empty() {
            return Err(DatasetError::NoRows);
        }

        let mut order: Vec<usize> = (0..self.len()).collect();
        order.shuffle(&mut StdRng::seed_from_u64(seed));

        let holdout_len = ((self.len() as f64) * fraction).round() as usize;
        let holdout_len = holdout_len.min(self.len() - 1);
        let (holdout_idx, train_idx) = order.split_at(holdout_len);

        let pick = |indices: &[usize]| TrainingSet {
            rows: indices.iter().map(|&i| self.rows[i]).collect(),
            labels: indices.iter().map(|&i| self.labels[i]).collect(),
        };

        Ok((pick(train_idx), pick(holdout_idx)))
    }
}
