use std::collections::HashMap;
use std::fs;
use std::path::Path;

use crate::logic::features::layout::{FeatureSchema, FEATURE_COUNT};
use crate::logic::preprocess::RawRow;

use super::{DatasetError, TrainingSet, TARGET_COLUMN};

const MISSING_MARKERS: &[&str] = &["", "na", "nan", "null"];

/// Read a comma-separated training file
pub fn read_csv(path: &Path, schema: &FeatureSchema) -> Result<TrainingSet, DatasetError> {
    log::info!("Reading training data from {}", path.display());
    let text = fs::read_to_string(path)?;
    parse_csv(&text, schema)
}

/// Parse CSV text: header names are lower-cased, `NA`/empty cells are
/// missing, unknown columns are ignored, unlabelled rows are skipped.
pub fn parse_csv(text: &str, schema: &FeatureSchema) -> Result<TrainingSet, DatasetError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, line)| (i + 1, line))
        .filter(|(_, line)| !line.trim().is_empty());

    let (_, header) = lines.next().ok_or(DatasetError::MissingHeader)?;
    let header: Vec<String> = header.split(',').map(|h| unquote(h).to_lowercase()).collect();

    let mut positions = HashMap::with_capacity(header.len());
    for (i, name) in header.iter().enumerate() {
        if positions.insert(name.as_str(), i).is_some() {
            return Err(DatasetError::DuplicateColumn(name.clone()));
        }
    }

    let mut feature_columns = [0usize; FEATURE_COUNT];
    for (slot, name) in feature_columns.iter_mut().zip(schema.names()) {
        *slot = *positions
            .get(name)
            .ok_or_else(|| DatasetError::MissingColumn(name.to_string()))?;
    }
    let target_column = *positions
        .get(TARGET_COLUMN)
        .ok_or_else(|| DatasetError::MissingColumn(TARGET_COLUMN.to_string()))?;

    let ignored: Vec<&str> = header
        .iter()
        .map(String::as_str)
        .filter(|h| *h != TARGET_COLUMN && !schema.contains(h))
        .collect();
    if !ignored.is_empty() {
        log::warn!("Ignoring columns not in the feature schema: {}", ignored.join(", "));
    }

    let mut set = TrainingSet::default();
    let mut skipped = 0usize;

    for (line_no, line) in lines {
        let cells: Vec<&str> = line.split(',').map(unquote).collect();
        if cells.len() != header.len() {
            return Err(DatasetError::RaggedRow {
                line: line_no,
                expected: header.len(),
                actual: cells.len(),
            });
        }

        let label = match parse_cell(cells[target_column]) {
            Ok(Some(v)) if v == 0.0 || v == 1.0 => v as u8,
            _ => {
                skipped += 1;
                continue;
            }
        };

        let mut row: RawRow = [None; FEATURE_COUNT];
        for ((slot, &col), name) in row.iter_mut().zip(&feature_columns).zip(schema.names()) {
            *slot = parse_cell(cells[col]).map_err(|value| DatasetError::InvalidCell {
                line: line_no,
                column: name.to_string(),
                value,
            })?;
        }

        set.rows.push(row);
        set.labels.push(label);
    }

    if skipped > 0 {
        log::warn!("Skipped {} rows without a valid '{}' label", skipped, TARGET_COLUMN);
    }
    if set.is_empty() {
        return Err(DatasetError::NoRows);
    }

    log::info!(
        "Loaded {} labelled rows ({} positive)",
        set.len(),
        set.positives()
    );
    Ok(set)
}

fn unquote(cell: &str) -> &str {
    cell.trim().trim_matches('"').trim()
}

fn parse_cell(cell: &str) -> Result<Option<f64>, String> {
    if MISSING_MARKERS.iter().any(|m| cell.eq_ignore_ascii_case(m)) {
        return Ok(None);
    }
    cell.parse::<f64>()
        .map(Some)
        .map_err(|_| cell.to_string())
}
