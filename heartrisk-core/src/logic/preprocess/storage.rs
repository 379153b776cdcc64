use std::fs;
use std::path::Path;

use crate::logic::features::layout::{schema, validate_layout};

use super::pipeline::FittedPipeline;
use super::PreprocessError;

/// Save fitted pipeline to disk
pub fn save_pipeline(pipeline: &FittedPipeline, path: &Path) -> Result<(), PreprocessError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_vec_pretty(pipeline)?;
    fs::write(path, json)?;

    log::info!("Preprocessor saved to {}", path.display());
    Ok(())
}

/// Load fitted pipeline from disk with layout and structure validation
pub fn load_pipeline(path: &Path) -> Result<FittedPipeline, PreprocessError> {
    let data = fs::read(path)?;
    let pipeline: FittedPipeline = serde_json::from_slice(&data)?;

    validate_layout(pipeline.feature_version, pipeline.layout_hash)?;
    pipeline.verify(schema())?;

    log::info!(
        "Preprocessor loaded from {} ({} output features)",
        path.display(),
        pipeline.output_dim()
    );
    Ok(pipeline)
}
