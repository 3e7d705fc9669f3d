//! Host metadata dimensions supplied by a locally installed agent.
//!
//! The agent publishes a well-known indirection file whose content is the
//! path of a JSON object with string properties. Every property becomes a
//! dimension on every exported line.

use crate::core::{ExporterError, Result};
use crate::metrics::types::Dimension;
use serde_json::{Map, Value};
use std::path::Path;
use tracing::debug;

/// Name of the indirection file, resolved against the working directory
pub const METADATA_INDIRECTION_FILE: &str = "dt_metadata_e617c525669e072eebe3d0f08212e8f2.json";

/// Read metadata dimensions via the well-known indirection file.
///
/// Any failure yields an empty list.
pub fn read_metadata() -> Vec<Dimension> {
    read_metadata_from(Path::new(METADATA_INDIRECTION_FILE))
}

/// Read metadata dimensions via an explicit indirection file.
pub fn read_metadata_from(indirection_file: &Path) -> Vec<Dimension> {
    match try_read_metadata(indirection_file) {
        Ok(dimensions) => {
            debug!("Read {} metadata dimensions", dimensions.len());
            dimensions
        },
        Err(e) => {
            debug!("No metadata from {}: {}", indirection_file.display(), e);
            Vec::new()
        },
    }
}

fn try_read_metadata(indirection_file: &Path) -> Result<Vec<Dimension>> {
    let contents = std::fs::read_to_string(indirection_file)?;
    let metadata_file = contents.trim();
    if metadata_file.is_empty() {
        return Err(ExporterError::config("metadata file name is empty"));
    }

    let properties: Map<String, Value> = serde_json::from_str(&std::fs::read_to_string(metadata_file)?)?;

    Ok(properties
        .into_iter()
        .filter_map(|(key, value)| match value {
            Value::String(value) => Some(Dimension::new(key, value)),
            _ => None,
        })
        .collect())
}
