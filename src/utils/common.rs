//! Small file helpers shared by the configuration layer and the stages

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};

/// Read and deserialize a YAML file.
///
/// An empty file is a configuration error rather than a silent default.
pub fn read_yaml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let contents = fs::read_to_string(path).map_err(|e| {
        PipelineError::ConfigError(format!("cannot read {}: {}", path.display(), e))
    })?;
    if contents.trim().is_empty() {
        return Err(PipelineError::ConfigError(format!(
            "yaml file is empty: {}",
            path.display()
        )));
    }
    let value = serde_yaml::from_str(&contents).map_err(|e| {
        PipelineError::ConfigError(format!("invalid yaml in {}: {}", path.display(), e))
    })?;
    info!(path = %path.display(), "yaml file loaded");
    Ok(value)
}

/// Create every directory in `paths`, including parents
pub fn create_directories<P: AsRef<Path>>(paths: &[P]) -> Result<()> {
    for path in paths {
        let path = path.as_ref();
        fs::create_dir_all(path)?;
        debug!(path = %path.display(), "created directory");
    }
    Ok(())
}

/// Write `data` as pretty JSON, creating parent directories as needed.
/// Any previous file at `path` is overwritten.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, data: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(data)?;
    fs::write(path, json)?;
    info!(path = %path.display(), "json file saved");
    Ok(())
}

/// Read and deserialize a JSON file
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let json = fs::read_to_string(path)?;
    let value = serde_json::from_str(&json)?;
    debug!(path = %path.display(), "json file loaded");
    Ok(value)
}

/// File size rounded to whole kilobytes
pub fn get_size_kb(path: &Path) -> Result<u64> {
    let bytes = fs::metadata(path)?.len();
    Ok((bytes as f64 / 1024.0).round() as u64)
}
