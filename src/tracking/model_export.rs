//! MLflow model-directory export

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::training::FittedModel;

/// Descriptor file MLflow looks for at the root of a model directory
pub const MLMODEL_FILE: &str = "MLmodel";
/// Serialized estimator inside the model directory
pub const MODEL_DATA_FILE: &str = "model.json";

const FLAVOR: &str = "mlproject";

#[derive(Debug, Serialize)]
struct MlModelDescriptor {
    artifact_path: String,
    flavors: BTreeMap<String, Flavor>,
    model_uuid: String,
    utc_time_created: String,
    signature: Signature,
}

#[derive(Debug, Serialize)]
struct Flavor {
    data: String,
    estimator: String,
    version: String,
}

/// Column specs, JSON-encoded the way MLflow stores them
#[derive(Debug, Serialize)]
struct Signature {
    inputs: String,
    outputs: String,
}

#[derive(Debug, Serialize)]
struct ColumnSpec<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    dtype: &'a str,
}

/// Write `model` into `dir` as an MLflow model directory (`MLmodel` + `model.json`)
pub fn export_mlflow_model(model: &FittedModel, dir: &Path, artifact_path: &str) -> Result<()> {
    fs::create_dir_all(dir)?;
    model.save(&dir.join(MODEL_DATA_FILE))?;

    let inputs: Vec<ColumnSpec<'_>> = model
        .feature_names
        .iter()
        .map(|name| ColumnSpec { name: name.as_str(), dtype: "double" })
        .collect();
    let outputs = [ColumnSpec { name: model.target_column.as_str(), dtype: "double" }];

    let mut flavors = BTreeMap::new();
    flavors.insert(
        FLAVOR.to_string(),
        Flavor {
            data: MODEL_DATA_FILE.to_string(),
            estimator: "ElasticNetRegression".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        },
    );

    let descriptor = MlModelDescriptor {
        artifact_path: artifact_path.to_string(),
        flavors,
        model_uuid: uuid::Uuid::new_v4().simple().to_string(),
        utc_time_created: chrono::Utc::now().format("%Y-%m-%d %H:%M:%S%.6f").to_string(),
        signature: Signature {
            inputs: serde_json::to_string(&inputs)?,
            outputs: serde_json::to_string(&outputs)?,
        },
    };
    let yaml = serde_yaml::to_string(&descriptor)
        .map_err(|e| PipelineError::SerializationError(e.to_string()))?;
    fs::write(dir.join(MLMODEL_FILE), yaml)?;

    debug!(dir = %dir.display(), "model exported");
    Ok(())
}

/// Temporary local directory removed when dropped.
///
/// Removal failures are logged at warning level and otherwise ignored.
#[derive(Debug)]
pub struct ScratchDir {
    path: PathBuf,
}

impl ScratchDir {
    /// Create an empty directory at `path`, clearing leftovers from an earlier run
    pub fn create(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if path.exists() {
            fs::remove_dir_all(&path)?;
        }
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for ScratchDir {
    fn drop(&mut self) {
        if let Err(e) = fs::remove_dir_all(&self.path) {
            warn!(path = %self.path.display(), error = %e, "failed to remove scratch directory");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::training::ElasticNetParams;
    use polars::prelude::*;

    fn fitted() -> FittedModel {
        let df = df!(
            "a" => &[1.0, 2.0, 3.0, 4.0],
            "b" => &[0.3, 0.1, 0.4, 0.2],
            "quality" => &[5.0, 6.0, 7.0, 8.0]
        )
        .unwrap();
        let params = ElasticNetParams { alpha: 0.01, l1_ratio: 0.5, ..Default::default() };
        FittedModel::fit(&df, "quality", &params).unwrap()
    }

    #[test]
    fn test_export_writes_descriptor_and_model() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("model");
        export_mlflow_model(&fitted(), &out, "model").unwrap();

        let descriptor: serde_yaml::Value =
            serde_yaml::from_str(&fs::read_to_string(out.join(MLMODEL_FILE)).unwrap()).unwrap();
        assert_eq!(descriptor["artifact_path"].as_str(), Some("model"));
        assert_eq!(descriptor["flavors"]["mlproject"]["data"].as_str(), Some("model.json"));
        let inputs = descriptor["signature"]["inputs"].as_str().unwrap();
        assert!(inputs.contains("\"name\":\"a\""));

        let loaded = FittedModel::load(&out.join(MODEL_DATA_FILE)).unwrap();
        assert_eq!(loaded.feature_names, vec!["a", "b"]);
    }

    #[test]
    fn test_scratch_dir_removed_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("temp_saved_model");
        fs::create_dir_all(&path).unwrap();
        fs::write(path.join("stale.txt"), "old").unwrap();

        {
            let scratch = ScratchDir::create(&path).unwrap();
            assert!(!scratch.path().join("stale.txt").exists());
            fs::write(scratch.path().join("model.json"), "{}").unwrap();
        }
        assert!(!path.exists());
    }

    #[test]
    fn test_scratch_dir_already_gone_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let scratch = ScratchDir::create(dir.path().join("tmp")).unwrap();
        fs::remove_dir_all(scratch.path()).unwrap();
        drop(scratch);
    }
}
