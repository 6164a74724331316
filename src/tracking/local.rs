//! File-store tracking backend
//!
//! Layout below the root directory:
//!
//! ```text
//! <root>/<experiment_id>/<run_id>/run.json
//! <root>/<experiment_id>/<run_id>/artifacts/...
//! <root>/models/<name>/version-<n>/...
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::{RunInfo, RunStatus, TrackingClient};
use crate::error::{PipelineError, Result};
use crate::utils::{load_json, save_json};

const RUN_FILE: &str = "run.json";
const VERSION_FILE: &str = "version.json";
const MODELS_DIR: &str = "models";

/// Persisted state of one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub run_id: String,
    pub run_name: String,
    pub experiment_id: String,
    pub status: RunStatus,
    /// Milliseconds since the Unix epoch
    pub start_time: i64,
    pub end_time: Option<i64>,
    pub params: BTreeMap<String, String>,
    pub metrics: BTreeMap<String, f64>,
    /// Artifact paths relative to the run's artifact root
    pub artifacts: Vec<String>,
}

/// One registered model version
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelVersion {
    pub name: String,
    pub version: u32,
    pub run_id: String,
    pub source: String,
}

/// Tracking client backed by a local directory
#[derive(Debug, Clone)]
pub struct LocalTracker {
    root: PathBuf,
    uri: String,
    experiment_id: String,
}

impl LocalTracker {
    /// Open (creating if needed) a file store rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Result<Self> {
        let root = root.into();
        fs::create_dir_all(&root)?;
        let uri = root.display().to_string();
        Ok(Self {
            root,
            uri,
            experiment_id: "0".to_string(),
        })
    }

    pub fn with_experiment_id(mut self, experiment_id: impl Into<String>) -> Self {
        self.experiment_id = experiment_id.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn run_dir(&self, experiment_id: &str, run_id: &str) -> PathBuf {
        self.root.join(experiment_id).join(run_id)
    }

    fn artifact_root(&self, run: &RunInfo) -> PathBuf {
        self.run_dir(&run.experiment_id, &run.run_id).join("artifacts")
    }

    /// Read the stored state of `run`
    pub fn load_run(&self, run: &RunInfo) -> Result<RunRecord> {
        let path = self.run_dir(&run.experiment_id, &run.run_id).join(RUN_FILE);
        if !path.exists() {
            return Err(PipelineError::TrackingError(format!(
                "unknown run: {}",
                run.run_id
            )));
        }
        load_json(&path)
    }

    /// Every run of the current experiment, oldest first
    pub fn list_runs(&self) -> Result<Vec<RunRecord>> {
        let exp_dir = self.root.join(&self.experiment_id);
        if !exp_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut runs = Vec::new();
        for entry in fs::read_dir(&exp_dir)? {
            let path = entry?.path().join(RUN_FILE);
            if path.is_file() {
                runs.push(load_json::<RunRecord>(&path)?);
            }
        }
        runs.sort_by(|a, b| a.start_time.cmp(&b.start_time).then(a.run_id.cmp(&b.run_id)));
        Ok(runs)
    }

    /// Registered versions of `name`, lowest first
    pub fn model_versions(&self, name: &str) -> Result<Vec<ModelVersion>> {
        let model_dir = self.root.join(MODELS_DIR).join(name);
        if !model_dir.is_dir() {
            return Ok(Vec::new());
        }

        let mut versions = Vec::new();
        for entry in fs::read_dir(&model_dir)? {
            let path = entry?.path().join(VERSION_FILE);
            if path.is_file() {
                versions.push(load_json::<ModelVersion>(&path)?);
            }
        }
        versions.sort_by_key(|v| v.version);
        Ok(versions)
    }

    /// Load, check the run is still accepting logs, apply `f`, store
    fn update_active<F>(&self, run: &RunInfo, f: F) -> Result<()>
    where
        F: FnOnce(&mut RunRecord),
    {
        let mut record = self.load_run(run)?;
        if record.status.is_terminal() {
            return Err(PipelineError::TrackingError(format!(
                "run {} is already {}",
                run.run_id,
                record.status.as_str()
            )));
        }
        f(&mut record);
        self.store(&record)
    }

    fn store(&self, record: &RunRecord) -> Result<()> {
        let path = self
            .run_dir(&record.experiment_id, &record.run_id)
            .join(RUN_FILE);
        save_json(&path, record)
    }
}

/// Copy every file below `src` into `dst`, returning the copied relative paths
fn copy_tree(src: &Path, dst: &Path) -> Result<Vec<String>> {
    if !src.is_dir() {
        return Err(PipelineError::TrackingError(format!(
            "artifact directory not found: {}",
            src.display()
        )));
    }

    let mut copied = Vec::new();
    for entry in WalkDir::new(src).sort_by_file_name() {
        let entry = entry.map_err(|e| PipelineError::TrackingError(e.to_string()))?;
        if !entry.file_type().is_file() {
            continue;
        }
        let rel = entry
            .path()
            .strip_prefix(src)
            .map_err(|e| PipelineError::TrackingError(e.to_string()))?;
        let target = dst.join(rel);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(entry.path(), &target)?;
        copied.push(rel.to_string_lossy().replace('\\', "/"));
    }
    Ok(copied)
}

fn join_artifact_path(prefix: &str, rel: &str) -> String {
    let prefix = prefix.trim_matches('/');
    if prefix.is_empty() {
        rel.to_string()
    } else {
        format!("{}/{}", prefix, rel)
    }
}

#[async_trait]
impl TrackingClient for LocalTracker {
    fn tracking_uri(&self) -> &str {
        &self.uri
    }

    async fn create_run(&self, run_name: &str) -> Result<RunInfo> {
        let run_id = uuid::Uuid::new_v4().simple().to_string();
        let info = RunInfo {
            artifact_uri: self
                .run_dir(&self.experiment_id, &run_id)
                .join("artifacts")
                .display()
                .to_string(),
            run_id,
            experiment_id: self.experiment_id.clone(),
        };

        let record = RunRecord {
            run_id: info.run_id.clone(),
            run_name: run_name.to_string(),
            experiment_id: info.experiment_id.clone(),
            status: RunStatus::Running,
            start_time: chrono::Utc::now().timestamp_millis(),
            end_time: None,
            params: BTreeMap::new(),
            metrics: BTreeMap::new(),
            artifacts: Vec::new(),
        };
        self.store(&record)?;
        debug!(run_id = %info.run_id, "local run created");
        Ok(info)
    }

    async fn log_param(&self, run: &RunInfo, key: &str, value: &str) -> Result<()> {
        self.update_active(run, |r| {
            r.params.insert(key.to_string(), value.to_string());
        })
    }

    async fn log_metric(&self, run: &RunInfo, key: &str, value: f64) -> Result<()> {
        self.update_active(run, |r| {
            r.metrics.insert(key.to_string(), value);
        })
    }

    async fn log_artifacts(
        &self,
        run: &RunInfo,
        local_dir: &Path,
        artifact_path: &str,
    ) -> Result<()> {
        // Reject before copying anything into a closed run
        self.update_active(run, |_| {})?;
        let dst = self.artifact_root(run).join(artifact_path.trim_matches('/'));
        let copied = copy_tree(local_dir, &dst)?;
        debug!(count = copied.len(), artifact_path, "artifacts copied");
        self.update_active(run, |r| {
            r.artifacts
                .extend(copied.iter().map(|rel| join_artifact_path(artifact_path, rel)));
        })
    }

    async fn log_model(
        &self,
        run: &RunInfo,
        model_dir: &Path,
        artifact_path: &str,
        registered_name: &str,
    ) -> Result<()> {
        self.log_artifacts(run, model_dir, artifact_path).await?;

        let next = self
            .model_versions(registered_name)?
            .last()
            .map(|v| v.version + 1)
            .unwrap_or(1);
        let version_dir = self
            .root
            .join(MODELS_DIR)
            .join(registered_name)
            .join(format!("version-{}", next));
        copy_tree(model_dir, &version_dir)?;

        let version = ModelVersion {
            name: registered_name.to_string(),
            version: next,
            run_id: run.run_id.clone(),
            source: format!(
                "{}/{}",
                run.artifact_uri.trim_end_matches('/'),
                artifact_path.trim_matches('/')
            ),
        };
        save_json(&version_dir.join(VERSION_FILE), &version)?;
        info!(name = registered_name, version = next, "model version registered");
        Ok(())
    }

    async fn end_run(&self, run: &RunInfo, status: RunStatus) -> Result<()> {
        if !status.is_terminal() {
            return Err(PipelineError::TrackingError(
                "a run can only be ended with a terminal status".to_string(),
            ));
        }
        self.update_active(run, |r| {
            r.status = status;
            r.end_time = Some(chrono::Utc::now().timestamp_millis());
        })
    }
}
