//! Experiment tracking
//!
//! A [`TrackingClient`] appends parameters, metrics and artifacts to a run
//! owned by a tracking service. Two clients are provided:
//!
//! - [`MlflowClient`] talks to an MLflow-compatible server over its REST API
//! - [`LocalTracker`] keeps runs and registered models in a directory tree
//!
//! Runs are opened and closed through [`with_run`], which guarantees the run
//! reaches a terminal state exactly once.

mod local;
mod mlflow;
mod model_export;
mod run;

pub use local::{LocalTracker, ModelVersion, RunRecord};
pub use mlflow::{MlflowAuth, MlflowClient};
pub use model_export::{export_mlflow_model, ScratchDir, MLMODEL_FILE, MODEL_DATA_FILE};
pub use run::with_run;

use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{PipelineError, Result};

/// Lifecycle state of a tracking run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RunStatus {
    Running,
    Finished,
    Failed,
}

impl RunStatus {
    /// Name used on the MLflow wire protocol
    pub fn as_str(&self) -> &'static str {
        match self {
            RunStatus::Running => "RUNNING",
            RunStatus::Finished => "FINISHED",
            RunStatus::Failed => "FAILED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RunStatus::Running)
    }
}

/// Identity of an open run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunInfo {
    pub run_id: String,
    pub experiment_id: String,
    pub artifact_uri: String,
}

/// Model-publication capability of a tracking backend
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrackingBackend {
    /// Supports logging a model and registering it by name
    Registry,
    /// Accepts plain artifact uploads only (DagsHub-hosted MLflow)
    ArtifactOnly,
}

impl TrackingBackend {
    /// Resolve the capability of the backend behind `uri`
    pub fn from_uri(uri: &str) -> Self {
        if uri.to_lowercase().contains("dagshub") {
            TrackingBackend::ArtifactOnly
        } else {
            TrackingBackend::Registry
        }
    }
}

/// Client for an experiment-tracking service
#[async_trait]
pub trait TrackingClient: Send + Sync {
    /// URI the client is pointed at
    fn tracking_uri(&self) -> &str;

    /// Open a new run
    async fn create_run(&self, run_name: &str) -> Result<RunInfo>;

    async fn log_param(&self, run: &RunInfo, key: &str, value: &str) -> Result<()>;

    /// Log several parameters, in order
    async fn log_params(&self, run: &RunInfo, params: &[(String, String)]) -> Result<()> {
        for (key, value) in params {
            self.log_param(run, key, value).await?;
        }
        Ok(())
    }

    async fn log_metric(&self, run: &RunInfo, key: &str, value: f64) -> Result<()>;

    /// Upload every file below `local_dir` under `artifact_path`
    async fn log_artifacts(&self, run: &RunInfo, local_dir: &Path, artifact_path: &str)
        -> Result<()>;

    /// Log a model directory and register it as a new version of `registered_name`
    async fn log_model(
        &self,
        run: &RunInfo,
        model_dir: &Path,
        artifact_path: &str,
        registered_name: &str,
    ) -> Result<()>;

    /// Move the run to a terminal state
    async fn end_run(&self, run: &RunInfo, status: RunStatus) -> Result<()>;
}

/// Build a client for `uri`.
///
/// `http(s)://` addresses an MLflow server; `file://` URIs and plain paths
/// select a local file store.
pub fn connect(uri: &str) -> Result<Box<dyn TrackingClient>> {
    let uri = uri.trim();
    if uri.is_empty() {
        return Err(PipelineError::ConfigError("tracking URI is empty".to_string()));
    }

    let lower = uri.to_lowercase();
    let client: Box<dyn TrackingClient> = if lower.starts_with("http://")
        || lower.starts_with("https://")
    {
        Box::new(MlflowClient::from_env(uri)?)
    } else if lower.starts_with("file:") {
        let path = url::Url::parse(uri)
            .ok()
            .and_then(|u| u.to_file_path().ok())
            .ok_or_else(|| PipelineError::ConfigError(format!("invalid file URI: {}", uri)))?;
        Box::new(LocalTracker::new(path)?)
    } else if uri.contains("://") {
        return Err(PipelineError::ConfigError(format!(
            "unsupported tracking URI scheme: {}",
            uri
        )));
    } else {
        Box::new(LocalTracker::new(uri)?)
    };

    info!(uri = %uri, "tracking client connected");
    Ok(client)
}
