//! Shared fixtures for integration tests

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use mlproject::tracking::{RunInfo, RunStatus, TrackingClient};
use mlproject::Result;
use walkdir::WalkDir;

pub const HEADER: &str = "fixed acidity,alcohol,pH,quality";

/// Deterministic wine-like dataset with a linear target plus bounded noise
pub fn wine_csv(n: usize) -> String {
    let mut out = String::from(HEADER);
    out.push('\n');
    for i in 0..n {
        let acidity = 6.0 + ((i * 7) % 30) as f64 / 5.0;
        let alcohol = 9.0 + ((i * 13) % 40) as f64 / 10.0;
        let ph = 3.0 + ((i * 3) % 10) as f64 / 20.0;
        let noise = (((i * 17) % 7) as f64 - 3.0) / 10.0;
        let quality = 0.3 * acidity + 0.5 * alcohol - 1.0 * ph + noise;
        out.push_str(&format!("{:.3},{:.3},{:.3},{:.3}\n", acidity, alcohol, ph, quality));
    }
    out
}

pub fn write_wine_csv(path: &Path, n: usize) -> PathBuf {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, wine_csv(n)).unwrap();
    path.to_path_buf()
}

/// Config, params and schema files for a project rooted at `root`
pub struct ProjectFiles {
    pub config: PathBuf,
    pub params: PathBuf,
    pub schema: PathBuf,
    pub artifacts: PathBuf,
}

pub fn write_project(root: &Path, source: &Path, tracking_uri: &str) -> ProjectFiles {
    let a = root.join("artifacts");
    let config = format!(
        r#"
artifacts_root: "{a}"
data_ingestion:
  root_dir: "{a}/data_ingestion"
  source_url: "{src}"
  local_data_file: "{a}/data_ingestion/data.csv"
  unzip_dir: "{a}/data_ingestion"
data_validation:
  root_dir: "{a}/data_validation"
  data_path: "{a}/data_ingestion/data.csv"
  status_file: "{a}/data_validation/status.txt"
data_transformation:
  root_dir: "{a}/data_transformation"
  data_path: "{a}/data_ingestion/data.csv"
  status_file: "{a}/data_validation/status.txt"
model_trainer:
  root_dir: "{a}/model_trainer"
  train_data_path: "{a}/data_transformation/train.csv"
  test_data_path: "{a}/data_transformation/test.csv"
  model_name: model.json
model_evaluation:
  root_dir: "{a}/model_evaluation"
  test_data_path: "{a}/data_transformation/test.csv"
  model_path: "{a}/model_trainer/model.json"
  metric_file_name: "{a}/model_evaluation/metrics.json"
  mlflow_uri: "{uri}"
"#,
        a = a.display(),
        src = source.display(),
        uri = tracking_uri,
    );
    let params = "elastic_net:\n  alpha: 0.2\n  l1_ratio: 0.1\nsplit:\n  test_size: 0.25\n  random_seed: 42\n";
    let schema = "columns:\n  fixed acidity: float64\n  alcohol: float64\n  pH: float64\n  quality: float64\ntarget_column:\n  name: quality\n";

    let files = ProjectFiles {
        config: root.join("config.yaml"),
        params: root.join("params.yaml"),
        schema: root.join("schema.yaml"),
        artifacts: a,
    };
    fs::write(&files.config, config).unwrap();
    fs::write(&files.params, params).unwrap();
    fs::write(&files.schema, schema).unwrap();
    files
}

/// A tracking call observed by [`RecordingClient`]
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    CreateRun(String),
    LogParam(String, String),
    LogMetric(String, f64),
    LogArtifacts {
        artifact_path: String,
        files: Vec<String>,
    },
    LogModel {
        artifact_path: String,
        registered_name: String,
        files: Vec<String>,
    },
    EndRun(RunStatus),
}

/// Tracking client that records every call in order
pub struct RecordingClient {
    uri: String,
    calls: Mutex<Vec<Call>>,
}

impl RecordingClient {
    pub fn new(uri: &str) -> Self {
        Self {
            uri: uri.to_string(),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn end_runs(&self) -> Vec<RunStatus> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                Call::EndRun(status) => Some(status),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

fn list_files(dir: &Path) -> Vec<String> {
    WalkDir::new(dir)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.file_name().to_string_lossy().to_string())
        .collect()
}

#[async_trait]
impl TrackingClient for RecordingClient {
    fn tracking_uri(&self) -> &str {
        &self.uri
    }

    async fn create_run(&self, run_name: &str) -> Result<RunInfo> {
        self.record(Call::CreateRun(run_name.to_string()));
        Ok(RunInfo {
            run_id: "run-1".to_string(),
            experiment_id: "0".to_string(),
            artifact_uri: "memory://run-1/artifacts".to_string(),
        })
    }

    async fn log_param(&self, _run: &RunInfo, key: &str, value: &str) -> Result<()> {
        self.record(Call::LogParam(key.to_string(), value.to_string()));
        Ok(())
    }

    async fn log_metric(&self, _run: &RunInfo, key: &str, value: f64) -> Result<()> {
        self.record(Call::LogMetric(key.to_string(), value));
        Ok(())
    }

    async fn log_artifacts(
        &self,
        _run: &RunInfo,
        local_dir: &Path,
        artifact_path: &str,
    ) -> Result<()> {
        self.record(Call::LogArtifacts {
            artifact_path: artifact_path.to_string(),
            files: list_files(local_dir),
        });
        Ok(())
    }

    async fn log_model(
        &self,
        _run: &RunInfo,
        model_dir: &Path,
        artifact_path: &str,
        registered_name: &str,
    ) -> Result<()> {
        self.record(Call::LogModel {
            artifact_path: artifact_path.to_string(),
            registered_name: registered_name.to_string(),
            files: list_files(model_dir),
        });
        Ok(())
    }

    async fn end_run(&self, _run: &RunInfo, status: RunStatus) -> Result<()> {
        self.record(Call::EndRun(status));
        Ok(())
    }
}
