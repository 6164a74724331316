//! MLflow REST client (API 2.0)

use std::path::Path;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use walkdir::WalkDir;

use super::{RunInfo, RunStatus, TrackingClient};
use crate::error::{PipelineError, Result};

const ENV_USERNAME: &str = "MLFLOW_TRACKING_USERNAME";
const ENV_PASSWORD: &str = "MLFLOW_TRACKING_PASSWORD";
const ENV_TOKEN: &str = "MLFLOW_TRACKING_TOKEN";
const ENV_EXPERIMENT_ID: &str = "MLFLOW_EXPERIMENT_ID";

/// Credentials sent with every request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MlflowAuth {
    Basic { username: String, password: String },
    Bearer(String),
}

/// Client for an MLflow tracking server
#[derive(Debug, Clone)]
pub struct MlflowClient {
    base_url: String,
    experiment_id: String,
    auth: Option<MlflowAuth>,
    http: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct CreateRunResponse {
    run: RunPayload,
}

#[derive(Debug, Deserialize)]
struct RunPayload {
    info: RunInfoPayload,
}

#[derive(Debug, Deserialize)]
struct RunInfoPayload {
    run_id: String,
    experiment_id: String,
    artifact_uri: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    message: String,
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

impl MlflowClient {
    pub fn new(tracking_uri: &str) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("mlproject/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PipelineError::TrackingError(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            base_url: tracking_uri.trim().trim_end_matches('/').to_string(),
            experiment_id: "0".to_string(),
            auth: None,
            http,
        })
    }

    /// Client configured from the `MLFLOW_TRACKING_*` environment variables
    pub fn from_env(tracking_uri: &str) -> Result<Self> {
        let env = |key: &str| std::env::var(key).ok().filter(|v| !v.is_empty());

        let mut client = Self::new(tracking_uri)?;
        if let Some(id) = env(ENV_EXPERIMENT_ID) {
            client = client.with_experiment_id(id);
        }
        client.auth = resolve_auth(env(ENV_USERNAME), env(ENV_PASSWORD), env(ENV_TOKEN));
        Ok(client)
    }

    pub fn with_experiment_id(mut self, experiment_id: impl Into<String>) -> Self {
        self.experiment_id = experiment_id.into();
        self
    }

    pub fn with_auth(mut self, auth: MlflowAuth) -> Self {
        self.auth = Some(auth);
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/2.0/mlflow/{}", self.base_url, path)
    }

    /// Upload URL of one artifact file through the server's artifact proxy
    fn artifact_url(&self, run: &RunInfo, artifact_path: &str) -> String {
        format!(
            "{}/api/2.0/mlflow-artifacts/artifacts/{}/{}",
            self.base_url,
            artifact_proxy_prefix(run),
            artifact_path.trim_matches('/')
        )
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Some(MlflowAuth::Basic { username, password }) => {
                request.basic_auth(username, Some(password))
            }
            Some(MlflowAuth::Bearer(token)) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let detail = match serde_json::from_str::<ApiError>(&body) {
            Ok(err) if !err.error_code.is_empty() => format!("{}: {}", err.error_code, err.message),
            _ => body,
        };
        Err(PipelineError::TrackingError(format!(
            "{} failed with HTTP {}: {}",
            what, status, detail
        )))
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: Value) -> Result<T> {
        let request = self.authorize(self.http.post(self.endpoint(path)).json(&body));
        let response = Self::check(request.send().await?, path).await?;
        Ok(response.json::<T>().await?)
    }

    async fn upload_file(&self, run: &RunInfo, file: &Path, artifact_path: &str) -> Result<()> {
        let bytes = tokio::fs::read(file).await?;
        let request = self.authorize(self.http.put(self.artifact_url(run, artifact_path)).body(bytes));
        Self::check(request.send().await?, "artifact upload").await?;
        debug!(artifact_path, "artifact uploaded");
        Ok(())
    }

    async fn create_registered_model(&self, name: &str) -> Result<()> {
        let request = self.authorize(
            self.http
                .post(self.endpoint("registered-models/create"))
                .json(&json!({ "name": name })),
        );
        let response = request.send().await?;
        if response.status().is_success() {
            info!(name, "registered model created");
            return Ok(());
        }

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        match serde_json::from_str::<ApiError>(&body) {
            Ok(err) if err.error_code == "RESOURCE_ALREADY_EXISTS" => Ok(()),
            _ => Err(PipelineError::TrackingError(format!(
                "registered-models/create failed with HTTP {}: {}",
                status, body
            ))),
        }
    }
}

/// Basic credentials need both halves and win over a token
fn resolve_auth(
    username: Option<String>,
    password: Option<String>,
    token: Option<String>,
) -> Option<MlflowAuth> {
    match (username, password, token) {
        (Some(username), Some(password), _) => Some(MlflowAuth::Basic { username, password }),
        (_, _, Some(token)) => Some(MlflowAuth::Bearer(token)),
        _ => None,
    }
}

/// `<experiment>/<run>/artifacts` path the artifact proxy expects for `run`
fn artifact_proxy_prefix(run: &RunInfo) -> String {
    let fallback = || format!("{}/{}/artifacts", run.experiment_id, run.run_id);

    match run.artifact_uri.strip_prefix("mlflow-artifacts:") {
        Some(rest) => {
            let rest = match rest.strip_prefix("//") {
                // mlflow-artifacts://host:port/<path>
                Some(with_host) => with_host.split_once('/').map(|(_, p)| p).unwrap_or(""),
                None => rest,
            };
            let rest = rest.trim_matches('/');
            if rest.is_empty() {
                fallback()
            } else {
                rest.to_string()
            }
        }
        None => fallback(),
    }
}

#[async_trait]
impl TrackingClient for MlflowClient {
    fn tracking_uri(&self) -> &str {
        &self.base_url
    }

    async fn create_run(&self, run_name: &str) -> Result<RunInfo> {
        let body = json!({
            "experiment_id": self.experiment_id,
            "run_name": run_name,
            "start_time": now_millis(),
            "tags": [{ "key": "mlflow.runName", "value": run_name }],
        });
        let created: CreateRunResponse = self.post("runs/create", body).await?;
        let info = created.run.info;
        Ok(RunInfo {
            run_id: info.run_id,
            experiment_id: info.experiment_id,
            artifact_uri: info.artifact_uri,
        })
    }

    async fn log_param(&self, run: &RunInfo, key: &str, value: &str) -> Result<()> {
        let body = json!({ "run_id": run.run_id, "key": key, "value": value });
        let _: Value = self.post("runs/log-parameter", body).await?;
        Ok(())
    }

    async fn log_metric(&self, run: &RunInfo, key: &str, value: f64) -> Result<()> {
        let body = json!({
            "run_id": run.run_id,
            "key": key,
            "value": value,
            "timestamp": now_millis(),
            "step": 0,
        });
        let _: Value = self.post("runs/log-metric", body).await?;
        Ok(())
    }

    async fn log_artifacts(
        &self,
        run: &RunInfo,
        local_dir: &Path,
        artifact_path: &str,
    ) -> Result<()> {
        if !local_dir.is_dir() {
            return Err(PipelineError::TrackingError(format!(
                "artifact directory not found: {}",
                local_dir.display()
            )));
        }

        for entry in WalkDir::new(local_dir).sort_by_file_name() {
            let entry = entry.map_err(|e| PipelineError::TrackingError(e.to_string()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let rel = entry
                .path()
                .strip_prefix(local_dir)
                .map_err(|e| PipelineError::TrackingError(e.to_string()))?
                .to_string_lossy()
                .replace('\\', "/");
            let target = format!("{}/{}", artifact_path.trim_matches('/'), rel);
            self.upload_file(run, entry.path(), &target).await?;
        }
        Ok(())
    }

    async fn log_model(
        &self,
        run: &RunInfo,
        model_dir: &Path,
        artifact_path: &str,
        registered_name: &str,
    ) -> Result<()> {
        self.log_artifacts(run, model_dir, artifact_path).await?;
        self.create_registered_model(registered_name).await?;

        let source = format!(
            "{}/{}",
            run.artifact_uri.trim_end_matches('/'),
            artifact_path.trim_matches('/')
        );
        let body = json!({ "name": registered_name, "source": source, "run_id": run.run_id });
        let created: Value = self.post("model-versions/create", body).await?;
        let version = created["model_version"]["version"].as_str().unwrap_or("?");
        info!(name = registered_name, version, "model version registered");
        Ok(())
    }

    async fn end_run(&self, run: &RunInfo, status: RunStatus) -> Result<()> {
        let body = json!({
            "run_id": run.run_id,
            "status": status.as_str(),
            "end_time": now_millis(),
        });
        let _: Value = self.post("runs/update", body).await?;
        Ok(())
    }
}
