//! Model evaluation: score the model on held-out data and publish the results

use tracing::info;

use crate::config::ModelEvaluationConfig;
use crate::error::Result;
use crate::tracking::{
    connect, export_mlflow_model, with_run, ScratchDir, TrackingBackend, TrackingClient,
};
use crate::training::{eval_metrics, FittedModel, RegressionMetrics};
use crate::utils::{column_to_array1, save_json, DataLoader};

/// Name the model is registered under on registry-capable backends
pub const REGISTERED_MODEL_NAME: &str = "ElasticnetModel";
/// Artifact path of the exported model inside the run
pub const MODEL_ARTIFACT_PATH: &str = "model";

const RUN_NAME: &str = "model_evaluation";
const SCRATCH_DIR: &str = "temp_saved_model";

/// String form of a YAML scalar; other values are JSON-encoded, or
/// debug-formatted when JSON cannot represent them
fn yaml_to_param(value: &serde_yaml::Value) -> String {
    match value {
        serde_yaml::Value::String(s) => s.clone(),
        serde_yaml::Value::Number(n) => n.to_string(),
        serde_yaml::Value::Bool(b) => b.to_string(),
        serde_yaml::Value::Null => "None".to_string(),
        other => serde_json::to_string(other).unwrap_or_else(|_| format!("{:?}", other)),
    }
}

/// Parameters to log: the entries of `all_params` when it is a mapping, else none
pub fn params_to_log(all_params: &serde_yaml::Value) -> Vec<(String, String)> {
    match all_params {
        serde_yaml::Value::Mapping(map) => map
            .iter()
            .map(|(k, v)| (yaml_to_param(k), yaml_to_param(v)))
            .collect(),
        _ => Vec::new(),
    }
}

pub struct ModelEvaluation {
    config: ModelEvaluationConfig,
}

impl ModelEvaluation {
    pub fn new(config: ModelEvaluationConfig) -> Self {
        Self { config }
    }

    /// Evaluate and log to the tracking service at the configured URI.
    ///
    /// Returns the id of the (closed) tracking run.
    pub async fn log_into_mlflow(&self) -> Result<String> {
        let client = connect(&self.config.mlflow_uri)?;
        self.log_into_tracking(client.as_ref()).await
    }

    /// Evaluate and log through `client`; returns the closed run's id
    pub async fn log_into_tracking(&self, client: &dyn TrackingClient) -> Result<String> {
        let test = DataLoader::new().load_csv(&self.config.test_data_path)?;
        let model = FittedModel::load(&self.config.model_path)?;
        let backend = TrackingBackend::from_uri(client.tracking_uri());
        info!(uri = client.tracking_uri(), ?backend, "evaluating model");

        let (run, metrics) = with_run(client, RUN_NAME, |run| {
            let test = &test;
            let model = &model;
            async move {
                let actual = column_to_array1(test, &self.config.target_column)?;
                let predicted = model.predict(test)?;
                let metrics: RegressionMetrics = eval_metrics(&actual, &predicted)?;

                save_json(&self.config.metric_file_name, &metrics)?;

                client.log_params(&run, &params_to_log(&self.config.all_params)).await?;
                for (name, value) in metrics.as_pairs() {
                    client.log_metric(&run, name, value).await?;
                }

                let scratch = ScratchDir::create(self.config.root_dir.join(SCRATCH_DIR))?;
                export_mlflow_model(model, scratch.path(), MODEL_ARTIFACT_PATH)?;
                match backend {
                    TrackingBackend::ArtifactOnly => {
                        client
                            .log_artifacts(&run, scratch.path(), MODEL_ARTIFACT_PATH)
                            .await?
                    }
                    TrackingBackend::Registry => {
                        client
                            .log_model(
                                &run,
                                scratch.path(),
                                MODEL_ARTIFACT_PATH,
                                REGISTERED_MODEL_NAME,
                            )
                            .await?
                    }
                }
                Ok(metrics)
            }
        })
        .await?;

        info!(
            run_id = %run.run_id,
            rmse = metrics.rmse,
            mae = metrics.mae,
            r2 = metrics.r2,
            "model evaluated"
        );
        Ok(run.run_id)
    }
}
