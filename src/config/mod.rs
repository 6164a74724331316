//! Configuration provider
//!
//! Reads `config.yaml` (paths), `params.yaml` (hyperparameters) and
//! `schema.yaml` (expected columns and target) once, and hands each stage an
//! immutable record built from them.

pub mod entity;

pub use entity::{
    DataIngestionConfig, DataTransformationConfig, DataValidationConfig, ModelEvaluationConfig,
    ModelTrainerConfig, SchemaStrictness,
};

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::error::{PipelineError, Result};
use crate::training::ElasticNetParams;
use crate::utils::{create_directories, read_yaml};

pub const CONFIG_FILE_PATH: &str = "config/config.yaml";
pub const PARAMS_FILE_PATH: &str = "params.yaml";
pub const SCHEMA_FILE_PATH: &str = "schema.yaml";

/// Environment variable overriding `model_evaluation.mlflow_uri`
pub const TRACKING_URI_ENV: &str = "MLFLOW_TRACKING_URI";

#[derive(Debug, Clone, Deserialize)]
struct ConfigFile {
    artifacts_root: PathBuf,
    data_ingestion: IngestionSection,
    data_validation: ValidationSection,
    data_transformation: TransformationSection,
    model_trainer: TrainerSection,
    model_evaluation: EvaluationSection,
}

#[derive(Debug, Clone, Deserialize)]
struct IngestionSection {
    root_dir: PathBuf,
    source_url: String,
    local_data_file: PathBuf,
    unzip_dir: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
struct ValidationSection {
    root_dir: PathBuf,
    data_path: PathBuf,
    status_file: PathBuf,
    #[serde(default)]
    schema_strictness: SchemaStrictness,
}

#[derive(Debug, Clone, Deserialize)]
struct TransformationSection {
    root_dir: PathBuf,
    data_path: PathBuf,
    #[serde(default)]
    status_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
struct TrainerSection {
    root_dir: PathBuf,
    train_data_path: PathBuf,
    test_data_path: PathBuf,
    model_name: String,
}

#[derive(Debug, Clone, Deserialize)]
struct EvaluationSection {
    root_dir: PathBuf,
    test_data_path: PathBuf,
    model_path: PathBuf,
    metric_file_name: PathBuf,
    mlflow_uri: String,
}

fn default_test_size() -> f64 {
    0.25
}

fn default_seed() -> u64 {
    42
}

#[derive(Debug, Clone, Deserialize)]
struct SplitParams {
    #[serde(default = "default_test_size")]
    test_size: f64,
    #[serde(default = "default_seed")]
    random_seed: u64,
}

impl Default for SplitParams {
    fn default() -> Self {
        Self {
            test_size: default_test_size(),
            random_seed: default_seed(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ParamsFile {
    elastic_net: ElasticNetParams,
    #[serde(default)]
    split: SplitParams,
}

#[derive(Debug, Clone, Deserialize)]
struct SchemaFile {
    columns: serde_yaml::Mapping,
    target_column: TargetColumn,
}

#[derive(Debug, Clone, Deserialize)]
struct TargetColumn {
    name: String,
}

/// `env_override` wins when set and non-empty
pub fn resolve_tracking_uri(configured: &str, env_override: Option<String>) -> String {
    env_override
        .filter(|uri| !uri.trim().is_empty())
        .unwrap_or_else(|| configured.to_string())
}

/// Builds stage configuration records from the three YAML files
#[derive(Debug, Clone)]
pub struct ConfigurationManager {
    config: ConfigFile,
    params: ParamsFile,
    /// `elastic_net` section kept verbatim for tracking
    all_params: serde_yaml::Value,
    columns: Vec<String>,
    target_column: String,
}

impl ConfigurationManager {
    /// Load all three files and create the artifacts root
    pub fn new(config_path: &Path, params_path: &Path, schema_path: &Path) -> Result<Self> {
        let config: ConfigFile = read_yaml(config_path)?;
        let raw_params: serde_yaml::Value = read_yaml(params_path)?;
        let params: ParamsFile = serde_yaml::from_value(raw_params.clone()).map_err(|e| {
            PipelineError::ConfigError(format!("invalid params in {}: {}", params_path.display(), e))
        })?;
        let schema: SchemaFile = read_yaml(schema_path)?;

        let columns = schema
            .columns
            .keys()
            .map(|key| {
                key.as_str().map(str::to_string).ok_or_else(|| {
                    PipelineError::ConfigError(format!("schema column name is not a string: {:?}", key))
                })
            })
            .collect::<Result<Vec<_>>>()?;

        create_directories(&[&config.artifacts_root])?;
        info!(
            artifacts_root = %config.artifacts_root.display(),
            columns = columns.len(),
            target = %schema.target_column.name,
            "configuration loaded"
        );

        Ok(Self {
            all_params: raw_params.get("elastic_net").cloned().unwrap_or_default(),
            config,
            params,
            columns,
            target_column: schema.target_column.name,
        })
    }

    /// Load from the conventional locations relative to the working directory
    pub fn from_default_paths() -> Result<Self> {
        Self::new(
            Path::new(CONFIG_FILE_PATH),
            Path::new(PARAMS_FILE_PATH),
            Path::new(SCHEMA_FILE_PATH),
        )
    }

    pub fn target_column(&self) -> &str {
        &self.target_column
    }

    pub fn get_data_ingestion_config(&self) -> Result<DataIngestionConfig> {
        let section = &self.config.data_ingestion;
        create_directories(&[&section.root_dir])?;

        Ok(DataIngestionConfig {
            root_dir: section.root_dir.clone(),
            source_url: section.source_url.clone(),
            local_data_file: section.local_data_file.clone(),
            unzip_dir: section.unzip_dir.clone(),
        })
    }

    pub fn get_data_validation_config(&self) -> Result<DataValidationConfig> {
        let section = &self.config.data_validation;
        create_directories(&[&section.root_dir])?;

        Ok(DataValidationConfig {
            root_dir: section.root_dir.clone(),
            data_path: section.data_path.clone(),
            status_file: section.status_file.clone(),
            columns: self.columns.clone(),
            strictness: section.schema_strictness,
        })
    }

    pub fn get_data_transformation_config(&self) -> Result<DataTransformationConfig> {
        let section = &self.config.data_transformation;
        let split = &self.params.split;
        if !(split.test_size > 0.0 && split.test_size < 1.0) {
            return Err(PipelineError::InvalidParameter {
                name: "split.test_size".to_string(),
                value: split.test_size.to_string(),
                reason: "must be strictly between 0 and 1".to_string(),
            });
        }
        create_directories(&[&section.root_dir])?;

        Ok(DataTransformationConfig {
            root_dir: section.root_dir.clone(),
            data_path: section.data_path.clone(),
            status_file: section.status_file.clone(),
            test_size: split.test_size,
            random_seed: split.random_seed,
        })
    }

    pub fn get_model_trainer_config(&self) -> Result<ModelTrainerConfig> {
        let section = &self.config.model_trainer;
        create_directories(&[&section.root_dir])?;

        Ok(ModelTrainerConfig {
            root_dir: section.root_dir.clone(),
            train_data_path: section.train_data_path.clone(),
            test_data_path: section.test_data_path.clone(),
            model_name: section.model_name.clone(),
            target_column: self.target_column.clone(),
            params: self.params.elastic_net.clone(),
        })
    }

    /// Evaluation record; `MLFLOW_TRACKING_URI` overrides the configured URI
    pub fn get_model_evaluation_config(&self) -> Result<ModelEvaluationConfig> {
        let section = &self.config.model_evaluation;
        create_directories(&[&section.root_dir])?;

        Ok(ModelEvaluationConfig {
            root_dir: section.root_dir.clone(),
            test_data_path: section.test_data_path.clone(),
            model_path: section.model_path.clone(),
            all_params: self.all_params.clone(),
            metric_file_name: section.metric_file_name.clone(),
            target_column: self.target_column.clone(),
            mlflow_uri: resolve_tracking_uri(
                &section.mlflow_uri,
                std::env::var(TRACKING_URI_ENV).ok(),
            ),
        })
    }
}
