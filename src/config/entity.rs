//! Per-stage configuration records

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::training::ElasticNetParams;

/// How strictly the dataset header must match the schema
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaStrictness {
    /// Every expected column present; extra and reordered columns allowed
    #[default]
    Lenient,
    /// Exactly the expected columns, in any order
    Exact,
    /// Exactly the expected columns, in schema order
    Ordered,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataIngestionConfig {
    pub root_dir: PathBuf,
    /// `http(s)://` URL, `file://` URI or local path
    pub source_url: String,
    pub local_data_file: PathBuf,
    pub unzip_dir: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataValidationConfig {
    pub root_dir: PathBuf,
    pub data_path: PathBuf,
    pub status_file: PathBuf,
    /// Expected column names, in schema order
    pub columns: Vec<String>,
    pub strictness: SchemaStrictness,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DataTransformationConfig {
    pub root_dir: PathBuf,
    pub data_path: PathBuf,
    /// Validation marker that must read `Validation status: true` before splitting
    pub status_file: Option<PathBuf>,
    /// Fraction of rows held out for testing, in (0, 1)
    pub test_size: f64,
    pub random_seed: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelTrainerConfig {
    pub root_dir: PathBuf,
    pub train_data_path: PathBuf,
    pub test_data_path: PathBuf,
    pub model_name: String,
    pub target_column: String,
    pub params: ElasticNetParams,
}

impl ModelTrainerConfig {
    pub fn model_path(&self) -> PathBuf {
        self.root_dir.join(&self.model_name)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelEvaluationConfig {
    pub root_dir: PathBuf,
    pub test_data_path: PathBuf,
    pub model_path: PathBuf,
    /// Hyperparameters logged to the tracking run
    pub all_params: serde_yaml::Value,
    pub metric_file_name: PathBuf,
    pub target_column: String,
    pub mlflow_uri: String,
}
