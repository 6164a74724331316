//! The five training stages

use async_trait::async_trait;
use tracing::info;

use super::Stage;
use crate::components::{
    DataIngestion, DataTransformation, DataValidation, ModelEvaluation, ModelTrainer,
};
use crate::config::{
    DataIngestionConfig, DataTransformationConfig, DataValidationConfig, ModelEvaluationConfig,
    ModelTrainerConfig,
};
use crate::error::Result;

pub struct DataIngestionStage {
    config: DataIngestionConfig,
}

impl DataIngestionStage {
    pub fn new(config: DataIngestionConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Stage for DataIngestionStage {
    fn name(&self) -> &str {
        "Data Ingestion Stage"
    }

    async fn run(&self) -> Result<()> {
        let ingestion = DataIngestion::new(self.config.clone());
        ingestion.download_file().await?;
        ingestion.extract_zip_file()
    }
}

pub struct DataValidationStage {
    config: DataValidationConfig,
}

impl DataValidationStage {
    pub fn new(config: DataValidationConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Stage for DataValidationStage {
    fn name(&self) -> &str {
        "Data Validation Stage"
    }

    async fn run(&self) -> Result<()> {
        DataValidation::new(self.config.clone()).validate_all_columns()?;
        Ok(())
    }
}

pub struct DataTransformationStage {
    config: DataTransformationConfig,
}

impl DataTransformationStage {
    pub fn new(config: DataTransformationConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Stage for DataTransformationStage {
    fn name(&self) -> &str {
        "Data Transformation Stage"
    }

    async fn run(&self) -> Result<()> {
        DataTransformation::new(self.config.clone()).train_test_split()?;
        Ok(())
    }
}

pub struct ModelTrainerStage {
    config: ModelTrainerConfig,
}

impl ModelTrainerStage {
    pub fn new(config: ModelTrainerConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Stage for ModelTrainerStage {
    fn name(&self) -> &str {
        "Model Training Stage"
    }

    async fn run(&self) -> Result<()> {
        ModelTrainer::new(self.config.clone()).train()?;
        Ok(())
    }
}

pub struct ModelEvaluationStage {
    config: ModelEvaluationConfig,
}

impl ModelEvaluationStage {
    pub fn new(config: ModelEvaluationConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl Stage for ModelEvaluationStage {
    fn name(&self) -> &str {
        "Model Evaluation Stage"
    }

    async fn run(&self) -> Result<()> {
        let run_id = ModelEvaluation::new(self.config.clone()).log_into_mlflow().await?;
        info!(run_id = %run_id, "evaluation logged");
        Ok(())
    }
}
