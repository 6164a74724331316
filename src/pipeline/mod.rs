//! Pipeline driver
//!
//! Runs the training stages strictly in order. The first failing stage stops
//! the pipeline: its error is logged in full and returned unchanged.

mod stages;

pub use stages::{
    DataIngestionStage, DataTransformationStage, DataValidationStage, ModelEvaluationStage,
    ModelTrainerStage,
};

use async_trait::async_trait;
use tracing::{error, info};

use crate::config::ConfigurationManager;
use crate::error::{PipelineError, Result};

/// One sequential step of the pipeline
#[async_trait]
pub trait Stage: Send + Sync {
    fn name(&self) -> &str;

    async fn run(&self) -> Result<()>;
}

/// Log `err` with its Debug form and every underlying cause
fn log_failure(stage: &str, err: &PipelineError) {
    error!(stage, "{}", err);
    error!(stage, "{:?}", err);
    let mut source = std::error::Error::source(err);
    while let Some(cause) = source {
        error!(stage, "caused by: {}", cause);
        source = cause.source();
    }
}

pub struct TrainingPipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl TrainingPipeline {
    /// Ingestion, validation, transformation, training, evaluation
    pub fn from_config(config: &ConfigurationManager) -> Result<Self> {
        Ok(Self::with_stages(vec![
            Box::new(DataIngestionStage::new(config.get_data_ingestion_config()?)),
            Box::new(DataValidationStage::new(config.get_data_validation_config()?)),
            Box::new(DataTransformationStage::new(config.get_data_transformation_config()?)),
            Box::new(ModelTrainerStage::new(config.get_model_trainer_config()?)),
            Box::new(ModelEvaluationStage::new(config.get_model_evaluation_config()?)),
        ]))
    }

    pub fn with_stages(stages: Vec<Box<dyn Stage>>) -> Self {
        Self { stages }
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Run every stage in order, stopping at the first failure
    pub async fn run(&self) -> Result<()> {
        for stage in &self.stages {
            let name = stage.name();
            info!(">>>>>> Stage {} started <<<<<<", name);
            if let Err(err) = stage.run().await {
                log_failure(name, &err);
                return Err(err);
            }
            info!(">>>>>> Stage {} completed <<<<<<\n\nx==========x", name);
        }
        Ok(())
    }
}
