//! Model trainer: fit the elastic net on the training partition

use tracing::info;

use crate::config::ModelTrainerConfig;
use crate::error::Result;
use crate::training::FittedModel;
use crate::utils::DataLoader;

pub struct ModelTrainer {
    config: ModelTrainerConfig,
}

impl ModelTrainer {
    pub fn new(config: ModelTrainerConfig) -> Self {
        Self { config }
    }

    /// Fit on `train_data_path` and write the model to `root_dir/model_name`
    pub fn train(&self) -> Result<FittedModel> {
        let train = DataLoader::new().load_csv(&self.config.train_data_path)?;
        let model = FittedModel::fit(&train, &self.config.target_column, &self.config.params)?;

        let path = self.config.model_path();
        model.save(&path)?;
        info!(path = %path.display(), features = model.feature_names.len(), "model saved");
        Ok(model)
    }
}
