//! Persisted model artifact

use std::path::Path;

use ndarray::Array1;
use polars::prelude::DataFrame;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::linear_models::{ElasticNetParams, ElasticNetRegression};
use crate::error::{PipelineError, Result};
use crate::utils::{column_to_array1, columns_to_array2, feature_columns, load_json, save_json};

/// A fitted estimator together with the column layout it was trained on.
///
/// Prediction selects features by name, so a frame whose columns are
/// reordered (or that still carries the target) predicts identically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FittedModel {
    pub feature_names: Vec<String>,
    pub target_column: String,
    pub estimator: ElasticNetRegression,
}

impl FittedModel {
    /// Fit on every column of `train` except `target`
    pub fn fit(train: &DataFrame, target: &str, params: &ElasticNetParams) -> Result<Self> {
        if train.height() == 0 {
            return Err(PipelineError::EmptyDataset("training set has no rows".to_string()));
        }
        let y = column_to_array1(train, target)?;
        let feature_names = feature_columns(train, target);
        let x = columns_to_array2(train, &feature_names)?;
        debug!(rows = x.nrows(), features = x.ncols(), "prepared training matrix");

        let mut estimator = ElasticNetRegression::from_params(params);
        estimator.fit(&x, &y)?;
        info!(
            alpha = params.alpha,
            l1_ratio = params.l1_ratio,
            iterations = estimator.n_iter,
            "elastic net fitted"
        );

        Ok(Self {
            feature_names,
            target_column: target.to_string(),
            estimator,
        })
    }

    pub fn predict(&self, df: &DataFrame) -> Result<Array1<f64>> {
        let x = columns_to_array2(df, &self.feature_names)?;
        self.estimator.predict(&x)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        save_json(path, self)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let model: Self = load_json(path).map_err(|e| {
            PipelineError::SerializationError(format!(
                "cannot load model from {}: {}",
                path.display(),
                e
            ))
        })?;
        if !model.estimator.is_fitted {
            return Err(PipelineError::ModelNotFitted);
        }
        Ok(model)
    }
}
