//! Numeric layer
//!
//! Elastic-net regression fit by coordinate descent, the regression metrics
//! used to score it, and the persisted [`FittedModel`] artifact that carries
//! a fitted estimator from the trainer stage to the evaluation stage.

pub mod linear_models;
pub mod metrics;
pub mod model;

pub use linear_models::{ElasticNetParams, ElasticNetRegression};
pub use metrics::{eval_metrics, RegressionMetrics};
pub use model::FittedModel;
