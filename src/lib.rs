//! mlproject - stage-based elastic-net training pipeline
//!
//! Ingests a raw dataset, validates its columns against a schema, splits it
//! into train/test partitions, fits an elastic-net regression model and
//! evaluates it, logging metrics and the model to an MLflow-compatible
//! tracking service.
//!
//! # Modules
//!
//! - [`config`] - YAML configuration and per-stage records
//! - [`components`] - the five stage components
//! - [`pipeline`] - ordered, fail-fast stage driver
//! - [`training`] - elastic net, regression metrics, model artifact
//! - [`tracking`] - tracking clients (MLflow REST, local file store)
//! - [`utils`] - file and data-frame helpers
//! - [`logging`] - subscriber setup with a flushed file writer
//! - [`cli`] - command-line interface

pub mod cli;
pub mod components;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod tracking;
pub mod training;
pub mod utils;

pub use error::{PipelineError, Result};

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::ConfigurationManager;
    pub use crate::error::{PipelineError, Result};
    pub use crate::pipeline::{Stage, TrainingPipeline};
    pub use crate::tracking::{connect, with_run, RunInfo, RunStatus, TrackingBackend, TrackingClient};
    pub use crate::training::{eval_metrics, ElasticNetParams, FittedModel, RegressionMetrics};
}
