//! Pipeline stage components
//!
//! Each component owns its stage configuration record and exposes the
//! operations the corresponding pipeline stage calls.

pub mod data_ingestion;
pub mod data_transformation;
pub mod data_validation;
pub mod model_evaluation;
pub mod model_trainer;

pub use data_ingestion::DataIngestion;
pub use data_transformation::{split_indices, DataTransformation, SplitIndices, SplitSummary};
pub use data_validation::{check_columns, DataValidation, SchemaReport};
pub use model_evaluation::{params_to_log, ModelEvaluation, REGISTERED_MODEL_NAME};
pub use model_trainer::ModelTrainer;
