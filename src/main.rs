//! mlproject - Main Entry Point
//!
//! Runs the full training pipeline: ingestion, validation, transformation,
//! training and evaluation.

use clap::Parser;
use mlproject::cli::{self, Cli};
use mlproject::logging::{self, LoggingConfig};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // Credentials and MLFLOW_TRACKING_URI may come from a .env file
    dotenvy::dotenv().ok();

    let args = Cli::parse();
    let log_handle = logging::init(&LoggingConfig::default().with_log_dir(&args.log_dir))?;

    let result = cli::run(&args).await;
    log_handle.shutdown();
    result
}
