//! Command-line interface
//!
//! The binary takes only the locations of its configuration files; every
//! invocation runs all five stages.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use colored::*;

use crate::config::{ConfigurationManager, CONFIG_FILE_PATH, PARAMS_FILE_PATH, SCHEMA_FILE_PATH};
use crate::pipeline::TrainingPipeline;
use crate::training::RegressionMetrics;
use crate::utils::load_json;

#[derive(Parser, Debug)]
#[command(name = "mlproject")]
#[command(author, version, about = "Train and evaluate an elastic-net model", long_about = None)]
pub struct Cli {
    /// Paths and stage layout
    #[arg(long, default_value = CONFIG_FILE_PATH)]
    pub config: PathBuf,

    /// Hyperparameters and split settings
    #[arg(long, default_value = PARAMS_FILE_PATH)]
    pub params: PathBuf,

    /// Expected columns and target column
    #[arg(long, default_value = SCHEMA_FILE_PATH)]
    pub schema: PathBuf,

    /// Directory receiving running_logs.log
    #[arg(long, default_value = "logs")]
    pub log_dir: PathBuf,
}

fn dim(s: &str) -> ColoredString {
    s.truecolor(100, 100, 100)
}

fn ok(s: &str) -> ColoredString {
    s.truecolor(100, 210, 120)
}

fn print_summary(metric_file: &Path) {
    let Ok(metrics) = load_json::<RegressionMetrics>(metric_file) else {
        return;
    };
    println!();
    println!("  {} {}", ok("✓"), "Pipeline completed".bold());
    println!("  {} {}", dim("metrics"), metric_file.display());
    for (name, value) in metrics.as_pairs() {
        println!("    {:<5} {:.6}", dim(name), value);
    }
    println!();
}

/// Build the pipeline from the configured files and run every stage
pub async fn run(cli: &Cli) -> anyhow::Result<()> {
    let manager = ConfigurationManager::new(&cli.config, &cli.params, &cli.schema)
        .context("failed to load configuration")?;
    let pipeline = TrainingPipeline::from_config(&manager)?;
    pipeline.run().await?;

    let evaluation = manager.get_model_evaluation_config()?;
    print_summary(&evaluation.metric_file_name);
    Ok(())
}
