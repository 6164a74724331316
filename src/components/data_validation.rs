//! Data validation: compare the dataset header with the schema

use std::collections::HashSet;
use std::fs;

use tracing::{info, warn};

use crate::config::{DataValidationConfig, SchemaStrictness};
use crate::error::{PipelineError, Result};
use crate::utils::DataLoader;

/// Outcome of a header check
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SchemaReport {
    /// Expected columns absent from the dataset
    pub missing: Vec<String>,
    /// Dataset columns the schema does not name (rejected unless lenient)
    pub unexpected: Vec<String>,
    /// Set when `ordered` strictness found the right columns in the wrong order
    pub out_of_order: bool,
}

impl SchemaReport {
    pub fn is_valid(&self) -> bool {
        self.missing.is_empty() && self.unexpected.is_empty() && !self.out_of_order
    }

    fn describe(&self) -> String {
        let mut parts = Vec::new();
        if !self.missing.is_empty() {
            parts.push(format!("missing columns: {}", self.missing.join(", ")));
        }
        if !self.unexpected.is_empty() {
            parts.push(format!("unexpected columns: {}", self.unexpected.join(", ")));
        }
        if self.out_of_order {
            parts.push("columns are not in schema order".to_string());
        }
        parts.join("; ")
    }
}

/// Check `actual` header names against `expected` under `strictness`
pub fn check_columns(
    expected: &[String],
    actual: &[String],
    strictness: SchemaStrictness,
) -> SchemaReport {
    let actual_set: HashSet<&str> = actual.iter().map(String::as_str).collect();
    let expected_set: HashSet<&str> = expected.iter().map(String::as_str).collect();

    let missing = expected
        .iter()
        .filter(|c| !actual_set.contains(c.as_str()))
        .cloned()
        .collect();
    let extras: Vec<String> = actual
        .iter()
        .filter(|c| !expected_set.contains(c.as_str()))
        .cloned()
        .collect();

    let mut report = SchemaReport {
        missing,
        ..Default::default()
    };
    match strictness {
        SchemaStrictness::Lenient => {
            if !extras.is_empty() {
                warn!(columns = ?extras, "dataset has columns not named in the schema");
            }
        }
        SchemaStrictness::Exact => report.unexpected = extras,
        SchemaStrictness::Ordered => {
            report.unexpected = extras;
            report.out_of_order =
                report.missing.is_empty() && report.unexpected.is_empty() && expected != actual;
        }
    }
    report
}

pub struct DataValidation {
    config: DataValidationConfig,
}

impl DataValidation {
    pub fn new(config: DataValidationConfig) -> Self {
        Self { config }
    }

    /// Validate the dataset header and record the result in the status file.
    ///
    /// Returns `Ok(true)` when valid; an invalid header is written as
    /// `Validation status: false` and then reported as a schema error.
    pub fn validate_all_columns(&self) -> Result<bool> {
        let header = DataLoader::new().read_header(&self.config.data_path)?;
        let report = check_columns(&self.config.columns, &header, self.config.strictness);
        let status = report.is_valid();

        if let Some(parent) = self.config.status_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.config.status_file, format!("Validation status: {}", status))?;
        info!(
            status,
            strictness = ?self.config.strictness,
            file = %self.config.status_file.display(),
            "validation status written"
        );

        if status {
            Ok(true)
        } else {
            Err(PipelineError::SchemaError(format!(
                "{}: {}",
                self.config.data_path.display(),
                report.describe()
            )))
        }
    }
}
