//! Data transformation: seeded train/test split

use std::fs;
use std::path::PathBuf;

use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tracing::info;

use crate::config::DataTransformationConfig;
use crate::error::{PipelineError, Result};
use crate::utils::{take_rows, DataLoader, DataSaver};

pub const TRAIN_FILE: &str = "train.csv";
pub const TEST_FILE: &str = "test.csv";

const VALIDATED_MARKER: &str = "Validation status: true";

/// Row indices of a train/test partition
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitIndices {
    pub train: Vec<usize>,
    pub test: Vec<usize>,
}

/// Shuffle `0..n` with a seeded ChaCha8 generator and hold out
/// `ceil(n * test_size)` rows for testing.
pub fn split_indices(n: usize, test_size: f64, seed: u64) -> Result<SplitIndices> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(PipelineError::InvalidParameter {
            name: "test_size".to_string(),
            value: test_size.to_string(),
            reason: "must be strictly between 0 and 1".to_string(),
        });
    }

    let n_test = (n as f64 * test_size).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(PipelineError::EmptyDataset(format!(
            "{} rows cannot be split with test_size {} into two non-empty sets",
            n, test_size
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let train = indices.split_off(n_test);
    Ok(SplitIndices {
        train,
        test: indices,
    })
}

/// Files written by a split
#[derive(Debug, Clone, PartialEq)]
pub struct SplitSummary {
    pub train_path: PathBuf,
    pub test_path: PathBuf,
    pub train_rows: usize,
    pub test_rows: usize,
}

pub struct DataTransformation {
    config: DataTransformationConfig,
}

impl DataTransformation {
    pub fn new(config: DataTransformationConfig) -> Self {
        Self { config }
    }

    fn ensure_validated(&self) -> Result<()> {
        let Some(status_file) = &self.config.status_file else {
            return Ok(());
        };
        let status = fs::read_to_string(status_file).map_err(|e| {
            PipelineError::SchemaError(format!(
                "validation status unavailable at {}: {}",
                status_file.display(),
                e
            ))
        })?;
        if status.trim() != VALIDATED_MARKER {
            return Err(PipelineError::SchemaError(format!(
                "dataset failed validation ({})",
                status.trim()
            )));
        }
        Ok(())
    }

    /// Split the dataset and write `train.csv` and `test.csv` into `root_dir`
    pub fn train_test_split(&self) -> Result<SplitSummary> {
        self.ensure_validated()?;

        let df = DataLoader::new().load_csv(&self.config.data_path)?;
        let split = split_indices(df.height(), self.config.test_size, self.config.random_seed)?;

        let mut train = take_rows(&df, &split.train)?;
        let mut test = take_rows(&df, &split.test)?;

        let train_path = self.config.root_dir.join(TRAIN_FILE);
        let test_path = self.config.root_dir.join(TEST_FILE);
        DataSaver::save_csv(&mut train, &train_path)?;
        DataSaver::save_csv(&mut test, &test_path)?;

        info!(
            train_shape = ?train.shape(),
            test_shape = ?test.shape(),
            "split data into training and test sets"
        );

        Ok(SplitSummary {
            train_path,
            test_path,
            train_rows: train.height(),
            test_rows: test.height(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_split_sizes_use_ceiling() {
        let split = split_indices(10, 0.25, 42).unwrap();
        assert_eq!(split.test.len(), 3);
        assert_eq!(split.train.len(), 7);
    }

    #[test]
    fn test_split_is_a_partition() {
        let split = split_indices(101, 0.2, 7).unwrap();
        let train: HashSet<_> = split.train.iter().copied().collect();
        let test: HashSet<_> = split.test.iter().copied().collect();
        assert!(train.is_disjoint(&test));
        assert_eq!(train.len() + test.len(), 101);
        assert!(train.union(&test).all(|&i| i < 101));
    }

    #[test]
    fn test_same_seed_same_split() {
        assert_eq!(split_indices(50, 0.3, 1).unwrap(), split_indices(50, 0.3, 1).unwrap());
        assert_ne!(split_indices(50, 0.3, 1).unwrap(), split_indices(50, 0.3, 2).unwrap());
    }

    #[test]
    fn test_split_rejects_degenerate_inputs() {
        assert!(matches!(split_indices(0, 0.25, 1), Err(PipelineError::EmptyDataset(_))));
        assert!(matches!(split_indices(1, 0.25, 1), Err(PipelineError::EmptyDataset(_))));
        assert!(matches!(
            split_indices(10, 0.0, 1),
            Err(PipelineError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn test_requires_passing_validation_status() {
        let dir = tempfile::tempdir().unwrap();
        let data_path = dir.path().join("data.csv");
        fs::write(&data_path, "a,quality\n1,5\n2,6\n3,7\n4,8\n").unwrap();
        let status_file = dir.path().join("status.txt");
        fs::write(&status_file, "Validation status: false").unwrap();

        let stage = DataTransformation::new(DataTransformationConfig {
            root_dir: dir.path().join("out"),
            data_path,
            status_file: Some(status_file.clone()),
            test_size: 0.25,
            random_seed: 42,
        });
        assert!(matches!(stage.train_test_split(), Err(PipelineError::SchemaError(_))));

        fs::write(&status_file, "Validation status: true").unwrap();
        let summary = stage.train_test_split().unwrap();
        assert_eq!((summary.train_rows, summary.test_rows), (3, 1));
        assert!(summary.train_path.is_file());
    }
}
