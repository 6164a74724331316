//! Tabular data loading and saving
//!
//! Every dataset artifact in the pipeline is a CSV file with a header row.
//! The helpers here are the only place that talks to polars I/O.

use crate::error::{PipelineError, Result};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// Number of rows polars samples to infer column types
const INFER_SCHEMA_ROWS: usize = 1000;

/// Data loader for CSV dataset artifacts
#[derive(Debug, Clone)]
pub struct DataLoader {
    /// Field separator
    separator: u8,
    /// Rows used for schema inference
    infer_schema_length: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new comma-separated loader
    pub fn new() -> Self {
        Self {
            separator: b',',
            infer_schema_length: INFER_SCHEMA_ROWS,
        }
    }

    fn open(path: &Path) -> Result<File> {
        File::open(path).map_err(|e| {
            PipelineError::DataError(format!("cannot open {}: {}", path.display(), e))
        })
    }

    fn read_options(&self) -> CsvReadOptions {
        CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_length))
            .with_parse_options(CsvParseOptions::default().with_separator(self.separator))
    }

    /// Load a CSV file with a header row
    pub fn load_csv(&self, path: &Path) -> Result<DataFrame> {
        self.read_options()
            .into_reader_with_file_handle(Self::open(path)?)
            .finish()
            .map_err(|e| PipelineError::DataError(format!("{}: {}", path.display(), e)))
    }

    /// Column names of a CSV file, exactly as [`DataLoader::load_csv`] reports them
    pub fn read_header(&self, path: &Path) -> Result<Vec<String>> {
        let df = self
            .read_options()
            .with_n_rows(Some(0))
            .into_reader_with_file_handle(Self::open(path)?)
            .finish()
            .map_err(|e| PipelineError::DataError(format!("{}: {}", path.display(), e)))?;

        if df.width() == 0 {
            return Err(PipelineError::EmptyDataset(format!(
                "{} has no header row",
                path.display()
            )));
        }
        Ok(column_names(&df))
    }
}

/// Save DataFrames as CSV
pub struct DataSaver;

impl DataSaver {
    /// Save to CSV, creating parent directories
    pub fn save_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let mut file = File::create(path)?;

        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(df)
            .map_err(|e| PipelineError::DataError(e.to_string()))
    }
}

/// Column names of `df` in file order
pub fn column_names(df: &DataFrame) -> Vec<String> {
    df.get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect()
}

/// All column names except `target`, in file order
pub fn feature_columns(df: &DataFrame, target: &str) -> Vec<String> {
    column_names(df)
        .into_iter()
        .filter(|name| name != target)
        .collect()
}

/// Extract one numeric column as `f64`. Missing values are an error.
pub fn column_to_array1(df: &DataFrame, name: &str) -> Result<Array1<f64>> {
    let column = df
        .column(name)
        .map_err(|_| PipelineError::FeatureNotFound(name.to_string()))?;

    let as_f64 = column
        .cast(&DataType::Float64)
        .map_err(|e| PipelineError::DataError(format!("column '{}': {}", name, e)))?;
    let values = as_f64
        .as_materialized_series()
        .f64()
        .map_err(|e| PipelineError::DataError(e.to_string()))?;

    if values.null_count() > 0 {
        return Err(PipelineError::DataError(format!(
            "column '{}' has {} missing or non-numeric values",
            name,
            values.null_count()
        )));
    }

    Ok(values.into_iter().map(|v| v.unwrap_or_default()).collect())
}

/// Extract named columns into a row-major `Array2<f64>`.
pub fn columns_to_array2(df: &DataFrame, col_names: &[String]) -> Result<Array2<f64>> {
    let n_rows = df.height();
    let n_cols = col_names.len();

    let col_data: Vec<Array1<f64>> = col_names
        .iter()
        .map(|name| column_to_array1(df, name))
        .collect::<Result<Vec<_>>>()?;

    Ok(Array2::from_shape_fn((n_rows, n_cols), |(r, c)| col_data[c][r]))
}

/// Keep only the rows at `indices`, in that order
pub fn take_rows(df: &DataFrame, indices: &[usize]) -> Result<DataFrame> {
    let idx: Vec<IdxSize> = indices.iter().map(|&i| i as IdxSize).collect();
    let idx = IdxCa::from_vec("idx".into(), idx);
    Ok(df.take(&idx)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_csv() -> NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "a,b,target").unwrap();
        writeln!(file, "1,2.5,3").unwrap();
        writeln!(file, "4,5.5,6").unwrap();
        writeln!(file, "7,8.5,9").unwrap();
        file
    }

    #[test]
    fn test_load_csv() {
        let file = create_test_csv();
        let df = DataLoader::new().load_csv(file.path()).unwrap();

        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 3);
        assert_eq!(column_names(&df), vec!["a", "b", "target"]);
    }

    #[test]
    fn test_load_missing_file() {
        let result = DataLoader::new().load_csv(Path::new("/definitely/not/here.csv"));
        assert!(matches!(result, Err(PipelineError::DataError(_))));
    }

    #[test]
    fn test_read_header() {
        let file = create_test_csv();
        let header = DataLoader::new().read_header(file.path()).unwrap();
        assert_eq!(header, vec!["a", "b", "target"]);
    }

    #[test]
    fn test_read_header_matches_loaded_columns() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "a, quality").unwrap();
        writeln!(file, "1,5").unwrap();
        writeln!(file, "2,6").unwrap();

        let loader = DataLoader::new();
        let header = loader.read_header(file.path()).unwrap();
        let df = loader.load_csv(file.path()).unwrap();
        assert_eq!(header, column_names(&df));
        assert_eq!(header, vec!["a", " quality"]);
    }

    #[test]
    fn test_columns_to_array2() {
        let file = create_test_csv();
        let df = DataLoader::new().load_csv(file.path()).unwrap();
        let features = feature_columns(&df, "target");
        assert_eq!(features, vec!["a", "b"]);

        let x = columns_to_array2(&df, &features).unwrap();
        assert_eq!(x.shape(), &[3, 2]);
        assert_eq!(x[[1, 0]], 4.0);
        assert_eq!(x[[2, 1]], 8.5);

        let y = column_to_array1(&df, "target").unwrap();
        assert_eq!(y.to_vec(), vec![3.0, 6.0, 9.0]);
    }

    #[test]
    fn test_missing_column_is_feature_not_found() {
        let file = create_test_csv();
        let df = DataLoader::new().load_csv(file.path()).unwrap();
        let result = column_to_array1(&df, "quality");
        assert!(matches!(result, Err(PipelineError::FeatureNotFound(name)) if name == "quality"));
    }

    #[test]
    fn test_take_rows_and_save_csv() {
        let mut df = df!(
            "a" => &[1.0, 2.0, 3.0, 4.0],
            "b" => &[10.0, 20.0, 30.0, 40.0]
        )
        .unwrap();

        let mut subset = take_rows(&df, &[3, 1]).unwrap();
        assert_eq!(subset.height(), 2);
        assert_eq!(column_to_array1(&subset, "a").unwrap().to_vec(), vec![4.0, 2.0]);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out/subset.csv");
        DataSaver::save_csv(&mut subset, &path).unwrap();
        DataSaver::save_csv(&mut df, &dir.path().join("full.csv")).unwrap();

        let loaded = DataLoader::new().load_csv(&path).unwrap();
        assert_eq!(loaded.height(), 2);
        assert_eq!(loaded.width(), 2);
    }
}
