//! Utility functions and types

pub mod common;
pub mod data_loader;

pub use common::{create_directories, get_size_kb, load_json, read_yaml, save_json};
pub use data_loader::{
    column_names, column_to_array1, columns_to_array2, feature_columns, take_rows, DataLoader,
    DataSaver,
};
