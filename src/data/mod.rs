//! Dataset ingestion and preparation.
//!
//! Raw CSV files are read into a [`RawFrame`] of string cells, then
//! [`prepare_time_series`] turns them into a time-indexed [`Table`] with
//! numeric sensor columns and a boolean event flag.

mod frame;
mod loader;
mod prepare;
mod resample;
mod sensors;
mod splits;
pub mod synthetic;

pub use frame::{ColumnKind, NumericFrame, RawColumn, RawFrame, Series, Table};
pub use loader::{
    load_dataset_csv, load_gecco2018_csv, read_csv, resolve_dataset_path, write_raw_csv,
    write_table_csv,
};
pub use prepare::{is_truthy_event, parse_timestamp, prepare_time_series, PrepareOptions, Schema};
pub use resample::{resample_mean, Resampled};
pub use sensors::{get_standard_sensors, present_columns};
pub use splits::{load_and_prepare_dataset, DatasetSplits};

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while reading, writing or reshaping datasets.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Dataset CSV not found at {}. Copy it into data/raw/", path.display())]
    NotFound { path: PathBuf },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error in {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("Column not found: {0}")]
    MissingColumn(String),

    #[error("Row {row} has {found} cells, expected {expected}")]
    RaggedRow {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Column {column} has {found} values, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("Time index is not sorted at position {0}")]
    Unsorted(usize),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Frame operation failed: {0}")]
    Frame(#[from] polars::prelude::PolarsError),
}
