//! CSV ingestion and export.
//!
//! ```ignore
//! let paths = ProjectPaths::detect(None);
//! let raw = load_gecco2018_csv(None, &paths)?;   // data/raw/1_gecco2018_water_quality.csv
//! let table = prepare_time_series(&raw.drop_unnamed(), &PrepareOptions::default())?;
//! write_table_csv(&table, &paths.processed.join("gecco2018_clean.csv"))?;
//! ```

use super::frame::normalize_cell;
use super::{DataError, RawFrame, Table};
use crate::config::{defaults, ProjectPaths};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Read a comma-separated file with a header row into a [`RawFrame`].
///
/// Cells matching a missing marker (`""`, `NaN`, `NA`, `null`, ...) are
/// stored as `None`. Rows with a different cell count than the header are
/// rejected by the CSV reader.
pub fn read_csv(path: &Path) -> Result<RawFrame, DataError> {
    if !path.is_file() {
        return Err(DataError::NotFound {
            path: path.to_path_buf(),
        });
    }

    let csv_err = |source| DataError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .from_path(path)
        .map_err(csv_err)?;

    let headers: Vec<String> = reader
        .headers()
        .map_err(csv_err)?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(csv_err)?;
        rows.push(record.iter().map(normalize_cell).collect());
    }

    let frame = RawFrame::from_rows(headers, rows)?;
    info!(
        file = %path.display(),
        rows = frame.n_rows(),
        columns = frame.n_cols(),
        "CSV loaded"
    );
    Ok(frame)
}

/// Where a dataset file lives: the explicit path, else `{raw}/{file_name}`.
pub fn resolve_dataset_path(path: Option<&Path>, paths: &ProjectPaths, file_name: &str) -> PathBuf {
    path.map_or_else(|| paths.raw_file(file_name), Path::to_path_buf)
}

/// Load a dataset CSV from an explicit path or the raw data directory.
pub fn load_dataset_csv(
    path: Option<&Path>,
    paths: &ProjectPaths,
    file_name: &str,
) -> Result<RawFrame, DataError> {
    let resolved = resolve_dataset_path(path, paths, file_name);
    debug!(path = %resolved.display(), "Resolved dataset path");
    read_csv(&resolved)
}

/// Load the GECCO 2018 water-quality CSV.
///
/// With `path = None` the file is looked up as
/// `data/raw/1_gecco2018_water_quality.csv` below the project root. A missing
/// file yields [`DataError::NotFound`] carrying the resolved path.
pub fn load_gecco2018_csv(path: Option<&Path>, paths: &ProjectPaths) -> Result<RawFrame, DataError> {
    load_dataset_csv(path, paths, defaults::GECCO2018_FILE_NAME)
}

/// Write a raw frame as CSV, missing cells as empty fields.
pub fn write_raw_csv(frame: &RawFrame, path: &Path) -> Result<(), DataError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|source| DataError::Io {
            path: parent.to_path_buf(),
            source,
        })?;
    }

    let csv_err = |source| DataError::Csv {
        path: path.to_path_buf(),
        source,
    };

    let mut writer = csv::Writer::from_path(path).map_err(csv_err)?;
    writer.write_record(frame.column_names()).map_err(csv_err)?;
    for idx in 0..frame.n_rows() {
        let row = frame.row(idx).unwrap_or_default();
        writer
            .write_record(row.into_iter().map(|c| c.unwrap_or("")))
            .map_err(csv_err)?;
    }
    writer.flush().map_err(|source| DataError::Io {
        path: path.to_path_buf(),
        source,
    })?;

    info!(path = %path.display(), rows = frame.n_rows(), "CSV written");
    Ok(())
}

/// Export a prepared table: time, sensors, event flag.
pub fn write_table_csv(table: &Table, path: &Path) -> Result<(), DataError> {
    write_raw_csv(&table.to_raw_frame(), path)
}
