//! Median imputation followed by standard scaling.
//!
//! Column statistics come from `statrs`: medians for gap filling, mean and
//! population standard deviation for scaling. A column with no values at all
//! has no median and is dropped with a warning. A constant column keeps a
//! scale of 1 so it maps to zeros instead of NaN.

use crate::data::NumericFrame;
use statrs::statistics::{Data, Median, Statistics};
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FeatureError {
    #[error("No rows to preprocess")]
    NoRows,

    #[error("No numeric column has any value")]
    NoColumns,

    #[error("Column {column} has {found} rows, expected {expected}")]
    LengthMismatch {
        column: String,
        expected: usize,
        found: usize,
    },

    #[error("Row has {found} features, scaler was fitted on {expected}")]
    FeatureCount { expected: usize, found: usize },
}

// ============================================================================
// Imputer
// ============================================================================

/// Per-column medians used to fill gaps.
#[derive(Debug, Clone, PartialEq)]
pub struct MedianImputer {
    pub names: Vec<String>,
    pub medians: Vec<f64>,
    /// Columns dropped because they had no values.
    pub dropped: Vec<String>,
}

impl MedianImputer {
    pub fn fit(frame: &NumericFrame) -> Result<Self, FeatureError> {
        let n_rows = check_shape(frame)?;
        let mut names = Vec::new();
        let mut medians = Vec::new();
        let mut dropped = Vec::new();

        for (name, column) in frame.names.iter().zip(&frame.columns) {
            let present: Vec<f64> = column.iter().flatten().copied().collect();
            if present.is_empty() {
                warn!(column = %name, "Skipping column with no observed values");
                dropped.push(name.clone());
                continue;
            }
            let median = Data::new(present).median();
            debug!(column = %name, median, missing = n_rows - column.iter().flatten().count(), "Median fitted");
            names.push(name.clone());
            medians.push(median);
        }

        if names.is_empty() {
            return Err(FeatureError::NoColumns);
        }
        Ok(Self {
            names,
            medians,
            dropped,
        })
    }

    /// Column-major filled values for the kept columns.
    pub fn transform(&self, frame: &NumericFrame) -> Vec<Vec<f64>> {
        self.names
            .iter()
            .zip(&self.medians)
            .filter_map(|(name, &median)| {
                let idx = frame.names.iter().position(|n| n == name)?;
                Some(
                    frame.columns[idx]
                        .iter()
                        .map(|v| v.unwrap_or(median))
                        .collect(),
                )
            })
            .collect()
    }
}

// ============================================================================
// Scaler
// ============================================================================

/// Zero-mean, unit-variance scaling fitted per column.
#[derive(Debug, Clone, PartialEq)]
pub struct StandardScaler {
    pub names: Vec<String>,
    pub mean: Vec<f64>,
    /// Population standard deviation, or 1 for constant columns.
    pub scale: Vec<f64>,
}

impl StandardScaler {
    /// Fit on column-major data.
    pub fn fit(names: Vec<String>, columns: &[Vec<f64>]) -> Self {
        let (mean, scale) = columns
            .iter()
            .map(|c| {
                let mean = c.iter().mean();
                let std = c.iter().population_std_dev();
                let scale = if std.is_finite() && std > 0.0 { std } else { 1.0 };
                (mean, scale)
            })
            .unzip();
        Self { names, mean, scale }
    }

    pub fn transform_row(&self, row: &[f64]) -> Result<Vec<f64>, FeatureError> {
        if row.len() != self.mean.len() {
            return Err(FeatureError::FeatureCount {
                expected: self.mean.len(),
                found: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
            .collect())
    }

    pub fn inverse_transform_row(&self, row: &[f64]) -> Result<Vec<f64>, FeatureError> {
        if row.len() != self.mean.len() {
            return Err(FeatureError::FeatureCount {
                expected: self.mean.len(),
                found: row.len(),
            });
        }
        Ok(row
            .iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(z, (m, s))| z * s + m)
            .collect())
    }
}

/// Row-major scaled features with their column names.
#[derive(Debug, Clone, PartialEq)]
pub struct ScaledMatrix {
    pub names: Vec<String>,
    pub rows: Vec<Vec<f64>>,
}

impl ScaledMatrix {
    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn column(&self, idx: usize) -> Vec<f64> {
        self.rows.iter().map(|r| r[idx]).collect()
    }
}

/// Fill gaps with column medians, then standardise every column.
pub fn impute_and_scale(frame: &NumericFrame) -> Result<(ScaledMatrix, StandardScaler), FeatureError> {
    let imputer = MedianImputer::fit(frame)?;
    let filled = imputer.transform(frame);
    let scaler = StandardScaler::fit(imputer.names.clone(), &filled);

    let n_rows = filled.first().map_or(0, Vec::len);
    let rows = (0..n_rows)
        .map(|r| {
            filled
                .iter()
                .zip(scaler.mean.iter().zip(&scaler.scale))
                .map(|(col, (m, s))| (col[r] - m) / s)
                .collect()
        })
        .collect();

    Ok((
        ScaledMatrix {
            names: imputer.names,
            rows,
        },
        scaler,
    ))
}

fn check_shape(frame: &NumericFrame) -> Result<usize, FeatureError> {
    let n_rows = frame.n_rows();
    if n_rows == 0 {
        return Err(FeatureError::NoRows);
    }
    for (name, col) in frame.names.iter().zip(&frame.columns) {
        if col.len() != n_rows {
            return Err(FeatureError::LengthMismatch {
                column: name.clone(),
                expected: n_rows,
                found: col.len(),
            });
        }
    }
    Ok(n_rows)
}
