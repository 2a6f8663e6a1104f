//! Baseline Anomaly Scorers - Isolation Forest & Local Outlier Factor
//!
//! Two unsupervised reference detectors over a row-major feature matrix.
//! Both return one score per row, larger meaning more anomalous, so their
//! outputs can be ranked or thresholded the same way.
//!
//! ## Usage
//!
//! ```ignore
//! let (features, _scaler) = impute_and_scale(&table.numeric_frame())?;
//! let scores = score_all(&features.rows)?;
//! let iforest = &scores["isolation_forest"];
//! let lof = &scores["lof"];
//! ```

mod isolation_forest;
mod lof;

pub use isolation_forest::{average_path_length, isolation_forest_baseline, IsolationForest};
pub use lof::{lof_baseline, LocalOutlierFactor};

use crate::config::{defaults, BaselineConfig};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::info;

/// Key of the isolation forest scores in [`score_all`] output.
pub const ISOLATION_FOREST_KEY: &str = "isolation_forest";

/// Key of the LOF scores in [`score_all`] output.
pub const LOF_KEY: &str = "lof";

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error, PartialEq)]
pub enum BaselineError {
    #[error("Feature matrix is empty")]
    EmptyMatrix,

    #[error("Row {0} has {1} features, expected {2}")]
    RaggedRow(usize, usize, usize),

    #[error("Non-finite value at row {0}, column {1}")]
    NonFinite(usize, usize),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Model used before fit")]
    NotFitted,
}

/// Check shape and finiteness; returns the feature count.
pub(crate) fn validate_matrix(x: &[Vec<f64>]) -> Result<usize, BaselineError> {
    let width = x.first().map_or(0, Vec::len);
    if x.is_empty() || width == 0 {
        return Err(BaselineError::EmptyMatrix);
    }
    for (r, row) in x.iter().enumerate() {
        if row.len() != width {
            return Err(BaselineError::RaggedRow(r, row.len(), width));
        }
        if let Some(c) = row.iter().position(|v| !v.is_finite()) {
            return Err(BaselineError::NonFinite(r, c));
        }
    }
    Ok(width)
}

// ============================================================================
// Combined Scoring
// ============================================================================

/// Parameters of both scorers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaselineParams {
    pub seed: u64,
    pub n_estimators: usize,
    pub max_samples: usize,
    pub lof_neighbors: usize,
}

impl Default for BaselineParams {
    fn default() -> Self {
        Self {
            seed: defaults::BASELINE_SEED,
            n_estimators: defaults::ISOLATION_TREES,
            max_samples: defaults::ISOLATION_MAX_SAMPLES,
            lof_neighbors: defaults::LOF_NEIGHBORS,
        }
    }
}

impl From<&BaselineConfig> for BaselineParams {
    fn from(cfg: &BaselineConfig) -> Self {
        Self {
            seed: cfg.seed,
            n_estimators: cfg.n_estimators,
            max_samples: cfg.max_samples,
            lof_neighbors: cfg.lof_neighbors,
        }
    }
}

/// Run both scorers with default parameters.
pub fn score_all(x: &[Vec<f64>]) -> Result<BTreeMap<String, Vec<f64>>, BaselineError> {
    score_all_with(x, &BaselineParams::default())
}

/// Run both scorers with explicit parameters.
pub fn score_all_with(
    x: &[Vec<f64>],
    params: &BaselineParams,
) -> Result<BTreeMap<String, Vec<f64>>, BaselineError> {
    let mut forest = IsolationForest::new()
        .with_n_estimators(params.n_estimators)
        .with_max_samples(params.max_samples)
        .with_random_state(params.seed);
    forest.fit(x)?;
    let if_scores = forest.anomaly_scores(x)?;

    let (lof_scores, lof) = lof_baseline(x, params.lof_neighbors)?;

    info!(
        rows = x.len(),
        trees = params.n_estimators,
        lof_neighbors = lof.n_neighbors_effective(),
        lof_outliers = lof.labels().iter().filter(|&&l| l < 0).count(),
        "Baseline scores computed"
    );

    let mut out = BTreeMap::new();
    out.insert(ISOLATION_FOREST_KEY.to_string(), if_scores);
    out.insert(LOF_KEY.to_string(), lof_scores);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cluster_with_outlier() -> Vec<Vec<f64>> {
        let mut rows: Vec<Vec<f64>> = (0..60)
            .map(|i| {
                let a = f64::from(i % 10) * 0.1;
                let b = f64::from(i / 10) * 0.1;
                vec![a, b]
            })
            .collect();
        rows.push(vec![25.0, -25.0]);
        rows
    }

    #[test]
    fn validation_rejects_bad_input() {
        assert_eq!(validate_matrix(&[]), Err(BaselineError::EmptyMatrix));
        assert_eq!(validate_matrix(&[vec![]]), Err(BaselineError::EmptyMatrix));
        assert_eq!(
            validate_matrix(&[vec![1.0, 2.0], vec![1.0]]),
            Err(BaselineError::RaggedRow(1, 1, 2))
        );
        assert_eq!(
            validate_matrix(&[vec![1.0, f64::NAN]]),
            Err(BaselineError::NonFinite(0, 1))
        );
        assert_eq!(validate_matrix(&[vec![1.0, 2.0]]), Ok(2));
    }

    #[test]
    fn score_all_has_both_keys_and_one_score_per_row() {
        let x = cluster_with_outlier();
        let scores = score_all(&x).unwrap();
        assert_eq!(
            scores.keys().map(String::as_str).collect::<Vec<_>>(),
            vec!["isolation_forest", "lof"]
        );
        for v in scores.values() {
            assert_eq!(v.len(), x.len());
        }
        let outlier = x.len() - 1;
        let iforest = &scores[ISOLATION_FOREST_KEY];
        assert!(iforest[..outlier].iter().all(|&s| s < iforest[outlier]));
        assert_eq!(scores[LOF_KEY][outlier], 1.0);
    }

    #[test]
    fn params_follow_config() {
        let cfg = BaselineConfig {
            seed: 7,
            n_estimators: 10,
            max_samples: 32,
            lof_neighbors: 5,
        };
        let p = BaselineParams::from(&cfg);
        assert_eq!((p.seed, p.n_estimators, p.max_samples, p.lof_neighbors), (7, 10, 32, 5));
    }
}
