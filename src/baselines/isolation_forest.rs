//! Isolation Forest.
//!
//! Each tree is grown on a random subsample of `min(max_samples, n)` rows by
//! picking a random feature and a uniform split between that feature's
//! minimum and maximum, until a node holds one row or the height limit
//! `ceil(log2(subsample))` is reached. Anomalies are isolated in fewer
//! splits, so their average path length is short.
//!
//! Scoring follows the usual normalisation:
//!
//! ```text
//! s(x) = 2^(-E[h(x)] / c(psi))
//! c(n) = 2 (ln(n - 1) + gamma) - 2 (n - 1) / n
//! ```
//!
//! with the fixed "auto" offset of 0.5, so `anomaly_scores` returns
//! `s(x) - 0.5`: positive for likely anomalies, negative for inliers.

use super::{validate_matrix, BaselineError};
use crate::config::defaults;
use rand::rngs::StdRng;
use rand::seq::{index, SliceRandom};
use rand::{Rng, SeedableRng};
use statrs::consts::EULER_MASCHERONI;
use tracing::debug;

/// Score offset used when no contamination rate is given.
const AUTO_OFFSET: f64 = -0.5;

/// Expected path length of an unsuccessful search in a binary search tree
/// of `n` nodes.
pub fn average_path_length(n: usize) -> f64 {
    match n {
        0 | 1 => 0.0,
        2 => 1.0,
        _ => {
            let n = n as f64;
            2.0 * ((n - 1.0).ln() + EULER_MASCHERONI) - 2.0 * (n - 1.0) / n
        }
    }
}

// ============================================================================
// Trees
// ============================================================================

#[derive(Debug, Clone)]
enum Node {
    Leaf {
        size: usize,
    },
    Split {
        feature: usize,
        threshold: f64,
        left: Box<Node>,
        right: Box<Node>,
    },
}

#[derive(Debug, Clone)]
struct IsolationTree {
    root: Node,
}

impl IsolationTree {
    fn grow(x: &[Vec<f64>], rows: Vec<usize>, height_limit: usize, rng: &mut StdRng) -> Self {
        Self {
            root: grow_node(x, rows, 0, height_limit, rng),
        }
    }

    fn path_length(&self, point: &[f64]) -> f64 {
        let mut node = &self.root;
        let mut depth = 0.0;
        loop {
            match node {
                Node::Leaf { size } => return depth + average_path_length(*size),
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if point[*feature] <= *threshold { &**left } else { &**right };
                    depth += 1.0;
                }
            }
        }
    }
}

fn grow_node(x: &[Vec<f64>], rows: Vec<usize>, depth: usize, limit: usize, rng: &mut StdRng) -> Node {
    if depth >= limit || rows.len() <= 1 {
        return Node::Leaf { size: rows.len() };
    }

    let mut features: Vec<usize> = (0..x[rows[0]].len()).collect();
    features.shuffle(rng);

    for feature in features {
        let (lo, hi) = rows.iter().fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &r| {
            (lo.min(x[r][feature]), hi.max(x[r][feature]))
        });
        if hi > lo {
            let threshold = rng.gen_range(lo..hi);
            let (left, right): (Vec<usize>, Vec<usize>) =
                rows.into_iter().partition(|&r| x[r][feature] <= threshold);
            return Node::Split {
                feature,
                threshold,
                left: Box::new(grow_node(x, left, depth + 1, limit, rng)),
                right: Box::new(grow_node(x, right, depth + 1, limit, rng)),
            };
        }
    }

    // every feature is constant over these rows
    Node::Leaf { size: rows.len() }
}

// ============================================================================
// Forest
// ============================================================================

/// An ensemble of isolation trees.
#[derive(Debug, Clone)]
pub struct IsolationForest {
    n_estimators: usize,
    max_samples: usize,
    random_state: u64,
    trees: Vec<IsolationTree>,
    sample_size: usize,
    n_features: usize,
}

impl Default for IsolationForest {
    fn default() -> Self {
        Self::new()
    }
}

impl IsolationForest {
    pub fn new() -> Self {
        Self {
            n_estimators: defaults::ISOLATION_TREES,
            max_samples: defaults::ISOLATION_MAX_SAMPLES,
            random_state: defaults::BASELINE_SEED,
            trees: Vec::new(),
            sample_size: 0,
            n_features: 0,
        }
    }

    pub fn with_n_estimators(mut self, n: usize) -> Self {
        self.n_estimators = n;
        self
    }

    pub fn with_max_samples(mut self, n: usize) -> Self {
        self.max_samples = n;
        self
    }

    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = seed;
        self
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    /// Rows drawn per tree in the last fit.
    pub fn sample_size(&self) -> usize {
        self.sample_size
    }

    pub fn n_estimators(&self) -> usize {
        self.n_estimators
    }

    pub fn fit(&mut self, x: &[Vec<f64>]) -> Result<(), BaselineError> {
        if self.n_estimators == 0 {
            return Err(BaselineError::InvalidParameter("n_estimators must be > 0".into()));
        }
        if self.max_samples == 0 {
            return Err(BaselineError::InvalidParameter("max_samples must be > 0".into()));
        }
        let n_features = validate_matrix(x)?;

        let n = x.len();
        let sample_size = self.max_samples.min(n);
        let height_limit = (sample_size.max(2) as f64).log2().ceil() as usize;
        let mut rng = StdRng::seed_from_u64(self.random_state);

        self.trees = (0..self.n_estimators)
            .map(|_| {
                let rows = index::sample(&mut rng, n, sample_size).into_vec();
                IsolationTree::grow(x, rows, height_limit, &mut rng)
            })
            .collect();
        self.sample_size = sample_size;
        self.n_features = n_features;

        debug!(
            trees = self.trees.len(),
            sample_size,
            height_limit,
            "Isolation forest fitted"
        );
        Ok(())
    }

    /// Raw normalised scores negated: lower means more abnormal.
    pub fn score_samples(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, BaselineError> {
        if !self.is_fitted() {
            return Err(BaselineError::NotFitted);
        }
        let width = validate_matrix(x)?;
        if width != self.n_features {
            return Err(BaselineError::InvalidParameter(format!(
                "expected {} features, got {width}",
                self.n_features
            )));
        }

        let norm = average_path_length(self.sample_size);
        let n_trees = self.trees.len() as f64;
        Ok(x.iter()
            .map(|row| {
                let mean_depth = self.trees.iter().map(|t| t.path_length(row)).sum::<f64>() / n_trees;
                let s = if norm > 0.0 {
                    2f64.powf(-mean_depth / norm)
                } else {
                    0.5
                };
                -s
            })
            .collect())
    }

    /// `score_samples` shifted by the auto offset: negative for outliers.
    pub fn decision_function(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, BaselineError> {
        Ok(self
            .score_samples(x)?
            .into_iter()
            .map(|s| s - AUTO_OFFSET)
            .collect())
    }

    /// -1 for outliers, 1 for inliers.
    pub fn predict(&self, x: &[Vec<f64>]) -> Result<Vec<i8>, BaselineError> {
        Ok(self
            .decision_function(x)?
            .into_iter()
            .map(|d| if d < 0.0 { -1 } else { 1 })
            .collect())
    }

    /// Negated decision function: larger means more anomalous.
    pub fn anomaly_scores(&self, x: &[Vec<f64>]) -> Result<Vec<f64>, BaselineError> {
        Ok(self.decision_function(x)?.into_iter().map(|d| -d).collect())
    }
}

/// Fit a default forest with the given seed and score the same rows.
pub fn isolation_forest_baseline(
    x: &[Vec<f64>],
    random_state: u64,
) -> Result<(Vec<f64>, IsolationForest), BaselineError> {
    let mut forest = IsolationForest::new().with_random_state(random_state);
    forest.fit(x)?;
    let scores = forest.anomaly_scores(x)?;
    Ok((scores, forest))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn blob_with_outlier() -> Vec<Vec<f64>> {
        let mut x: Vec<Vec<f64>> = (0..100)
            .map(|i| {
                let t = f64::from(i) * 0.37;
                vec![t.sin() * 0.5, t.cos() * 0.5, f64::from(i % 5) * 0.1]
            })
            .collect();
        x.push(vec![8.0, -8.0, 6.0]);
        x
    }

    #[test]
    fn path_length_normaliser() {
        assert_eq!(average_path_length(0), 0.0);
        assert_eq!(average_path_length(1), 0.0);
        assert_eq!(average_path_length(2), 1.0);
        assert!((average_path_length(256) - 10.244_770).abs() < 1e-5);
    }

    #[test]
    fn outlier_scores_highest() {
        let x = blob_with_outlier();
        let (scores, forest) = isolation_forest_baseline(&x, 42).unwrap();
        assert_eq!(scores.len(), x.len());
        assert_eq!(forest.sample_size(), x.len());
        let last = scores[x.len() - 1];
        assert!(scores[..x.len() - 1].iter().all(|&s| s < last));
        assert!(last > 0.0);
        assert!(scores.iter().all(|s| (-0.5..=0.5).contains(s)));
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let x = blob_with_outlier();
        let (a, _) = isolation_forest_baseline(&x, 42).unwrap();
        let (b, _) = isolation_forest_baseline(&x, 42).unwrap();
        let (c, _) = isolation_forest_baseline(&x, 7).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn constant_data_scores_zero() {
        let x = vec![vec![1.0, 2.0]; 20];
        let (scores, _) = isolation_forest_baseline(&x, 0).unwrap();
        assert!(scores.iter().all(|s| s.abs() < 1e-12));
    }

    #[test]
    fn subsample_is_capped() {
        let x: Vec<Vec<f64>> = (0..400).map(|i| vec![f64::from(i)]).collect();
        let mut forest = IsolationForest::new().with_n_estimators(5);
        forest.fit(&x).unwrap();
        assert_eq!(forest.sample_size(), 256);
    }

    #[test]
    fn misuse_is_reported() {
        let forest = IsolationForest::new();
        assert_eq!(forest.score_samples(&[vec![1.0]]), Err(BaselineError::NotFitted));

        let mut forest = IsolationForest::new().with_n_estimators(0);
        assert!(matches!(forest.fit(&[vec![1.0]]), Err(BaselineError::InvalidParameter(_))));

        let mut forest = IsolationForest::new();
        forest.fit(&[vec![1.0, 2.0], vec![2.0, 3.0]]).unwrap();
        assert!(forest.predict(&[vec![1.0]]).is_err());
    }
}
