//! Local Outlier Factor.
//!
//! Density of each row relative to its k nearest neighbours (Euclidean,
//! brute force):
//!
//! ```text
//! reach_dist(p, o) = max(k_distance(o), d(p, o))
//! lrd(p)           = 1 / (mean_o reach_dist(p, o) + 1e-10)
//! LOF(p)           = mean_o lrd(o) / lrd(p)
//! ```
//!
//! Rows with LOF above 1.5 are labelled outliers (-1), the rest inliers (1).
//! The baseline score is the negated label, so outliers score 1 and inliers
//! -1.

use super::{validate_matrix, BaselineError};
use crate::config::defaults;
use tracing::debug;

/// Added to mean reachability distances so duplicates do not divide by zero.
const LRD_EPSILON: f64 = 1e-10;

#[derive(Debug, Clone)]
pub struct LocalOutlierFactor {
    n_neighbors: usize,
    n_neighbors_effective: usize,
    negative_outlier_factor: Vec<f64>,
    labels: Vec<i8>,
}

impl Default for LocalOutlierFactor {
    fn default() -> Self {
        Self::new(defaults::LOF_NEIGHBORS)
    }
}

impl LocalOutlierFactor {
    pub fn new(n_neighbors: usize) -> Self {
        Self {
            n_neighbors,
            n_neighbors_effective: 0,
            negative_outlier_factor: Vec::new(),
            labels: Vec::new(),
        }
    }

    /// Neighbourhood size requested at construction.
    pub fn n_neighbors(&self) -> usize {
        self.n_neighbors
    }

    /// Neighbourhood size actually used, `min(k, n - 1)`.
    pub fn n_neighbors_effective(&self) -> usize {
        self.n_neighbors_effective
    }

    /// `-LOF` per row of the last fit; lower is more abnormal.
    pub fn negative_outlier_factor(&self) -> &[f64] {
        &self.negative_outlier_factor
    }

    /// Labels of the last fit: -1 outlier, 1 inlier.
    pub fn labels(&self) -> &[i8] {
        &self.labels
    }

    /// Fit on `x` and label every row.
    pub fn fit_predict(&mut self, x: &[Vec<f64>]) -> Result<Vec<i8>, BaselineError> {
        if self.n_neighbors == 0 {
            return Err(BaselineError::InvalidParameter("n_neighbors must be > 0".into()));
        }
        validate_matrix(x)?;
        let n = x.len();
        if n < 2 {
            return Err(BaselineError::InvalidParameter(format!(
                "LOF needs at least 2 rows, got {n}"
            )));
        }
        let k = self.n_neighbors.min(n - 1);
        if k < self.n_neighbors {
            debug!(requested = self.n_neighbors, used = k, "n_neighbors clipped to n - 1");
        }

        let neighbours: Vec<Vec<(usize, f64)>> = (0..n).map(|i| nearest(x, i, k)).collect();
        let k_distance: Vec<f64> = neighbours
            .iter()
            .map(|nb| nb.last().map_or(0.0, |&(_, d)| d))
            .collect();

        let lrd: Vec<f64> = neighbours
            .iter()
            .map(|nb| {
                let reach: f64 = nb.iter().map(|&(o, d)| k_distance[o].max(d)).sum();
                1.0 / (reach / k as f64 + LRD_EPSILON)
            })
            .collect();

        let lof: Vec<f64> = neighbours
            .iter()
            .enumerate()
            .map(|(i, nb)| {
                let neighbour_lrd: f64 = nb.iter().map(|&(o, _)| lrd[o]).sum::<f64>() / k as f64;
                neighbour_lrd / lrd[i]
            })
            .collect();

        self.labels = lof
            .iter()
            .map(|&f| if f > defaults::LOF_OUTLIER_THRESHOLD { -1 } else { 1 })
            .collect();
        self.negative_outlier_factor = lof.into_iter().map(|f| -f).collect();
        self.n_neighbors_effective = k;
        Ok(self.labels.clone())
    }
}

/// The `k` nearest other rows of row `i`, closest first; ties go to the
/// lower index.
fn nearest(x: &[Vec<f64>], i: usize, k: usize) -> Vec<(usize, f64)> {
    let mut dists: Vec<(usize, f64)> = x
        .iter()
        .enumerate()
        .filter(|&(j, _)| j != i)
        .map(|(j, row)| (j, euclidean(&x[i], row)))
        .collect();
    dists.sort_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)));
    dists.truncate(k);
    dists
}

fn euclidean(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(p, q)| (p - q) * (p - q))
        .sum::<f64>()
        .sqrt()
}

/// Fit LOF with `n_neighbors` and return `-label` as scores.
pub fn lof_baseline(
    x: &[Vec<f64>],
    n_neighbors: usize,
) -> Result<(Vec<f64>, LocalOutlierFactor), BaselineError> {
    let mut lof = LocalOutlierFactor::new(n_neighbors);
    let labels = lof.fit_predict(x)?;
    let scores = labels.iter().map(|&l| -f64::from(l)).collect();
    Ok((scores, lof))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid_with_outlier() -> Vec<Vec<f64>> {
        let mut x: Vec<Vec<f64>> = (0..25)
            .map(|i| vec![f64::from(i % 5), f64::from(i / 5)])
            .collect();
        x.push(vec![40.0, 40.0]);
        x
    }

    #[test]
    fn isolated_point_is_outlier() {
        let x = grid_with_outlier();
        let (scores, lof) = lof_baseline(&x, 5).unwrap();
        assert_eq!(scores[25], 1.0);
        assert_eq!(lof.labels()[25], -1);
        assert!(scores[..25].iter().all(|&s| s == -1.0));
    }

    #[test]
    fn scores_are_negated_labels() {
        let x = grid_with_outlier();
        let (scores, lof) = lof_baseline(&x, 20).unwrap();
        for (s, l) in scores.iter().zip(lof.labels()) {
            assert_eq!(*s, -f64::from(*l));
        }
        for (nof, l) in lof.negative_outlier_factor().iter().zip(lof.labels()) {
            assert_eq!(*l == -1, *nof < -defaults::LOF_OUTLIER_THRESHOLD);
        }
    }

    #[test]
    fn neighbours_clipped_to_sample_count() {
        let x = vec![vec![0.0], vec![1.0], vec![2.0]];
        let (_, lof) = lof_baseline(&x, 20).unwrap();
        assert_eq!(lof.n_neighbors(), 20);
        assert_eq!(lof.n_neighbors_effective(), 2);
    }

    #[test]
    fn duplicates_do_not_blow_up() {
        let mut x = vec![vec![1.0, 1.0]; 10];
        x.push(vec![5.0, 5.0]);
        let (scores, lof) = lof_baseline(&x, 3).unwrap();
        assert!(lof.negative_outlier_factor().iter().all(|v| v.is_finite()));
        assert_eq!(scores[10], 1.0);
    }

    #[test]
    fn rejects_degenerate_input() {
        assert!(matches!(lof_baseline(&[vec![1.0]], 5), Err(BaselineError::InvalidParameter(_))));
        assert!(matches!(lof_baseline(&[vec![1.0], vec![2.0]], 0), Err(BaselineError::InvalidParameter(_))));
        assert_eq!(lof_baseline(&[], 5).unwrap_err(), BaselineError::EmptyMatrix);
    }
}
