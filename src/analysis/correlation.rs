//! Pairwise Pearson correlation between sensor channels.
//!
//! Each coefficient comes with a two-tailed p-value from Student's
//! t-distribution (statrs), so the strongest relationships can be listed
//! next to the heatmap.

use crate::data::{DataError, Table};
use statrs::distribution::{ContinuousCDF, StudentsT};

/// Square correlation matrix over named sensors.
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    pub names: Vec<String>,
    /// `values[i][j]` is r between `names[i]` and `names[j]`.
    pub values: Vec<Vec<f64>>,
    pub p_values: Vec<Vec<f64>>,
    pub sample_count: usize,
}

/// One off-diagonal entry of a [`CorrelationMatrix`].
#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationPair {
    pub x: String,
    pub y: String,
    pub r: f64,
    pub p_value: f64,
}

impl CorrelationMatrix {
    pub fn get(&self, x: &str, y: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == x)?;
        let j = self.names.iter().position(|n| n == y)?;
        Some(self.values[i][j])
    }

    /// Upper-triangle pairs with `p < alpha`, strongest |r| first.
    pub fn significant_pairs(&self, alpha: f64) -> Vec<CorrelationPair> {
        let mut pairs: Vec<CorrelationPair> = (0..self.names.len())
            .flat_map(|i| ((i + 1)..self.names.len()).map(move |j| (i, j)))
            .filter(|&(i, j)| self.p_values[i][j] < alpha)
            .map(|(i, j)| CorrelationPair {
                x: self.names[i].clone(),
                y: self.names[j].clone(),
                r: self.values[i][j],
                p_value: self.p_values[i][j],
            })
            .collect();
        pairs.sort_by(|a, b| b.r.abs().total_cmp(&a.r.abs()));
        pairs
    }
}

/// Correlate every pair of the named sensors.
///
/// A constant column correlates 0 with everything else; the diagonal is 1.
pub fn correlation_matrix(table: &Table, names: &[String]) -> Result<CorrelationMatrix, DataError> {
    let columns = names
        .iter()
        .map(|n| table.sensor(n).ok_or_else(|| DataError::MissingColumn(n.clone())))
        .collect::<Result<Vec<_>, _>>()?;

    let k = columns.len();
    let n = table.len();
    let mut values = vec![vec![0.0; k]; k];
    let mut p_values = vec![vec![1.0; k]; k];
    for i in 0..k {
        values[i][i] = 1.0;
        p_values[i][i] = 0.0;
        for j in (i + 1)..k {
            let r = pearson(columns[i], columns[j]);
            let p = p_value_for_r(r, n);
            values[i][j] = r;
            values[j][i] = r;
            p_values[i][j] = p;
            p_values[j][i] = p;
        }
    }

    Ok(CorrelationMatrix {
        names: names.to_vec(),
        values,
        p_values,
        sample_count: n,
    })
}

/// Pearson correlation coefficient.
///
/// Formula: r = (nΣxy - ΣxΣy) / sqrt((nΣx² - (Σx)²)(nΣy² - (Σy)²))
pub fn pearson(x: &[f64], y: &[f64]) -> f64 {
    let len = x.len().min(y.len());
    if len < 2 {
        return 0.0;
    }
    let (x, y) = (&x[..len], &y[..len]);
    let n = len as f64;
    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
    let sum_x2: f64 = x.iter().map(|a| a * a).sum();
    let sum_y2: f64 = y.iter().map(|a| a * a).sum();

    let numerator = n * sum_xy - sum_x * sum_y;
    let denominator = ((n * sum_x2 - sum_x.powi(2)) * (n * sum_y2 - sum_y.powi(2))).sqrt();

    if denominator == 0.0 || !denominator.is_finite() {
        0.0
    } else {
        (numerator / denominator).clamp(-1.0, 1.0)
    }
}

/// Two-tailed p-value of r with n samples: t = r·sqrt(n-2)/sqrt(1-r²).
fn p_value_for_r(r: f64, n: usize) -> f64 {
    if n < 3 {
        return 1.0;
    }
    if r.abs() >= 0.9999 {
        return 0.0;
    }
    let df = (n - 2) as f64;
    let t_stat = r * df.sqrt() / (1.0 - r * r).sqrt();
    StudentsT::new(0.0, 1.0, df).map_or(1.0, |t| 2.0 * (1.0 - t.cdf(t_stat.abs())))
}
