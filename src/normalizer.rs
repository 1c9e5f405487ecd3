//! Min-max feature normalization
//!
//! Each feature dimension is scaled to [0, 1] using the min/max observed in the
//! training set. The same statistics are reused at inference so logged and
//! forecast vectors land on one scale. A dimension with no spread normalizes
//! to 0 rather than NaN.

use crate::types::FeatureStats;

/// Ranges narrower than this are treated as constant
pub const RANGE_EPSILON: f64 = 1e-10;

impl FeatureStats {
    /// Compute per-dimension min, max and mean over the rows
    ///
    /// Returns `None` for an empty set. Every row must have the same length as the first.
    pub fn fit<R: AsRef<[f64]>>(rows: &[R]) -> Option<Self> {
        let dims = rows.first()?.as_ref().len();
        let mut min = vec![f64::INFINITY; dims];
        let mut max = vec![f64::NEG_INFINITY; dims];
        let mut sum = vec![0.0; dims];

        for row in rows {
            for (j, &v) in row.as_ref().iter().enumerate().take(dims) {
                min[j] = min[j].min(v);
                max[j] = max[j].max(v);
                sum[j] += v;
            }
        }

        let n = rows.len() as f64;
        Some(Self {
            min,
            max,
            mean: sum.into_iter().map(|s| s / n).collect(),
        })
    }

    pub fn dimensions(&self) -> usize {
        self.min.len()
    }

    pub fn range(&self, j: usize) -> f64 {
        self.max[j] - self.min[j]
    }

    /// Whether dimension `j` varied in the training set
    pub fn has_range(&self, j: usize) -> bool {
        self.range(j) > RANGE_EPSILON
    }

    /// Scale one value of dimension `j`
    pub fn normalize_value(&self, j: usize, v: f64) -> f64 {
        if self.has_range(j) {
            (v - self.min[j]) / self.range(j)
        } else {
            0.0
        }
    }

    /// Scale a whole vector
    pub fn normalize(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .enumerate()
            .take(self.dimensions())
            .map(|(j, &v)| self.normalize_value(j, v))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_fit_min_max_mean() {
        let rows = vec![vec![1.0, 10.0], vec![3.0, 10.0], vec![2.0, 10.0]];
        let stats = FeatureStats::fit(&rows).unwrap();
        assert_eq!(
            stats,
            FeatureStats {
                min: vec![1.0, 10.0],
                max: vec![3.0, 10.0],
                mean: vec![2.0, 10.0],
            }
        );
    }

    #[test]
    fn test_normalize_scales_to_unit_interval() {
        let rows = [[0.0, 5.0], [4.0, 5.0]];
        let stats = FeatureStats::fit(&rows).unwrap();
        assert_eq!(stats.normalize(&[2.0, 5.0]), vec![0.5, 0.0]);
        assert_eq!(stats.normalize(&[4.0, 7.0]), vec![1.0, 0.0]);
    }

    #[test]
    fn test_constant_dimension_normalizes_to_zero() {
        let rows = [[7.0], [7.0], [7.0]];
        let stats = FeatureStats::fit(&rows).unwrap();
        assert!(!stats.has_range(0));
        let v = stats.normalize_value(0, 7.0);
        assert_eq!(v, 0.0);
        assert!(!v.is_nan());
    }

    #[test]
    fn test_empty_set_has_no_stats() {
        let rows: Vec<Vec<f64>> = Vec::new();
        assert!(FeatureStats::fit(&rows).is_none());
    }
}
