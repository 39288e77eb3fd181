//! Descriptive statistics over credit values.

use serde::Serialize;

/// Summary statistics of a credit distribution.
///
/// The standard deviation treats the values as the whole population, not a
/// sample of a larger one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct CostStatistics {
    /// Number of observations.
    pub count: usize,
    /// Mean credits.
    pub mean: f64,
    /// Population standard deviation of credits.
    pub std_dev: f64,
    /// Median credits.
    pub median: f64,
    /// 95th percentile credits (nearest rank).
    pub percentile_95: f64,
}

impl CostStatistics {
    /// Computes statistics for the given values. Empty input yields all zeros.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let mut ranked = values.to_vec();
        ranked.sort_by(f64::total_cmp);

        let count = ranked.len();
        let mean = ranked.iter().sum::<f64>() / count as f64;
        let variance = ranked.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count as f64;

        Self {
            count,
            mean,
            std_dev: variance.sqrt(),
            median: Self::median_of(&ranked),
            percentile_95: Self::nearest_rank(&ranked, 95),
        }
    }

    /// Standardized distance of `value` from the mean.
    ///
    /// Fewer than two observations or zero spread give a z-score of 0.
    /// Spread at the level of rounding noise counts as zero.
    pub fn z_score(&self, value: f64) -> f64 {
        if self.count < 2 || !self.has_spread() {
            return 0.0;
        }
        (value - self.mean) / self.std_dev
    }

    fn has_spread(&self) -> bool {
        let noise = f64::EPSILON * self.mean.abs().max(1.0) * 4.0;
        self.std_dev.is_finite() && self.std_dev > noise
    }

    /// Middle value of sorted, non-empty `ranked`; the mean of the two middle
    /// values for an even count.
    fn median_of(ranked: &[f64]) -> f64 {
        let mid = ranked.len() / 2;
        if ranked.len() % 2 == 0 {
            (ranked[mid - 1] + ranked[mid]) / 2.0
        } else {
            ranked[mid]
        }
    }

    /// Smallest value of sorted, non-empty `ranked` with at least
    /// `percentile`% of the values at or below it.
    fn nearest_rank(ranked: &[f64], percentile: u8) -> f64 {
        let rank = (usize::from(percentile) * ranked.len()).div_ceil(100);
        ranked[rank.clamp(1, ranked.len()) - 1]
    }
}
