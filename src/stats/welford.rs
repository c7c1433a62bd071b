//! Online mean/stdev via Welford's method
//!
//! Single pass, bounded numerical error, no sample history retained.

/// Population mean and standard deviation of a stream of observations.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningMoments {
    pub mean: f64,
    pub stdev: f64,
}

impl RunningMoments {
    /// Moments of a fully materialized sample (population stdev).
    pub fn of_population(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }
        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
        Self {
            mean,
            stdev: variance.sqrt(),
        }
    }

    /// Fold one observation into the moments.
    ///
    /// `count` is the sample count *including* `x`. The variance accumulator
    /// is reconstructed from the stored stdev, stepped once, and collapsed
    /// back, so repeated folds track a direct computation over the whole
    /// sample to within floating-point error.
    pub fn fold(self, count: u64, x: f64) -> Self {
        let count = count as f64;
        let mut m2 = self.stdev.powi(2) * (count - 1.0);
        let d1 = x - self.mean;
        let mean = self.mean + d1 / count;
        let d2 = x - mean;
        m2 += d1 * d2;
        Self {
            mean,
            stdev: (m2 / count).sqrt(),
        }
    }

    /// The value sitting exactly `sigmas` standard deviations above the mean
    /// (below, for negative `sigmas`).
    pub fn band(self, sigmas: f64) -> f64 {
        self.mean + sigmas * self.stdev
    }
}
