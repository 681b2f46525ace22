//! Derived statistics.
//!
//! Nothing in this module keeps state: [`OccupancyStats`] and [`Summary`]
//! are computed on demand from the [`OccupancyStore`] and the
//! [`MessageStats`] lists when a report entry is written.
//!
//! [`OccupancyStore`]: crate::snapshot::OccupancyStore
//! [`MessageStats`]: crate::tracker::MessageStats

use crate::measure::Occupancy;

/// Mean and variance of the buffer occupancy over a set of hosts.
///
/// The variance is computed on the percentage scale divided by `100`:
///
/// ```text
/// mean     = Σo / n
/// variance = (Σo² / 100) / n − mean² / 100
/// ```
///
/// This is the normalisation the simulator's buffer occupancy reports have
/// always used; results stay comparable with earlier runs.
///
/// ```
/// # use netreport_core::{measure::Occupancy, stats::OccupancyStats};
/// let stats = OccupancyStats::from_occupancies([
///     Occupancy::clamped(0.0),
///     Occupancy::clamped(100.0),
/// ]);
/// assert_eq!(stats.hosts, 2);
/// assert_eq!(stats.mean, 50.0);
/// assert_eq!(stats.variance, 25.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct OccupancyStats {
    /// number of hosts the statistics were computed over
    pub hosts: usize,
    pub mean: f64,
    pub variance: f64,
}

impl OccupancyStats {
    /// An empty host set yields a mean and variance of `0`.
    pub fn from_occupancies<I>(occupancies: I) -> Self
    where
        I: IntoIterator<Item = Occupancy>,
    {
        let mut hosts = 0usize;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;

        for occupancy in occupancies {
            let value = occupancy.value();
            hosts += 1;
            sum += value;
            sum_sq += (value * value) / 100.0;
        }

        if hosts == 0 {
            return Self::default();
        }

        let n = hosts as f64;
        let mean = sum / n;
        // rounding can push a uniform set slightly below zero
        let variance = (sum_sq / n - (mean * mean) / 100.0).max(0.0);

        Self {
            hosts,
            mean,
            variance,
        }
    }
}

/// Summary of a list of samples (latencies, hop counts, ...).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub mean: f64,
    /// the upper median for an even number of samples
    pub median: f64,
    pub min: f64,
    pub max: f64,
}

impl Summary {
    /// Returns `None` for an empty list.
    ///
    /// ```
    /// # use netreport_core::stats::Summary;
    /// let summary = Summary::of(&[4.0, 1.0, 3.0, 2.0]).unwrap();
    /// assert_eq!(summary.mean, 2.5);
    /// assert_eq!(summary.median, 3.0);
    /// assert_eq!(summary.min, 1.0);
    /// assert_eq!(summary.max, 4.0);
    ///
    /// assert!(Summary::of(&[]).is_none());
    /// ```
    pub fn of(samples: &[f64]) -> Option<Self> {
        if samples.is_empty() {
            return None;
        }

        let mut sorted = samples.to_vec();
        sorted.sort_by(f64::total_cmp);

        let count = sorted.len();
        let sum: f64 = sorted.iter().sum();

        Some(Self {
            count,
            mean: sum / count as f64,
            median: sorted[count / 2],
            min: sorted[0],
            max: sorted[count - 1],
        })
    }

    /// Convenience for integer samples such as hop counts.
    pub fn of_counts(samples: &[usize]) -> Option<Self> {
        let samples: Vec<f64> = samples.iter().map(|&count| count as f64).collect();
        Self::of(&samples)
    }
}
