//! Outlier-trimmed latency statistics and per-width reports.
//!
//! Samples are sorted, a fixed number are dropped from each end, and the
//! mean and Bessel-corrected standard deviation are computed over what
//! remains. Trimming is by count, not by proportion.

use crate::error::{Result, StatsError};
use std::fmt;
use std::time::Duration;

/// Samples dropped from each end by [`summarize`].
pub const DEFAULT_TRIM: usize = 2;

/// Summary of the retained middle of a sample set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    /// Arithmetic mean of the retained samples
    pub mean: f64,

    /// Sample standard deviation (divides by `n - 1`)
    pub stddev: f64,

    /// Number of samples that survived trimming
    pub retained: usize,
}

/// Summarize `samples`, dropping the lowest and highest [`DEFAULT_TRIM`].
///
/// # Errors
/// - `StatsError::InsufficientSamples` if fewer than two samples would remain
pub fn summarize(samples: &[f64]) -> Result<Summary> {
    summarize_trimmed(samples, DEFAULT_TRIM)
}

/// Summarize `samples`, dropping `trim` values from each end.
///
/// The result does not depend on input order.
///
/// # Errors
/// - `StatsError::InsufficientSamples` if fewer than two samples would remain
pub fn summarize_trimmed(samples: &[f64], trim: usize) -> Result<Summary> {
    let required = 2 * trim + 2;
    if samples.len() < required {
        return Err(StatsError::InsufficientSamples {
            count: samples.len(),
            trim,
            required,
        }
        .into());
    }

    let mut sorted = samples.to_vec();
    sorted.sort_by(f64::total_cmp);
    let kept = &sorted[trim..sorted.len() - trim];

    let n = kept.len() as f64;
    let mean = kept.iter().sum::<f64>() / n;
    let variance = kept.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0);

    Ok(Summary {
        mean,
        stddev: variance.sqrt(),
        retained: kept.len(),
    })
}

/// Final result for one bit width. Emitted once, never revisited.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BitWidthReport {
    /// Exponent `b` of the sweep start `2^b + offset`
    pub bit_width: u32,

    /// Trimmed mean latency in seconds
    pub mean: f64,

    /// Trimmed standard deviation in seconds
    pub stddev: f64,

    /// Wall-clock time of the whole sweep for this width
    pub elapsed: Duration,
}

impl BitWidthReport {
    /// Build a report from a sample summary.
    pub fn new(bit_width: u32, summary: Summary, elapsed: Duration) -> Self {
        Self {
            bit_width,
            mean: summary.mean,
            stddev: summary.stddev,
            elapsed,
        }
    }

    /// Elapsed wall-clock time in minutes.
    pub fn elapsed_minutes(&self) -> f64 {
        self.elapsed.as_secs_f64() / 60.0
    }

    /// Export as `key=value` lines.
    pub fn export_text(&self) -> String {
        format!(
            "bits={}\nmean_s={:.6}\nstddev_s={:.6}\nelapsed_min={:.3}\n",
            self.bit_width,
            self.mean,
            self.stddev,
            self.elapsed_minutes(),
        )
    }
}

impl fmt::Display for BitWidthReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "bits={}, smooth={:4.3}, stddev={:4.3}, mins={:4.1}",
            self.bit_width,
            self.mean,
            self.stddev,
            self.elapsed_minutes()
        )
    }
}
