//! Progress observation and counters for a benchmark run.
//!
//! This module provides observable insights into sweep behavior:
//! - Candidate counts (scanned, skipped by reason)
//! - Oracle exchanges (queries issued, noise lines discarded)
//! - Timing information
//!
//! # Design
//!
//! Progress is reported through the [`Progress`] trait, whose methods all
//! default to no-ops. Nothing in the measurement path depends on what an
//! observer does with the events.
//!
//! # Thread Safety
//!
//! `SweepMetrics` is NOT thread-safe. The benchmark is strictly sequential,
//! so it is updated from a single thread of control.

use crate::filter::SkipReason;
use num_bigint::BigUint;
use std::time::{Duration, Instant};

/// Observer for non-contractual progress events.
pub trait Progress {
    /// A candidate was rejected locally without querying the oracle.
    fn candidate_skipped(&mut self, _n: &BigUint, _reason: SkipReason) {}

    /// A received line did not qualify as a reply and was dropped.
    fn reply_discarded(&mut self, _line: &[u8]) {}

    /// A latency sample was collected.
    fn sample_collected(&mut self, _latency: Duration) {}
}

/// Progress observer that ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl Progress for NoProgress {}

/// Counters for one or more sweeps.
#[derive(Debug, Clone)]
pub struct SweepMetrics {
    // === Timing ===
    /// When collection started
    pub start_time: Instant,

    /// When collection ended (set on completion)
    pub end_time: Option<Instant>,

    // === Candidates ===
    /// Integers pulled from the enumeration
    pub candidates_scanned: u64,

    /// Rejected as perfect squares
    pub skipped_square: u64,

    /// Rejected for a factor below the trial-division bound
    pub skipped_small_factor: u64,

    /// Rejected as prime
    pub skipped_prime: u64,

    // === Oracle ===
    /// Queries sent to the oracle
    pub queries: u64,

    /// Lines discarded as incomplete replies
    pub replies_discarded: u64,

    /// Latency samples collected
    pub samples: u64,

    /// Sum of all collected latencies
    pub total_latency: Duration,
}

impl SweepMetrics {
    /// Create new metrics with start time set to now.
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            end_time: None,
            candidates_scanned: 0,
            skipped_square: 0,
            skipped_small_factor: 0,
            skipped_prime: 0,
            queries: 0,
            replies_discarded: 0,
            samples: 0,
            total_latency: Duration::ZERO,
        }
    }

    /// Mark collection as complete.
    pub fn complete(&mut self) {
        self.end_time = Some(Instant::now());
    }

    /// Get total duration (or current elapsed if not complete).
    pub fn duration(&self) -> Duration {
        match self.end_time {
            Some(end) => end.duration_since(self.start_time),
            None => self.start_time.elapsed(),
        }
    }

    /// Record a locally rejected candidate.
    pub fn record_skip(&mut self, reason: SkipReason) {
        match reason {
            SkipReason::PerfectSquare => self.skipped_square += 1,
            SkipReason::SmallFactor => self.skipped_small_factor += 1,
            SkipReason::Prime => self.skipped_prime += 1,
        }
    }

    /// Record a successful oracle exchange.
    pub fn record_sample(&mut self, latency: Duration) {
        self.samples += 1;
        self.total_latency += latency;
    }

    /// Total candidates rejected locally.
    pub fn skipped(&self) -> u64 {
        self.skipped_square + self.skipped_small_factor + self.skipped_prime
    }

    /// Fraction of scanned candidates that never reached the oracle.
    ///
    /// Returns 0.0 if nothing was scanned.
    pub fn skip_rate(&self) -> f64 {
        if self.candidates_scanned == 0 {
            0.0
        } else {
            self.skipped() as f64 / self.candidates_scanned as f64
        }
    }

    /// Untrimmed mean latency in seconds.
    pub fn mean_latency_secs(&self) -> f64 {
        if self.samples == 0 {
            0.0
        } else {
            self.total_latency.as_secs_f64() / self.samples as f64
        }
    }

    /// Print a human-readable summary to stdout.
    pub fn print_summary(&self) {
        println!("\n=== Sweep Summary ===");
        println!("Duration: {:.1} s", self.duration().as_secs_f64());
        println!();

        println!("=== Candidates ===");
        println!("Scanned: {}", self.candidates_scanned);
        println!("Skipped: {} ({:.2}%)", self.skipped(), self.skip_rate() * 100.0);
        println!("  perfect square: {}", self.skipped_square);
        println!("  small factor:   {}", self.skipped_small_factor);
        println!("  prime:          {}", self.skipped_prime);
        println!();

        println!("=== Oracle ===");
        println!("Queries: {}", self.queries);
        println!("Samples: {}", self.samples);
        println!("Discarded lines: {}", self.replies_discarded);
        println!("Mean latency (untrimmed): {:.3} s", self.mean_latency_secs());
        println!();
    }

    /// Export metrics as a simple text format (for parsing/testing).
    pub fn export_text(&self) -> String {
        format!(
            "duration_ms={}\n\
             candidates_scanned={}\n\
             skipped_square={}\n\
             skipped_small_factor={}\n\
             skipped_prime={}\n\
             skip_rate={:.4}\n\
             queries={}\n\
             samples={}\n\
             replies_discarded={}\n\
             mean_latency_s={:.6}\n",
            self.duration().as_millis(),
            self.candidates_scanned,
            self.skipped_square,
            self.skipped_small_factor,
            self.skipped_prime,
            self.skip_rate(),
            self.queries,
            self.samples,
            self.replies_discarded,
            self.mean_latency_secs(),
        )
    }
}

impl Default for SweepMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_creation() {
        let metrics = SweepMetrics::new();
        assert!(metrics.end_time.is_none());
        assert!(metrics.duration().as_millis() < 100);
    }

    #[test]
    fn test_skip_rate() {
        let mut metrics = SweepMetrics::new();
        assert_eq!(metrics.skip_rate(), 0.0);

        metrics.candidates_scanned = 8;
        metrics.record_skip(SkipReason::PerfectSquare);
        metrics.record_skip(SkipReason::SmallFactor);
        metrics.record_skip(SkipReason::SmallFactor);
        metrics.record_skip(SkipReason::Prime);

        assert_eq!(metrics.skipped(), 4);
        assert_eq!(metrics.skipped_small_factor, 2);
        assert_eq!(metrics.skip_rate(), 0.5);
    }

    #[test]
    fn test_mean_latency() {
        let mut metrics = SweepMetrics::new();
        metrics.record_sample(Duration::from_millis(10));
        metrics.record_sample(Duration::from_millis(30));

        assert_eq!(metrics.samples, 2);
        assert!((metrics.mean_latency_secs() - 0.020).abs() < 1e-9);
    }

    #[test]
    fn test_export_text() {
        let mut metrics = SweepMetrics::new();
        metrics.candidates_scanned = 1000;
        metrics.queries = 3;
        metrics.complete();

        let text = metrics.export_text();
        assert!(text.contains("candidates_scanned=1000"));
        assert!(text.contains("queries=3"));
        assert!(text.contains("skip_rate=0.0000"));
    }
}
