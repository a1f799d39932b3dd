//! Candidate sampling loop and the bit-width sweep driver.
//!
//! For one bit width the controller enumerates `start, start + 1, ...`,
//! drops candidates the filter rejects, and queries the oracle for the rest
//! until it holds the requested number of latency samples. The enumeration
//! is capped at `count * scan_multiplier` candidates; running out of that
//! budget is an error, never a silent truncation.
//!
//! The driver walks an ascending range of bit widths, sweeps from
//! `2^b + offset` for each, and turns the samples into a
//! [`BitWidthReport`].
//!
//! Any error stops the run. Samples from a width that did not finish are
//! discarded with it.

use crate::client::OracleClient;
use crate::error::{Error, Result, SweepError};
use crate::filter::{Bpsw, CandidateFilter, PrimalityTest};
use crate::metrics::{NoProgress, Progress, SweepMetrics};
use crate::stats::{summarize_trimmed, BitWidthReport, DEFAULT_TRIM};
use log::{debug, info, warn};
use num_bigint::BigUint;
use num_traits::One;
use std::io::{Read, Write};
use std::time::Instant;

/// Default candidates scanned per requested sample.
pub const DEFAULT_SCAN_MULTIPLIER: u64 = 1000;

/// Upper limit on samples per width accepted by [`SweepConfig::validate`].
pub const MAX_SAMPLES_PER_WIDTH: usize = 1_000_000;

/// Sample buffers grow past this many entries only as samples arrive.
const PREALLOCATED_SAMPLES: usize = 1024;

/// Parameters of a full benchmark run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SweepConfig {
    /// First bit width (inclusive)
    pub bits_start: u32,

    /// Last bit width (exclusive)
    pub bits_end: u32,

    /// Step between bit widths
    pub bits_step: u32,

    /// Latency samples collected per width
    pub samples_per_width: usize,

    /// Added to `2^b` to get the first candidate
    pub offset: u64,

    /// Candidates scanned per requested sample before giving up
    pub scan_multiplier: u64,

    /// Samples trimmed from each end before summarizing
    pub trim: usize,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            bits_start: 70,
            bits_end: 110,
            bits_step: 2,
            samples_per_width: 100,
            offset: 1_000_000,
            scan_multiplier: DEFAULT_SCAN_MULTIPLIER,
            trim: DEFAULT_TRIM,
        }
    }
}

impl SweepConfig {
    /// Check that the configuration describes a runnable sweep.
    ///
    /// # Errors
    /// - `Error::Config` describing the first problem found
    pub fn validate(&self) -> Result<()> {
        if self.bits_step == 0 {
            return Err(Error::Config("bit width step must be positive".to_string()));
        }
        if self.bits_start >= self.bits_end {
            return Err(Error::Config(format!(
                "empty bit width range {}..{}",
                self.bits_start, self.bits_end
            )));
        }
        if self.samples_per_width < 2 * self.trim + 2 {
            return Err(Error::Config(format!(
                "{} samples per width cannot be trimmed by {} at each end",
                self.samples_per_width, self.trim
            )));
        }
        if self.samples_per_width > MAX_SAMPLES_PER_WIDTH {
            return Err(Error::Config(format!(
                "{} samples per width exceeds the limit of {}",
                self.samples_per_width, MAX_SAMPLES_PER_WIDTH
            )));
        }
        if self.scan_multiplier == 0 {
            return Err(Error::Config("scan multiplier must be positive".to_string()));
        }
        Ok(())
    }

    /// Bit widths in ascending order.
    pub fn bit_widths(&self) -> impl Iterator<Item = u32> {
        (self.bits_start..self.bits_end).step_by(self.bits_step.max(1) as usize)
    }

    /// First candidate for a bit width: `2^bits + offset`.
    pub fn start_for(&self, bits: u32) -> BigUint {
        (BigUint::one() << bits) + self.offset
    }
}

/// Collects latency samples by driving the filter and the oracle client.
#[derive(Debug)]
pub struct SweepController<S, P = Bpsw> {
    client: OracleClient<S>,
    filter: CandidateFilter<P>,
    scan_multiplier: u64,
    metrics: SweepMetrics,
}

impl<S: Read + Write, P: PrimalityTest> SweepController<S, P> {
    /// Create a controller with the default scan multiplier.
    pub fn new(client: OracleClient<S>, filter: CandidateFilter<P>) -> Self {
        Self {
            client,
            filter,
            scan_multiplier: DEFAULT_SCAN_MULTIPLIER,
            metrics: SweepMetrics::new(),
        }
    }

    /// Override the number of candidates scanned per requested sample.
    pub fn with_scan_multiplier(mut self, scan_multiplier: u64) -> Self {
        self.scan_multiplier = scan_multiplier;
        self
    }

    /// Collect `count` latency samples (seconds), starting the scan at `start`.
    ///
    /// # Errors
    /// - `SweepError::InsufficientCandidates` if the scan cap runs out first
    /// - Any error from the oracle exchange
    pub fn sweep(&mut self, start: &BigUint, count: usize) -> Result<Vec<f64>> {
        self.sweep_with(start, count, &mut NoProgress)
    }

    /// Like [`SweepController::sweep`], reporting progress events.
    pub fn sweep_with(
        &mut self,
        start: &BigUint,
        count: usize,
        progress: &mut dyn Progress,
    ) -> Result<Vec<f64>> {
        let mut samples = Vec::with_capacity(count.min(PREALLOCATED_SAMPLES));
        if count == 0 {
            return Ok(samples);
        }

        let cap = (count as u64).saturating_mul(self.scan_multiplier);
        let mut n = start.clone();
        let mut scanned = 0u64;

        while scanned < cap {
            scanned += 1;
            self.metrics.candidates_scanned += 1;

            if let Some(reason) = self.filter.classify(&n) {
                debug!("skipping {} ({:?})", n, reason);
                self.metrics.record_skip(reason);
                progress.candidate_skipped(&n, reason);
                n += 1u32;
                continue;
            }

            let discarded_before = self.client.discarded_replies();
            self.metrics.queries += 1;
            let result = self.client.query_with(&n, progress);
            self.metrics.replies_discarded += self.client.discarded_replies() - discarded_before;
            let reply = result?;

            self.metrics.record_sample(reply.latency);
            progress.sample_collected(reply.latency);
            samples.push(reply.latency_secs());

            if samples.len() == count {
                return Ok(samples);
            }
            n += 1u32;
        }

        warn!(
            "scan cap of {} candidates from {} exhausted with {}/{} samples",
            cap,
            start,
            samples.len(),
            count
        );
        Err(SweepError::InsufficientCandidates {
            start: start.clone(),
            scanned,
            collected: samples.len(),
            required: count,
        }
        .into())
    }

    /// Sweep one bit width and summarize it.
    pub fn run_width(
        &mut self,
        bits: u32,
        config: &SweepConfig,
        progress: &mut dyn Progress,
    ) -> Result<BitWidthReport> {
        let started = Instant::now();
        let start = config.start_for(bits);

        let samples = self.sweep_with(&start, config.samples_per_width, progress)?;
        let summary = summarize_trimmed(&samples, config.trim)?;
        let report = BitWidthReport::new(bits, summary, started.elapsed());

        info!(
            "bits={} mean={:.6}s stddev={:.6}s over {} retained samples",
            bits, report.mean, report.stddev, summary.retained
        );
        Ok(report)
    }

    /// Run every bit width in `config`, handing each report to `on_report`
    /// as soon as it is computed.
    ///
    /// # Errors
    /// - `Error::Config` if `config` is invalid
    /// - The first error from any width; later widths are not attempted
    pub fn run<F>(
        &mut self,
        config: &SweepConfig,
        progress: &mut dyn Progress,
        mut on_report: F,
    ) -> Result<Vec<BitWidthReport>>
    where
        F: FnMut(&BitWidthReport),
    {
        config.validate()?;
        self.scan_multiplier = config.scan_multiplier;

        let mut reports = Vec::new();
        for bits in config.bit_widths() {
            let report = self.run_width(bits, config, progress)?;
            on_report(&report);
            reports.push(report);
        }

        self.metrics.complete();
        Ok(reports)
    }

    /// Counters accumulated across all sweeps.
    pub fn metrics(&self) -> &SweepMetrics {
        &self.metrics
    }

    /// Mutable access to the client, e.g. for verification queries.
    pub fn client_mut(&mut self) -> &mut OracleClient<S> {
        &mut self.client
    }

    /// Release the client.
    pub fn into_client(self) -> OracleClient<S> {
        self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::SkipReason;
    use crate::sim::{SimConfig, SimulatedOracle};

    fn controller(bound: u32) -> SweepController<SimulatedOracle> {
        let client = OracleClient::new(SimulatedOracle::new(SimConfig::instant(7)));
        SweepController::new(client, CandidateFilter::with_bound(Bpsw, bound))
    }

    #[test]
    fn test_default_config() {
        let config = SweepConfig::default();
        config.validate().unwrap();

        let widths: Vec<u32> = config.bit_widths().collect();
        assert_eq!(widths.first(), Some(&70));
        assert_eq!(widths.last(), Some(&108));
        assert_eq!(widths.len(), 20);

        assert_eq!(config.start_for(10), BigUint::from(1024u32 + 1_000_000));
    }

    #[test]
    fn test_invalid_config() {
        let bad = [
            SweepConfig { bits_step: 0, ..SweepConfig::default() },
            SweepConfig { bits_start: 110, ..SweepConfig::default() },
            SweepConfig { samples_per_width: 5, ..SweepConfig::default() },
            SweepConfig { scan_multiplier: 0, ..SweepConfig::default() },
            SweepConfig { samples_per_width: usize::MAX, ..SweepConfig::default() },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(Error::Config(_))), "{:?}", config);
        }
    }

    #[test]
    fn test_sweep_queries_only_hard_candidates() {
        let mut ctl = controller(11);
        let samples = ctl.sweep(&BigUint::from(101u32), 3).unwrap();

        assert_eq!(samples.len(), 3);
        // 143, 187 and 209 are the first odd composites past 121 with no factor below 11
        let metrics = ctl.metrics();
        assert_eq!(metrics.queries, 3);
        assert_eq!(metrics.candidates_scanned, 209 - 101 + 1);
        assert_eq!(ctl.into_client().into_inner().queries_received(), 3);
    }

    #[test]
    fn test_zero_count() {
        let mut ctl = controller(11);
        assert!(ctl.sweep(&BigUint::from(101u32), 0).unwrap().is_empty());
        assert_eq!(ctl.metrics().candidates_scanned, 0);
    }

    #[test]
    fn test_insufficient_candidates() {
        let mut ctl = controller(1000).with_scan_multiplier(1000);
        let err = ctl.sweep(&BigUint::from(101u32), 3).unwrap_err();

        match err {
            Error::Sweep(SweepError::InsufficientCandidates {
                scanned,
                collected,
                required,
                ..
            }) => {
                assert_eq!(scanned, 3000);
                assert_eq!(collected, 0);
                assert_eq!(required, 3);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_progress_events() {
        #[derive(Default)]
        struct Tally {
            skipped: Vec<SkipReason>,
            samples: usize,
        }
        impl Progress for Tally {
            fn candidate_skipped(&mut self, _n: &BigUint, reason: SkipReason) {
                self.skipped.push(reason);
            }
            fn sample_collected(&mut self, _latency: std::time::Duration) {
                self.samples += 1;
            }
        }

        let mut ctl = controller(11);
        let mut tally = Tally::default();
        ctl.sweep_with(&BigUint::from(119u32), 1, &mut tally).unwrap();

        // 119 = 7 * 17, 120 even, 121 square, 122 even, 123 = 3 * 41, ...
        assert_eq!(tally.samples, 1);
        assert_eq!(tally.skipped.len(), 143 - 119);
        assert!(tally.skipped.contains(&SkipReason::PerfectSquare));
        assert!(tally.skipped.contains(&SkipReason::Prime));
        assert_eq!(ctl.metrics().skipped(), tally.skipped.len() as u64);
    }

    #[test]
    fn test_timeout_stops_sweep() {
        let sim = SimulatedOracle::new(SimConfig::instant(1).behavior(crate::sim::Behavior::Stall));
        let client = OracleClient::with_config(
            sim,
            crate::client::ClientConfig {
                read_timeout: std::time::Duration::from_millis(20),
                ..Default::default()
            },
        );
        let mut ctl = SweepController::new(client, CandidateFilter::with_bound(Bpsw, 11));

        let err = ctl.sweep(&BigUint::from(101u32), 3).unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(ctl.metrics().queries, 1);
    }

    #[test]
    fn test_huge_count_does_not_preallocate() {
        let sim = SimulatedOracle::new(
            SimConfig::instant(1).behavior(crate::sim::Behavior::Fixed(b"4\r\n".to_vec())),
        );
        let mut ctl = SweepController::new(OracleClient::new(sim), CandidateFilter::with_bound(Bpsw, 11));

        let err = ctl.sweep(&BigUint::from(101u32), usize::MAX).unwrap_err();
        assert!(err.is_protocol_violation());
        assert_eq!(ctl.metrics().queries, 1);
    }
}
