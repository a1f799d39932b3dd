//! Integration tests for the full benchmarking pipeline.
//!
//! These tests verify end-to-end behavior: enumerate -> filter -> query ->
//! validate -> summarize, against the in-memory simulated oracle.

use factor_bench_core::{
    client::{ClientConfig, OracleClient},
    filter::{Bpsw, CandidateFilter},
    metrics::NoProgress,
    sim::{Behavior, SimConfig, SimulatedOracle},
    stats::summarize,
    sweep::{SweepConfig, SweepController},
};
use num_bigint::BigUint;
use std::time::Duration;

fn sim_controller(config: SimConfig, bound: u32) -> SweepController<SimulatedOracle> {
    let client = OracleClient::new(SimulatedOracle::new(config));
    SweepController::new(client, CandidateFilter::with_bound(Bpsw, bound))
}

/// Three hard candidates, each answered after a 5 ms delay.
#[test]
fn test_sweep_latency_matches_simulated_delay() {
    let mut ctl = sim_controller(SimConfig::with_latency(5, 42), 11);

    let samples = ctl.sweep(&BigUint::from(101u32), 3).expect("sweep failed");

    assert_eq!(samples.len(), 3);
    for latency in &samples {
        assert!(*latency >= 0.005, "latency {} below simulated delay", latency);
        assert!(*latency < 0.100, "latency {} far above simulated delay", latency);
    }
}

/// With the standard bound, the first hard candidate is 1009 * 1013.
#[test]
fn test_default_bound_finds_semiprime() {
    let mut ctl = sim_controller(SimConfig::instant(1), 1000).with_scan_multiplier(100);

    let samples = ctl.sweep(&BigUint::from(1_022_100u32), 1).expect("sweep failed");
    assert_eq!(samples.len(), 1);
    assert_eq!(ctl.metrics().candidates_scanned, 1_022_117 - 1_022_100 + 1);

    let reply = ctl
        .client_mut()
        .query(&BigUint::from(1_022_117u32))
        .expect("query failed");
    assert_eq!(reply.factor, BigUint::from(1009u32));
}

/// A full multi-width run produces one report per width, in order.
#[test]
fn test_full_run_reports_each_width() {
    let mut ctl = sim_controller(SimConfig::with_latency(1, 7), 11);
    let config = SweepConfig {
        bits_start: 8,
        bits_end: 14,
        bits_step: 2,
        samples_per_width: 6,
        offset: 0,
        scan_multiplier: 1000,
        trim: 2,
    };

    let mut seen = Vec::new();
    let reports = ctl
        .run(&config, &mut NoProgress, |r| seen.push(r.bit_width))
        .expect("run failed");

    assert_eq!(seen, vec![8, 10, 12]);
    assert_eq!(reports.len(), 3);
    for report in &reports {
        assert!(report.mean >= 0.001);
        assert!(report.stddev >= 0.0);
        assert!(report.to_string().starts_with(&format!("bits={}, smooth=", report.bit_width)));
    }

    let metrics = ctl.metrics();
    assert_eq!(metrics.samples, 18);
    assert!(metrics.end_time.is_some());
}

/// Blank lines from the oracle are skipped without breaking the exchange.
#[test]
fn test_noise_lines_tolerated() {
    let config = SimConfig::instant(3).behavior(Behavior::Noise(4));
    let mut ctl = sim_controller(config, 11);

    let samples = ctl.sweep(&BigUint::from(101u32), 3).expect("sweep failed");
    assert_eq!(samples.len(), 3);
    assert_eq!(ctl.metrics().replies_discarded, 12);
}

/// Replies trickling in one byte at a time still frame correctly.
#[test]
fn test_fragmented_replies() {
    let mut config = SimConfig::instant(5);
    config.fragment_size = 1;

    let mut client = OracleClient::new(SimulatedOracle::new(config));
    for (n, f) in [(143u32, 11u32), (1_022_117, 1009), (35, 5)] {
        let reply = client.query(&BigUint::from(n)).expect("query failed");
        assert_eq!(reply.factor, BigUint::from(f));
    }
}

/// A lying oracle is caught before its answer becomes a sample.
#[test]
fn test_wrong_factor_is_fatal() {
    let config = SimConfig::instant(1).behavior(Behavior::Fixed(b"4\r\n".to_vec()));
    let mut ctl = sim_controller(config, 11);

    let err = ctl.sweep(&BigUint::from(101u32), 3).unwrap_err();
    assert!(err.is_protocol_violation());
    assert_eq!(ctl.metrics().samples, 0);
}

/// A stalled oracle fails within the configured deadline.
#[test]
fn test_stalled_oracle_times_out() {
    let sim = SimulatedOracle::new(SimConfig::instant(1).behavior(Behavior::Stall));
    let mut client = OracleClient::with_config(
        sim,
        ClientConfig {
            read_timeout: Duration::from_millis(100),
            poll_interval: Duration::from_millis(1),
        },
    );

    let started = std::time::Instant::now();
    let err = client.query(&BigUint::from(143u32)).unwrap_err();

    assert!(err.is_timeout());
    assert!(started.elapsed() < Duration::from_secs(2));
}

/// Reported statistics match a direct summary of the same samples.
#[test]
fn test_summary_of_sweep_samples() {
    let mut ctl = sim_controller(SimConfig::with_latency(2, 11), 11);
    let samples = ctl.sweep(&BigUint::from(101u32), 8).expect("sweep failed");

    let summary = summarize(&samples).expect("summary failed");
    assert_eq!(summary.retained, 4);
    assert!(summary.mean >= 0.002);
}
