//! factor-bench: measure how long a factorization oracle takes to answer.
//!
//! Sweeps bit widths, sends every non-trivial candidate to the oracle, and
//! prints one trimmed latency summary per width. With `--verify` it instead
//! queries the given integers once each.

mod config;
mod transport;

use config::Config;
use factor_bench_core::{
    Bpsw, CandidateFilter, OracleClient, Progress, SweepController,
};
use log::{error, info};
use std::io::Write;
use std::time::Duration;
use transport::Stream;

/// Prints `.` per collected sample and `*` per discarded reply line.
struct ConsoleProgress;

impl ConsoleProgress {
    fn mark(&self, c: char) {
        let mut out = std::io::stdout().lock();
        let _ = write!(out, "{}", c);
        let _ = out.flush();
    }
}

impl Progress for ConsoleProgress {
    fn reply_discarded(&mut self, _line: &[u8]) {
        self.mark('*');
    }

    fn sample_collected(&mut self, _latency: Duration) {
        self.mark('.');
    }
}

fn main() {
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match Config::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {}", e);
            eprintln!("run with --help for usage");
            std::process::exit(2);
        }
    };

    if config.print_config {
        config.print();
    }

    if let Err(e) = run(&config) {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn run(config: &Config) -> factor_bench_core::Result<()> {
    let stream = transport::open(&config.transport, &config.client)?;
    let client = OracleClient::with_config(stream, config.client);
    let filter = CandidateFilter::new(Bpsw);
    let mut controller =
        SweepController::new(client, filter).with_scan_multiplier(config.sweep.scan_multiplier);

    if !config.verify.is_empty() {
        for n in &config.verify {
            let verification = controller.client_mut().verify(n)?;
            println!("{}", verification);
        }
        println!("Done");
        return Ok(());
    }

    let mut progress = ConsoleProgress;
    let reports =
        controller.run(&config.sweep, &mut progress, |report| println!("\n{}", report))?;

    if config.print_metrics {
        controller.metrics().print_summary();
    }

    if let Some(path) = &config.export {
        let mut text = String::new();
        for report in &reports {
            text.push_str(&report.export_text());
            text.push('\n');
        }
        text.push_str(&controller.metrics().export_text());
        std::fs::write(path, text)?;
        info!("exported {} reports to {}", reports.len(), path.display());
    }

    if let Stream::Simulated(sim) = controller.into_client().into_inner() {
        info!(
            "simulated oracle: {} queries received, {} replies delivered, {} pending",
            sim.queries_received(),
            sim.replies_delivered(),
            sim.pending_count()
        );
    }

    println!("Done");
    Ok(())
}
