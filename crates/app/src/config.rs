//! Configuration for the factor-bench application.
//!
//! Handles parsing command-line arguments and filling in defaults. The
//! defaults reproduce the reference benchmark: bit widths 70..110 in steps
//! of 2, 100 samples per width, candidates starting at `2^b + 1_000_000`,
//! a 10 second read timeout, and the oracle on `/dev/ttyUSB1`.
//!
//! # Philosophy
//!
//! The tool should work with ZERO arguments against the reference setup.
//! Randomized defaults (simulated latency) are derived from the seed, and
//! the seed is printed with `--print-config` so runs are reproducible.

use crate::transport::TransportConfig;
use factor_bench_core::client::ClientConfig;
use factor_bench_core::sim::SimConfig;
use factor_bench_core::sweep::SweepConfig;
use num_bigint::BigUint;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::path::PathBuf;
use std::time::Duration;

/// Serial device used when no transport is given.
const DEFAULT_DEVICE: &str = "/dev/ttyUSB1";

/// Bit widths the simulator can still factor by trial division.
const SIMULATED_BITS: (u32, u32) = (20, 32);

/// Complete configuration for a benchmark run.
#[derive(Debug, Clone)]
pub struct Config {
    // === Transport ===
    /// Where the oracle lives
    pub transport: TransportConfig,

    /// Client read timeout and polling
    pub client: ClientConfig,

    // === Sweep ===
    /// Bit-width range and sampling parameters
    pub sweep: SweepConfig,

    /// Seed for the simulator and its randomized defaults
    pub seed: u64,

    /// Integers to verify instead of sweeping
    pub verify: Vec<BigUint>,

    // === Behavior ===
    /// Whether to print detailed config
    pub print_config: bool,

    /// Whether to print the metrics summary
    pub print_metrics: bool,

    /// File receiving per-width reports and metrics as key=value text
    pub export: Option<PathBuf>,
}

impl Config {
    /// Parse configuration from command-line arguments.
    ///
    /// If --seed is not provided, a time-based seed is used.
    pub fn from_args(args: &[String]) -> Result<Self, String> {
        let mut device: Option<PathBuf> = None;
        let mut tcp: Option<String> = None;
        let mut simulate = false;
        let mut latency_ms: Option<u64> = None;
        let mut jitter_ms: Option<u64> = None;
        let mut seed: Option<u64> = None;
        let mut timeout_ms: Option<u64> = None;
        let mut bits_start: Option<u32> = None;
        let mut bits_end: Option<u32> = None;
        let mut bits_step: Option<u32> = None;
        let mut samples: Option<usize> = None;
        let mut offset: Option<u64> = None;
        let mut scan_multiplier: Option<u64> = None;
        let mut verify = Vec::new();
        let mut print_config = false;
        let mut print_metrics = true;
        let mut export: Option<PathBuf> = None;

        let mut i = 0;
        while i < args.len() {
            match args[i].as_str() {
                "--device" => device = Some(PathBuf::from(value(args, &mut i, "a path")?)),
                "--tcp" => tcp = Some(value(args, &mut i, "HOST:PORT")?.to_string()),
                "--simulate" => simulate = true,
                "--latency" => latency_ms = Some(number(args, &mut i, "latency")?),
                "--jitter" => jitter_ms = Some(number(args, &mut i, "jitter")?),
                "--seed" => seed = Some(number(args, &mut i, "seed")?),
                "--timeout" => timeout_ms = Some(number(args, &mut i, "timeout")?),
                "--bits-start" => bits_start = Some(number(args, &mut i, "bits-start")?),
                "--bits-end" => bits_end = Some(number(args, &mut i, "bits-end")?),
                "--bits-step" => bits_step = Some(number(args, &mut i, "bits-step")?),
                "--samples" => samples = Some(number(args, &mut i, "samples")?),
                "--offset" => offset = Some(number(args, &mut i, "offset")?),
                "--scan-multiplier" => {
                    scan_multiplier = Some(number(args, &mut i, "scan-multiplier")?)
                }
                "--verify" => {
                    let text = value(args, &mut i, "an integer")?;
                    let n = BigUint::parse_bytes(text.as_bytes(), 10)
                        .ok_or_else(|| format!("invalid integer for --verify: {}", text))?;
                    verify.push(n);
                }
                "--print-config" => print_config = true,
                "--no-metrics" => print_metrics = false,
                "--export" => export = Some(PathBuf::from(value(args, &mut i, "a path")?)),
                "--help" | "-h" => {
                    print_help();
                    std::process::exit(0);
                }
                _ => {
                    return Err(format!("unknown argument: {}", args[i]));
                }
            }
            i += 1;
        }

        let chosen = [device.is_some(), tcp.is_some(), simulate];
        if chosen.iter().filter(|&&c| c).count() > 1 {
            return Err("--device, --tcp and --simulate are mutually exclusive".to_string());
        }

        // Determine seed (explicit or time-based)
        let seed = seed.unwrap_or_else(|| {
            use std::time::{SystemTime, UNIX_EPOCH};
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis() as u64)
                .unwrap_or(0)
        });

        let mut rng = ChaCha8Rng::seed_from_u64(seed);

        let transport = if simulate {
            TransportConfig::Simulate(SimConfig {
                base_latency_ms: latency_ms.unwrap_or_else(|| rng.gen_range(1..=20)),
                jitter_ms: jitter_ms.unwrap_or_else(|| rng.gen_range(0..=5)),
                ..SimConfig::instant(seed)
            })
        } else if let Some(addr) = tcp {
            TransportConfig::Tcp(addr)
        } else {
            TransportConfig::Device(device.unwrap_or_else(|| PathBuf::from(DEFAULT_DEVICE)))
        };

        let defaults = SweepConfig::default();
        let (default_start, default_end) = if simulate {
            SIMULATED_BITS
        } else {
            (defaults.bits_start, defaults.bits_end)
        };

        let sweep = SweepConfig {
            bits_start: bits_start.unwrap_or(default_start),
            bits_end: bits_end.unwrap_or(default_end),
            bits_step: bits_step.unwrap_or(defaults.bits_step),
            samples_per_width: samples.unwrap_or(defaults.samples_per_width),
            offset: offset.unwrap_or(defaults.offset),
            scan_multiplier: scan_multiplier.unwrap_or(defaults.scan_multiplier),
            trim: defaults.trim,
        };
        if verify.is_empty() {
            sweep.validate().map_err(|e| e.to_string())?;
        }

        let mut client = ClientConfig::default();
        if let Some(ms) = timeout_ms {
            client.read_timeout = Duration::from_millis(ms);
        }

        Ok(Config {
            transport,
            client,
            sweep,
            seed,
            verify,
            print_config,
            print_metrics,
            export,
        })
    }

    /// Print the configuration in human-readable form.
    pub fn print(&self) {
        println!("=== Configuration ===");
        match &self.transport {
            TransportConfig::Device(path) => println!("Transport: serial device {}", path.display()),
            TransportConfig::Tcp(addr) => println!("Transport: tcp {}", addr),
            TransportConfig::Simulate(sim) => {
                println!("Transport: simulated oracle");
                println!("  latency: {} ms ±{} ms", sim.base_latency_ms, sim.jitter_ms);
            }
        }
        println!("Read timeout: {} ms", self.client.read_timeout.as_millis());
        println!("Seed: {}", self.seed);
        if let Some(path) = &self.export {
            println!("Export: {}", path.display());
        }
        println!();
        if self.verify.is_empty() {
            println!("=== Sweep ===");
            println!(
                "Bit widths: {}..{} step {}",
                self.sweep.bits_start, self.sweep.bits_end, self.sweep.bits_step
            );
            println!("Samples per width: {}", self.sweep.samples_per_width);
            println!("Start offset: {}", self.sweep.offset);
            println!("Scan cap: {} candidates per sample", self.sweep.scan_multiplier);
            println!("Trim: {} per end", self.sweep.trim);
        } else {
            println!("=== Verify ===");
            for n in &self.verify {
                println!("{}", n);
            }
        }
        println!();
    }
}

/// Take the value following option `args[*i]`.
fn value<'a>(args: &'a [String], i: &mut usize, what: &str) -> Result<&'a str, String> {
    let option = &args[*i];
    *i += 1;
    args.get(*i)
        .map(String::as_str)
        .ok_or_else(|| format!("{} requires {}", option, what))
}

/// Take and parse the numeric value following option `args[*i]`.
fn number<T: std::str::FromStr>(args: &[String], i: &mut usize, name: &str) -> Result<T, String> {
    let text = value(args, i, "a number")?;
    text.parse()
        .map_err(|_| format!("invalid {}: {}", name, text))
}

fn print_help() {
    println!("factor-bench: Benchmark the latency of a factorization oracle");
    println!();
    println!("USAGE:");
    println!("    factor-bench [OPTIONS]");
    println!();
    println!("TRANSPORT:");
    println!("    --device <PATH>         Pre-configured serial device (default: {})", DEFAULT_DEVICE);
    println!("    --tcp <HOST:PORT>       Oracle reachable over TCP");
    println!("    --simulate              In-process simulated oracle (small widths only)");
    println!("    --latency <MS>          Simulated reply latency (default: random 1-20)");
    println!("    --jitter <MS>           Simulated latency jitter (default: random 0-5)");
    println!("    --timeout <MS>          Read timeout per reply line (default: 10000)");
    println!();
    println!("SWEEP:");
    println!("    --bits-start <N>        First bit width (default: 70, simulated: {})", SIMULATED_BITS.0);
    println!("    --bits-end <N>          Last bit width, exclusive (default: 110, simulated: {})", SIMULATED_BITS.1);
    println!("    --bits-step <N>         Bit width step (default: 2)");
    println!("    --samples <N>           Samples per width (default: 100)");
    println!("    --offset <N>            Added to 2^bits for the first candidate (default: 1000000)");
    println!("    --scan-multiplier <N>   Candidates scanned per sample before giving up (default: 1000)");
    println!("    --seed <N>              Seed for simulated latency and jitter");
    println!();
    println!("OTHER:");
    println!("    --verify <N>            Query N once and print the factor (repeatable)");
    println!("    --print-config          Print resolved configuration");
    println!("    --no-metrics            Don't print metrics summary");
    println!("    --export <FILE>         Write reports and metrics as key=value text");
    println!("    --help, -h              Print this help");
    println!();
    println!("EXAMPLES:");
    println!("    factor-bench                                   # Reference sweep on /dev/ttyUSB1");
    println!("    factor-bench --tcp 10.0.0.5:6502 --samples 20  # Shorter sweep over TCP");
    println!("    factor-bench --verify 2059 --verify 1022117    # Spot-check the oracle");
    println!("    factor-bench --simulate --seed 42              # Dry run without hardware");
    println!();
}
