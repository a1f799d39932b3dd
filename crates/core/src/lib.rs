//! factor-bench-core: latency benchmarking for an external factorization oracle
//!
//! This library provides the core components of a benchmarking client that:
//! - Generates candidate integers across a range of bit widths
//! - Filters out candidates whose factors are trivial to find locally
//! - Sends the rest to an oracle over a line-oriented byte stream
//! - Aggregates outlier-trimmed latency statistics per bit width
//!
//! # Architecture
//!
//! The system is designed around clear module boundaries:
//! - `framing`: Query encoding and deadline-bounded line reading
//! - `client`: One request/response exchange per call, with reply validation
//! - `filter`: Perfect-square, small-factor and primality rejection
//! - `sweep`: Sampling loop per bit width and the bit-width driver
//! - `stats`: Trimmed mean/stddev and per-width reports
//! - `metrics`: Progress events and run counters
//! - `sim`: In-memory simulated oracle for tests and demos
//!
//! # Design Principles
//!
//! - **No panics**: All errors are structured and propagate to the caller
//! - **Strictly sequential**: One query in flight; replies are not correlated
//! - **Bounded waits**: Every read runs against a deadline
//! - **Injected transport**: Any `Read + Write` stream can carry the protocol

pub mod client;
pub mod error;
pub mod filter;
pub mod framing;
pub mod metrics;
pub mod sim;
pub mod stats;
pub mod sweep;

// Re-export commonly used types
pub use client::{ClientConfig, OracleClient, Reply, Verification};
pub use error::{Error, Result};
pub use filter::{Bpsw, CandidateFilter, PrimalityTest, SkipReason};
pub use metrics::{NoProgress, Progress, SweepMetrics};
pub use stats::{summarize, BitWidthReport, Summary};
pub use sweep::{SweepConfig, SweepController};
