//! Error types for the factor-bench system.
//!
//! Every failure of a measurement is surfaced as a structured error. A
//! benchmark that silently dropped a bad measurement would corrupt the
//! statistic it reports, so none of these are recovered internally.

use num_bigint::BigUint;
use thiserror::Error;

/// Top-level error type for all operations in the system.
///
/// Each variant corresponds to a specific failure domain:
/// - Protocol: the oracle exchange timed out or returned a bad reply
/// - Sweep: candidate enumeration ran out of budget
/// - Stats: too few samples to summarize
/// - I/O: the transport failed for a reason other than a read timeout
#[derive(Debug, Error)]
pub enum Error {
    /// Oracle exchange failure (timeout or protocol violation)
    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Sweep could not collect enough samples
    #[error("sweep error: {0}")]
    Sweep(#[from] SweepError),

    /// Statistics could not be computed
    #[error("statistics error: {0}")]
    Stats(#[from] StatsError),

    /// Transport I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("configuration error: {0}")]
    Config(String),
}

impl Error {
    /// True if no complete reply arrived before the read deadline.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Protocol(ProtocolError::Timeout { .. }))
    }

    /// True if the oracle replied with something that is not a factor.
    pub fn is_protocol_violation(&self) -> bool {
        matches!(self, Error::Protocol(e) if e.is_violation())
    }
}

/// Errors from a single request/response exchange with the oracle.
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// No line-feed terminated reply within the read timeout
    #[error("no complete reply within {timeout_ms}ms ({partial_bytes} bytes buffered)")]
    Timeout { timeout_ms: u64, partial_bytes: usize },

    /// Reply parsed, but does not divide the query
    #[error("oracle replied {factor}, which does not divide {n}")]
    NonFactor { n: BigUint, factor: BigUint },

    /// Reply of zero can never be a factor
    #[error("oracle replied 0 for {n}")]
    ZeroFactor { n: BigUint },

    /// Reply is not a decimal integer
    #[error("unparseable reply: {line:?}")]
    Unparseable { line: String },
}

impl ProtocolError {
    /// Protocol violations imply the stream is desynchronized.
    pub fn is_violation(&self) -> bool {
        !matches!(self, ProtocolError::Timeout { .. })
    }
}

/// Sweep errors.
#[derive(Debug, Error)]
pub enum SweepError {
    /// The scan cap was exhausted before enough candidates were accepted
    #[error(
        "scanned {scanned} candidates from {start} but only collected {collected} of {required} samples"
    )]
    InsufficientCandidates {
        start: BigUint,
        scanned: u64,
        collected: usize,
        required: usize,
    },
}

/// Statistics errors.
#[derive(Debug, Error)]
pub enum StatsError {
    /// Trimming would leave fewer than two samples
    #[error("need at least {required} samples to trim {trim} from each end, got {count}")]
    InsufficientSamples {
        count: usize,
        trim: usize,
        required: usize,
    },
}

/// Type alias for Result with our Error type
pub type Result<T> = std::result::Result<T, Error>;
