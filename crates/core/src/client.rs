//! Request/response driver for the factorization oracle.
//!
//! One call to [`OracleClient::query`] is exactly one exchange: write the
//! framed query, then read lines until one qualifies as a reply, validate
//! it, and return the factor with the measured latency.
//!
//! # Timing
//!
//! The latency timer starts immediately before the write, so transport
//! write time is included in every sample. It stops as soon as a
//! qualifying line has been read, before parsing and validation.
//!
//! # Deadlines
//!
//! The read timeout applies to each line read, not to the whole exchange.
//! A noise line (e.g. a bare `\r\n`) restarts the clock, so an oracle that
//! keeps emitting noise can hold an exchange open for longer than one
//! timeout. If a line read runs out of time without seeing a line feed the
//! exchange fails with `ProtocolError::Timeout`; the client never retries.
//!
//! # Sequencing
//!
//! Replies carry no identifier tying them to a request. The client takes
//! `&mut self` for every exchange so only one query can be in flight on a
//! given stream.

use crate::error::{ProtocolError, Result};
use crate::framing::{encode_query, is_complete_reply, parse_reply, LineReader};
use crate::metrics::{NoProgress, Progress};
use log::debug;
use num_bigint::BigUint;
use num_traits::Zero;
use std::io::{Read, Write};
use std::time::{Duration, Instant};

/// Default read timeout per line, matching the reference serial configuration.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Default sleep between reads that returned no data.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_micros(100);

/// Client timing configuration.
#[derive(Debug, Clone, Copy)]
pub struct ClientConfig {
    /// Deadline for each line read
    pub read_timeout: Duration,

    /// Sleep between empty reads
    pub poll_interval: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            read_timeout: DEFAULT_READ_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// A validated oracle reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    /// Factor claimed by the oracle; divides the query
    pub factor: BigUint,

    /// Round-trip time from just before the write to the reply line
    pub latency: Duration,
}

impl Reply {
    /// Latency in seconds.
    pub fn latency_secs(&self) -> f64 {
        self.latency.as_secs_f64()
    }
}

/// Result of a single verification query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verification {
    /// The queried integer
    pub n: BigUint,

    /// The validated reply
    pub reply: Reply,
}

impl std::fmt::Display for Verification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} : {} | {:4.3}", self.n, self.reply.factor, self.reply.latency_secs())
    }
}

/// Owns the byte stream to the oracle and performs exchanges over it.
#[derive(Debug)]
pub struct OracleClient<S> {
    stream: S,
    reader: LineReader,
    config: ClientConfig,
    discarded: u64,
}

impl<S: Read + Write> OracleClient<S> {
    /// Create a client with the default configuration.
    pub fn new(stream: S) -> Self {
        Self::with_config(stream, ClientConfig::default())
    }

    /// Create a client with an explicit configuration.
    pub fn with_config(stream: S, config: ClientConfig) -> Self {
        Self {
            stream,
            reader: LineReader::new(),
            config,
            discarded: 0,
        }
    }

    /// Query the oracle for a factor of `n`.
    ///
    /// # Errors
    /// - `ProtocolError::Timeout` if a line read exceeds the read timeout
    /// - `ProtocolError::NonFactor` / `ZeroFactor` / `Unparseable` if the
    ///   reply is not a factor of `n`
    /// - `Error::Io` if the transport fails or the peer closes the stream
    pub fn query(&mut self, n: &BigUint) -> Result<Reply> {
        self.query_with(n, &mut NoProgress)
    }

    /// Like [`OracleClient::query`], reporting discarded lines to `progress`.
    pub fn query_with(&mut self, n: &BigUint, progress: &mut dyn Progress) -> Result<Reply> {
        let frame = encode_query(n);

        let start = Instant::now();
        self.stream.write_all(&frame)?;
        self.stream.flush()?;

        loop {
            let line = self
                .reader
                .read_line(&mut self.stream, self.config.read_timeout, self.config.poll_interval)?
                .ok_or_else(|| ProtocolError::Timeout {
                    timeout_ms: self.config.read_timeout.as_millis() as u64,
                    partial_bytes: self.reader.pending(),
                })?;

            if !is_complete_reply(&line) {
                self.discarded += 1;
                debug!("discarding incomplete reply line {:?}", String::from_utf8_lossy(&line));
                progress.reply_discarded(&line);
                continue;
            }

            let latency = start.elapsed();
            let factor = parse_reply(&line)?;
            check_factor(n, &factor)?;

            return Ok(Reply { factor, latency });
        }
    }

    /// Query `n` and package the result for display.
    pub fn verify(&mut self, n: &BigUint) -> Result<Verification> {
        let reply = self.query(n)?;
        Ok(Verification { n: n.clone(), reply })
    }

    /// Lines discarded as incomplete over the client's lifetime.
    pub fn discarded_replies(&self) -> u64 {
        self.discarded
    }

    /// Release the underlying stream.
    pub fn into_inner(self) -> S {
        self.stream
    }
}

/// Enforce `n mod f == 0`.
fn check_factor(n: &BigUint, factor: &BigUint) -> Result<()> {
    if factor.is_zero() {
        return Err(ProtocolError::ZeroFactor { n: n.clone() }.into());
    }
    if !(n % factor).is_zero() {
        return Err(ProtocolError::NonFactor {
            n: n.clone(),
            factor: factor.clone(),
        }
        .into());
    }
    Ok(())
}
