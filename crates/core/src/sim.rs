//! In-memory simulated oracle with latency and jitter.
//!
//! `SimulatedOracle` implements `Read + Write` so it can stand in for the
//! real byte stream. It parses `\r\n`-terminated decimal queries, answers
//! with the smallest prime factor, and holds each reply back until its
//! delivery time has arrived.
//!
//! # Simulated Effects
//!
//! - **Latency**: Base delay for every reply
//! - **Jitter**: Uniform variation in latency
//! - **Fragmentation**: Replies trickle out a few bytes per `read`
//! - **Misbehavior**: Wrong replies, stalls, and blank noise lines
//!
//! # Determinism
//!
//! All randomness comes from a seeded ChaCha8 RNG. Given the same seed and
//! the same queries, the scheduled delays are identical.
//!
//! # Limits
//!
//! Factors are found by trial division. This is only meant for small
//! magnitudes in tests and demos, not for the widths of a real sweep.

use num_bigint::BigUint;
use num_integer::Integer;
use num_traits::{One, Zero};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::collections::VecDeque;
use std::io::{self, ErrorKind, Read, Write};
use std::time::{Duration, Instant};

/// How the simulated oracle answers a query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Behavior {
    /// Reply with the smallest prime factor
    Correct,

    /// Always reply with these exact bytes
    Fixed(Vec<u8>),

    /// Never reply
    Stall,

    /// Emit this many blank `\r\n` lines before the correct reply
    Noise(usize),
}

/// Configuration for the simulated oracle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SimConfig {
    /// Base reply latency in milliseconds
    pub base_latency_ms: u64,

    /// Jitter range in milliseconds (uniform ±jitter)
    pub jitter_ms: u64,

    /// Maximum bytes handed out per `read` (0 = unlimited)
    pub fragment_size: usize,

    /// Reply behavior
    pub behavior: Behavior,

    /// Random seed for determinism
    pub seed: u64,
}

impl SimConfig {
    /// Correct replies with no delay.
    pub fn instant(seed: u64) -> Self {
        Self {
            base_latency_ms: 0,
            jitter_ms: 0,
            fragment_size: 0,
            behavior: Behavior::Correct,
            seed,
        }
    }

    /// Correct replies after a fixed delay.
    pub fn with_latency(base_latency_ms: u64, seed: u64) -> Self {
        Self {
            base_latency_ms,
            ..Self::instant(seed)
        }
    }

    /// Replace the reply behavior.
    pub fn behavior(mut self, behavior: Behavior) -> Self {
        self.behavior = behavior;
        self
    }
}

/// Reply bytes with scheduled delivery time.
#[derive(Debug)]
struct ScheduledReply {
    bytes: Vec<u8>,
    delivery_time: Instant,
}

/// Simulated factorization oracle.
///
/// # Thread Safety
/// Not thread-safe; the real transport is a single sequential channel too.
#[derive(Debug)]
pub struct SimulatedOracle {
    config: SimConfig,
    rng: ChaCha8Rng,
    inbox: Vec<u8>,
    outbox: VecDeque<ScheduledReply>,

    // Statistics
    queries_received: u64,
    replies_delivered: u64,
}

impl SimulatedOracle {
    /// Create a simulated oracle with the given configuration.
    pub fn new(config: SimConfig) -> Self {
        let rng = ChaCha8Rng::seed_from_u64(config.seed);

        Self {
            config,
            rng,
            inbox: Vec::new(),
            outbox: VecDeque::new(),
            queries_received: 0,
            replies_delivered: 0,
        }
    }

    /// Queries parsed so far.
    pub fn queries_received(&self) -> u64 {
        self.queries_received
    }

    /// Reply lines fully handed out so far (noise lines included).
    pub fn replies_delivered(&self) -> u64 {
        self.replies_delivered
    }

    /// Reply lines scheduled but not yet fully read.
    pub fn pending_count(&self) -> usize {
        self.outbox.len()
    }

    /// Handle one request line (terminator stripped).
    fn handle_request(&mut self, line: &[u8]) {
        let text = line.trim_ascii();
        let Some(n) = BigUint::parse_bytes(text, 10) else {
            log::warn!("simulated oracle ignoring malformed request {:?}", String::from_utf8_lossy(line));
            return;
        };
        self.queries_received += 1;

        let now = Instant::now();
        let reply = match &self.config.behavior {
            Behavior::Stall => return,
            Behavior::Fixed(bytes) => bytes.clone(),
            Behavior::Correct => format!("{}\r\n", smallest_factor(&n)).into_bytes(),
            Behavior::Noise(count) => {
                for _ in 0..*count {
                    self.outbox.push_back(ScheduledReply {
                        bytes: b"\r\n".to_vec(),
                        delivery_time: now,
                    });
                }
                format!("{}\r\n", smallest_factor(&n)).into_bytes()
            }
        };

        // An empty reply would read as end of stream
        if reply.is_empty() {
            return;
        }

        let delay = Duration::from_millis(self.compute_delay());
        self.outbox.push_back(ScheduledReply {
            bytes: reply,
            delivery_time: now + delay,
        });
    }

    /// Compute delay for a reply in milliseconds.
    ///
    /// Delay = base_latency ± jitter
    fn compute_delay(&mut self) -> u64 {
        let base = self.config.base_latency_ms;

        if self.config.jitter_ms == 0 {
            return base;
        }

        let jitter_range = self.config.jitter_ms * 2;
        let jitter = self.rng.gen_range(0..=jitter_range);
        let jitter_offset = jitter as i64 - self.config.jitter_ms as i64;

        (base as i64 + jitter_offset).max(0) as u64
    }
}

impl Write for SimulatedOracle {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inbox.extend_from_slice(buf);

        while let Some(end) = self.inbox.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.inbox.drain(..=end).collect();
            self.handle_request(&line);
        }

        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Read for SimulatedOracle {
    /// Non-blocking: returns `WouldBlock` if no reply is deliverable yet.
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let Some(front) = self.outbox.front_mut() else {
            return Err(ErrorKind::WouldBlock.into());
        };
        if Instant::now() < front.delivery_time {
            return Err(ErrorKind::WouldBlock.into());
        }

        let mut len = front.bytes.len().min(buf.len());
        if self.config.fragment_size > 0 {
            len = len.min(self.config.fragment_size);
        }

        buf[..len].copy_from_slice(&front.bytes[..len]);
        front.bytes.drain(..len);

        if front.bytes.is_empty() {
            self.outbox.pop_front();
            self.replies_delivered += 1;
        }

        Ok(len)
    }
}

/// Smallest prime factor of `n`, or `n` itself for 0, 1 and primes.
pub fn smallest_factor(n: &BigUint) -> BigUint {
    if n <= &BigUint::one() {
        return n.clone();
    }
    if n.is_even() {
        return BigUint::from(2u32);
    }

    let mut d = BigUint::from(3u32);
    while &d * &d <= *n {
        if (n % &d).is_zero() {
            return d;
        }
        d += 2u32;
    }
    n.clone()
}
