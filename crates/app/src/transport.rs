//! Opening the byte stream to the oracle.
//!
//! The oracle is reached through one of:
//! - a serial device node, which must already be configured (symbol rate,
//!   8N1, raw mode, and a read timeout via VTIME) before the tool starts
//! - a TCP endpoint, for oracles bridged onto the network
//! - the in-process simulated oracle
//!
//! Whatever the source, the stream is opened once at startup and owned by
//! the client until the process exits.
//!
//! A raw-mode tty with `VMIN = 0` returns zero bytes when VTIME expires, so
//! device reads of length zero are reported as `TimedOut`. On TCP a zero
//! length read is a real end of stream and passes through unchanged.

use factor_bench_core::client::ClientConfig;
use factor_bench_core::sim::{SimConfig, SimulatedOracle};
use log::info;
use std::fs::{File, OpenOptions};
use std::io::{self, ErrorKind, Read, Write};
use std::net::TcpStream;
use std::path::PathBuf;
use std::time::Duration;

/// Which transport to open.
#[derive(Debug, Clone)]
pub enum TransportConfig {
    /// Pre-configured serial device node
    Device(PathBuf),

    /// `HOST:PORT` of a TCP bridge
    Tcp(String),

    /// In-process simulated oracle
    Simulate(SimConfig),
}

/// An open byte stream to the oracle.
#[derive(Debug)]
pub enum Stream {
    Device(File),
    Tcp(TcpStream),
    Simulated(SimulatedOracle),
}

/// A blocking socket read may overrun the line deadline by at most
/// `read_timeout / SOCKET_SLICES`.
const SOCKET_SLICES: u32 = 20;

/// Floor for the socket timeout; a zero timeout is rejected by the OS layer.
const MIN_SOCKET_TIMEOUT: Duration = Duration::from_millis(1);

/// Timeout for a single blocking socket read under `client`.
pub fn socket_timeout(client: &ClientConfig) -> Duration {
    (client.read_timeout / SOCKET_SLICES)
        .max(client.poll_interval)
        .max(MIN_SOCKET_TIMEOUT)
}

/// Open the configured transport.
///
/// For TCP the socket read timeout is a slice of the client's read timeout
/// (see [`socket_timeout`]), so a silent peer surfaces as short timed-out
/// reads and the line deadline is honored closely.
pub fn open(config: &TransportConfig, client: &ClientConfig) -> io::Result<Stream> {
    match config {
        TransportConfig::Device(path) => {
            let file = OpenOptions::new().read(true).write(true).open(path)?;
            info!("opened serial device {}", path.display());
            Ok(Stream::Device(file))
        }
        TransportConfig::Tcp(addr) => {
            let stream = TcpStream::connect(addr)?;
            stream.set_read_timeout(Some(socket_timeout(client)))?;
            stream.set_nodelay(true)?;
            info!("connected to oracle at {}", addr);
            Ok(Stream::Tcp(stream))
        }
        TransportConfig::Simulate(sim) => {
            info!(
                "using simulated oracle ({} ms ±{} ms)",
                sim.base_latency_ms, sim.jitter_ms
            );
            Ok(Stream::Simulated(SimulatedOracle::new(sim.clone())))
        }
    }
}

impl Read for Stream {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Stream::Device(f) => match f.read(buf)? {
                0 if !buf.is_empty() => Err(ErrorKind::TimedOut.into()),
                n => Ok(n),
            },
            Stream::Tcp(s) => s.read(buf),
            Stream::Simulated(s) => s.read(buf),
        }
    }
}

impl Write for Stream {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Stream::Device(f) => f.write(buf),
            Stream::Tcp(s) => s.write(buf),
            Stream::Simulated(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Stream::Device(f) => f.flush(),
            Stream::Tcp(s) => s.flush(),
            Stream::Simulated(s) => s.flush(),
        }
    }
}
