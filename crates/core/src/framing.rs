//! Line framing for the oracle wire protocol.
//!
//! The oracle speaks a plain text protocol over a byte stream that has no
//! message boundaries of its own. Both directions are line oriented.
//!
//! # Wire Format
//!
//! ```text
//! request:  <decimal digits of n> \r \n
//! reply:    <decimal digits of f> [\r] \n
//! ```
//!
//! No escaping, no length prefix, no correlation identifier. A reply only
//! counts once it ends in a line feed and carries something besides
//! whitespace. Bare `\r\n` pairs and blank lines are line noise and are
//! skipped by the client.
//!
//! # Reading Under a Deadline
//!
//! [`LineReader`] accumulates bytes from a `Read` source until a line feed
//! shows up or the deadline passes. Sources are expected to return from
//! `read` in bounded time: either with data or with a `WouldBlock`/`TimedOut`
//! error (a socket with a read timeout behaves this way). Those errors are
//! retried after a short poll interval until the deadline. `Ok(0)` means the
//! peer closed the stream and fails the read at once with `UnexpectedEof`.

use crate::error::{ProtocolError, Result};
use num_bigint::BigUint;
use std::io::{self, ErrorKind, Read};
use std::time::{Duration, Instant};

/// Request terminator: carriage return, line feed.
pub const TERMINATOR: [u8; 2] = *b"\r\n";

/// Size of the scratch buffer for a single `read` call.
const READ_CHUNK: usize = 256;

/// Encode a query for `n`: its decimal digits followed by `\r\n`.
pub fn encode_query(n: &BigUint) -> Vec<u8> {
    let digits = n.to_str_radix(10);

    let mut frame = Vec::with_capacity(digits.len() + TERMINATOR.len());
    frame.extend_from_slice(digits.as_bytes());
    frame.extend_from_slice(&TERMINATOR);
    frame
}

/// Whether a received line qualifies as a reply.
///
/// True when the line ends with `\n` and holds something other than
/// whitespace. Every such line of three or more bytes qualifies; a single
/// digit followed by a bare `\n` does too.
pub fn is_complete_reply(line: &[u8]) -> bool {
    line.last() == Some(&b'\n') && line.iter().any(|b| !b.is_ascii_whitespace())
}

/// Parse a reply line into the claimed factor.
///
/// Surrounding whitespace (including the `\r\n`) is stripped. Only plain
/// decimal digits are accepted; signs and digit separators are not.
///
/// # Errors
/// - `ProtocolError::Unparseable` if the trimmed text is not a decimal integer
pub fn parse_reply(line: &[u8]) -> Result<BigUint> {
    let unparseable = || ProtocolError::Unparseable {
        line: String::from_utf8_lossy(line).into_owned(),
    };

    let text = line.trim_ascii();
    if text.is_empty() || !text.iter().all(u8::is_ascii_digit) {
        return Err(unparseable().into());
    }

    BigUint::parse_bytes(text, 10).ok_or_else(|| unparseable().into())
}

/// Buffered line reader over a byte stream without built-in boundaries.
///
/// Bytes that arrive after a line feed stay buffered for the next call.
#[derive(Debug, Default)]
pub struct LineReader {
    buffer: Vec<u8>,
}

impl LineReader {
    /// Create an empty line reader.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read one `\n`-terminated line, waiting at most `timeout`.
    ///
    /// # Returns
    /// - `Ok(Some(line))` with the terminator included
    /// - `Ok(None)` if the deadline passed without a line feed; any partial
    ///   bytes remain buffered (see [`LineReader::pending`])
    ///
    /// # Errors
    /// Propagates I/O errors other than `WouldBlock`, `TimedOut` and
    /// `Interrupted`. End of stream is reported as `UnexpectedEof`.
    pub fn read_line<R: Read + ?Sized>(
        &mut self,
        source: &mut R,
        timeout: Duration,
        poll_interval: Duration,
    ) -> io::Result<Option<Vec<u8>>> {
        let deadline = Instant::now() + timeout;
        let mut chunk = [0u8; READ_CHUNK];

        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(None);
            }

            match source.read(&mut chunk) {
                Ok(0) => {
                    return Err(io::Error::new(
                        ErrorKind::UnexpectedEof,
                        format!("stream closed with {} bytes buffered", self.buffer.len()),
                    ))
                }
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(e) if is_transient(&e) => {
                    let left = deadline.saturating_duration_since(Instant::now());
                    std::thread::sleep(poll_interval.min(left));
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Number of buffered bytes not yet returned as a line.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Split off the first complete line from the buffer, if any.
    fn take_line(&mut self) -> Option<Vec<u8>> {
        let end = self.buffer.iter().position(|&b| b == b'\n')?;
        let rest = self.buffer.split_off(end + 1);
        Some(std::mem::replace(&mut self.buffer, rest))
    }
}

/// Errors that mean "nothing to read yet" rather than a broken stream.
fn is_transient(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        ErrorKind::WouldBlock | ErrorKind::TimedOut | ErrorKind::Interrupted
    )
}
