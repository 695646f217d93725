//! Line framing over the byte transport
//!
//! The adapter terminates everything it says with a newline. The reader
//! accumulates bytes into lines, enforces the framing sanity limits, and
//! keeps lines that arrived ahead of the current transaction in a backlog so
//! nothing is lost across transaction boundaries.

use std::collections::VecDeque;

use tracing::trace;

use super::error::DriverError;
use super::transport::Transport;
use super::{MAX_EMPTY_READS, MAX_LINE_LENGTH};

/// Buffers adapter output into newline-terminated lines.
#[derive(Debug, Default)]
pub struct LineReader {
    backlog: VecDeque<String>,
}

impl LineReader {
    /// A reader with an empty backlog.
    pub fn new() -> Self {
        Self {
            backlog: VecDeque::new(),
        }
    }

    /// Next line for the current transaction: backlog first, then the wire.
    ///
    /// A returned empty string is a real (blank) line from the adapter, not
    /// a failure; the transaction loop treats it as its own response class.
    pub fn read_line(&mut self, transport: &mut dyn Transport) -> Result<String, DriverError> {
        if let Some(line) = self.backlog.pop_front() {
            trace!("serving '{}' from backlog", line);
            return Ok(line);
        }
        read_raw_line(transport)
    }

    /// Queue a line as if it had been read from the adapter.
    pub fn enqueue(&mut self, line: impl Into<String>) {
        self.backlog.push_back(line.into());
    }

    /// Drop every queued line.
    pub fn clear(&mut self) {
        self.backlog.clear();
    }

    /// Number of lines waiting in the backlog.
    pub fn backlog_len(&self) -> usize {
        self.backlog.len()
    }
}

/// Accumulate one newline-terminated line, byte by byte.
///
/// Two limits guard against a wedged adapter: a line longer than
/// [`MAX_LINE_LENGTH`] characters fails as [`DriverError::LineTooLong`], and
/// more than [`MAX_EMPTY_READS`] consecutive timed-out reads mid-line fail
/// as [`DriverError::IncompletePacket`]. Any received byte resets the
/// empty-read count.
fn read_raw_line(transport: &mut dyn Transport) -> Result<String, DriverError> {
    let mut line = String::new();
    let mut empty_reads = 0u32;
    loop {
        match transport.read_byte()? {
            Some(b'\n') => return Ok(line),
            Some(byte) => {
                trace!("read byte {:#04x}", byte);
                empty_reads = 0;
                line.push(byte as char);
                if line.len() > MAX_LINE_LENGTH {
                    return Err(DriverError::LineTooLong(line));
                }
            }
            None => {
                empty_reads += 1;
                if empty_reads > MAX_EMPTY_READS {
                    return Err(DriverError::IncompletePacket(line));
                }
            }
        }
    }
}
