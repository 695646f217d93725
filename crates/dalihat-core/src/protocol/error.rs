//! Driver errors

use thiserror::Error;

/// Errors that can occur while driving the bus adapter
#[derive(Error, Debug)]
pub enum DriverError {
    #[error("Could not open serial connection: {0}")]
    TransportUnavailable(String),

    #[error("Not connected to the bus adapter")]
    Disconnected,

    #[error("Oversized response line: {0:?}")]
    LineTooLong(String),

    #[error("Adapter stalled mid-line: {0:?}")]
    IncompletePacket(String),

    #[error("Malformed backward frame line: {0:?}")]
    MalformedResponse(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
