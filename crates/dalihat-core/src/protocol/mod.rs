//! DALI HAT serial protocol
//!
//! Implements the ASCII line protocol spoken by the DALI HAT adapter:
//! packet encoding, response framing, and the transaction loop with
//! collision recovery and bounded resends.

mod codec;
mod driver;
mod error;
mod line_reader;
pub mod serial;
mod transport;

pub use codec::{
    construct, extract, parse_backward, parse_packet, Decoded, ResponseKind, WirePacket,
};
pub use driver::{HatDriver, SendOutcome};
pub use error::DriverError;
pub use line_reader::LineReader;
pub use serial::{list_ports, open_port, PortInfo};
pub use transport::{SerialTransport, Transport};

use std::time::Duration;

/// Baud rate the adapter runs at. Not negotiable.
pub const BAUD_RATE: u32 = 19_200;

/// Per-byte read timeout on the serial link.
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// Longest response line the adapter legitimately produces.
pub const MAX_LINE_LENGTH: usize = 30;

/// Consecutive empty byte-reads tolerated before a line counts as stalled.
pub const MAX_EMPTY_READS: u32 = 10;

/// Base number of response-read attempts per transaction.
pub const SEND_ATTEMPTS: u32 = 5;

/// Resend cap for the address-search commands.
pub const MAX_SET_COMPARE_RESENDS: u32 = 5;

/// Pause that lets the bus settle after a collision before draining.
pub const COLLISION_SETTLE: Duration = Duration::from_millis(100);

/// Default serial device on a Raspberry Pi.
pub const DEFAULT_PORT: &str = "/dev/ttyS0";
