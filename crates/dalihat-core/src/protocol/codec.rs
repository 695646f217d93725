//! Wire packet encoding and response decoding
//!
//! The adapter speaks a line protocol. Each command becomes one ASCII line,
//! a prefix character followed by the frame payload as uppercase hex:
//!
//! - `j` 8-bit frame, `h` 16-bit, `l` 24-bit, `m` 25-bit
//! - `t` 16-bit frame the adapter transmits twice back to back
//!
//! Each reply is one line classified by its first character: `N` normal,
//! `J<hex>` backward frame, `X` send collision, `Z` receive collision.

use std::fmt;

use tracing::warn;

use crate::command::Command;
use crate::frame::{Frame, FrameWidth};

use super::error::DriverError;

/// Prefix for a 16-bit frame the adapter should transmit twice back to back.
const SEND_TWICE_PREFIX: char = 't';

/// First character of a backward-frame reply line.
const BACKWARD_PREFIX: char = 'J';

/// Encoded prefixes of the three address-search commands. Replies to these
/// accept nothing but a plain `N` line.
const SET_COMPARE_PREFIXES: [&str; 3] = ["hB1", "hB3", "hB5"];

fn prefix_for(width: FrameWidth) -> char {
    match width {
        FrameWidth::Bits8 => 'j',
        FrameWidth::Bits16 => 'h',
        FrameWidth::Bits24 => 'l',
        FrameWidth::Bits25 => 'm',
    }
}

fn width_for(prefix: char) -> Option<FrameWidth> {
    match prefix {
        'j' => Some(FrameWidth::Bits8),
        'h' | SEND_TWICE_PREFIX => Some(FrameWidth::Bits16),
        'l' => Some(FrameWidth::Bits24),
        'm' => Some(FrameWidth::Bits25),
        _ => None,
    }
}

/// One encoded command, exactly as it goes on the wire.
///
/// Built once per transaction; resends retransmit these bytes verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WirePacket {
    ascii: String,
}

impl WirePacket {
    /// The bytes to write to the transport, newline terminator included.
    pub fn as_bytes(&self) -> &[u8] {
        self.ascii.as_bytes()
    }

    /// The packet text without the trailing newline.
    pub fn as_str(&self) -> &str {
        self.ascii.trim_end_matches('\n')
    }

    /// Whether this packet is one of the address-search commands, whose only
    /// acceptable reply is a plain `N`.
    pub fn is_set_compare(&self) -> bool {
        SET_COMPARE_PREFIXES
            .iter()
            .any(|marker| self.ascii.starts_with(marker))
    }
}

impl fmt::Display for WirePacket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Encode a command into its wire packet.
///
/// The prefix comes from the frame width; a 16-bit frame with the send-twice
/// flag gets the `t` prefix instead, so the adapter itself repeats the
/// transmission on the bus. Payload bytes render as two uppercase hex digits
/// each.
pub fn construct(command: &Command) -> WirePacket {
    let frame = command.frame();
    let prefix = if command.is_send_twice() && frame.width() == FrameWidth::Bits16 {
        SEND_TWICE_PREFIX
    } else {
        prefix_for(frame.width())
    };

    let mut ascii = String::with_capacity(2 + 2 * frame.width().byte_len());
    ascii.push(prefix);
    for byte in frame.pack() {
        ascii.push_str(&format!("{:02X}", byte));
    }
    ascii.push('\n');
    WirePacket { ascii }
}

/// What a response line turned out to contain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded {
    /// A backward frame parsed from a `J` line.
    BackwardFrame(Frame),
    /// Anything else, passed through verbatim for the caller to interpret.
    Raw(String),
}

/// Decode one reply line.
///
/// `J` lines carry a backward frame in hex. A `J` line that fails to parse
/// is logged and passed through raw rather than failing the transaction.
pub fn extract(line: &str) -> Decoded {
    if line.starts_with(BACKWARD_PREFIX) {
        match parse_backward(line) {
            Ok(frame) => return Decoded::BackwardFrame(frame),
            Err(err) => warn!("failed to parse backward frame '{}': {}", line, err),
        }
    }
    Decoded::Raw(line.to_string())
}

/// Strict parse of a `J<hex>` backward-frame line.
///
/// Backward frames are eight bits wide; values that overflow one byte are
/// rejected along with non-hex payloads.
pub fn parse_backward(line: &str) -> Result<Frame, DriverError> {
    let hex = line
        .strip_prefix(BACKWARD_PREFIX)
        .ok_or_else(|| DriverError::MalformedResponse(line.to_string()))?;
    let value = u32::from_str_radix(hex, 16)
        .map_err(|_| DriverError::MalformedResponse(line.to_string()))?;
    let value =
        u8::try_from(value).map_err(|_| DriverError::MalformedResponse(line.to_string()))?;
    Ok(Frame::backward(value))
}

/// Decode a wire packet back into its frame.
///
/// Inverse of [`construct`], modulo the send-twice marker: a `t` packet maps
/// back to a plain 16-bit frame.
pub fn parse_packet(packet: &str) -> Result<Frame, DriverError> {
    let text = packet.trim_end_matches('\n');
    let mut chars = text.chars();
    let prefix = chars
        .next()
        .ok_or_else(|| DriverError::MalformedResponse(packet.to_string()))?;
    let width =
        width_for(prefix).ok_or_else(|| DriverError::MalformedResponse(packet.to_string()))?;
    let hex = chars.as_str();
    if hex.len() != 2 * width.byte_len() {
        return Err(DriverError::MalformedResponse(packet.to_string()));
    }
    let data = u32::from_str_radix(hex, 16)
        .map_err(|_| DriverError::MalformedResponse(packet.to_string()))?;
    Frame::new(width, data).map_err(|_| DriverError::MalformedResponse(packet.to_string()))
}

/// First-character classification of a reply line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// `N`: the command went out, no backward frame followed.
    Normal,
    /// `J`: a backward frame follows in hex.
    Backward,
    /// `X`: we lost arbitration while transmitting.
    SendCollision,
    /// `Z`: replies collided on the bus.
    ReceiveCollision,
    /// A bare newline: nothing to report in this window.
    Empty,
    /// Any other line; diagnostic traffic, not protocol progress.
    Unrelated,
}

impl ResponseKind {
    /// Classify a reply line by its first character.
    pub fn classify(line: &str) -> Self {
        match line.chars().next() {
            None => ResponseKind::Empty,
            Some('N') => ResponseKind::Normal,
            Some(BACKWARD_PREFIX) => ResponseKind::Backward,
            Some('X') => ResponseKind::SendCollision,
            Some('Z') => ResponseKind::ReceiveCollision,
            Some(_) => ResponseKind::Unrelated,
        }
    }
}
