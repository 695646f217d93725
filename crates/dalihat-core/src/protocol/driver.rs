//! Driver lifecycle and the send/response transaction loop
//!
//! One transaction is on the wire at a time. `send` writes the encoded
//! packet, then reads and classifies reply lines until it can accept one,
//! must abort, or runs out of attempts. Collisions trigger a settle pause,
//! a drain of buffered lines, and (except for a lost transmission) a single
//! verbatim retransmission.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::thread;

use tracing::{debug, info};

use crate::command::Command;
use crate::frame::Frame;

use super::codec::{construct, extract, Decoded, ResponseKind};
use super::error::DriverError;
use super::line_reader::LineReader;
use super::serial::open_port;
use super::transport::{SerialTransport, Transport};
use super::{COLLISION_SETTLE, MAX_SET_COMPARE_RESENDS, SEND_ATTEMPTS};

/// Terminal result of one bus transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The gear answered and the reply decoded as a backward frame.
    BackwardFrame(Frame),
    /// The adapter acknowledged with a status line, passed through verbatim.
    Raw(String),
    /// We lost bus arbitration while transmitting; nothing was delivered.
    SendAborted,
    /// The attempt budget ran out without an acceptable reply.
    NoResponse,
}

impl SendOutcome {
    /// The decoded backward frame, if that is what came back.
    pub fn backward_frame(&self) -> Option<Frame> {
        match self {
            SendOutcome::BackwardFrame(frame) => Some(*frame),
            _ => None,
        }
    }
}

impl From<Decoded> for SendOutcome {
    fn from(decoded: Decoded) -> Self {
        match decoded {
            Decoded::BackwardFrame(frame) => SendOutcome::BackwardFrame(frame),
            Decoded::Raw(line) => SendOutcome::Raw(line),
        }
    }
}

struct DriverInner {
    transport: Option<Box<dyn Transport>>,
    reader: LineReader,
}

/// Synchronous driver for a DALI HAT serial adapter.
///
/// All methods take `&self`; an internal lock serialises transactions, so
/// concurrent `send` callers simply queue.
pub struct HatDriver {
    inner: Mutex<DriverInner>,
}

impl HatDriver {
    /// Open the adapter on the given serial device.
    pub fn open(port: &str) -> Result<Self, DriverError> {
        let serial = open_port(port)?;
        info!("serial connection opened on {}", port);
        Ok(Self::new(Box::new(SerialTransport::new(serial))))
    }

    /// Drive an already open transport (tests, alternate links).
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            inner: Mutex::new(DriverInner {
                transport: Some(transport),
                reader: LineReader::new(),
            }),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DriverInner> {
        // A poisoned lock means a caller panicked mid-transaction; the state
        // it guards is still coherent enough to keep driving the bus.
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Send one command and run the response protocol to completion.
    ///
    /// Blocks until the transaction ends; a stuck bus is bounded by the
    /// attempt budget times the per-byte read timeout, not by wall-clock
    /// deadlines. Errors cover transport and framing failures only; protocol
    /// outcomes (including an aborted send and an exhausted budget) come
    /// back as [`SendOutcome`] variants.
    pub fn send(&self, command: Command) -> Result<SendOutcome, DriverError> {
        let mut inner = self.lock();
        let DriverInner { transport, reader } = &mut *inner;
        let transport = transport.as_deref_mut().ok_or(DriverError::Disconnected)?;
        run_transaction(transport, reader, command)
    }

    /// Drop pending input: the reader backlog and the transport receive
    /// buffer.
    pub fn reset_input_buffer(&self) -> Result<(), DriverError> {
        let mut inner = self.lock();
        let DriverInner { transport, reader } = &mut *inner;
        let transport = transport.as_deref_mut().ok_or(DriverError::Disconnected)?;
        transport.clear_input()?;
        reader.clear();
        Ok(())
    }

    /// Queue a line as if the adapter had sent it.
    ///
    /// The next transaction consumes queued lines before touching the wire.
    pub fn enqueue_line(&self, line: impl Into<String>) {
        self.lock().reader.enqueue(line);
    }

    /// Close the connection.
    ///
    /// Later calls fail with [`DriverError::Disconnected`].
    pub fn close(&self) {
        let mut inner = self.lock();
        if inner.transport.take().is_some() {
            debug!("serial connection closed");
        }
    }

    /// Whether the connection is still open.
    pub fn is_open(&self) -> bool {
        self.lock().transport.is_some()
    }
}

/// One full send/response exchange over the wire.
fn run_transaction(
    transport: &mut dyn Transport,
    reader: &mut LineReader,
    command: Command,
) -> Result<SendOutcome, DriverError> {
    let packet = construct(&command);
    let send_twice = command.is_send_twice();
    let set_compare = packet.is_set_compare();
    debug!("send: {:?} encoded as '{}'", command, packet);
    transport.write_all(packet.as_bytes())?;

    let mut attempts = SEND_ATTEMPTS;
    let mut attempt = 0u32;
    let mut last_response: Option<String> = None;
    let mut already_resent = false;
    let mut resend_count = 0u32;
    let mut stray_lines: Vec<String> = Vec::new();

    while attempt < attempts {
        attempt += 1;
        let response = reader.read_line(transport)?;
        debug!("send: attempt {} got response '{}'", attempt, response);
        let kind = ResponseKind::classify(&response);
        let mut resend = false;

        if !set_compare {
            match kind {
                ResponseKind::Normal | ResponseKind::Backward => {
                    if !send_twice {
                        return Ok(extract(&response).into());
                    }
                    // Configuration commands need two matching replies in a
                    // row; a mismatched pair invalidates both.
                    match last_response.take() {
                        Some(previous) if previous == response => {
                            return Ok(extract(&response).into());
                        }
                        Some(previous) => {
                            debug!(
                                "send: send-twice replies differ ('{}' vs '{}'), resending",
                                previous, response
                            );
                            resend = true;
                        }
                        None => last_response = Some(response),
                    }
                }
                ResponseKind::SendCollision
                | ResponseKind::ReceiveCollision
                | ResponseKind::Empty => {
                    settle_after_collision(transport, reader)?;
                    if kind == ResponseKind::SendCollision {
                        debug!("send: lost arbitration while transmitting, aborting");
                        return Ok(SendOutcome::SendAborted);
                    }
                    debug!("send: bus collision '{}', resending", response);
                    last_response = None;
                    resend = true;
                }
                ResponseKind::Unrelated => {
                    debug!("send: ignoring unrelated line '{}'", response);
                    stray_lines.push(response);
                }
            }

            if resend && !already_resent {
                transport.write_all(packet.as_bytes())?;
                attempts += 1 + u32::from(send_twice);
                already_resent = true;
            }
        } else {
            // Address-search commands: a plain N is the only acceptable
            // reply, and resends are capped rather than one-shot.
            match kind {
                ResponseKind::Normal => return Ok(extract(&response).into()),
                ResponseKind::SendCollision
                | ResponseKind::ReceiveCollision
                | ResponseKind::Empty => {
                    settle_after_collision(transport, reader)?;
                    resend = kind != ResponseKind::SendCollision;
                }
                _ => {
                    debug!("send: unusable reply '{}' to compare command", response);
                    resend = true;
                }
            }

            if resend && resend_count < MAX_SET_COMPARE_RESENDS {
                transport.write_all(packet.as_bytes())?;
                attempts += 1 + u32::from(send_twice);
                resend_count += 1;
            }
        }
    }

    if !stray_lines.is_empty() {
        debug!("send: transaction saw unrelated traffic: {:?}", stray_lines);
    }
    debug!("send: no usable response within the attempt budget");
    Ok(SendOutcome::NoResponse)
}

/// Let the bus settle after a collision, then flush buffered lines until the
/// adapter sends an empty one.
fn settle_after_collision(
    transport: &mut dyn Transport,
    reader: &mut LineReader,
) -> Result<(), DriverError> {
    thread::sleep(COLLISION_SETTLE);
    loop {
        let line = reader.read_line(transport)?;
        if line.is_empty() {
            return Ok(());
        }
        debug!("settle: flushed '{}'", line);
    }
}
