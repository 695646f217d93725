//! Bus command value type
//!
//! A command pairs a forward frame with its delivery flags. The driver never
//! looks inside the payload; it only cares how the frame must be delivered.

use serde::{Deserialize, Serialize};

use crate::frame::Frame;

/// A command ready for the bus.
///
/// Configuration commands only take effect when the gear sees them twice in
/// short succession; `send_twice` marks those, and the driver then insists on
/// two matching replies before reporting success.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Command {
    frame: Frame,
    send_twice: bool,
}

impl Command {
    /// A single-shot command.
    pub fn new(frame: Frame) -> Self {
        Self {
            frame,
            send_twice: false,
        }
    }

    /// A command the bus requires twice in a row.
    pub fn send_twice(frame: Frame) -> Self {
        Self {
            frame,
            send_twice: true,
        }
    }

    /// The frame to transmit.
    pub fn frame(&self) -> Frame {
        self.frame
    }

    /// Whether delivery needs the repeated-transmission treatment.
    pub fn is_send_twice(&self) -> bool {
        self.send_twice
    }
}
