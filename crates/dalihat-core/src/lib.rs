//! # DaliHat Core Library
//!
//! Driver for DALI HAT serial adapters on the DALI lighting-control bus.

#![warn(missing_docs)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//!
//! This library provides:
//! - Frame and command value types (width-tagged, payload kept opaque)
//! - The HAT wire codec (one prefix character plus uppercase hex per line)
//! - A synchronous transaction driver with collision recovery and bounded
//!   resends
//!
//! ## Example
//!
//! ```rust,ignore
//! use dalihat_core::prelude::*;
//!
//! // Broadcast "off" to every ballast on the bus
//! let driver = HatDriver::open("/dev/ttyS0")?;
//! let outcome = driver.send(Command::new(Frame::forward(16, 0xFF00)?))?;
//! println!("bus said: {:?}", outcome);
//! ```

pub mod command;
pub mod frame;
pub mod protocol;

/// Re-export commonly used types
pub mod prelude {
    pub use crate::command::Command;
    pub use crate::frame::{Frame, FrameError, FrameWidth};
    pub use crate::protocol::{
        Decoded, DriverError, HatDriver, ResponseKind, SendOutcome, Transport,
    };
}

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
