//! DALI frame value type
//!
//! A frame is the raw bit pattern on the bus, tagged with its width. The
//! driver treats the payload as opaque; the width alone decides how the
//! adapter transmits it.

use byteorder::{BigEndian, ByteOrder};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors building a frame from raw parts
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    #[error("Unsupported frame width: {0} bits")]
    UnsupportedWidth(u8),

    #[error("Data {data:#x} does not fit in {bits} bits")]
    Overflow { bits: u8, data: u32 },
}

/// Frame widths the adapter can put on the bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameWidth {
    /// 8-bit backward frame (replies from control gear)
    Bits8,
    /// 16-bit forward frame (the common gear commands)
    Bits16,
    /// 24-bit forward frame (control device commands)
    Bits24,
    /// 25-bit forward frame
    Bits25,
}

impl FrameWidth {
    /// Width in bits.
    pub const fn bits(self) -> u8 {
        match self {
            FrameWidth::Bits8 => 8,
            FrameWidth::Bits16 => 16,
            FrameWidth::Bits24 => 24,
            FrameWidth::Bits25 => 25,
        }
    }

    /// Packed payload length in bytes.
    pub const fn byte_len(self) -> usize {
        match self {
            FrameWidth::Bits8 => 1,
            FrameWidth::Bits16 => 2,
            FrameWidth::Bits24 => 3,
            FrameWidth::Bits25 => 4,
        }
    }

    /// Look up a width from a raw bit count.
    pub fn from_bits(bits: u8) -> Option<Self> {
        match bits {
            8 => Some(FrameWidth::Bits8),
            16 => Some(FrameWidth::Bits16),
            24 => Some(FrameWidth::Bits24),
            25 => Some(FrameWidth::Bits25),
            _ => None,
        }
    }

    const fn max_value(self) -> u32 {
        match self {
            FrameWidth::Bits8 => 0xFF,
            FrameWidth::Bits16 => 0xFFFF,
            FrameWidth::Bits24 => 0xFF_FFFF,
            FrameWidth::Bits25 => 0x1FF_FFFF,
        }
    }
}

/// A bus frame: width tag plus payload bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Frame {
    width: FrameWidth,
    data: u32,
}

impl Frame {
    /// Build a frame, rejecting payloads wider than the frame.
    pub fn new(width: FrameWidth, data: u32) -> Result<Self, FrameError> {
        if data > width.max_value() {
            return Err(FrameError::Overflow {
                bits: width.bits(),
                data,
            });
        }
        Ok(Self { width, data })
    }

    /// Build a forward frame from a raw bit count, e.g. `forward(16, 0xFF00)`.
    pub fn forward(bits: u8, data: u32) -> Result<Self, FrameError> {
        let width = FrameWidth::from_bits(bits).ok_or(FrameError::UnsupportedWidth(bits))?;
        Self::new(width, data)
    }

    /// An 8-bit backward frame, as answered by control gear.
    pub fn backward(data: u8) -> Self {
        Self {
            width: FrameWidth::Bits8,
            data: u32::from(data),
        }
    }

    /// The frame's width tag.
    pub fn width(&self) -> FrameWidth {
        self.width
    }

    /// Width in bits.
    pub fn bits(&self) -> u8 {
        self.width.bits()
    }

    /// The payload, right-aligned.
    pub fn data(&self) -> u32 {
        self.data
    }

    /// Packed big-endian payload bytes (1, 2, 3 or 4 per the width).
    pub fn pack(&self) -> Vec<u8> {
        let mut buf = [0u8; 4];
        BigEndian::write_u32(&mut buf, self.data);
        buf[4 - self.width.byte_len()..].to_vec()
    }
}
