use serialport::SerialPort;
use std::io::{self, Read, Write};

/// Byte transport the driver runs on: the serial adapter in production, a
/// scripted stand-in under test.
pub trait Transport: Send {
    /// Read one byte, blocking up to the link's per-byte timeout.
    ///
    /// `Ok(None)` means the window elapsed with nothing received.
    fn read_byte(&mut self) -> io::Result<Option<u8>>;

    /// Write a whole packet to the link.
    fn write_all(&mut self, data: &[u8]) -> io::Result<()>;

    /// Throw away anything sitting unread in the receive buffer.
    fn clear_input(&mut self) -> io::Result<()>;
}

/// Serial port transport
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
}

impl SerialTransport {
    /// Wrap an already configured port.
    pub fn new(port: Box<dyn SerialPort>) -> Self {
        Self { port }
    }
}

impl Transport for SerialTransport {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        let mut buf = [0u8; 1];
        match self.port.read(&mut buf) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(buf[0])),
            Err(e)
                if e.kind() == io::ErrorKind::TimedOut
                    || e.kind() == io::ErrorKind::WouldBlock =>
            {
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        self.port.write_all(data)
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.port
            .clear(serialport::ClearBuffer::Input)
            .map_err(|e| io::Error::new(io::ErrorKind::Other, e))
    }
}
