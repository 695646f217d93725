//! Serial port handling
//!
//! Low-level access to the UART the adapter hangs off. A DALI HAT sits on a
//! Raspberry Pi GPIO UART, so enumeration includes `/dev` devices the USB
//! port scan never sees.

use serialport::{SerialPort, SerialPortInfo, SerialPortType};
use std::collections::HashMap;
#[cfg(target_os = "linux")]
use std::fs;

use super::{DriverError, BAUD_RATE, READ_TIMEOUT};

/// Information about an available serial port
#[derive(Debug, Clone)]
pub struct PortInfo {
    /// Device path (e.g., "/dev/ttyS0" or "/dev/ttyAMA0")
    pub name: String,

    /// Manufacturer name (USB adapters only)
    pub manufacturer: Option<String>,

    /// Product name (USB adapters only)
    pub product: Option<String>,
}

impl From<SerialPortInfo> for PortInfo {
    fn from(info: SerialPortInfo) -> Self {
        let (manufacturer, product) = match info.port_type {
            SerialPortType::UsbPort(usb) => (usb.manufacturer, usb.product),
            _ => (None, None),
        };

        Self {
            name: info.port_name,
            manufacturer,
            product,
        }
    }
}

/// Helper used to sort port names so the UARTs a HAT actually lives on come
/// first:
///  - ttyAMA* (PL011 UART) sorted numerically by suffix
///  - then ttyS* (mini UART, the default wiring), sorted numerically
///  - then USB serial adapters, then everything else by name
fn port_sort_key(name: &str) -> (u8, usize, String) {
    let basename = name.rsplit('/').next().unwrap_or(name);
    for (rank, prefix) in [(0u8, "ttyAMA"), (1, "ttyS"), (2, "ttyUSB"), (3, "ttyACM")] {
        if let Some(rest) = basename.strip_prefix(prefix) {
            let num = rest.parse::<usize>().unwrap_or(usize::MAX);
            return (rank, num, basename.to_string());
        }
    }
    (4, 0, basename.to_string())
}

/// List candidate serial devices, with /dev fallbacks and deterministic
/// ordering
pub fn list_ports() -> Vec<PortInfo> {
    // Collect from serialport API
    let mut map: HashMap<String, PortInfo> = HashMap::new();
    for info in serialport::available_ports().unwrap_or_default() {
        let port = PortInfo::from(info);
        map.entry(port.name.clone()).or_insert(port);
    }

    // Linux-only: GPIO UARTs are not USB devices, so the platform scan can
    // miss them entirely on a Pi. Add /dev/ttyAMA* and /dev/ttyS* directly.
    #[cfg(target_os = "linux")]
    if let Ok(entries) = fs::read_dir("/dev") {
        for entry in entries.flatten() {
            if let Some(fname) = entry.file_name().to_str() {
                if fname.starts_with("ttyAMA") || fname.starts_with("ttyS") {
                    let full = format!("/dev/{}", fname);
                    map.entry(full.clone()).or_insert_with(|| PortInfo {
                        name: full,
                        manufacturer: None,
                        product: None,
                    });
                }
            }
        }
    }

    let mut ports: Vec<PortInfo> = map.into_values().collect();
    ports.sort_by_key(|p| port_sort_key(&p.name));
    ports
}

/// Open the adapter's UART with the one configuration it supports:
/// 19200 baud, 8N1, no flow control, 1-second byte timeout.
pub fn open_port(name: &str) -> Result<Box<dyn SerialPort>, DriverError> {
    serialport::new(name, BAUD_RATE)
        .data_bits(serialport::DataBits::Eight)
        .parity(serialport::Parity::None)
        .stop_bits(serialport::StopBits::One)
        .flow_control(serialport::FlowControl::None)
        .timeout(READ_TIMEOUT)
        .open()
        .map_err(|e| DriverError::TransportUnavailable(e.to_string()))
}
