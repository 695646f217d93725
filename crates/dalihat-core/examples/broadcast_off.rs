//! DALI HAT smoke test
//!
//! Opens the adapter and broadcasts "arc power 0", which switches every
//! ballast on the bus off. Useful to prove the wiring before anything else.
//!
//! Usage:
//!   cargo run --example broadcast_off -- [PORT]
//!
//! PORT defaults to /dev/ttyS0, the Pi GPIO UART a HAT normally sits on.

use dalihat_core::command::Command;
use dalihat_core::frame::Frame;
use dalihat_core::protocol::{DEFAULT_PORT, HatDriver};

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let port = std::env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_PORT.to_string());

    println!("DALI HAT broadcast test");
    println!("=======================");
    println!("Port: {}", port);

    let driver = match HatDriver::open(&port) {
        Ok(driver) => driver,
        Err(e) => {
            eprintln!("Failed to open {}: {}", port, e);
            std::process::exit(1);
        }
    };

    // Broadcast, arc power 0
    let off = Frame::forward(16, 0xFF00).expect("frame is in range");
    match driver.send(Command::new(off)) {
        Ok(outcome) => println!("Outcome: {:?}", outcome),
        Err(e) => {
            eprintln!("Send failed: {}", e);
            std::process::exit(1);
        }
    }
}
