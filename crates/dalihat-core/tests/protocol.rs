//! End-to-end driver tests over a scripted transport.

use std::io;
use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;

use dalihat_core::command::Command;
use dalihat_core::frame::Frame;
use dalihat_core::protocol::{DriverError, HatDriver, SendOutcome, Transport};

/// Recorded packets the driver wrote, shared with the test body.
type Writes = Arc<Mutex<Vec<Vec<u8>>>>;

/// Mock transport replaying canned adapter output line by line.
///
/// Once the script runs out every read times out, which is exactly what a
/// silent adapter looks like to the driver.
struct MockTransport {
    recv_buffer: Vec<u8>,
    recv_idx: usize,
    writes: Writes,
    fail_on_send: bool,
}

impl MockTransport {
    fn with_script(script: &[&str]) -> (Self, Writes) {
        let mut recv_buffer = Vec::new();
        for line in script {
            recv_buffer.extend_from_slice(line.as_bytes());
            recv_buffer.push(b'\n');
        }
        let writes: Writes = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                recv_buffer,
                recv_idx: 0,
                writes: Arc::clone(&writes),
                fail_on_send: false,
            },
            writes,
        )
    }
}

impl Transport for MockTransport {
    fn read_byte(&mut self) -> io::Result<Option<u8>> {
        if self.recv_idx < self.recv_buffer.len() {
            let byte = self.recv_buffer[self.recv_idx];
            self.recv_idx += 1;
            Ok(Some(byte))
        } else {
            Ok(None)
        }
    }

    fn write_all(&mut self, data: &[u8]) -> io::Result<()> {
        if self.fail_on_send {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "write failed"));
        }
        self.writes.lock().unwrap().push(data.to_vec());
        Ok(())
    }

    fn clear_input(&mut self) -> io::Result<()> {
        self.recv_idx = self.recv_buffer.len();
        Ok(())
    }
}

fn driver_with_script(script: &[&str]) -> (HatDriver, Writes) {
    let (mock, writes) = MockTransport::with_script(script);
    (HatDriver::new(Box::new(mock)), writes)
}

fn broadcast_off() -> Command {
    Command::new(Frame::forward(16, 0xFF00).unwrap())
}

/// An address-search command; its packet encodes as "hB155".
fn compare_command() -> Command {
    Command::new(Frame::forward(16, 0xB155).unwrap())
}

#[test]
fn test_normal_reply_accepted_first_try() {
    let (driver, writes) = driver_with_script(&["N00"]);
    let outcome = driver.send(broadcast_off()).unwrap();
    assert_eq!(outcome, SendOutcome::Raw("N00".to_string()));
    let writes = writes.lock().unwrap();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0], b"hFF00\n".to_vec());
}

#[test]
fn test_backward_reply_decoded() {
    let (driver, _writes) = driver_with_script(&["J00FF"]);
    let outcome = driver
        .send(Command::new(Frame::forward(16, 0xFF90).unwrap()))
        .unwrap();
    let frame = outcome.backward_frame().expect("should decode a frame");
    assert_eq!(frame.data(), 0x00FF);
    assert_eq!(frame.bits(), 8);
}

#[test]
fn test_malformed_backward_passes_through_raw() {
    let (driver, _writes) = driver_with_script(&["JXYZZY"]);
    let outcome = driver.send(broadcast_off()).unwrap();
    assert_eq!(outcome, SendOutcome::Raw("JXYZZY".to_string()));
}

#[test]
fn test_send_twice_matching_pair_accepted() {
    let (driver, writes) = driver_with_script(&["J42", "J42"]);
    let command = Command::send_twice(Frame::forward(16, 0x0105).unwrap());
    let outcome = driver.send(command).unwrap();
    assert_eq!(
        outcome,
        SendOutcome::BackwardFrame(Frame::backward(0x42))
    );
    // Two matching replies, no resend: the adapter did the repeat itself
    let writes = writes.lock().unwrap();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0], b"t0105\n".to_vec());
}

#[test]
fn test_send_twice_mismatch_resends_once() {
    let (driver, writes) = driver_with_script(&["N00", "N01", "N01", "N01"]);
    let command = Command::send_twice(Frame::forward(16, 0x0105).unwrap());
    let outcome = driver.send(command).unwrap();
    assert_eq!(outcome, SendOutcome::Raw("N01".to_string()));

    let writes = writes.lock().unwrap();
    assert_eq!(writes.len(), 2);
    // The resend is the original packet, byte for byte
    assert_eq!(writes[0], writes[1]);
}

#[test]
fn test_send_collision_aborts_without_resend() {
    let (driver, writes) = driver_with_script(&["X", ""]);
    let outcome = driver.send(broadcast_off()).unwrap();
    assert_eq!(outcome, SendOutcome::SendAborted);
    assert_eq!(writes.lock().unwrap().len(), 1);
}

#[test]
fn test_receive_collision_drains_then_resends() {
    // Z, then the empty line ending the drain, then the real reply
    let (driver, writes) = driver_with_script(&["Z", "", "N00"]);
    let outcome = driver.send(broadcast_off()).unwrap();
    assert_eq!(outcome, SendOutcome::Raw("N00".to_string()));

    let writes = writes.lock().unwrap();
    assert_eq!(writes.len(), 2);
    assert_eq!(writes[0], writes[1]);
}

#[test]
fn test_empty_line_treated_as_collision() {
    let (driver, writes) = driver_with_script(&["", "", "N00"]);
    let outcome = driver.send(broadcast_off()).unwrap();
    assert_eq!(outcome, SendOutcome::Raw("N00".to_string()));
    assert_eq!(writes.lock().unwrap().len(), 2);
}

#[test]
fn test_unrelated_lines_do_not_consume_the_reply() {
    let (driver, writes) = driver_with_script(&["W1", "W2", "N00"]);
    let outcome = driver.send(broadcast_off()).unwrap();
    assert_eq!(outcome, SendOutcome::Raw("N00".to_string()));
    assert_eq!(writes.lock().unwrap().len(), 1);
}

#[test]
fn test_no_response_when_budget_exhausted() {
    let (driver, writes) = driver_with_script(&["W1", "W2", "W3", "W4", "W5"]);
    let outcome = driver.send(broadcast_off()).unwrap();
    assert_eq!(outcome, SendOutcome::NoResponse);
    assert_eq!(writes.lock().unwrap().len(), 1);
}

#[test]
fn test_set_compare_accepts_plain_normal() {
    let (driver, writes) = driver_with_script(&["N"]);
    let outcome = driver.send(compare_command()).unwrap();
    assert_eq!(outcome, SendOutcome::Raw("N".to_string()));
    let writes = writes.lock().unwrap();
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0], b"hB155\n".to_vec());
}

#[test]
fn test_set_compare_resends_on_unusable_reply() {
    // A backward frame is not a valid reply to an address-search command
    let (driver, writes) = driver_with_script(&["J42", "N"]);
    let outcome = driver.send(compare_command()).unwrap();
    assert_eq!(outcome, SendOutcome::Raw("N".to_string()));
    assert_eq!(writes.lock().unwrap().len(), 2);
}

#[test]
fn test_set_compare_resends_capped_then_no_response() {
    let script = ["Q99"; 10];
    let (driver, writes) = driver_with_script(&script);
    let outcome = driver.send(compare_command()).unwrap();
    assert_eq!(outcome, SendOutcome::NoResponse);
    // Original send plus the five capped resends
    assert_eq!(writes.lock().unwrap().len(), 6);
}

#[test]
fn test_set_compare_collision_recovers() {
    let (driver, writes) = driver_with_script(&["Z", "", "N"]);
    let outcome = driver.send(compare_command()).unwrap();
    assert_eq!(outcome, SendOutcome::Raw("N".to_string()));
    assert_eq!(writes.lock().unwrap().len(), 2);
}

#[test]
fn test_backlog_consumed_before_wire() {
    let (driver, writes) = driver_with_script(&[]);
    driver.enqueue_line("N07");
    let outcome = driver.send(broadcast_off()).unwrap();
    assert_eq!(outcome, SendOutcome::Raw("N07".to_string()));
    assert_eq!(writes.lock().unwrap().len(), 1);
}

#[test]
fn test_reset_input_buffer_clears_backlog_and_wire() {
    let (driver, _writes) = driver_with_script(&["STALE"]);
    driver.enqueue_line("J01");
    driver.reset_input_buffer().unwrap();

    // Old backlog is gone: a line queued after the reset is served first
    driver.enqueue_line("N09");
    let outcome = driver.send(broadcast_off()).unwrap();
    assert_eq!(outcome, SendOutcome::Raw("N09".to_string()));

    // And the stale wire bytes are gone too: the next send sees silence
    match driver.send(broadcast_off()) {
        Err(DriverError::IncompletePacket(_)) => {}
        other => panic!("expected IncompletePacket, got {:?}", other),
    }
}

#[test]
fn test_oversized_line_fails_transaction() {
    let long_line = "A".repeat(40);
    let (driver, _writes) = driver_with_script(&[&long_line]);
    match driver.send(broadcast_off()) {
        Err(DriverError::LineTooLong(_)) => {}
        other => panic!("expected LineTooLong, got {:?}", other),
    }
}

#[test]
fn test_silent_bus_reports_stall() {
    let (driver, _writes) = driver_with_script(&[]);
    match driver.send(broadcast_off()) {
        Err(DriverError::IncompletePacket(_)) => {}
        other => panic!("expected IncompletePacket, got {:?}", other),
    }
}

#[test]
fn test_write_failure_surfaces_as_io_error() {
    let (mut mock, _writes) = MockTransport::with_script(&["N00"]);
    mock.fail_on_send = true;
    let driver = HatDriver::new(Box::new(mock));
    match driver.send(broadcast_off()) {
        Err(DriverError::Io(_)) => {}
        other => panic!("expected Io, got {:?}", other),
    }
}
