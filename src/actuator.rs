//! Serial transport to the window microcontroller
//!
//! The actuator is a fire-and-forget serial peripheral: commands are ASCII
//! strings like "open45" followed by a line terminator, written at a
//! configured baud rate with no acknowledgement. The firmware on the other
//! end has been observed to be picky about encodings and terminators, so
//! `send` walks a small fixed matrix of encoding × terminator combinations
//! and stops at the first write that goes through.
//!
//! Discovery failures degrade gracefully: the rest of the pipeline runs
//! without an actuator rather than refusing to start.

use crate::command::SENTINEL_WIRE;
use crate::error::ActuatorError;
use serialport::SerialPortType;
use std::io::Write;
use std::time::Duration;

/// Descriptor substrings that identify a likely actuator board (USB-serial
/// bridge chips and common dev-board names), compared case-insensitively.
const VENDOR_KEYWORDS: &[&str] = &["CH340", "CP2102", "ESP32", "SERIAL", "USB SERIAL", "ARDUINO"];

/// Line terminators tried in order for each encoding
const TERMINATORS: &[&str] = &["\n", "\r\n", "\r"];

/// Read/write timeout on the opened port
const PORT_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Encoding {
    Ascii,
    Utf8,
}

const ENCODINGS: &[Encoding] = &[Encoding::Ascii, Encoding::Utf8];

/// Serial channel to the window actuator
pub struct ActuatorTransport {
    port: Option<String>,
    baudrate: u32,
    handle: Option<Box<dyn Write + Send>>,
    connected: bool,
}

impl ActuatorTransport {
    /// Connect to the actuator. `port` of `None` (or "auto" upstream) walks
    /// the available serial ports and picks the first whose descriptor
    /// matches a vendor keyword.
    pub fn connect(port: Option<&str>, baudrate: u32) -> Result<Self, ActuatorError> {
        let port_name = match port {
            Some(p) => p.to_string(),
            None => find_actuator_port().ok_or(ActuatorError::NoDeviceFound)?,
        };

        tracing::info!("Connecting to actuator: {} @ {} baud", port_name, baudrate);
        let handle = serialport::new(&port_name, baudrate)
            .timeout(PORT_TIMEOUT)
            .open()
            .map_err(|e| ActuatorError::OpenFailed {
                port: port_name.clone(),
                reason: e.to_string(),
            })?;

        tracing::info!("Actuator connected on {}", port_name);
        Ok(Self {
            port: Some(port_name),
            baudrate,
            handle: Some(Box::new(handle)),
            connected: true,
        })
    }

    /// Test seam: a transport backed by an arbitrary writer.
    #[cfg(test)]
    pub(crate) fn with_writer(writer: Box<dyn Write + Send>) -> Self {
        Self {
            port: Some("test".to_string()),
            baudrate: 115_200,
            handle: Some(writer),
            connected: true,
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn port_name(&self) -> Option<&str> {
        self.port.as_deref()
    }

    pub fn baudrate(&self) -> u32 {
        self.baudrate
    }

    /// Send one command string, trying every encoding × terminator
    /// combination in order until a write succeeds. Returns false only once
    /// every combination has been exhausted (or the transport is not
    /// connected).
    ///
    /// The sentinel is filtered upstream; the check here is a final guard so
    /// "move0" can never hit the wire.
    pub fn send(&mut self, command: &str) -> bool {
        let command = command.trim();
        if command == SENTINEL_WIRE {
            tracing::warn!("Refusing to transmit the sentinel command");
            return false;
        }
        if !self.connected {
            tracing::warn!("Actuator send skipped: not connected");
            return false;
        }
        let Some(handle) = self.handle.as_mut() else {
            return false;
        };

        for &encoding in ENCODINGS {
            for &terminator in TERMINATORS {
                let message = format!("{}{}", command, terminator);
                let bytes = match encode(&message, encoding) {
                    Some(b) => b,
                    None => continue, // not representable in this encoding
                };

                tracing::debug!(
                    "Actuator write attempt: encoding={:?}, terminator={:?}",
                    encoding,
                    terminator
                );
                match handle.write_all(bytes).and_then(|_| handle.flush()) {
                    Ok(()) => {
                        tracing::info!("Actuator command sent: '{}'", command);
                        return true;
                    }
                    Err(e) => {
                        tracing::debug!(
                            "Actuator write failed ({:?}, {:?}): {}",
                            encoding,
                            terminator,
                            e
                        );
                    }
                }
            }
        }

        tracing::warn!("All send patterns failed for '{}'", command);
        false
    }

    /// Close the serial handle. Idempotent.
    pub fn cleanup(&mut self) {
        if self.handle.take().is_some() {
            tracing::info!("Actuator serial connection closed");
        }
        self.connected = false;
    }
}

impl Drop for ActuatorTransport {
    fn drop(&mut self) {
        self.cleanup();
    }
}

fn encode(message: &str, encoding: Encoding) -> Option<&[u8]> {
    match encoding {
        Encoding::Ascii if !message.is_ascii() => None,
        _ => Some(message.as_bytes()),
    }
}

/// Whether a port descriptor looks like the actuator board.
fn descriptor_matches(descriptor: &str) -> bool {
    let upper = descriptor.to_uppercase();
    VENDOR_KEYWORDS.iter().any(|k| upper.contains(k))
}

/// Enumerate serial ports and pick the first whose name or USB descriptor
/// matches a vendor keyword.
fn find_actuator_port() -> Option<String> {
    let ports = match serialport::available_ports() {
        Ok(ports) => ports,
        Err(e) => {
            tracing::warn!("Serial port enumeration failed: {}", e);
            return None;
        }
    };

    for info in &ports {
        let descriptor = match &info.port_type {
            SerialPortType::UsbPort(usb) => format!(
                "{} {} {}",
                info.port_name,
                usb.manufacturer.as_deref().unwrap_or(""),
                usb.product.as_deref().unwrap_or("")
            ),
            _ => info.port_name.clone(),
        };
        if descriptor_matches(&descriptor) {
            tracing::info!("Actuator candidate found: {} ({})", info.port_name, descriptor);
            return Some(info.port_name.clone());
        }
    }

    tracing::warn!(
        "No actuator-like device among {} serial port(s)",
        ports.len()
    );
    for info in &ports {
        tracing::debug!("  available: {}", info.port_name);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::sync::{Arc, Mutex};

    /// Writer that fails the first `fail_count` writes, then records bytes.
    struct FlakyWriter {
        fail_count: usize,
        written: Arc<Mutex<Vec<Vec<u8>>>>,
    }

    impl Write for FlakyWriter {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail_count > 0 {
                self.fail_count -= 1;
                return Err(io::Error::new(io::ErrorKind::TimedOut, "write timeout"));
            }
            self.written.lock().unwrap().push(buf.to_vec());
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn transport(fail_count: usize) -> (ActuatorTransport, Arc<Mutex<Vec<Vec<u8>>>>) {
        let written = Arc::new(Mutex::new(Vec::new()));
        let writer = FlakyWriter {
            fail_count,
            written: written.clone(),
        };
        (ActuatorTransport::with_writer(Box::new(writer)), written)
    }

    #[test]
    fn first_combination_wins() {
        let (mut t, written) = transport(0);
        assert!(t.send("open45"));
        let written = written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0], b"open45\n");
    }

    #[test]
    fn falls_through_to_later_combination() {
        // First two combos (ascii+"\n", ascii+"\r\n") fail, third succeeds.
        let (mut t, written) = transport(2);
        assert!(t.send("close20"));
        let written = written.lock().unwrap();
        assert_eq!(written.len(), 1);
        assert_eq!(written[0], b"close20\r");
    }

    #[test]
    fn reports_failure_after_exhausting_all_combinations() {
        // 2 encodings x 3 terminators = 6 combinations for ASCII text.
        let (mut t, written) = transport(6);
        assert!(!t.send("open10"));
        assert!(written.lock().unwrap().is_empty());
    }

    #[test]
    fn non_ascii_skips_ascii_encoding() {
        let (mut t, written) = transport(0);
        assert!(t.send("öffne20"));
        let written = written.lock().unwrap();
        // ascii combinations were skipped; first write is utf-8 + "\n"
        assert_eq!(written[0], "öffne20\n".as_bytes());
    }

    #[test]
    fn sentinel_never_hits_the_wire() {
        let (mut t, written) = transport(0);
        assert!(!t.send("move0"));
        assert!(!t.send("  move0  "));
        assert!(written.lock().unwrap().is_empty());
    }

    #[test]
    fn send_after_cleanup_fails() {
        let (mut t, written) = transport(0);
        t.cleanup();
        t.cleanup(); // idempotent
        assert!(!t.is_connected());
        assert!(!t.send("open10"));
        assert!(written.lock().unwrap().is_empty());
    }

    #[test]
    fn descriptor_keyword_matching_is_case_insensitive() {
        assert!(descriptor_matches("/dev/ttyUSB0 wch.cn ch340 converter"));
        assert!(descriptor_matches("Silicon Labs CP2102 USB to UART"));
        assert!(descriptor_matches("Espressif esp32-s3"));
        assert!(descriptor_matches("/dev/ttyACM0 Arduino LLC"));
        assert!(!descriptor_matches("/dev/ttyS0 built-in modem"));
    }
}
