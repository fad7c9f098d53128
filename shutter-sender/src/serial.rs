//! Serial ports backed by the `serialport` crate.

use std::io::{self, Read, Write};
use std::time::Duration;

use shutter_core::{SerialLink, SerialPorts};

const MAX_LINE: usize = 256;

/// Ports as enumerated by the OS.
pub struct SystemPorts;

impl SerialPorts for SystemPorts {
    type Link = Port;

    fn list(&self) -> io::Result<Vec<String>> {
        let ports = serialport::available_ports().map_err(io::Error::from)?;
        Ok(ports.into_iter().map(|p| p.port_name).collect())
    }

    fn open(&self, endpoint: &str, baud_rate: u32, timeout: Duration) -> io::Result<Port> {
        let inner = serialport::new(endpoint, baud_rate)
            .timeout(timeout)
            .open()
            .map_err(io::Error::from)?;
        Ok(Port { inner })
    }
}

pub struct Port {
    inner: Box<dyn serialport::SerialPort>,
}

impl SerialLink for Port {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.inner.write_all(bytes)
    }

    /// Returns what arrived before the timeout if no newline came.
    fn read_line(&mut self) -> io::Result<Vec<u8>> {
        read_line_from(&mut self.inner)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Read up to and including `\n`, at most `MAX_LINE` bytes. A timeout after some bytes
/// ends the line; a timeout before any byte is returned as an error.
fn read_line_from<R: Read + ?Sized>(reader: &mut R) -> io::Result<Vec<u8>> {
    let mut line = Vec::new();
    let mut byte = [0u8; 1];
    while line.len() < MAX_LINE {
        match reader.read(&mut byte) {
            Ok(0) => break,
            Ok(_) => {
                line.push(byte[0]);
                if byte[0] == b'\n' {
                    break;
                }
            }
            Err(e) if e.kind() == io::ErrorKind::TimedOut && !line.is_empty() => break,
            Err(e) => return Err(e),
        }
    }
    Ok(line)
}
