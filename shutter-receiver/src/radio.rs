//! nRF24 radio reached through a USB serial bridge. The bridge forwards each received
//! payload as `[len: u8][payload]`.
//!
//! Register setup (channel, data rate, pipes) lives in the bridge firmware.

use std::io::{self, Read};
use std::time::Duration;

use shutter_core::Radio;

/// Largest payload an nRF24 can carry.
pub const MAX_PAYLOAD: usize = 32;

/// Byte stream from the bridge.
pub trait BridgePort: Read {
    /// Bytes already buffered and readable without blocking.
    fn bytes_to_read(&self) -> io::Result<u32>;
    /// Drop anything buffered in either direction.
    fn discard_buffers(&mut self) -> io::Result<()>;
}

impl BridgePort for Box<dyn serialport::SerialPort> {
    fn bytes_to_read(&self) -> io::Result<u32> {
        serialport::SerialPort::bytes_to_read(self.as_ref()).map_err(io::Error::from)
    }

    fn discard_buffers(&mut self) -> io::Result<()> {
        self.clear(serialport::ClearBuffer::All)
            .map_err(io::Error::from)
    }
}

/// Owns the bridge port; dropping it discards pending bytes and closes the port.
pub struct BridgedRadio<P: BridgePort = Box<dyn serialport::SerialPort>> {
    port: P,
    name: String,
    pending_len: Option<usize>,
}

impl BridgedRadio {
    pub fn open(path: &str, baud_rate: u32) -> io::Result<Self> {
        let port = serialport::new(path, baud_rate)
            .timeout(Duration::from_millis(500))
            .open()
            .map_err(io::Error::from)?;
        tracing::info!(port = path, baud_rate, "radio listening");
        Ok(Self::from_port(port, path))
    }
}

impl<P: BridgePort> BridgedRadio<P> {
    pub fn from_port(port: P, name: &str) -> Self {
        Self {
            port,
            name: name.to_string(),
            pending_len: None,
        }
    }
}

impl<P: BridgePort> Radio for BridgedRadio<P> {
    fn available(&mut self) -> io::Result<bool> {
        if self.pending_len.is_some() {
            return Ok(true);
        }
        Ok(self.port.bytes_to_read()? > 0)
    }

    /// Reads the length byte once; repeated calls return the same length until the
    /// payload is read.
    fn dynamic_payload_size(&mut self) -> io::Result<usize> {
        if let Some(len) = self.pending_len {
            return Ok(len);
        }
        let mut header = [0u8; 1];
        self.port.read_exact(&mut header)?;
        let len = usize::from(header[0]);
        if len > MAX_PAYLOAD {
            tracing::warn!(len, "bridge reported oversized payload");
        }
        self.pending_len = Some(len);
        Ok(len)
    }

    fn read_payload(&mut self, len: usize) -> io::Result<Vec<u8>> {
        let mut buf = vec![0u8; len];
        self.port.read_exact(&mut buf)?;
        self.pending_len = None;
        Ok(buf)
    }
}

impl<P: BridgePort> Drop for BridgedRadio<P> {
    fn drop(&mut self) {
        if let Err(e) = self.port.discard_buffers() {
            tracing::debug!(error = %e, "failed to clear radio buffers");
        }
        tracing::info!(port = %self.name, "radio released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct Recorded {
        stream: io::Cursor<Vec<u8>>,
        cleared: Arc<AtomicBool>,
    }

    impl Recorded {
        fn new(bytes: Vec<u8>) -> Self {
            Self {
                stream: io::Cursor::new(bytes),
                cleared: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl Read for Recorded {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.stream.read(buf)
        }
    }

    impl BridgePort for Recorded {
        fn bytes_to_read(&self) -> io::Result<u32> {
            let left = self.stream.get_ref().len() as u64 - self.stream.position();
            Ok(left as u32)
        }

        fn discard_buffers(&mut self) -> io::Result<()> {
            self.cleared.store(true, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn reads_consecutive_records() {
        let mut bytes = vec![3, b'a', b'b', b'c'];
        bytes.push(MAX_PAYLOAD as u8);
        bytes.extend([7u8; MAX_PAYLOAD]);
        let mut radio = BridgedRadio::from_port(Recorded::new(bytes), "test");

        assert!(radio.available().unwrap());
        let len = radio.dynamic_payload_size().unwrap();
        assert_eq!(radio.read_payload(len).unwrap(), b"abc");

        assert!(radio.available().unwrap());
        let len = radio.dynamic_payload_size().unwrap();
        assert_eq!(radio.read_payload(len).unwrap(), vec![7u8; MAX_PAYLOAD]);
        assert!(!radio.available().unwrap());
    }

    #[test]
    fn length_is_read_once_until_payload_taken() {
        let mut radio = BridgedRadio::from_port(Recorded::new(vec![2, 9, 8]), "test");
        assert_eq!(radio.dynamic_payload_size().unwrap(), 2);
        assert_eq!(radio.dynamic_payload_size().unwrap(), 2);
        assert_eq!(radio.read_payload(2).unwrap(), vec![9, 8]);
    }

    #[test]
    fn pending_length_counts_as_available() {
        // Header arrived, payload bytes not yet.
        let mut radio = BridgedRadio::from_port(Recorded::new(vec![4]), "test");
        assert_eq!(radio.dynamic_payload_size().unwrap(), 4);
        assert!(radio.available().unwrap());
        let err = radio.read_payload(4).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn oversized_record_is_read_whole_and_stream_stays_aligned() {
        let mut bytes = vec![40];
        bytes.extend([1u8; 40]);
        bytes.extend([1, 0x55]);
        let mut radio = BridgedRadio::from_port(Recorded::new(bytes), "test");

        let len = radio.dynamic_payload_size().unwrap();
        assert_eq!(len, 40);
        assert_eq!(radio.read_payload(len).unwrap(), vec![1u8; 40]);
        let len = radio.dynamic_payload_size().unwrap();
        assert_eq!(radio.read_payload(len).unwrap(), vec![0x55]);
    }

    #[test]
    fn drop_clears_bridge_buffers() {
        let port = Recorded::new(vec![1, 2]);
        let cleared = port.cleared.clone();
        drop(BridgedRadio::from_port(port, "test"));
        assert!(cleared.load(Ordering::SeqCst));
    }
}
