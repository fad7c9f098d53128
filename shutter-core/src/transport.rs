//! Collaborator seams: serial ports, the receive radio, and the image codec.
//! Hosts implement these; the core never touches hardware directly.

use std::io;
use std::path::Path;
use std::time::Duration;

/// An open serial endpoint. Closed on drop.
pub trait SerialLink {
    fn write_all(&mut self, bytes: &[u8]) -> io::Result<()>;

    /// Read up to and including `\n`, bounded by the timeout given at open.
    fn read_line(&mut self) -> io::Result<Vec<u8>>;

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Enumerates and opens serial endpoints.
pub trait SerialPorts {
    type Link: SerialLink;

    /// Candidate endpoint identifiers in OS enumeration order.
    fn list(&self) -> io::Result<Vec<String>>;

    fn open(&self, endpoint: &str, baud_rate: u32, timeout: Duration) -> io::Result<Self::Link>;
}

/// Packet radio in listening mode.
pub trait Radio {
    /// True if a payload is waiting.
    fn available(&mut self) -> io::Result<bool>;

    /// Length of the waiting payload as reported by the radio.
    fn dynamic_payload_size(&mut self) -> io::Result<usize>;

    /// Read exactly `len` bytes of the waiting payload.
    fn read_payload(&mut self, len: usize) -> io::Result<Vec<u8>>;
}

/// Converts an image file to the byte encoding that gets framed.
pub trait ImageCodec {
    fn encode(&self, path: &Path) -> Result<Vec<u8>, CodecError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },
    #[error("failed to decode image: {0}")]
    Decode(String),
    #[error("failed to encode image: {0}")]
    Encode(String),
}
