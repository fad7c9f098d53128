//! Device discovery: probe each serial candidate until one answers with the expected reply.

use std::io;
use std::time::Duration;

use crate::transport::{SerialLink, SerialPorts};

/// Handshake settings for a scan.
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub probe: Vec<u8>,
    pub expected_reply: Vec<u8>,
    pub baud_rate: u32,
    pub timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            probe: b"hello".to_vec(),
            expected_reply: b"ESP32".to_vec(),
            baud_rate: 115_200,
            timeout: Duration::from_secs(1),
        }
    }
}

/// A serial endpoint found by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviceEndpoint {
    pub identifier: String,
    pub verified: bool,
}

/// Result of probing one candidate.
#[derive(Debug)]
pub enum ProbeOutcome {
    Matched,
    /// Answered, but not with the expected reply.
    Mismatch(Vec<u8>),
    /// Open, write or read failed.
    Failed(io::Error),
}

/// Probe a single candidate: open, write the probe, read one line, compare trimmed reply.
pub fn probe<P: SerialPorts>(ports: &P, candidate: &str, config: &ProbeConfig) -> ProbeOutcome {
    let attempt = || -> io::Result<Vec<u8>> {
        let mut link = ports.open(candidate, config.baud_rate, config.timeout)?;
        link.write_all(&config.probe)?;
        link.flush()?;
        link.read_line()
    };
    match attempt() {
        Ok(reply) if reply.trim_ascii() == config.expected_reply.as_slice() => ProbeOutcome::Matched,
        Ok(reply) => ProbeOutcome::Mismatch(reply),
        Err(e) => ProbeOutcome::Failed(e),
    }
}

/// Scan candidates in order; first match wins. A failing candidate never aborts the scan.
pub fn locate<P: SerialPorts>(
    ports: &P,
    candidates: &[String],
    config: &ProbeConfig,
) -> Option<DeviceEndpoint> {
    for candidate in candidates {
        match probe(ports, candidate, config) {
            ProbeOutcome::Matched => {
                tracing::info!(endpoint = %candidate, "device found");
                return Some(DeviceEndpoint {
                    identifier: candidate.clone(),
                    verified: true,
                });
            }
            ProbeOutcome::Mismatch(reply) => {
                tracing::debug!(
                    endpoint = %candidate,
                    reply = %String::from_utf8_lossy(reply.trim_ascii()),
                    "unexpected handshake reply"
                );
            }
            ProbeOutcome::Failed(e) => {
                tracing::debug!(endpoint = %candidate, error = %e, "probe failed, skipping");
            }
        }
    }
    None
}
