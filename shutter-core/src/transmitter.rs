//! Transmitter: encode an image, frame it, find the device, write frames at a fixed pace.
//! Fire-and-forget: nothing is acknowledged or retransmitted.

use std::io;
use std::path::Path;
use std::time::Duration;

use crate::frame::{Transfer, DEFAULT_CHUNK_SIZE};
use crate::locator::{self, DeviceEndpoint, ProbeConfig};
use crate::transport::{CodecError, ImageCodec, SerialLink, SerialPorts};
use crate::wire;

/// Transfer settings.
#[derive(Debug, Clone)]
pub struct TransmitConfig {
    pub chunk_size: usize,
    /// Sleep between frame writes.
    pub pace_delay: Duration,
    /// Rate for the bound endpoint.
    pub baud_rate: u32,
    /// Read/write timeout for the bound endpoint.
    pub io_timeout: Duration,
    pub probe: ProbeConfig,
}

impl Default for TransmitConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            pace_delay: Duration::from_millis(50),
            baud_rate: 115_200,
            io_timeout: Duration::from_secs(1),
            probe: ProbeConfig::default(),
        }
    }
}

/// Summary of a completed transfer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransmitReport {
    pub endpoint: DeviceEndpoint,
    pub frames_sent: usize,
    pub bytes_sent: usize,
}

#[derive(Debug, thiserror::Error)]
pub enum TransmitError {
    #[error("no device answered the handshake")]
    NoDevice,
    #[error(transparent)]
    Codec(#[from] CodecError),
    #[error("transport failure on {endpoint}: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: io::Error,
    },
}

pub struct Transmitter<P, C> {
    ports: P,
    codec: C,
    config: TransmitConfig,
}

impl<P: SerialPorts, C: ImageCodec> Transmitter<P, C> {
    pub fn new(ports: P, codec: C, config: TransmitConfig) -> Self {
        Self {
            ports,
            codec,
            config,
        }
    }

    pub fn config(&self) -> &TransmitConfig {
        &self.config
    }

    /// Send one image. Frames are built before any port is touched.
    pub fn transmit(&self, image_path: &Path) -> Result<TransmitReport, TransmitError> {
        let encoded = self.codec.encode(image_path)?;
        let transfer = Transfer::split(&encoded, self.config.chunk_size);
        tracing::info!(
            path = %image_path.display(),
            bytes = encoded.len(),
            frames = transfer.len(),
            "image framed"
        );

        let endpoint = self.find_device()?;
        self.send(&endpoint, &transfer)
    }

    /// Enumerate candidates and run the handshake scan.
    pub fn find_device(&self) -> Result<DeviceEndpoint, TransmitError> {
        let candidates = self.ports.list().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "port enumeration failed");
            Vec::new()
        });
        tracing::debug!(candidates = candidates.len(), "scanning serial ports");
        locator::locate(&self.ports, &candidates, &self.config.probe).ok_or(TransmitError::NoDevice)
    }

    /// Write every frame of `transfer` to `endpoint` in sequence order.
    pub fn send(
        &self,
        endpoint: &DeviceEndpoint,
        transfer: &Transfer,
    ) -> Result<TransmitReport, TransmitError> {
        let transport_err = |source: io::Error| TransmitError::Transport {
            endpoint: endpoint.identifier.clone(),
            source,
        };
        let mut link = self
            .ports
            .open(
                &endpoint.identifier,
                self.config.baud_rate,
                self.config.io_timeout,
            )
            .map_err(transport_err)?;

        let mut bytes_sent = 0;
        let frames = transfer.frames();
        for (i, frame) in frames.iter().enumerate() {
            let packet = wire::encode_frame(frame);
            link.write_all(&packet).map_err(transport_err)?;
            link.flush().map_err(transport_err)?;
            bytes_sent += packet.len();
            tracing::info!(sequence = frame.sequence(), size = packet.len(), "frame sent");
            if i + 1 < frames.len() && !self.config.pace_delay.is_zero() {
                std::thread::sleep(self.config.pace_delay);
            }
        }

        Ok(TransmitReport {
            endpoint: endpoint.clone(),
            frames_sent: frames.len(),
            bytes_sent,
        })
    }
}
