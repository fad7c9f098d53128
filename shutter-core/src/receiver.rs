//! Receiver: poll the radio for payloads and hand each one to the capture pipeline.
//!
//! Each payload is treated as a complete image. Nothing here reassembles or verifies the
//! sender's multi-frame transfers.

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::pipeline::CapturePipeline;
use crate::transport::Radio;
use crate::upload::UploadSink;

/// Default wait between polls when no payload is waiting.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReceiverState {
    #[default]
    Listening,
    Shutdown,
}

/// Counters plus the state the receiver was in when they were taken. `run` returns them
/// with `state == Shutdown` on a clean stop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveStats {
    pub state: ReceiverState,
    pub payloads: u64,
    pub bytes: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum ReceiveError {
    #[error("radio failure: {0}")]
    Transport(#[from] io::Error),
}

/// Owns the radio for its whole life; dropping the receiver releases it.
pub struct Receiver<R, S> {
    radio: R,
    pipeline: Arc<CapturePipeline<S>>,
    poll_interval: Duration,
    stats: ReceiveStats,
}

impl<R: Radio, S: UploadSink> Receiver<R, S> {
    pub fn new(radio: R, pipeline: Arc<CapturePipeline<S>>) -> Self {
        Self {
            radio,
            pipeline,
            poll_interval: DEFAULT_POLL_INTERVAL,
            stats: ReceiveStats::default(),
        }
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn state(&self) -> ReceiverState {
        self.stats.state
    }

    pub fn stats(&self) -> ReceiveStats {
        self.stats
    }

    /// One Listening iteration: if a payload is waiting, read exactly one and hand it off.
    /// Returns the payload length, or None if nothing was waiting.
    pub fn poll_once(&mut self) -> Result<Option<usize>, ReceiveError> {
        if !self.radio.available()? {
            return Ok(None);
        }
        let size = self.radio.dynamic_payload_size()?;
        let payload = self.radio.read_payload(size)?;
        let len = payload.len();
        tracing::info!(bytes = len, "payload received");
        self.stats.payloads += 1;
        self.stats.bytes += len as u64;

        if let Err(e) = self.pipeline.on_payload_received(payload) {
            tracing::error!(error = %e, "failed to save payload");
        }
        Ok(Some(len))
    }

    /// Poll until `shutdown` is set. Consumes the receiver so the radio is released on
    /// every exit path, including a radio error.
    pub fn run(mut self, shutdown: &AtomicBool) -> Result<ReceiveStats, ReceiveError> {
        tracing::info!("receiving and uploading images");
        while !shutdown.load(Ordering::Relaxed) {
            if self.poll_once()?.is_none() {
                std::thread::sleep(self.poll_interval);
            }
        }
        self.stats.state = ReceiverState::Shutdown;
        tracing::info!(
            payloads = self.stats.payloads,
            bytes = self.stats.bytes,
            "receiver stopped"
        );
        Ok(self.stats)
    }
}
