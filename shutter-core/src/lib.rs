//! Shutter image relay core.
//! Framing, discovery and the capture pipeline; hosts supply serial ports, radio, codec and storage.

pub mod frame;
pub mod integrity;
pub mod locator;
pub mod pipeline;
pub mod receiver;
pub mod transmitter;
pub mod transport;
pub mod upload;
pub mod wire;

pub use frame::{effective_chunk_size, frame, Frame, Transfer, DEFAULT_CHUNK_SIZE};
pub use locator::{locate, DeviceEndpoint, ProbeConfig, ProbeOutcome};
pub use pipeline::{CapturePipeline, CapturedImage, ExtensionFilter, PipelineConfig};
pub use receiver::{ReceiveError, ReceiveStats, Receiver, ReceiverState};
pub use transmitter::{TransmitConfig, TransmitError, TransmitReport, Transmitter};
pub use transport::{CodecError, ImageCodec, Radio, SerialLink, SerialPorts};
pub use upload::{RemoteId, RemoteStorage, StorageSink, UploadError, UploadSink};
pub use wire::{decode_frame, encode_frame, FrameDecodeError, FRAME_HEADER_LEN};
