//! The submit-frame boundary between capture and encoding.
//!
//! Raw frames are handed to an [`EncoderPipeline`], which queues them for a
//! worker thread driving a [`FrameEncoder`]. The queue is bounded; a full
//! queue is reported to the caller instead of blocking the capture path.

mod error;
mod passthrough;
mod pipeline;

pub use error::EncoderError;
pub use passthrough::PassthroughEncoder;
pub use pipeline::EncoderPipeline;

use bytes::Bytes;

/// Channel capacity for encoded packets.
pub const ENCODED_CHANNEL_CAPACITY: usize = 8;

/// Result type for encoder operations.
pub type EncoderResult<T> = Result<T, EncoderError>;

/// A raw frame submitted for encoding.
#[derive(Debug, Clone)]
pub struct FrameData {
    /// Raw pixel bytes.
    pub data: Bytes,

    /// Width in pixels.
    pub width: u32,

    /// Height in pixels.
    pub height: u32,

    /// Capture timestamp in microseconds.
    pub timestamp_us: u64,
}

impl FrameData {
    /// Size of the pixel payload in bytes.
    pub fn size(&self) -> usize {
        self.data.len()
    }
}

/// An encoded packet.
#[derive(Debug, Clone)]
pub struct EncodedPacket {
    /// Encoded payload.
    pub data: Bytes,

    /// Timestamp of the source frame in microseconds.
    pub timestamp_us: u64,

    /// Position in the encoded stream.
    pub sequence: u64,
}

/// Trait for video encoders driven by the pipeline worker.
pub trait FrameEncoder: Send + 'static {
    /// Encode one frame. `Ok(None)` means the encoder buffered it.
    fn encode(&mut self, frame: &FrameData) -> EncoderResult<Option<EncodedPacket>>;

    /// Flush any buffered frames.
    fn flush(&mut self) -> EncoderResult<Vec<EncodedPacket>>;

    /// Get encoder name for diagnostics.
    fn name(&self) -> &'static str;
}
