//! Encoder that validates frames and forwards their bytes unchanged.

use tracing::trace;

use hybrid_ipc::EncoderSettings;

use crate::error::EncoderError;
use crate::{EncodedPacket, EncoderResult, FrameData, FrameEncoder};

/// Stand-in encoder: checks frame geometry and wraps the payload as-is.
#[derive(Debug)]
pub struct PassthroughEncoder {
    width: u32,
    height: u32,
    sequence: u64,
}

impl PassthroughEncoder {
    /// Create an encoder for frames of the configured size.
    pub fn new(settings: &EncoderSettings) -> Self {
        Self {
            width: settings.width,
            height: settings.height,
            sequence: 0,
        }
    }
}

impl FrameEncoder for PassthroughEncoder {
    fn encode(&mut self, frame: &FrameData) -> EncoderResult<Option<EncodedPacket>> {
        if frame.width != self.width || frame.height != self.height {
            return Err(EncoderError::InvalidInput(format!(
                "Expected {}x{} frame, got {}x{}",
                self.width, self.height, frame.width, frame.height
            )));
        }
        if frame.data.is_empty() {
            return Err(EncoderError::InvalidInput("empty frame".into()));
        }

        trace!(sequence = self.sequence, size = frame.size(), "Passing frame through");
        let packet = EncodedPacket {
            data: frame.data.clone(),
            timestamp_us: frame.timestamp_us,
            sequence: self.sequence,
        };
        self.sequence += 1;
        Ok(Some(packet))
    }

    fn flush(&mut self) -> EncoderResult<Vec<EncodedPacket>> {
        Ok(Vec::new())
    }

    fn name(&self) -> &'static str {
        "passthrough"
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn settings() -> EncoderSettings {
        EncoderSettings {
            width: 4,
            height: 2,
            ..EncoderSettings::default()
        }
    }

    #[test]
    fn test_packets_are_numbered() {
        let mut encoder = PassthroughEncoder::new(&settings());
        let frame = FrameData {
            data: Bytes::from(vec![1u8; 32]),
            width: 4,
            height: 2,
            timestamp_us: 99,
        };

        let first = encoder.encode(&frame).unwrap().unwrap();
        let second = encoder.encode(&frame).unwrap().unwrap();
        assert_eq!(first.sequence, 0);
        assert_eq!(second.sequence, 1);
        assert_eq!(second.timestamp_us, 99);
        assert_eq!(second.data.len(), 32);
    }

    #[test]
    fn test_rejects_wrong_geometry() {
        let mut encoder = PassthroughEncoder::new(&settings());
        let frame = FrameData {
            data: Bytes::from(vec![1u8; 32]),
            width: 8,
            height: 1,
            timestamp_us: 0,
        };
        assert!(matches!(
            encoder.encode(&frame),
            Err(EncoderError::InvalidInput(_))
        ));
    }
}
