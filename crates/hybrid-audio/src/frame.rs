//! Audio frame type.

use crate::error::AudioError;
use crate::AudioResult;

/// A block of interleaved f32 samples.
///
/// `data.len()` is always `channels * samples_per_channel` for frames built
/// through the constructors. Sample values are nominally in `[-1.0, 1.0]`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioFrame {
    /// Number of interleaved channels.
    pub channels: u16,

    /// Sample rate in Hz.
    pub sample_rate: u32,

    /// Samples per channel in `data`.
    pub samples_per_channel: usize,

    /// Microseconds since the Unix epoch.
    pub timestamp_us: u64,

    /// Interleaved samples (L, R, L, R, ...).
    pub data: Vec<f32>,
}

impl AudioFrame {
    /// Create a silent frame of the given shape.
    pub fn new(channels: u16, sample_rate: u32, samples_per_channel: usize) -> Self {
        Self {
            channels,
            sample_rate,
            samples_per_channel,
            timestamp_us: 0,
            data: vec![0.0; channels as usize * samples_per_channel],
        }
    }

    /// Wrap interleaved samples.
    pub fn from_samples(channels: u16, sample_rate: u32, data: Vec<f32>) -> AudioResult<Self> {
        if channels == 0 || data.len() % channels as usize != 0 {
            return Err(AudioError::FormatNotSupported(format!(
                "{} samples cannot be split into {} channels",
                data.len(),
                channels
            )));
        }

        Ok(Self {
            channels,
            sample_rate,
            samples_per_channel: data.len() / channels as usize,
            timestamp_us: 0,
            data,
        })
    }

    /// Total number of interleaved samples.
    pub fn sample_count(&self) -> usize {
        self.data.len()
    }

    /// True if the buffer matches the declared shape.
    pub fn is_valid(&self) -> bool {
        self.channels >= 1
            && self.sample_rate > 0
            && self.data.len() == self.channels as usize * self.samples_per_channel
    }

    /// True if `other` has the same channel count, rate and length.
    pub fn same_shape(&self, other: &AudioFrame) -> bool {
        self.channels == other.channels
            && self.sample_rate == other.sample_rate
            && self.samples_per_channel == other.samples_per_channel
    }
}

impl Default for AudioFrame {
    fn default() -> Self {
        Self::new(2, 44_100, 1024)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_shape() {
        let frame = AudioFrame::default();
        assert_eq!(frame.sample_count(), 2048);
        assert!(frame.is_valid());
    }

    #[test]
    fn test_from_samples() {
        let frame = AudioFrame::from_samples(2, 48_000, vec![0.1; 6]).unwrap();
        assert_eq!(frame.samples_per_channel, 3);

        assert!(AudioFrame::from_samples(2, 48_000, vec![0.1; 5]).is_err());
        assert!(AudioFrame::from_samples(0, 48_000, vec![]).is_err());
    }
}
