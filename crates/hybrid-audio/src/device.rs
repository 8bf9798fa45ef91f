//! Audio device traits and the simulated devices used when no backend is
//! configured.

use std::f32::consts::TAU;

use hybrid_capture::FramePacer;
use hybrid_ipc::AudioConfig;
use tracing::debug;

use crate::error::AudioError;
use crate::AudioResult;

/// Negotiated stream parameters of an audio device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamFormat {
    /// Sample rate in Hz.
    pub sample_rate: u32,

    /// Interleaved channel count.
    pub channels: u16,

    /// Frames (samples per channel) delivered per device period.
    pub period_frames: usize,
}

impl StreamFormat {
    /// The format requested for a given configuration.
    pub fn from_config(config: &AudioConfig) -> Self {
        Self {
            sample_rate: config.sample_rate,
            channels: config.channels,
            period_frames: config.samples_per_frame,
        }
    }

    /// Interleaved samples per device period.
    pub fn samples_per_period(&self) -> usize {
        self.period_frames * self.channels as usize
    }

    /// Bytes of f32 PCM per device period.
    pub fn bytes_per_period(&self) -> usize {
        self.samples_per_period() * std::mem::size_of::<f32>()
    }

    /// True if rate and channel layout match, so no conversion is needed.
    pub fn is_compatible(&self, other: &StreamFormat) -> bool {
        self.sample_rate == other.sample_rate && self.channels == other.channels
    }
}

/// A capture device delivering raw f32 little-endian PCM.
pub trait AudioInput: Send + 'static {
    /// Open the device, returning the format it actually granted.
    fn open(&mut self, requested: &StreamFormat) -> AudioResult<StreamFormat>;

    /// Block for at most about one period and copy captured bytes into `buf`.
    ///
    /// Returns the number of bytes written; 0 means nothing was captured.
    fn read(&mut self, buf: &mut [u8]) -> AudioResult<usize>;

    /// Release the device.
    fn close(&mut self);
}

/// A playback device consuming interleaved f32 samples.
pub trait AudioOutput: Send + 'static {
    /// Open the device, returning the format it actually granted.
    fn open(&mut self, requested: &StreamFormat) -> AudioResult<StreamFormat>;

    /// Play one period of samples, blocking until the device wants more.
    fn write(&mut self, samples: &[f32]) -> AudioResult<()>;

    /// Release the device.
    fn close(&mut self);
}

fn check_format(requested: &StreamFormat) -> AudioResult<()> {
    if requested.sample_rate == 0 || requested.channels == 0 {
        return Err(AudioError::FormatNotSupported(format!(
            "{} Hz, {} channels",
            requested.sample_rate, requested.channels
        )));
    }
    Ok(())
}

fn pacer_for(format: &StreamFormat) -> FramePacer {
    let periods_per_sec = format.sample_rate as f64 / format.period_frames.max(1) as f64;
    FramePacer::with_interval(std::time::Duration::from_secs_f64(1.0 / periods_per_sec))
}

/// Simulated microphone producing a sine tone on every channel.
#[derive(Debug)]
pub struct ToneInput {
    frequency: f32,
    amplitude: f32,
    phase: f32,
    format: Option<StreamFormat>,
    pacer: Option<FramePacer>,
}

impl ToneInput {
    /// Create a tone generator at `frequency` Hz and peak `amplitude`.
    pub fn new(frequency: f32, amplitude: f32) -> Self {
        Self {
            frequency,
            amplitude,
            phase: 0.0,
            format: None,
            pacer: None,
        }
    }
}

impl AudioInput for ToneInput {
    fn open(&mut self, requested: &StreamFormat) -> AudioResult<StreamFormat> {
        check_format(requested)?;

        debug!(
            frequency = self.frequency,
            sample_rate = requested.sample_rate,
            channels = requested.channels,
            "Opening tone input"
        );
        self.phase = 0.0;
        self.format = Some(*requested);
        self.pacer = Some(pacer_for(requested));
        Ok(*requested)
    }

    fn read(&mut self, buf: &mut [u8]) -> AudioResult<usize> {
        let (Some(format), Some(pacer)) = (self.format, self.pacer.as_mut()) else {
            return Ok(0);
        };
        pacer.wait();

        let channels = format.channels as usize;
        let frame_bytes = channels * std::mem::size_of::<f32>();
        let frames = (buf.len() / frame_bytes).min(format.period_frames);
        let step = TAU * self.frequency / format.sample_rate as f32;

        for frame in buf.chunks_exact_mut(frame_bytes).take(frames) {
            let sample = (self.phase.sin() * self.amplitude).to_le_bytes();
            for channel in frame.chunks_exact_mut(4) {
                channel.copy_from_slice(&sample);
            }
            self.phase = (self.phase + step) % TAU;
        }

        Ok(frames * frame_bytes)
    }

    fn close(&mut self) {
        self.format = None;
        self.pacer = None;
    }
}

/// Simulated speaker that discards samples at real-time pace.
#[derive(Debug, Default)]
pub struct NullOutput {
    pacer: Option<FramePacer>,
    played: u64,
}

impl NullOutput {
    /// Create a closed output.
    pub fn new() -> Self {
        Self::default()
    }

    /// Samples consumed since creation.
    pub fn played(&self) -> u64 {
        self.played
    }
}

impl AudioOutput for NullOutput {
    fn open(&mut self, requested: &StreamFormat) -> AudioResult<StreamFormat> {
        check_format(requested)?;
        self.pacer = Some(pacer_for(requested));
        Ok(*requested)
    }

    fn write(&mut self, samples: &[f32]) -> AudioResult<()> {
        let pacer = self
            .pacer
            .as_mut()
            .ok_or_else(|| AudioError::DeviceLost("null output is closed".into()))?;
        pacer.wait();
        self.played += samples.len() as u64;
        Ok(())
    }

    fn close(&mut self) {
        self.pacer = None;
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn format() -> StreamFormat {
        StreamFormat {
            sample_rate: 48_000,
            channels: 2,
            period_frames: 64,
        }
    }

    #[test]
    fn test_format_sizes() {
        let format = StreamFormat::from_config(&AudioConfig::default());
        assert_eq!(format.samples_per_period(), 2048);
        assert_eq!(format.bytes_per_period(), 8192);
    }

    #[test]
    fn test_tone_fills_one_period() {
        let mut tone = ToneInput::new(1_000.0, 0.5);
        let mut buf = vec![0u8; format().bytes_per_period() + 3];
        assert_eq!(tone.read(&mut buf).unwrap(), 0);

        tone.open(&format()).unwrap();
        let n = tone.read(&mut buf).unwrap();
        assert_eq!(n, format().bytes_per_period());

        let samples: Vec<f32> = buf[..n]
            .chunks_exact(4)
            .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
            .collect();
        assert_relative_eq!(samples[0], 0.0);
        assert_relative_eq!(samples[2], samples[3]);
        assert!(samples.iter().all(|s| s.abs() <= 0.5 + f32::EPSILON));
    }

    #[test]
    fn test_tone_rejects_empty_format() {
        let mut tone = ToneInput::new(440.0, 0.5);
        let bad = StreamFormat {
            channels: 0,
            ..format()
        };
        assert!(matches!(
            tone.open(&bad),
            Err(AudioError::FormatNotSupported(_))
        ));
    }

    #[test]
    fn test_null_output_counts_samples() {
        let mut output = NullOutput::new();
        assert!(output.write(&[0.0; 4]).is_err());

        output.open(&format()).unwrap();
        output.write(&[0.0; 128]).unwrap();
        assert_eq!(output.played(), 128);
    }

    #[test]
    fn test_null_output_rejects_zero_rate() {
        let mut output = NullOutput::new();
        let bad = StreamFormat {
            sample_rate: 0,
            ..format()
        };
        assert!(matches!(
            output.open(&bad),
            Err(AudioError::FormatNotSupported(_))
        ));
        assert!(output.write(&[0.0; 4]).is_err());
    }
}
