//! Common types shared across the engine.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::ConfigResult;

/// Kind of media source.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Audio input device.
    Microphone,

    /// Video capture device.
    Camera,

    /// Display capture.
    Screen,
}

impl SourceKind {
    /// Prefix used when deriving a source name from a device identifier.
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Microphone => "Mic",
            Self::Camera => "Camera",
            Self::Screen => "Screen",
        }
    }

    /// Derive the registry name for a source of this kind.
    ///
    /// `SourceKind::Camera.source_name("0")` is `"Camera-0"`.
    pub fn source_name(self, device_id: &str) -> String {
        format!("{}-{}", self.prefix(), device_id)
    }
}

/// Top level configuration for the engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct MediaConfig {
    /// Audio capture and playback settings.
    pub audio: AudioConfig,

    /// Video capture settings.
    pub video: VideoConfig,

    /// Encoder pipeline settings.
    pub encoder: EncoderSettings,
}

impl MediaConfig {
    /// Parse a configuration from a JSON string.
    ///
    /// Missing fields take their default values.
    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json_str(&json)
    }

    /// Check value ranges that serde cannot express.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.audio.channels == 0 {
            return Err(ConfigError::Invalid("audio.channels must be >= 1".into()));
        }
        if self.audio.sample_rate == 0 {
            return Err(ConfigError::Invalid("audio.sample_rate must be > 0".into()));
        }
        if !(self.audio.capture_buffer_secs > 0.0) || !(self.audio.playback_buffer_secs > 0.0) {
            return Err(ConfigError::Invalid(
                "audio buffer durations must be positive".into(),
            ));
        }
        if self.video.fps == 0 || self.encoder.fps == 0 {
            return Err(ConfigError::Invalid("fps must be > 0".into()));
        }
        if self.encoder.queue_depth == 0 {
            return Err(ConfigError::Invalid("encoder.queue_depth must be > 0".into()));
        }
        Ok(())
    }
}

/// Audio stream settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,

    /// Number of interleaved channels.
    pub channels: u16,

    /// Samples per channel in one polled frame (and one device period).
    pub samples_per_frame: usize,

    /// Seconds of audio the capture queue may hold before dropping.
    pub capture_buffer_secs: f32,

    /// Seconds of audio the playback queue may hold before clearing.
    pub playback_buffer_secs: f32,
}

impl AudioConfig {
    /// Number of interleaved samples in one frame.
    pub fn samples_per_period(&self) -> usize {
        self.samples_per_frame * self.channels as usize
    }

    /// Sample ceiling for the capture queue.
    pub fn capture_capacity(&self) -> usize {
        self.capacity_for(self.capture_buffer_secs)
    }

    /// Sample ceiling for the playback queue.
    pub fn playback_capacity(&self) -> usize {
        self.capacity_for(self.playback_buffer_secs)
    }

    fn capacity_for(&self, secs: f32) -> usize {
        (self.sample_rate as f64 * self.channels as f64 * secs as f64) as usize
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 44_100,
            channels: 2,
            samples_per_frame: 1024,
            capture_buffer_secs: 2.0,
            playback_buffer_secs: 0.5,
        }
    }
}

/// Video capture settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoConfig {
    /// Screen capture width in pixels.
    pub width: u32,

    /// Screen capture height in pixels.
    pub height: u32,

    /// Screen capture rate.
    pub fps: u32,

    /// Requested camera width in pixels.
    pub camera_width: u32,

    /// Requested camera height in pixels.
    pub camera_height: u32,
}

impl Default for VideoConfig {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 60,
            camera_width: 1280,
            camera_height: 720,
        }
    }
}

/// Encoder pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderSettings {
    /// Width in pixels.
    pub width: u32,

    /// Height in pixels.
    pub height: u32,

    /// Target frames per second.
    pub fps: u32,

    /// Target bitrate in bits per second.
    pub bitrate: u32,

    /// Frames the pipeline may buffer before rejecting submissions.
    pub queue_depth: usize,
}

impl Default for EncoderSettings {
    fn default() -> Self {
        Self {
            width: 1920,
            height: 1080,
            fps: 30,
            bitrate: 5_000_000,
            queue_depth: 64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_capacities() {
        let audio = AudioConfig::default();
        assert_eq!(audio.capture_capacity(), 44_100 * 2 * 2);
        assert_eq!(audio.playback_capacity(), 44_100);
        assert_eq!(audio.samples_per_period(), 2048);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = MediaConfig::from_json_str(r#"{ "audio": { "sample_rate": 48000 } }"#)
            .unwrap();
        assert_eq!(config.audio.sample_rate, 48_000);
        assert_eq!(config.audio.channels, 2);
        assert_eq!(config.video.fps, 60);
        assert_eq!(config.encoder.queue_depth, 64);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let result = MediaConfig::from_json_str(r#"{ "audio": { "channels": 0 } }"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));

        let result = MediaConfig::from_json_str("not json");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = MediaConfig::load("/nonexistent/hybrid-media.json");
        assert!(matches!(result, Err(ConfigError::Io { .. })));
    }

    #[test]
    fn test_source_names() {
        assert_eq!(SourceKind::Camera.source_name("0"), "Camera-0");
        assert_eq!(SourceKind::Screen.source_name("1"), "Screen-1");
        assert_eq!(SourceKind::Microphone.source_name("default"), "Mic-default");
    }
}
