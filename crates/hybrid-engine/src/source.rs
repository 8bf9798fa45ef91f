//! The closed set of source kinds the registry manages.

use hybrid_audio::{AudioFrame, MicrophoneSource};
use hybrid_capture::{CameraSource, ScreenSource, Source, VideoFrame};
use hybrid_ipc::SourceKind;

use crate::EngineResult;

/// A registered source of any kind.
pub enum MediaSource {
    /// Audio input.
    Microphone(MicrophoneSource),

    /// Camera video.
    Camera(CameraSource),

    /// Display capture.
    Screen(ScreenSource),
}

impl MediaSource {
    /// Registry name, e.g. `Camera-0`.
    pub fn name(&self) -> &str {
        match self {
            Self::Microphone(s) => s.name(),
            Self::Camera(s) => s.name(),
            Self::Screen(s) => s.name(),
        }
    }

    /// Which kind of source this is.
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Microphone(_) => SourceKind::Microphone,
            Self::Camera(_) => SourceKind::Camera,
            Self::Screen(_) => SourceKind::Screen,
        }
    }

    /// Open the device and start producing.
    pub fn start(&self) -> EngineResult<()> {
        match self {
            Self::Microphone(s) => s.start()?,
            Self::Camera(s) => s.start()?,
            Self::Screen(s) => s.start()?,
        }
        Ok(())
    }

    /// Stop producing and release the device.
    pub fn stop(&self) {
        match self {
            Self::Microphone(s) => s.stop(),
            Self::Camera(s) => s.stop(),
            Self::Screen(s) => s.stop(),
        }
    }

    /// True while the producer thread is running.
    pub fn is_active(&self) -> bool {
        match self {
            Self::Microphone(s) => s.is_active(),
            Self::Camera(s) => s.is_active(),
            Self::Screen(s) => s.is_active(),
        }
    }

    /// Poll the newest video frame. Always false for audio sources.
    pub fn get_video_frame(&self, out: &mut VideoFrame) -> bool {
        match self {
            Self::Microphone(_) => false,
            Self::Camera(s) => s.get_frame(out),
            Self::Screen(s) => s.get_frame(out),
        }
    }

    /// Poll exactly `out.data.len()` samples. Always false for video sources.
    pub fn get_audio_frame(&self, out: &mut AudioFrame) -> bool {
        match self {
            Self::Microphone(s) => s.get_frame(out),
            Self::Camera(_) | Self::Screen(_) => false,
        }
    }
}

impl From<MicrophoneSource> for MediaSource {
    fn from(source: MicrophoneSource) -> Self {
        Self::Microphone(source)
    }
}

impl From<CameraSource> for MediaSource {
    fn from(source: CameraSource) -> Self {
        Self::Camera(source)
    }
}

impl From<ScreenSource> for MediaSource {
    fn from(source: ScreenSource) -> Self {
        Self::Screen(source)
    }
}

impl std::fmt::Debug for MediaSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MediaSource")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use hybrid_ipc::{AudioConfig, VideoConfig};

    use super::*;

    #[test]
    fn test_dispatch_by_kind() {
        let mic = MediaSource::from(MicrophoneSource::new("default", &AudioConfig::default()));
        let screen = MediaSource::from(ScreenSource::new(1, &VideoConfig::default()));

        assert_eq!(mic.name(), "Mic-default");
        assert_eq!(mic.kind(), SourceKind::Microphone);
        assert_eq!(screen.name(), "Screen-1");
        assert_eq!(screen.kind(), SourceKind::Screen);

        let mut video = VideoFrame::default();
        assert!(!mic.get_video_frame(&mut video));
        let mut audio = AudioFrame::default();
        assert!(!screen.get_audio_frame(&mut audio));
    }
}
