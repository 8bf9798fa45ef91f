//! Screen capture source.

use hybrid_ipc::{SourceKind, VideoConfig};

use crate::capture::VideoCapture;
use crate::device::{ScreenGenerator, VideoDevice};
use crate::error::CaptureError;
use crate::frame::VideoFrame;
use crate::source::Source;
use crate::CaptureResult;

/// A display polled for its latest RGBA frame.
pub struct ScreenSource {
    screen_index: u32,
    capture: VideoCapture,
}

impl ScreenSource {
    /// Create a screen source backed by the built-in generator.
    pub fn new(screen_index: u32, config: &VideoConfig) -> Self {
        let device = ScreenGenerator::new(config.width, config.height, config.fps);
        Self::with_device(screen_index, Box::new(device))
    }

    /// Create a screen source backed by `device`.
    pub fn with_device(screen_index: u32, device: Box<dyn VideoDevice>) -> Self {
        let name = SourceKind::Screen.source_name(&screen_index.to_string());
        Self {
            screen_index,
            capture: VideoCapture::new(name, device),
        }
    }

    /// Index of the captured display.
    pub fn screen_index(&self) -> u32 {
        self.screen_index
    }

    /// Frames replaced before anyone read them.
    pub fn dropped_frames(&self) -> u64 {
        self.capture.exchange().overwritten()
    }
}

impl Source for ScreenSource {
    type Frame = VideoFrame;
    type Error = CaptureError;

    fn start(&self) -> CaptureResult<()> {
        self.capture.start()
    }

    fn stop(&self) {
        self.capture.stop()
    }

    fn get_frame(&self, out: &mut VideoFrame) -> bool {
        self.capture.get_frame(out)
    }

    fn name(&self) -> &str {
        self.capture.name()
    }

    fn is_active(&self) -> bool {
        self.capture.is_active()
    }
}
