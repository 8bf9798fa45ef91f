//! Camera source.

use hybrid_ipc::{SourceKind, VideoConfig};

use crate::capture::VideoCapture;
use crate::device::{TestPatternCamera, VideoDevice};
use crate::error::CaptureError;
use crate::frame::VideoFrame;
use crate::source::Source;
use crate::CaptureResult;

/// Frame rate of the built-in test pattern camera.
const TEST_PATTERN_FPS: u32 = 30;

/// Parse the camera index out of a device identifier.
///
/// Takes the first run of digits, so `"Camera 1"`, `"/dev/video1"` and `"1"`
/// all map to 1. Identifiers without digits map to camera 0.
pub fn parse_camera_index(device_id: &str) -> u32 {
    let digits: String = device_id
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();

    digits.parse().unwrap_or(0)
}

/// A camera polled for its latest RGBA frame.
pub struct CameraSource {
    device_id: String,
    index: u32,
    capture: VideoCapture,
}

impl CameraSource {
    /// Create a camera source backed by the built-in test pattern.
    pub fn new(device_id: impl Into<String>, config: &VideoConfig) -> Self {
        let device_id = device_id.into();
        let index = parse_camera_index(&device_id);
        let device = TestPatternCamera::new(
            index,
            config.camera_width,
            config.camera_height,
            TEST_PATTERN_FPS,
        );
        Self::with_device(device_id, Box::new(device))
    }

    /// Create a camera source backed by `device`.
    pub fn with_device(device_id: impl Into<String>, device: Box<dyn VideoDevice>) -> Self {
        let device_id = device_id.into();
        let index = parse_camera_index(&device_id);
        let name = SourceKind::Camera.source_name(&device_id);

        Self {
            device_id,
            index,
            capture: VideoCapture::new(name, device),
        }
    }

    /// Device identifier this camera was created with.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Camera index parsed from the device identifier.
    pub fn index(&self) -> u32 {
        self.index
    }

    /// Frames replaced before anyone read them.
    pub fn dropped_frames(&self) -> u64 {
        self.capture.exchange().overwritten()
    }
}

impl Source for CameraSource {
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

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use crossbeam_channel::{Receiver, Sender};

    use super::*;
    use crate::frame::PixelFormat;

    /// Device fed from a channel so tests control exactly which frames exist.
    struct ScriptedDevice {
        frames: Receiver<VideoFrame>,
        open_failures: usize,
        closes: Arc<AtomicUsize>,
    }

    impl VideoDevice for ScriptedDevice {
        fn open(&mut self) -> CaptureResult<()> {
            if self.open_failures > 0 {
                self.open_failures -= 1;
                return Err(CaptureError::DeviceUnavailable("scripted failure".into()));
            }
            Ok(())
        }

        fn capture(&mut self) -> CaptureResult<Option<VideoFrame>> {
            Ok(self.frames.recv_timeout(Duration::from_millis(5)).ok())
        }

        fn close(&mut self) {
            self.closes.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn scripted(open_failures: usize) -> (CameraSource, Sender<VideoFrame>, Arc<AtomicUsize>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let closes = Arc::new(AtomicUsize::new(0));
        let device = ScriptedDevice {
            frames: rx,
            open_failures,
            closes: Arc::clone(&closes),
        };
        (CameraSource::with_device("Camera 0", Box::new(device)), tx, closes)
    }

    fn wait_for_frame(source: &CameraSource, out: &mut VideoFrame) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if source.get_frame(out) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        false
    }

    #[test]
    fn test_parse_camera_index() {
        assert_eq!(parse_camera_index("0"), 0);
        assert_eq!(parse_camera_index("Camera 2"), 2);
        assert_eq!(parse_camera_index("/dev/video12"), 12);
        assert_eq!(parse_camera_index("FaceTime HD"), 0);
    }

    #[test]
    fn test_name_available_before_start() {
        let source = CameraSource::new("0", &VideoConfig::default());
        assert_eq!(source.name(), "Camera-0");
        assert!(!source.is_active());
    }

    #[test]
    fn test_frames_are_stamped_in_order() {
        let (source, tx, _) = scripted(0);
        source.start().unwrap();

        let mut frame = VideoFrame::default();
        tx.send(VideoFrame::new(4, 4, PixelFormat::Rgba)).unwrap();
        assert!(wait_for_frame(&source, &mut frame));
        let first = frame.timestamp_us;

        tx.send(VideoFrame::new(4, 4, PixelFormat::Rgba)).unwrap();
        assert!(wait_for_frame(&source, &mut frame));
        assert!(frame.timestamp_us >= first);
        assert_eq!(frame.sequence, 1);

        source.stop();
    }

    #[test]
    fn test_get_frame_without_data_leaves_output() {
        let (source, _tx, _) = scripted(0);
        source.start().unwrap();

        let mut frame = VideoFrame::new(2, 2, PixelFormat::Rgba);
        frame.timestamp_us = 7;
        assert!(!source.get_frame(&mut frame));
        assert_eq!(frame.timestamp_us, 7);

        source.stop();
    }

    #[test]
    fn test_failed_start_can_be_retried() {
        let (source, _tx, closes) = scripted(1);

        assert!(matches!(source.start(), Err(CaptureError::DeviceUnavailable(_))));
        assert!(!source.is_active());

        source.start().unwrap();
        assert!(source.is_active());
        source.stop();
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_stop_is_idempotent() {
        let (source, _tx, closes) = scripted(0);
        source.stop();

        source.start().unwrap();
        source.stop();
        source.stop();
        assert!(!source.is_active());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_drop_joins_producer() {
        let (source, _tx, closes) = scripted(0);
        source.start().unwrap();
        drop(source);
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }
}
