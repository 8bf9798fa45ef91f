//! Video frame producers.
//!
//! Physical capture backends plug in through [`VideoDevice`]; this module
//! ships the simulated producers used when no backend is configured.

use tracing::debug;

use crate::frame::{PixelFormat, VideoFrame};
use crate::worker::FramePacer;
use crate::CaptureResult;

/// A device that produces video frames on demand.
pub trait VideoDevice: Send + 'static {
    /// Acquire the device. Called on the thread that starts the source.
    fn open(&mut self) -> CaptureResult<()>;

    /// Wait for the next image, for at most about one frame period.
    ///
    /// `Ok(None)` means no image this round (the producer retries shortly);
    /// `Err(CaptureError::DeviceLost)` ends the producer loop.
    fn capture(&mut self) -> CaptureResult<Option<VideoFrame>>;

    /// Release the device. Called on the producer thread when it exits.
    fn close(&mut self);
}

/// Simulated camera producing a moving RGBA gradient.
#[derive(Debug)]
pub struct TestPatternCamera {
    index: u32,
    width: u32,
    height: u32,
    pacer: FramePacer,
    offset: u8,
    is_open: bool,
}

impl TestPatternCamera {
    /// Create a test pattern for camera `index`.
    pub fn new(index: u32, width: u32, height: u32, fps: u32) -> Self {
        Self {
            index,
            width,
            height,
            pacer: FramePacer::per_second(fps),
            offset: 0,
            is_open: false,
        }
    }

    fn render(&self) -> Vec<u8> {
        let w = self.width as usize;
        let h = self.height as usize;
        let mut pixels = vec![0u8; w * h * 4];

        for (i, px) in pixels.chunks_exact_mut(4).enumerate() {
            let x = i % w;
            let y = i / w;
            px[0] = (x as u8).wrapping_add(self.offset);
            px[1] = y as u8;
            px[2] = self.offset;
            px[3] = 255;
        }

        pixels
    }
}

impl VideoDevice for TestPatternCamera {
    fn open(&mut self) -> CaptureResult<()> {
        debug!(
            index = self.index,
            width = self.width,
            height = self.height,
            "Opening test pattern camera"
        );
        self.pacer.reset();
        self.is_open = true;
        Ok(())
    }

    fn capture(&mut self) -> CaptureResult<Option<VideoFrame>> {
        if !self.is_open {
            return Ok(None);
        }

        self.pacer.wait();
        let pixels = self.render();
        let frame = VideoFrame::from_pixels(self.width, self.height, PixelFormat::Rgba, pixels)?;
        self.offset = self.offset.wrapping_add(1);
        Ok(Some(frame))
    }

    fn close(&mut self) {
        self.is_open = false;
    }
}

/// Simulated display capture producing blank RGBA frames.
#[derive(Debug)]
pub struct ScreenGenerator {
    width: u32,
    height: u32,
    pacer: FramePacer,
}

impl ScreenGenerator {
    /// Create a generator for a `width` x `height` display refreshed at `fps`.
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            pacer: FramePacer::per_second(fps),
        }
    }
}

impl VideoDevice for ScreenGenerator {
    fn open(&mut self) -> CaptureResult<()> {
        self.pacer.reset();
        Ok(())
    }

    fn capture(&mut self) -> CaptureResult<Option<VideoFrame>> {
        self.pacer.wait();

        let mut pixels = vec![0u8; PixelFormat::Rgba.buffer_size(self.width, self.height)];
        if let Some(first) = pixels.first_mut() {
            *first = 255;
        }

        VideoFrame::from_pixels(self.width, self.height, PixelFormat::Rgba, pixels).map(Some)
    }

    fn close(&mut self) {}
}
