//! Video frame types and frame timestamps.

use std::time::{Instant, SystemTime, UNIX_EPOCH};

use bytes::Bytes;

use crate::error::CaptureError;
use crate::CaptureResult;

/// Monotonic microsecond clock anchored to the Unix epoch.
///
/// Readings never go backwards even if the wall clock is adjusted, because
/// only the starting point is taken from [`SystemTime`].
#[derive(Debug, Clone, Copy)]
pub struct MediaClock {
    origin: Instant,
    origin_unix_us: u64,
}

impl MediaClock {
    /// Create a clock anchored at the current wall-clock time.
    pub fn new() -> Self {
        let origin_unix_us = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros() as u64)
            .unwrap_or(0);

        Self {
            origin: Instant::now(),
            origin_unix_us,
        }
    }

    /// Microseconds since the Unix epoch.
    pub fn now_us(&self) -> u64 {
        self.origin_unix_us + self.elapsed_us()
    }

    /// Microseconds since this clock was created.
    pub fn elapsed_us(&self) -> u64 {
        self.origin.elapsed().as_micros() as u64
    }
}

impl Default for MediaClock {
    fn default() -> Self {
        Self::new()
    }
}

/// Pixel layout of a [`VideoFrame`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PixelFormat {
    /// 8-bit RGBA, 4 bytes per pixel.
    #[default]
    Rgba,

    /// Planar YUV 4:2:0.
    I420,

    /// Y plane followed by interleaved UV, 4:2:0.
    Nv12,
}

impl PixelFormat {
    /// Bytes per pixel for packed formats, `None` for planar 4:2:0 formats.
    pub fn bytes_per_pixel(self) -> Option<usize> {
        match self {
            Self::Rgba => Some(4),
            Self::I420 | Self::Nv12 => None,
        }
    }

    /// Buffer size in bytes for a frame of the given dimensions.
    pub fn buffer_size(self, width: u32, height: u32) -> usize {
        let pixels = width as usize * height as usize;
        match self.bytes_per_pixel() {
            Some(bpp) => pixels * bpp,
            // 4:2:0: full-size luma plus two quarter-size chroma planes
            None => pixels + pixels / 2,
        }
    }
}

/// A captured or generated video frame.
#[derive(Debug, Clone, Default)]
pub struct VideoFrame {
    /// Frame width in pixels.
    pub width: u32,

    /// Frame height in pixels.
    pub height: u32,

    /// Pixel layout of `data`.
    pub format: PixelFormat,

    /// Microseconds since the Unix epoch, from the producing source's clock.
    pub timestamp_us: u64,

    /// Monotonically increasing sequence number within the producing source.
    pub sequence: u64,

    /// Pixel data.
    pub data: Bytes,
}

impl VideoFrame {
    /// Create a zero-filled frame sized for the given dimensions.
    pub fn new(width: u32, height: u32, format: PixelFormat) -> Self {
        let size = format.buffer_size(width, height);
        Self {
            width,
            height,
            format,
            timestamp_us: 0,
            sequence: 0,
            data: Bytes::from(vec![0u8; size]),
        }
    }

    /// Wrap existing pixel data, checking that it matches the dimensions.
    pub fn from_pixels(
        width: u32,
        height: u32,
        format: PixelFormat,
        pixels: Vec<u8>,
    ) -> CaptureResult<Self> {
        let expected = format.buffer_size(width, height);
        if pixels.len() != expected {
            return Err(CaptureError::FrameConversion(format!(
                "{}x{} {:?} needs {} bytes, got {}",
                width,
                height,
                format,
                expected,
                pixels.len()
            )));
        }

        Ok(Self {
            width,
            height,
            format,
            timestamp_us: 0,
            sequence: 0,
            data: Bytes::from(pixels),
        })
    }

    /// True if this frame carries no image.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Validate that the frame data matches its dimensions and format.
    pub fn is_valid(&self) -> bool {
        if self.is_empty() {
            return self.data.is_empty();
        }
        self.data.len() == self.format.buffer_size(self.width, self.height)
    }
}
