//! Producer loop and shared state behind every video source.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{info, instrument, trace, warn};

use crate::device::VideoDevice;
use crate::error::CaptureError;
use crate::exchange::LatestFrame;
use crate::frame::{MediaClock, VideoFrame};
use crate::worker::SourceWorker;
use crate::CaptureResult;

/// Back-off after a device returned no image.
const RETRY_DELAY: Duration = Duration::from_millis(10);

/// A device, its producer thread and the latest-frame exchange it feeds.
pub struct VideoCapture {
    name: String,
    worker: SourceWorker<Box<dyn VideoDevice>>,
    exchange: Arc<LatestFrame<VideoFrame>>,
    clock: MediaClock,
}

impl VideoCapture {
    /// Wrap `device` under the given source name.
    pub fn new(name: impl Into<String>, device: Box<dyn VideoDevice>) -> Self {
        let name = name.into();
        Self {
            worker: SourceWorker::new(name.clone(), device),
            name,
            exchange: Arc::new(LatestFrame::new()),
            clock: MediaClock::new(),
        }
    }

    /// Source name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Open the device and start the producer thread.
    #[instrument(name = "video_capture_start", skip(self), fields(source = %self.name))]
    pub fn start(&self) -> CaptureResult<()> {
        let exchange = Arc::clone(&self.exchange);
        let clock = self.clock;
        let name = self.name.clone();

        let started = self.worker.start(
            |device: &mut Box<dyn VideoDevice>| device.open(),
            move |device: &mut Box<dyn VideoDevice>, running: &AtomicBool| {
                capture_loop(&name, device.as_mut(), running, &exchange, &clock);
            },
        )?;

        if started {
            info!(source = %self.name, "Video capture started");
        }
        Ok(())
    }

    /// Stop the producer thread and release the device.
    #[instrument(name = "video_capture_stop", skip(self), fields(source = %self.name))]
    pub fn stop(&self) {
        if self.worker.stop() {
            info!(source = %self.name, "Video capture stopped");
        }
    }

    /// Move the newest frame into `out`, if there is one.
    pub fn get_frame(&self, out: &mut VideoFrame) -> bool {
        self.exchange.get_frame(out)
    }

    /// True while the producer thread is running.
    pub fn is_active(&self) -> bool {
        self.worker.is_running()
    }

    /// The exchange the producer writes into.
    pub fn exchange(&self) -> &LatestFrame<VideoFrame> {
        &self.exchange
    }
}

impl Drop for VideoCapture {
    fn drop(&mut self) {
        self.stop();
    }
}

fn capture_loop(
    name: &str,
    device: &mut dyn VideoDevice,
    running: &AtomicBool,
    exchange: &LatestFrame<VideoFrame>,
    clock: &MediaClock,
) {
    let mut sequence = 0u64;

    while running.load(Ordering::SeqCst) {
        match device.capture() {
            Ok(Some(mut frame)) => {
                frame.timestamp_us = clock.now_us();
                frame.sequence = sequence;
                sequence += 1;

                if exchange.publish(frame) {
                    trace!(source = %name, sequence, "Unread frame replaced");
                }
            }
            Ok(None) => thread::sleep(RETRY_DELAY),
            Err(CaptureError::DeviceLost(reason)) => {
                warn!(source = %name, %reason, "Capture device lost");
                break;
            }
            Err(e) => {
                warn!(source = %name, "Capture error: {}", e);
                thread::sleep(RETRY_DELAY);
            }
        }
    }

    device.close();
    trace!(source = %name, frames = sequence, "Capture loop exiting");
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;
    use crate::device::ScreenGenerator;

    #[test]
    fn test_start_stop_cycle() {
        let capture = VideoCapture::new("Screen-test", Box::new(ScreenGenerator::new(8, 8, 200)));
        capture.start().unwrap();
        capture.start().unwrap();
        assert!(capture.is_active());

        let mut frame = VideoFrame::default();
        let deadline = Instant::now() + Duration::from_secs(3);
        while !capture.get_frame(&mut frame) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }
        assert!(frame.is_valid());
        assert_eq!(frame.width, 8);

        capture.stop();
        capture.stop();
        assert!(!capture.is_active());

        capture.start().unwrap();
        assert!(capture.is_active());
        capture.stop();
    }
}
