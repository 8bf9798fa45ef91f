//! Microphone source.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use hybrid_capture::{MediaClock, Source, SourceWorker};
use hybrid_ipc::{AudioConfig, SourceKind};
use parking_lot::Mutex;
use tracing::{info, instrument, trace, warn};

use crate::device::{AudioInput, StreamFormat, ToneInput};
use crate::error::AudioError;
use crate::frame::AudioFrame;
use crate::queue::{OverflowPolicy, SampleQueue};
use crate::AudioResult;

/// Back-off after a read returned nothing or failed.
const RETRY_DELAY: Duration = Duration::from_millis(5);

/// Tone played by the built-in simulated microphone.
const TONE_FREQUENCY: f32 = 440.0;
const TONE_AMPLITUDE: f32 = 0.25;

/// A microphone whose captured samples are polled in fixed-size frames.
///
/// The device thread appends PCM into a [`SampleQueue`] that keeps at most
/// `capture_buffer_secs` of audio, dropping the oldest samples past that.
pub struct MicrophoneSource {
    name: String,
    device_id: String,
    worker: SourceWorker<Box<dyn AudioInput>>,
    queue: Arc<SampleQueue>,
    requested: StreamFormat,
    format: Mutex<StreamFormat>,
    clock: MediaClock,
}

impl MicrophoneSource {
    /// Create a microphone backed by the built-in tone generator.
    pub fn new(device_id: impl Into<String>, config: &AudioConfig) -> Self {
        Self::with_device(
            device_id,
            config,
            Box::new(ToneInput::new(TONE_FREQUENCY, TONE_AMPLITUDE)),
        )
    }

    /// Create a microphone backed by `device`.
    pub fn with_device(
        device_id: impl Into<String>,
        config: &AudioConfig,
        device: Box<dyn AudioInput>,
    ) -> Self {
        let device_id = device_id.into();
        let name = SourceKind::Microphone.source_name(&device_id);
        let requested = StreamFormat::from_config(config);

        Self {
            worker: SourceWorker::new(name.clone(), device),
            name,
            device_id,
            queue: Arc::new(SampleQueue::new(
                config.capture_capacity(),
                OverflowPolicy::DropOldest,
            )),
            requested,
            format: Mutex::new(requested),
            clock: MediaClock::new(),
        }
    }

    /// Device identifier this microphone was created with.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Format granted by the device on the last successful start.
    pub fn format(&self) -> StreamFormat {
        *self.format.lock()
    }

    /// Samples waiting to be read.
    pub fn queued_samples(&self) -> usize {
        self.queue.len()
    }

    /// Samples discarded because nobody read them in time.
    pub fn dropped_samples(&self) -> u64 {
        self.queue.dropped()
    }

    /// The capture queue.
    pub fn queue(&self) -> &SampleQueue {
        &self.queue
    }
}

impl Source for MicrophoneSource {
    type Frame = AudioFrame;
    type Error = AudioError;

    #[instrument(name = "microphone_start", skip(self), fields(source = %self.name))]
    fn start(&self) -> AudioResult<()> {
        let queue = Arc::clone(&self.queue);
        let name = self.name.clone();
        let requested = self.requested;

        let started = self.worker.start(
            |device: &mut Box<dyn AudioInput>| {
                let granted = device.open(&requested)?;
                if !granted.is_compatible(&requested) {
                    device.close();
                    return Err(AudioError::FormatNotSupported(format!(
                        "wanted {} Hz x{}, device granted {} Hz x{}",
                        requested.sample_rate,
                        requested.channels,
                        granted.sample_rate,
                        granted.channels
                    )));
                }
                *self.format.lock() = granted;
                Ok(())
            },
            move |device: &mut Box<dyn AudioInput>, running: &AtomicBool| {
                capture_loop(&name, device.as_mut(), running, &queue, requested);
            },
        )?;

        if started {
            info!(source = %self.name, "Microphone started");
        }
        Ok(())
    }

    #[instrument(name = "microphone_stop", skip(self), fields(source = %self.name))]
    fn stop(&self) {
        if self.worker.stop() {
            info!(source = %self.name, "Microphone stopped");
        }
    }

    /// Fill `out.data` with exactly that many queued samples.
    ///
    /// The frame's buffer length is the request size. Nothing is consumed
    /// unless the whole request can be served.
    fn get_frame(&self, out: &mut AudioFrame) -> bool {
        if out.data.is_empty() || !self.queue.pop_exact(&mut out.data) {
            return false;
        }
        out.timestamp_us = self.clock.now_us();
        true
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_active(&self) -> bool {
        self.worker.is_running()
    }
}

impl Drop for MicrophoneSource {
    fn drop(&mut self) {
        self.stop();
    }
}

fn capture_loop(
    name: &str,
    device: &mut dyn AudioInput,
    running: &AtomicBool,
    queue: &SampleQueue,
    format: StreamFormat,
) {
    let mut buf = vec![0u8; format.bytes_per_period()];

    while running.load(Ordering::SeqCst) {
        match device.read(&mut buf) {
            Ok(0) => thread::sleep(RETRY_DELAY),
            Ok(n) => {
                let dropped = queue.push_pcm_bytes(&buf[..n]);
                if dropped > 0 {
                    trace!(source = %name, dropped, "Capture queue full, oldest samples dropped");
                }
            }
            Err(AudioError::DeviceLost(reason)) => {
                warn!(source = %name, %reason, "Microphone lost");
                break;
            }
            Err(e) => {
                warn!(source = %name, "Microphone read error: {}", e);
                thread::sleep(RETRY_DELAY);
            }
        }
    }

    device.close();
    trace!(source = %name, "Capture loop exiting");
}
