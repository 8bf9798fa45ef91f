//! Speaker sink.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use hybrid_capture::SourceWorker;
use hybrid_ipc::AudioConfig;
use tracing::{info, instrument, trace, warn};

use crate::device::{AudioOutput, NullOutput, StreamFormat};
use crate::error::AudioError;
use crate::frame::AudioFrame;
use crate::queue::{OverflowPolicy, SampleQueue};
use crate::sink::Sink;
use crate::AudioResult;

const RETRY_DELAY: Duration = Duration::from_millis(5);

/// Plays pushed frames through an output device.
///
/// Frames are queued as samples with at most `playback_buffer_secs` of
/// latency; a push that would exceed that clears the backlog. The device
/// thread pulls one period at a time and pads with silence on underrun.
pub struct SpeakerSink {
    name: String,
    worker: SourceWorker<Box<dyn AudioOutput>>,
    queue: Arc<SampleQueue>,
    format: StreamFormat,
}

impl SpeakerSink {
    /// Create a speaker backed by the built-in null output.
    pub fn new(device_id: impl AsRef<str>, config: &AudioConfig) -> Self {
        Self::with_device(device_id, config, Box::new(NullOutput::new()))
    }

    /// Create a speaker backed by `device`.
    pub fn with_device(
        device_id: impl AsRef<str>,
        config: &AudioConfig,
        device: Box<dyn AudioOutput>,
    ) -> Self {
        let name = format!("Speaker-{}", device_id.as_ref());
        Self {
            worker: SourceWorker::new(name.clone(), device),
            name,
            queue: Arc::new(SampleQueue::new(
                config.playback_capacity(),
                OverflowPolicy::ClearAll,
            )),
            format: StreamFormat::from_config(config),
        }
    }

    /// Fill `out` with queued samples, silence past the end of the queue.
    ///
    /// This is the body of the device callback. Returns how many queued
    /// samples were played.
    pub fn render(&self, out: &mut [f32]) -> usize {
        self.queue.pop_fill(out)
    }

    /// Samples waiting to be played.
    pub fn queued_samples(&self) -> usize {
        self.queue.len()
    }

    /// Samples discarded by backlog clears.
    pub fn dropped_samples(&self) -> u64 {
        self.queue.dropped()
    }

    /// The playback queue.
    pub fn queue(&self) -> &SampleQueue {
        &self.queue
    }
}

impl Sink for SpeakerSink {
    type Frame = AudioFrame;
    type Error = AudioError;

    #[instrument(name = "speaker_start", skip(self), fields(sink = %self.name))]
    fn start(&self) -> AudioResult<()> {
        let queue = Arc::clone(&self.queue);
        let name = self.name.clone();
        let requested = self.format;

        let started = self.worker.start(
            |device: &mut Box<dyn AudioOutput>| {
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
                Ok(())
            },
            move |device: &mut Box<dyn AudioOutput>, running: &AtomicBool| {
                playback_loop(&name, device.as_mut(), running, &queue, requested);
            },
        )?;

        if started {
            info!(sink = %self.name, "Speaker started");
        }
        Ok(())
    }

    #[instrument(name = "speaker_stop", skip(self), fields(sink = %self.name))]
    fn stop(&self) {
        if self.worker.stop() {
            info!(sink = %self.name, "Speaker stopped");
        }
    }

    fn push_frame(&self, frame: &AudioFrame) -> AudioResult<()> {
        if frame.channels != self.format.channels || frame.sample_rate != self.format.sample_rate {
            return Err(AudioError::FormatNotSupported(format!(
                "{} Hz x{} frame pushed to {} Hz x{} speaker",
                frame.sample_rate, frame.channels, self.format.sample_rate, self.format.channels
            )));
        }

        let dropped = self.queue.push(&frame.data);
        if dropped > 0 {
            trace!(sink = %self.name, dropped, "Playback backlog cleared");
        }
        Ok(())
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_active(&self) -> bool {
        self.worker.is_running()
    }
}

impl Drop for SpeakerSink {
    fn drop(&mut self) {
        self.stop();
    }
}

fn playback_loop(
    name: &str,
    device: &mut dyn AudioOutput,
    running: &AtomicBool,
    queue: &SampleQueue,
    format: StreamFormat,
) {
    let mut period = vec![0.0f32; format.samples_per_period()];

    while running.load(Ordering::SeqCst) {
        let played = queue.pop_fill(&mut period);
        if played < period.len() && played > 0 {
            trace!(sink = %name, missing = period.len() - played, "Playback underrun");
        }

        match device.write(&period) {
            Ok(()) => {}
            Err(AudioError::DeviceLost(reason)) => {
                warn!(sink = %name, %reason, "Speaker lost");
                break;
            }
            Err(e) => {
                warn!(sink = %name, "Speaker write error: {}", e);
                thread::sleep(RETRY_DELAY);
            }
        }
    }

    device.close();
    trace!(sink = %name, "Playback loop exiting");
}
