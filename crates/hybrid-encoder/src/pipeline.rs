//! Encoder worker fed through a bounded submit queue.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use tracing::{debug, info, instrument, trace, warn};

use hybrid_capture::SourceWorker;
use hybrid_ipc::EncoderSettings;

use crate::error::EncoderError;
use crate::passthrough::PassthroughEncoder;
use crate::{EncodedPacket, EncoderResult, FrameData, FrameEncoder, ENCODED_CHANNEL_CAPACITY};

/// How long the worker waits for a frame before re-checking the running flag.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Counters shared with the worker thread.
#[derive(Debug, Default)]
struct PipelineStats {
    encoded: AtomicU64,
    failed: AtomicU64,
    dropped_packets: AtomicU64,
}

/// Queues raw frames for a [`FrameEncoder`] running on its own thread.
///
/// [`submit_frame`](Self::submit_frame) never blocks: when `queue_depth`
/// frames are already waiting it fails with [`EncoderError::Overload`].
/// Encoded packets are published on a bounded channel; packets nobody
/// collects in time are dropped.
pub struct EncoderPipeline {
    settings: EncoderSettings,
    worker: SourceWorker<Box<dyn FrameEncoder>>,
    sender: Mutex<Option<Sender<FrameData>>>,
    packets_tx: Sender<EncodedPacket>,
    packets_rx: Receiver<EncodedPacket>,
    stats: Arc<PipelineStats>,
}

impl EncoderPipeline {
    /// Create a stopped pipeline using the passthrough encoder.
    pub fn new(settings: EncoderSettings) -> Self {
        let encoder = PassthroughEncoder::new(&settings);
        Self::with_encoder(settings, Box::new(encoder))
    }

    /// Create a stopped pipeline driving `encoder`.
    pub fn with_encoder(settings: EncoderSettings, encoder: Box<dyn FrameEncoder>) -> Self {
        let (packets_tx, packets_rx) = crossbeam_channel::bounded(ENCODED_CHANNEL_CAPACITY);
        Self {
            worker: SourceWorker::new(format!("encoder-{}", encoder.name()), encoder),
            settings,
            sender: Mutex::new(None),
            packets_tx,
            packets_rx,
            stats: Arc::new(PipelineStats::default()),
        }
    }

    /// Start the worker thread.
    #[instrument(name = "encoder_start", skip(self))]
    pub fn start(&self) -> EncoderResult<()> {
        let mut sender = self.sender.lock();
        if self.worker.is_running() {
            return Err(EncoderError::AlreadyRunning);
        }

        let (frames_tx, frames_rx) = crossbeam_channel::bounded(self.settings.queue_depth.max(1));
        let packets = self.packets_tx.clone();
        let stats = Arc::clone(&self.stats);

        let started = self.worker.start(
            |_: &mut Box<dyn FrameEncoder>| Ok::<(), EncoderError>(()),
            move |encoder: &mut Box<dyn FrameEncoder>, running: &AtomicBool| {
                encode_loop(encoder.as_mut(), running, &frames_rx, &packets, &stats);
            },
        )?;
        if !started {
            return Err(EncoderError::AlreadyRunning);
        }

        *sender = Some(frames_tx);
        info!(
            width = self.settings.width,
            height = self.settings.height,
            fps = self.settings.fps,
            bitrate = self.settings.bitrate,
            "Encoder pipeline started"
        );
        Ok(())
    }

    /// Stop the worker, encoding whatever is still queued first.
    ///
    /// Safe to call repeatedly or before `start`.
    #[instrument(name = "encoder_stop", skip(self))]
    pub fn stop(&self) {
        let mut sender = self.sender.lock();
        if self.worker.stop() {
            info!(encoded = self.encoded_frames(), "Encoder pipeline stopped");
        }
        *sender = None;
    }

    /// Queue a frame for encoding.
    pub fn submit_frame(&self, frame: FrameData) -> EncoderResult<()> {
        let sender = self.sender.lock();
        let sender = match sender.as_ref() {
            Some(sender) if self.worker.is_running() => sender,
            _ => return Err(EncoderError::NotRunning),
        };

        match sender.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(EncoderError::Overload(self.settings.queue_depth)),
            Err(TrySendError::Disconnected(_)) => Err(EncoderError::ChannelDisconnected),
        }
    }

    /// True while the worker thread is running.
    pub fn is_running(&self) -> bool {
        self.worker.is_running()
    }

    /// Frames encoded since creation.
    pub fn encoded_frames(&self) -> u64 {
        self.stats.encoded.load(Ordering::Relaxed)
    }

    /// Frames the encoder rejected.
    pub fn failed_frames(&self) -> u64 {
        self.stats.failed.load(Ordering::Relaxed)
    }

    /// Packets dropped because nobody collected them.
    pub fn dropped_packets(&self) -> u64 {
        self.stats.dropped_packets.load(Ordering::Relaxed)
    }

    /// Receiver for encoded packets.
    pub fn packets(&self) -> Receiver<EncodedPacket> {
        self.packets_rx.clone()
    }

    /// The settings this pipeline was created with.
    pub fn settings(&self) -> &EncoderSettings {
        &self.settings
    }
}

impl Drop for EncoderPipeline {
    fn drop(&mut self) {
        self.stop();
    }
}

fn encode_loop(
    encoder: &mut dyn FrameEncoder,
    running: &AtomicBool,
    frames: &Receiver<FrameData>,
    packets: &Sender<EncodedPacket>,
    stats: &PipelineStats,
) {
    debug!(encoder = encoder.name(), "Encoder thread started");

    while running.load(Ordering::SeqCst) {
        match frames.recv_timeout(POLL_INTERVAL) {
            Ok(frame) => encode_one(encoder, &frame, packets, stats),
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    for frame in frames.try_iter() {
        encode_one(encoder, &frame, packets, stats);
    }
    match encoder.flush() {
        Ok(rest) => rest.into_iter().for_each(|p| publish(packets, p, stats)),
        Err(e) => warn!(encoder = encoder.name(), "Flush failed: {}", e),
    }

    debug!(encoder = encoder.name(), "Encoder thread exiting");
}

fn encode_one(
    encoder: &mut dyn FrameEncoder,
    frame: &FrameData,
    packets: &Sender<EncodedPacket>,
    stats: &PipelineStats,
) {
    match encoder.encode(frame) {
        Ok(packet) => {
            stats.encoded.fetch_add(1, Ordering::Relaxed);
            if let Some(packet) = packet {
                publish(packets, packet, stats);
            }
        }
        Err(e) => {
            stats.failed.fetch_add(1, Ordering::Relaxed);
            warn!(encoder = encoder.name(), timestamp_us = frame.timestamp_us, "Encode failed: {}", e);
        }
    }
}

fn publish(packets: &Sender<EncodedPacket>, packet: EncodedPacket, stats: &PipelineStats) {
    match packets.try_send(packet) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => {
            stats.dropped_packets.fetch_add(1, Ordering::Relaxed);
            trace!("Encoded packet channel full, dropping packet");
        }
        Err(TrySendError::Disconnected(_)) => {}
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use bytes::Bytes;

    use super::*;

    fn settings(queue_depth: usize) -> EncoderSettings {
        EncoderSettings {
            width: 4,
            height: 4,
            queue_depth,
            ..EncoderSettings::default()
        }
    }

    fn frame(timestamp_us: u64) -> FrameData {
        FrameData {
            data: Bytes::from(vec![0u8; 64]),
            width: 4,
            height: 4,
            timestamp_us,
        }
    }

    /// Encoder that blocks until the test releases it.
    struct GatedEncoder {
        gate: Receiver<()>,
    }

    impl FrameEncoder for GatedEncoder {
        fn encode(&mut self, frame: &FrameData) -> EncoderResult<Option<EncodedPacket>> {
            let _ = self.gate.recv_timeout(Duration::from_secs(2));
            Ok(Some(EncodedPacket {
                data: frame.data.clone(),
                timestamp_us: frame.timestamp_us,
                sequence: 0,
            }))
        }

        fn flush(&mut self) -> EncoderResult<Vec<EncodedPacket>> {
            Ok(Vec::new())
        }

        fn name(&self) -> &'static str {
            "gated"
        }
    }

    #[test]
    fn test_submit_requires_running() {
        let pipeline = EncoderPipeline::new(settings(4));
        assert!(matches!(
            pipeline.submit_frame(frame(0)),
            Err(EncoderError::NotRunning)
        ));
    }

    #[test]
    fn test_start_stop() {
        let pipeline = EncoderPipeline::new(settings(4));
        pipeline.start().unwrap();
        assert!(matches!(pipeline.start(), Err(EncoderError::AlreadyRunning)));

        pipeline.stop();
        pipeline.stop();
        assert!(!pipeline.is_running());

        pipeline.start().unwrap();
        pipeline.stop();
    }

    #[test]
    fn test_frames_are_encoded() {
        let pipeline = EncoderPipeline::new(settings(8));
        let packets = pipeline.packets();
        pipeline.start().unwrap();

        for ts in 0..3 {
            pipeline.submit_frame(frame(ts)).unwrap();
        }

        let deadline = Instant::now() + Duration::from_secs(2);
        while pipeline.encoded_frames() < 3 && Instant::now() < deadline {
            std::thread::sleep(Duration::from_millis(1));
        }
        pipeline.stop();

        assert_eq!(pipeline.encoded_frames(), 3);
        let timestamps: Vec<u64> = packets.try_iter().map(|p| p.timestamp_us).collect();
        assert_eq!(timestamps, vec![0, 1, 2]);
    }

    #[test]
    fn test_full_queue_reports_overload() {
        let (gate_tx, gate_rx) = crossbeam_channel::unbounded();
        let pipeline =
            EncoderPipeline::with_encoder(settings(1), Box::new(GatedEncoder { gate: gate_rx }));
        pipeline.start().unwrap();

        // First frame is taken by the worker and blocks; second fills the queue.
        pipeline.submit_frame(frame(0)).unwrap();
        let deadline = Instant::now() + Duration::from_secs(2);
        let mut overloaded = false;
        for ts in 1..100 {
            if let Err(EncoderError::Overload(depth)) = pipeline.submit_frame(frame(ts)) {
                assert_eq!(depth, 1);
                overloaded = true;
                break;
            }
            if Instant::now() > deadline {
                break;
            }
        }
        assert!(overloaded);

        for _ in 0..100 {
            let _ = gate_tx.send(());
        }
        pipeline.stop();
    }

    #[test]
    fn test_stop_drains_queue() {
        let (gate_tx, gate_rx) = crossbeam_channel::unbounded();
        let pipeline =
            EncoderPipeline::with_encoder(settings(4), Box::new(GatedEncoder { gate: gate_rx }));
        pipeline.start().unwrap();
        for ts in 0..3 {
            pipeline.submit_frame(frame(ts)).unwrap();
        }
        for _ in 0..3 {
            gate_tx.send(()).unwrap();
        }

        pipeline.stop();
        assert_eq!(pipeline.encoded_frames(), 3);
    }

    #[test]
    fn test_invalid_frames_are_counted() {
        let pipeline = EncoderPipeline::new(settings(4));
        pipeline.start().unwrap();
        pipeline
            .submit_frame(FrameData {
                width: 2,
                ..frame(0)
            })
            .unwrap();
        pipeline.stop();

        assert_eq!(pipeline.failed_frames(), 1);
        assert_eq!(pipeline.encoded_frames(), 0);
    }
}
