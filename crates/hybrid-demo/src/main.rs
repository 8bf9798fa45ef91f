//! Command-line driver for the hybrid media engine.
//!
//! Usage: `hybrid-demo [config.json] [stream-url]`
//!
//! Registers a screen, a camera and a microphone, polls them for a few
//! seconds, mixes the microphone into a speaker, feeds screen frames into
//! the encoder pipeline and drives the stream controller alongside.

use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use hybrid_audio::{AudioFrame, AudioMixer, MicrophoneSource, Sink, SpeakerSink};
use hybrid_capture::{BlockPool, CameraSource, ScreenSource, VideoFrame};
use hybrid_encoder::{EncoderError, EncoderPipeline, FrameData};
use hybrid_engine::{SourceRegistry, StreamController};
use hybrid_ipc::{event_channel, EngineEvent, MediaConfig, NetworkStats};

const RUN_TIME: Duration = Duration::from_secs(3);
const POLL_INTERVAL: Duration = Duration::from_millis(5);
const DEFAULT_URL: &str = "rtmp://localhost/live/demo";

fn init_logging() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn main() -> Result<()> {
    init_logging();

    let mut args = std::env::args().skip(1);
    let config = match args.next() {
        Some(path) => MediaConfig::load(&path).with_context(|| format!("loading {path}"))?,
        None => MediaConfig::default(),
    };
    let url = args.next().unwrap_or_else(|| DEFAULT_URL.to_string());

    info!("Hybrid media engine demo starting");

    run_mixer_scenarios()?;
    run_block_pool(&config)?;
    run_capture(&config, &url)?;

    info!("Demo finished");
    Ok(())
}

/// The two reference mixes: unity gains, then channel 1 muted.
fn run_mixer_scenarios() -> Result<()> {
    let mixer = AudioMixer::new(2);
    let a = vec![0.5f32; 16];
    let b = vec![0.3f32; 16];
    let mut out = vec![0.0f32; 16];

    mixer.mix(&[Some(a.as_slice()), Some(b.as_slice())], &mut out, 16)?;
    info!(sample = out[0], gains = ?mixer.gains(), "Mix with unity gains");

    mixer.set_channel_gain(1, 0.0);
    mixer.mix(&[Some(a.as_slice()), Some(b.as_slice())], &mut out, 16)?;
    info!(sample = out[0], gains = ?mixer.gains(), "Mix with channel 1 muted");
    Ok(())
}

/// Carve one period of audio per block and run the pool dry.
fn run_block_pool(config: &MediaConfig) -> Result<()> {
    let block_size = config.audio.samples_per_period() * std::mem::size_of::<f32>();
    let pool = BlockPool::new(block_size, 8)?;

    let mut blocks = Vec::new();
    let exhausted = loop {
        match pool.allocate() {
            Ok(block) => blocks.push(block),
            Err(e) => break e,
        }
    };
    info!(allocated = blocks.len(), block_size, "Block pool drained: {}", exhausted);

    for block in blocks {
        pool.deallocate(block)?;
    }
    info!(available = pool.available_blocks(), "Block pool refilled");
    Ok(())
}

fn run_capture(config: &MediaConfig, url: &str) -> Result<()> {
    let (event_tx, event_rx) = event_channel();
    let registry = SourceRegistry::with_events(event_tx.clone());
    let controller = StreamController::with_events(event_tx);

    registry.add_source(Arc::new(ScreenSource::new(0, &config.video).into()));
    registry.add_source(Arc::new(CameraSource::new("0", &config.video).into()));
    registry.add_source(Arc::new(
        MicrophoneSource::new("default", &config.audio).into(),
    ));

    for name in registry.source_names() {
        if let Some(source) = registry.get_source(&name) {
            if let Err(e) = source.start() {
                warn!(source = %name, "Failed to start source: {}", e);
            }
        }
    }

    let speaker = SpeakerSink::new("default", &config.audio);
    speaker.start()?;

    let pipeline = EncoderPipeline::new(config.encoder.clone());
    pipeline.start()?;

    if let Err(e) = controller.start_streaming(url) {
        warn!("Stream controller refused {}: {}", url, e);
    }

    let screen = registry.get_source("Screen-0");
    let camera = registry.get_source("Camera-0");
    let mic = registry.get_source("Mic-default");

    let mixer = AudioMixer::new(1);
    let mut video = VideoFrame::default();
    let mut captured = AudioFrame::new(
        config.audio.channels,
        config.audio.sample_rate,
        config.audio.samples_per_frame,
    );
    let mut mixed = captured.clone();

    let mut screen_frames = 0u64;
    let mut camera_frames = 0u64;
    let mut audio_frames = 0u64;
    let mut overloads = 0u64;

    let started = Instant::now();
    let mut next_stats = started + Duration::from_secs(1);
    while started.elapsed() < RUN_TIME {
        if let Some(screen) = &screen {
            if screen.get_video_frame(&mut video) {
                screen_frames += 1;
                let submitted = pipeline.submit_frame(FrameData {
                    data: video.data.clone(),
                    width: video.width,
                    height: video.height,
                    timestamp_us: video.timestamp_us,
                });
                match submitted {
                    Ok(()) => {}
                    Err(EncoderError::Overload(_)) => overloads += 1,
                    Err(e) => warn!("Submit failed: {}", e),
                }
            }
        }

        if let Some(camera) = &camera {
            if camera.get_video_frame(&mut video) {
                camera_frames += 1;
            }
        }

        if let Some(mic) = &mic {
            while mic.get_audio_frame(&mut captured) {
                audio_frames += 1;
                mixer.mix_frames(&[Some(&captured)], &mut mixed)?;
                speaker.push_frame(&mixed)?;
            }
        }

        if Instant::now() >= next_stats {
            let elapsed = started.elapsed().as_secs_f32();
            let loss = if elapsed < 2.0 { 0.0 } else { 8.0 };
            controller.update_network_stats(NetworkStats {
                bitrate_kbps: config.encoder.bitrate / 1000,
                packet_loss_percent: loss,
                rtt_ms: 30,
            });
            next_stats += Duration::from_secs(1);
        }

        thread::sleep(POLL_INTERVAL);
    }

    info!(
        screen_frames,
        camera_frames,
        audio_frames,
        overloads,
        encoded = pipeline.encoded_frames(),
        state = controller.state().name(),
        "Capture run complete"
    );

    controller.stop_streaming();
    pipeline.stop();
    speaker.stop();
    registry.remove_all();

    for event in event_rx.try_iter() {
        match event {
            EngineEvent::StateChanged { previous, current } => {
                info!(previous = previous.name(), current = current.name(), "Event: state changed")
            }
            other => info!(?other, "Event"),
        }
    }

    Ok(())
}
