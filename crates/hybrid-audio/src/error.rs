//! Error types for the audio module.

use hybrid_capture::WorkerError;
use thiserror::Error;

/// Errors that can occur during audio operations.
#[derive(Debug, Error)]
pub enum AudioError {
    /// The device could not be opened.
    #[error("Audio device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Audio format not supported.
    #[error("Audio format not supported: {0}")]
    FormatNotSupported(String),

    /// Device lost during capture or playback.
    #[error("Audio device lost: {0}")]
    DeviceLost(String),

    /// Mixer inputs do not match the mixer's shape.
    #[error("Mixer error: {0}")]
    Mixer(String),

    /// The producer thread could not be spawned.
    #[error("Failed to spawn audio thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl From<WorkerError> for AudioError {
    fn from(err: WorkerError) -> Self {
        match err {
            WorkerError::DeviceLost(name) => Self::DeviceLost(name),
            WorkerError::Spawn(e) => Self::Spawn(e),
        }
    }
}
