//! Error types for the encoder module.

use hybrid_capture::WorkerError;
use thiserror::Error;

/// Errors that can occur during encoding operations.
#[derive(Debug, Error)]
pub enum EncoderError {
    /// Frames were submitted while the pipeline was stopped.
    #[error("Encoder not running")]
    NotRunning,

    /// `start` was called on a running pipeline.
    #[error("Encoder already running")]
    AlreadyRunning,

    /// The submit queue is full.
    #[error("Encoder overload: queue depth {0}")]
    Overload(usize),

    /// Invalid input data.
    #[error("Invalid input data: {0}")]
    InvalidInput(String),

    /// General encoding error.
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// The worker hung up its end of the submit queue.
    #[error("Encoder channel disconnected")]
    ChannelDisconnected,

    /// The worker thread could not be spawned.
    #[error("Failed to spawn encoder thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl From<WorkerError> for EncoderError {
    fn from(err: WorkerError) -> Self {
        match err {
            WorkerError::DeviceLost(name) => Self::Encoding(format!("{name} worker panicked")),
            WorkerError::Spawn(e) => Self::Spawn(e),
        }
    }
}
