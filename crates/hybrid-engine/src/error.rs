//! Error types for the engine module.

use hybrid_audio::AudioError;
use hybrid_capture::CaptureError;
use thiserror::Error;

/// Errors that can occur in the engine.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A video source failed.
    #[error(transparent)]
    Capture(#[from] CaptureError),

    /// An audio source failed.
    #[error(transparent)]
    Audio(#[from] AudioError),

    /// `start_streaming` was called while a session is active.
    #[error("Already streaming to {0}")]
    AlreadyStreaming(String),

    /// The ingest URL was rejected.
    #[error("Invalid stream URL: {0}")]
    InvalidUrl(String),
}
