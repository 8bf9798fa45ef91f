//! Error types for the capture module.

use thiserror::Error;

/// Errors that can occur during capture operations.
#[derive(Debug, Error)]
pub enum CaptureError {
    /// The device could not be opened or refused the requested format.
    #[error("Capture device unavailable: {0}")]
    DeviceUnavailable(String),

    /// Device lost during capture.
    #[error("Capture device lost: {0}")]
    DeviceLost(String),

    /// Frame conversion error.
    #[error("Frame conversion error: {0}")]
    FrameConversion(String),

    /// Capture not supported on this system.
    #[error("Capture not supported: {0}")]
    NotSupported(String),

    /// The producer thread could not be spawned.
    #[error("Failed to spawn producer thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Errors reported by the [`SourceWorker`](crate::SourceWorker) itself.
#[derive(Debug, Error)]
pub enum WorkerError {
    /// The producer thread panicked and took its device with it.
    #[error("Producer for {0} panicked; device lost")]
    DeviceLost(String),

    /// The producer thread could not be spawned.
    #[error("Failed to spawn producer thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl From<WorkerError> for CaptureError {
    fn from(err: WorkerError) -> Self {
        match err {
            WorkerError::DeviceLost(name) => Self::DeviceLost(name),
            WorkerError::Spawn(e) => Self::Spawn(e),
        }
    }
}

/// Errors that can occur during block pool operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PoolError {
    /// Every block is currently allocated.
    #[error("Block pool exhausted: all {0} blocks in use")]
    Exhausted(usize),

    /// The pointer does not belong to this pool's region.
    #[error("Pointer {0:#x} is outside the pool region")]
    ForeignPointer(usize),

    /// The pool cannot be built with the requested layout.
    #[error("Invalid pool layout: {0}")]
    InvalidLayout(String),
}
