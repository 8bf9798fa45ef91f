//! Source registry and stream controller for the hybrid media engine.
//!
//! The registry owns every live source behind a shared handle and
//! guarantees a removed source is stopped. The controller tracks the
//! network session the captured media is streamed to.

mod controller;
mod error;
mod registry;
mod source;

pub use controller::StreamController;
pub use error::EngineError;
pub use registry::SourceRegistry;
pub use source::MediaSource;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;
