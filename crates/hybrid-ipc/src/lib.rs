//! Shared configuration, state and event types for the hybrid media engine.
//!
//! This crate defines the plain data passed between the capture core, the
//! stream controller and whatever drives them (the demo binary, a UI).

mod error;
mod events;
mod state;
mod types;

pub use error::ConfigError;
pub use events::EngineEvent;
pub use state::{NetworkStats, StreamState};
pub use types::{AudioConfig, EncoderSettings, MediaConfig, SourceKind, VideoConfig};

use crossbeam_channel::{Receiver, Sender};

/// Channel capacity for events (engine → observer).
pub const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Result type for configuration operations.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Creates a bounded event channel.
pub fn event_channel() -> (Sender<EngineEvent>, Receiver<EngineEvent>) {
    crossbeam_channel::bounded(EVENT_CHANNEL_CAPACITY)
}
