//! Events published by the engine.

use serde::{Deserialize, Serialize};

use crate::state::StreamState;
use crate::types::SourceKind;

/// Events that the engine can send to an observer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EngineEvent {
    /// Stream controller state has changed.
    StateChanged {
        /// Previous state.
        previous: StreamState,

        /// Current state.
        current: StreamState,
    },

    /// A source was registered under `name`.
    SourceAdded { name: String, kind: SourceKind },

    /// A source was stopped and removed from the registry.
    SourceRemoved { name: String },

    /// A registered source was replaced by another one with the same name.
    SourceReplaced { name: String },

    /// Error occurred.
    Error {
        /// Whether the error is recoverable.
        recoverable: bool,

        /// Error message.
        message: String,
    },
}
