//! Stream controller state machine types.

use serde::{Deserialize, Serialize};

/// The current state of the stream controller.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum StreamState {
    /// Not streaming.
    #[default]
    Idle,

    /// Session is being set up.
    Initializing,

    /// Session is live.
    Streaming,

    /// Session failed to start or failed while live.
    Error {
        /// Error message.
        message: String,
    },

    /// Session is live but degraded; waiting for the network to recover.
    Recovering,
}

impl StreamState {
    /// Returns true if the controller is idle.
    pub fn is_idle(&self) -> bool {
        matches!(self, Self::Idle)
    }

    /// Returns true if the controller is streaming (degraded or not).
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Streaming | Self::Recovering)
    }

    /// Returns true if the controller is in an error state.
    pub fn is_error(&self) -> bool {
        matches!(self, Self::Error { .. })
    }

    /// Returns a simple string representation of the state.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Initializing => "Initializing",
            Self::Streaming => "Streaming",
            Self::Error { .. } => "Error",
            Self::Recovering => "Recovering",
        }
    }
}

/// Network statistics reported to the stream controller.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkStats {
    /// Outgoing bitrate in kbps.
    pub bitrate_kbps: u32,

    /// Packet loss over the last reporting window, 0-100.
    pub packet_loss_percent: f32,

    /// Round trip time in milliseconds.
    pub rtt_ms: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_live_states() {
        assert!(StreamState::Streaming.is_live());
        assert!(StreamState::Recovering.is_live());
        assert!(!StreamState::Initializing.is_live());
        assert!(!StreamState::Idle.is_live());
    }

    #[test]
    fn test_state_names() {
        assert_eq!(StreamState::default().name(), "Idle");
        let error = StreamState::Error {
            message: "boom".to_string(),
        };
        assert!(error.is_error());
        assert_eq!(error.name(), "Error");
    }
}
