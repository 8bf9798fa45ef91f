//! Network session state machine.

use crossbeam_channel::Sender;
use parking_lot::RwLock;
use tracing::{debug, info, instrument, warn};
use url::Url;

use hybrid_ipc::{EngineEvent, NetworkStats, StreamState};

use crate::error::EngineError;
use crate::EngineResult;

/// URL schemes accepted as ingest endpoints.
const SUPPORTED_SCHEMES: [&str; 4] = ["rtmp", "rtmps", "webrtc", "https"];

/// Packet loss above which a live session is considered degraded.
const DEGRADED_LOSS_PERCENT: f32 = 5.0;

/// Packet loss at or below which a degraded session is healthy again.
const RECOVERED_LOSS_PERCENT: f32 = 1.0;

/// Owns the streaming session state: Idle, Initializing, Streaming, Error
/// and Recovering.
///
/// Every transition is logged and, when an event channel is attached,
/// published as [`EngineEvent::StateChanged`].
#[derive(Debug, Default)]
pub struct StreamController {
    state: RwLock<StreamState>,
    url: RwLock<Option<String>>,
    stats: RwLock<NetworkStats>,
    event_tx: Option<Sender<EngineEvent>>,
}

impl StreamController {
    /// Create an idle controller.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an idle controller that reports transitions on `event_tx`.
    pub fn with_events(event_tx: Sender<EngineEvent>) -> Self {
        Self {
            state: RwLock::new(StreamState::Idle),
            url: RwLock::new(None),
            stats: RwLock::new(NetworkStats::default()),
            event_tx: Some(event_tx),
        }
    }

    /// Begin a session to `url`.
    ///
    /// Fails without changing state if a session is already live. An
    /// unusable URL moves the controller to Error.
    #[instrument(name = "start_streaming", skip(self))]
    pub fn start_streaming(&self, url: &str) -> EngineResult<()> {
        {
            let state = self.state.read();
            if state.is_live() || matches!(*state, StreamState::Initializing) {
                debug!("Already streaming, ignoring start");
                let current = self.url.read().clone().unwrap_or_default();
                return Err(EngineError::AlreadyStreaming(current));
            }
        }

        self.transition_to(StreamState::Initializing);

        if let Err(e) = validate_url(url) {
            warn!("Stream start failed: {}", e);
            self.transition_to(StreamState::Error {
                message: e.to_string(),
            });
            return Err(e);
        }

        *self.url.write() = Some(url.to_string());
        *self.stats.write() = NetworkStats::default();
        self.transition_to(StreamState::Streaming);
        info!("Streaming started");
        Ok(())
    }

    /// End the session. Safe to call in any state.
    #[instrument(name = "stop_streaming", skip(self))]
    pub fn stop_streaming(&self) {
        if self.state.read().is_idle() {
            return;
        }

        self.url.write().take();
        self.transition_to(StreamState::Idle);
        info!("Streaming stopped");
    }

    /// Feed the latest network statistics.
    ///
    /// A live session whose packet loss exceeds 5% enters Recovering and
    /// returns to Streaming once loss drops to 1% or less.
    pub fn update_network_stats(&self, stats: NetworkStats) {
        *self.stats.write() = stats;

        let loss = stats.packet_loss_percent;
        let next = match *self.state.read() {
            StreamState::Streaming if loss > DEGRADED_LOSS_PERCENT => Some(StreamState::Recovering),
            StreamState::Recovering if loss <= RECOVERED_LOSS_PERCENT => {
                Some(StreamState::Streaming)
            }
            _ => None,
        };

        if let Some(next) = next {
            debug!(
                loss,
                bitrate_kbps = stats.bitrate_kbps,
                rtt_ms = stats.rtt_ms,
                "Network conditions changed"
            );
            self.transition_to(next);
        }
    }

    /// Current state.
    pub fn state(&self) -> StreamState {
        self.state.read().clone()
    }

    /// Ingest URL of the current session.
    pub fn url(&self) -> Option<String> {
        self.url.read().clone()
    }

    /// Statistics last passed to [`update_network_stats`](Self::update_network_stats).
    pub fn network_stats(&self) -> NetworkStats {
        *self.stats.read()
    }

    fn transition_to(&self, new_state: StreamState) {
        let previous = {
            let mut state = self.state.write();
            std::mem::replace(&mut *state, new_state.clone())
        };

        debug!(
            previous = %previous.name(),
            current = %new_state.name(),
            "State transition"
        );

        if let Some(tx) = &self.event_tx {
            let event = EngineEvent::StateChanged {
                previous,
                current: new_state,
            };
            if let Err(e) = tx.try_send(event) {
                warn!("Failed to send event: {}", e);
            }
        }
    }
}

impl Drop for StreamController {
    fn drop(&mut self) {
        self.stop_streaming();
    }
}

fn validate_url(url: &str) -> EngineResult<()> {
    let parsed = Url::parse(url).map_err(|e| EngineError::InvalidUrl(format!("{url}: {e}")))?;

    if !SUPPORTED_SCHEMES.contains(&parsed.scheme()) {
        return Err(EngineError::InvalidUrl(format!(
            "unsupported scheme {}",
            parsed.scheme()
        )));
    }
    if parsed.host_str().map_or(true, str::is_empty) {
        return Err(EngineError::InvalidUrl("Missing host".to_string()));
    }

    Ok(())
}
