//! Sink capability shared by playback devices.

/// A consumer of frames, the mirror image of [`hybrid_capture::Source`].
///
/// `start` and `stop` follow the same contract as on sources: start is
/// idempotent and retryable, stop is idempotent and joins the device thread.
pub trait Sink: Send + Sync {
    /// Frame type accepted by [`push_frame`](Self::push_frame).
    type Frame;

    /// Error returned by [`start`](Self::start) and [`push_frame`](Self::push_frame).
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open the device and start its consumer thread.
    fn start(&self) -> Result<(), Self::Error>;

    /// Stop the consumer thread and release the device.
    fn stop(&self);

    /// Queue a frame for playback. Never blocks on the device.
    fn push_frame(&self, frame: &Self::Frame) -> Result<(), Self::Error>;

    /// Stable sink name, available before `start`.
    fn name(&self) -> &str;

    /// True while the consumer thread is running.
    fn is_active(&self) -> bool;
}
