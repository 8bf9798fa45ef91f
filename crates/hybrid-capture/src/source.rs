//! The capability shared by every media source.

/// A live media source polled by the application.
///
/// Implementations run their own producer thread and are shared across
/// threads, so every method takes `&self`.
pub trait Source: Send + Sync {
    /// Frame type delivered by [`get_frame`](Self::get_frame).
    type Frame;

    /// Error reported when the source cannot start.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Start producing frames.
    ///
    /// Idempotent. On failure no producer thread is left running and the
    /// call can be retried.
    fn start(&self) -> Result<(), Self::Error>;

    /// Stop producing frames and release the device.
    ///
    /// Blocks until the producer thread has exited. Idempotent, and safe to
    /// call without a prior [`start`](Self::start).
    fn stop(&self);

    /// Move the newest available data into `out`.
    ///
    /// Never blocks. Returns false, leaving `out` untouched, if nothing new
    /// is available; this is the normal result while polling.
    fn get_frame(&self, out: &mut Self::Frame) -> bool;

    /// Stable name of this source, e.g. `Camera-0`.
    fn name(&self) -> &str;

    /// True while the producer thread is running.
    fn is_active(&self) -> bool;
}
