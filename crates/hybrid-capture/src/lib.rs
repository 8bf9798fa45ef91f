//! Video capture sources, the frame exchange they publish into, and the
//! fixed block pool used on real-time paths.
//!
//! Every source runs one producer thread ([`SourceWorker`]) that writes into
//! a newest-wins [`LatestFrame`] cell; callers poll it through the
//! [`Source`] trait without ever blocking.

mod camera;
mod capture;
mod device;
mod error;
mod exchange;
mod frame;
mod pool;
mod screen;
mod source;
mod worker;

pub use camera::{parse_camera_index, CameraSource};
pub use capture::VideoCapture;
pub use device::{ScreenGenerator, TestPatternCamera, VideoDevice};
pub use error::{CaptureError, PoolError, WorkerError};
pub use exchange::LatestFrame;
pub use frame::{MediaClock, PixelFormat, VideoFrame};
pub use pool::{BlockPool, PoolResult};
pub use screen::ScreenSource;
pub use source::Source;
pub use worker::{FramePacer, SourceWorker};

/// Result type for capture operations.
pub type CaptureResult<T> = Result<T, CaptureError>;
