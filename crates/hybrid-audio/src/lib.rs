//! Audio side of the capture core: the microphone source, the speaker sink,
//! the bounded sample queue between them and their devices, and the gain
//! mixer.

mod device;
mod error;
mod frame;
mod microphone;
mod mixer;
mod queue;
mod sink;
mod speaker;

pub use device::{AudioInput, AudioOutput, NullOutput, StreamFormat, ToneInput};
pub use error::AudioError;
pub use frame::AudioFrame;
pub use microphone::MicrophoneSource;
pub use mixer::AudioMixer;
pub use queue::{OverflowPolicy, SampleQueue};
pub use sink::Sink;
pub use speaker::SpeakerSink;

/// Result type for audio operations.
pub type AudioResult<T> = Result<T, AudioError>;
