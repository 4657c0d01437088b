//! Replay Capture - session glue around the delay buffer
//!
//! Wires a frame source to the `Delayer`, keeps one `Compositer` per
//! capture screen, and runs the recording consumer that writes delayed
//! frames to a sink.

pub mod generator;
pub mod preferences;
pub mod recorder;
pub mod session;

pub use generator::{frame_number, FrameGenerator};
pub use preferences::{CapturePreferences, RecordingMode};
pub use recorder::{FrameSink, MemorySink, RawFileSink, RecordingConsumer, RecordingSettings};
pub use session::CaptureSession;
