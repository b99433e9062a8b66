pub mod cli;
pub mod config;
pub mod error;
pub mod gst;
pub mod memory;
pub mod recording;

pub use config::Config;
pub use error::RecorderError;
pub use gst::{ByteOrder, FrameSample, GhostType, GstHeader, RecorderInfo, RecorderMode};
pub use memory::{DolphinProcess, FakeMemory, MemoryAccessor, MemoryError};
pub use recording::{Recorder, RecorderConfig, RecorderEvent, RecorderState, RecordingSession};
