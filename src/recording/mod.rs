//! GST recording state machine
//!
//! This module provides the `Recorder` polling loop that:
//! - Attaches to the emulator and validates the game
//! - Locates the game's `GstRecorderInfo`
//! - Buffers one sample per game frame while a recording runs
//! - Writes each finished recording to a GST file

mod config;
mod events;
mod recorder;
mod session;

pub use config::RecorderConfig;
pub use events::{RecorderEvent, RecorderState};
pub use recorder::Recorder;
pub use session::RecordingSession;
