use thiserror::Error;

use crate::gst::CodecError;
use crate::memory::MemoryError;

/// Errors surfaced by the recording state machine
#[derive(Debug, Error)]
pub enum RecorderError {
    /// The emulator process detached or its memory went away
    #[error("Connection to Dolphin lost")]
    ConnectionLost,

    /// Frame counter skipped or went backwards during a session
    #[error("Frame counter out of sync: expected frame {expected}, read {actual}")]
    Sync { expected: u32, actual: u32 },

    /// Writing the recording to disk failed
    #[error("Failed to write recording: {0}")]
    Io(#[from] CodecError),

    /// The emulated game is not one we know the memory layout of
    #[error("Unsupported game ID {game_id:?}")]
    UnsupportedGame { game_id: String },

    #[error(transparent)]
    Memory(MemoryError),
}

impl From<MemoryError> for RecorderError {
    fn from(e: MemoryError) -> Self {
        match e {
            MemoryError::ConnectionLost => Self::ConnectionLost,
            other => Self::Memory(other),
        }
    }
}

impl RecorderError {
    /// Fatal errors end the polling loop; everything else is retried
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::UnsupportedGame { .. })
    }
}

pub type Result<T> = std::result::Result<T, RecorderError>;
