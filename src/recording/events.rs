use std::fmt;
use std::path::PathBuf;
use uuid::Uuid;

/// Phase of the recorder's polling loop
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum RecorderState {
    #[default]
    Disconnected,
    WaitingForProcess,
    WaitingForRecorderPointer,
    WaitingForSession,
    Recording,
    Flushing,
}

impl fmt::Display for RecorderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::WaitingForProcess => "waiting for process",
            Self::WaitingForRecorderPointer => "waiting for recorder pointer",
            Self::WaitingForSession => "waiting for session",
            Self::Recording => "recording",
            Self::Flushing => "flushing",
        };
        f.write_str(name)
    }
}

/// Notification emitted by the recorder
///
/// `Display` renders the console status line shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub enum RecorderEvent {
    StateChanged {
        from: RecorderState,
        to: RecorderState,
    },
    Connecting,
    Hooked {
        game_id: String,
    },
    SearchingPointer {
        address: u32,
    },
    WaitingForSession,
    RecordingStarted {
        session_id: Uuid,
        object_name: String,
        context: String,
    },
    RecordingStopped {
        frames: usize,
    },
    Dumped {
        frames: usize,
        path: PathBuf,
    },
    SessionAborted {
        reason: String,
    },
    FlushFailed {
        reason: String,
    },
    ConnectionLost,
}

impl fmt::Display for RecorderEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StateChanged { from, to } => write!(f, "State changed: {} -> {}", from, to),
            Self::Connecting => write!(f, "Connecting to Dolphin..."),
            Self::Hooked { game_id } => write!(f, "Hooked to Dolphin, game ID: {}", game_id),
            Self::SearchingPointer { address } => {
                write!(f, "Searching for GstRecorderInfo* at 0x{:08X}...", address)
            }
            Self::WaitingForSession => write!(f, "Waiting for recording to start..."),
            Self::RecordingStarted {
                object_name,
                context,
                ..
            } => write!(f, "Started recording {} in {}", object_name, context),
            Self::RecordingStopped { frames } => {
                write!(f, "Stopped recording after {} frames", frames)
            }
            Self::Dumped { frames, path } => {
                write!(f, "Dumped {} frames to {}", frames, path.display())
            }
            Self::SessionAborted { reason } => write!(f, "Recording aborted: {}", reason),
            Self::FlushFailed { reason } => write!(f, "Could not save recording: {}", reason),
            Self::ConnectionLost => write!(f, "Lost connection to Dolphin"),
        }
    }
}
