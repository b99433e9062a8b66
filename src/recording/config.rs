use std::path::PathBuf;
use std::time::Duration;

use crate::gst::{ByteOrder, DEFAULT_RECORDER_INFO_PTR};

/// Configuration for the recorder's polling loop
#[derive(Debug, Clone)]
pub struct RecorderConfig {
    /// Folder the `<stage>/<object><NN>.gst` files are written to
    pub output_dir: PathBuf,

    /// Address holding the `GstRecorderInfo*`
    pub recorder_info_ptr: u32,

    /// Tick while attached. Must stay well below one game frame (~16.7ms)
    /// or frames get skipped and the session is aborted.
    pub poll_interval: Duration,

    /// Tick while looking for the emulator process
    pub connect_interval: Duration,

    /// Playback rate written to the file header (frames per second)
    pub playback_rate: u16,

    pub byte_order: ByteOrder,
}

impl RecorderConfig {
    pub fn new(output_dir: PathBuf) -> Self {
        Self {
            output_dir,
            recorder_info_ptr: DEFAULT_RECORDER_INFO_PTR,
            poll_interval: Duration::from_millis(4),
            connect_interval: Duration::from_millis(1000),
            playback_rate: 60, // Game logic runs at 60 fps
            byte_order: ByteOrder::Big,
        }
    }
}
