pub mod codec;
pub mod info;
pub mod sample;

pub use codec::{
    encode, next_output_path, write_gst_file, ByteOrder, CodecError, GstHeader, OutputTarget,
    HEADER_SIZE, RECORD_SIZE,
};
pub use info::{
    GhostData, GhostType, RecorderInfo, RecorderMode, Vec3f, DEFAULT_RECORDER_INFO_PTR,
    SUPPORTED_GAME_IDS, UNINITIALIZED_GAME_ID,
};
pub use sample::{FrameSample, PacketFlags};
