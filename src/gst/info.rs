//! Layout of the `GstRecorderInfo` structure the in-game recorder helper
//! exposes. These values must stay in sync with the game-side code.

use crate::memory::{MemoryError, MemoryLayout, MemoryResult};

/// Default location of the `GstRecorderInfo*` in emulated memory
pub const DEFAULT_RECORDER_INFO_PTR: u32 = 0x8000_3FF8;

/// Game IDs written at the start of MEM1
pub const UNINITIALIZED_GAME_ID: &str = "\0\0\0\0";
pub const SUPPORTED_GAME_IDS: [&str; 5] = ["SB4P", "SB4E", "SB4J", "SB4K", "SB4W"];

const OFFSET_UPDATE_FRAME: usize = 0x00;
const OFFSET_RECORDER_MODE: usize = 0x04;
const OFFSET_STAGE_NAME_PTR: usize = 0x08;
const OFFSET_GHOST_DATA_INDEX: usize = 0x0C;
const OFFSET_GHOST_DATA_TYPE: usize = 0x10;
const OFFSET_GHOST_DATA: usize = 0x14;

const GHOST_POSITION: usize = 0x00;
const GHOST_ROTATION: usize = 0x0C;
const GHOST_SCALE: usize = 0x18;
const GHOST_VELOCITY: usize = 0x24;
const GHOST_ACTION_NAME_PTR: usize = 0x30;
const GHOST_ACTION_HASH: usize = 0x34;
const GHOST_BCK_FRAME: usize = 0x38;
const GHOST_TRACK_WEIGHTS: usize = 0x3C;
const GHOST_BCK_RATE: usize = 0x4C;
const GHOST_PACKET_FLAGS: usize = 0x50;
const GHOST_DATA_SIZE: usize = 0x54;

/// Phase of the in-game recorder
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecorderMode {
    Waiting,
    Preparing,
    Recording,
    Stopped,
}

impl RecorderMode {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::Waiting),
            1 => Some(Self::Preparing),
            2 => Some(Self::Recording),
            3 => Some(Self::Stopped),
            _ => None,
        }
    }
}

/// Kind of object whose motion is being recorded
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GhostType {
    GhostAttackGhost,
    PichanRacer,
    /// Reserved by the game
    PlayerMario,
    /// Reserved by the game
    PlayerLuigi,
}

impl GhostType {
    pub fn from_raw(raw: u32) -> Option<Self> {
        match raw {
            0 => Some(Self::GhostAttackGhost),
            1 => Some(Self::PichanRacer),
            2 => Some(Self::PlayerMario),
            3 => Some(Self::PlayerLuigi),
            _ => None,
        }
    }

    pub fn raw(self) -> u16 {
        match self {
            Self::GhostAttackGhost => 0,
            Self::PichanRacer => 1,
            Self::PlayerMario => 2,
            Self::PlayerLuigi => 3,
        }
    }

    /// Base name of the output files for this object in `stage`
    pub fn object_name(self, stage: &str) -> String {
        match self {
            Self::GhostAttackGhost => "GhostAttackGhostData".to_string(),
            Self::PichanRacer => "PichanRacerRaceData".to_string(),
            Self::PlayerMario => stage.to_string(),
            Self::PlayerLuigi => format!("{}Luigi", stage),
        }
    }

    /// Width of the numeric file name suffix
    pub fn suffix_digits(self) -> usize {
        match self {
            Self::PichanRacer => 3,
            _ => 2,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Vec3f {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3f {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

/// Per-frame state of the recorded object, as the game exposes it
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GhostData {
    pub position: Vec3f,
    pub rotation: Vec3f,
    pub scale: Vec3f,
    pub velocity: Vec3f,
    pub action_name_ptr: u32,
    pub action_hash: u32,
    pub bck_frame: f32,
    pub track_weights: [f32; 4],
    pub bck_rate: f32,
    pub packet_flags: u32,
}

/// Snapshot of `GstRecorderInfo`
#[derive(Debug, Clone, PartialEq)]
pub struct RecorderInfo {
    pub update_frame: u32,
    pub mode: RecorderMode,
    pub stage_name_ptr: u32,
    pub ghost_data_index: u32,
    pub ghost_type: GhostType,
    pub ghost: GhostData,
}

fn be_u32(bytes: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        bytes[offset],
        bytes[offset + 1],
        bytes[offset + 2],
        bytes[offset + 3],
    ])
}

fn be_f32(bytes: &[u8], offset: usize) -> f32 {
    f32::from_bits(be_u32(bytes, offset))
}

fn be_vec(bytes: &[u8], offset: usize) -> Vec3f {
    Vec3f::new(
        be_f32(bytes, offset),
        be_f32(bytes, offset + 4),
        be_f32(bytes, offset + 8),
    )
}

impl MemoryLayout for RecorderInfo {
    const SIZE: usize = OFFSET_GHOST_DATA + GHOST_DATA_SIZE;

    fn decode(address: u32, bytes: &[u8]) -> MemoryResult<Self> {
        if bytes.len() != Self::SIZE {
            return Err(MemoryError::ReadError {
                address,
                reason: format!("expected {} bytes, got {}", Self::SIZE, bytes.len()),
            });
        }

        let raw_mode = be_u32(bytes, OFFSET_RECORDER_MODE);
        let mode = RecorderMode::from_raw(raw_mode).ok_or_else(|| MemoryError::ReadError {
            address,
            reason: format!("unknown recorder mode {}", raw_mode),
        })?;

        let raw_type = be_u32(bytes, OFFSET_GHOST_DATA_TYPE);
        let ghost_type = GhostType::from_raw(raw_type).ok_or_else(|| MemoryError::ReadError {
            address,
            reason: format!("unknown ghost data type {}", raw_type),
        })?;

        let g = &bytes[OFFSET_GHOST_DATA..];
        let ghost = GhostData {
            position: be_vec(g, GHOST_POSITION),
            rotation: be_vec(g, GHOST_ROTATION),
            scale: be_vec(g, GHOST_SCALE),
            velocity: be_vec(g, GHOST_VELOCITY),
            action_name_ptr: be_u32(g, GHOST_ACTION_NAME_PTR),
            action_hash: be_u32(g, GHOST_ACTION_HASH),
            bck_frame: be_f32(g, GHOST_BCK_FRAME),
            track_weights: [
                be_f32(g, GHOST_TRACK_WEIGHTS),
                be_f32(g, GHOST_TRACK_WEIGHTS + 4),
                be_f32(g, GHOST_TRACK_WEIGHTS + 8),
                be_f32(g, GHOST_TRACK_WEIGHTS + 12),
            ],
            bck_rate: be_f32(g, GHOST_BCK_RATE),
            packet_flags: be_u32(g, GHOST_PACKET_FLAGS),
        };

        Ok(Self {
            update_frame: be_u32(bytes, OFFSET_UPDATE_FRAME),
            mode,
            stage_name_ptr: be_u32(bytes, OFFSET_STAGE_NAME_PTR),
            ghost_data_index: be_u32(bytes, OFFSET_GHOST_DATA_INDEX),
            ghost_type,
            ghost,
        })
    }
}

impl RecorderInfo {
    /// Encode back into target layout. Used to stage fake memory.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = vec![0u8; Self::SIZE];
        let mut put = |offset: usize, value: u32| {
            out[offset..offset + 4].copy_from_slice(&value.to_be_bytes());
        };

        let mode = match self.mode {
            RecorderMode::Waiting => 0,
            RecorderMode::Preparing => 1,
            RecorderMode::Recording => 2,
            RecorderMode::Stopped => 3,
        };
        put(OFFSET_UPDATE_FRAME, self.update_frame);
        put(OFFSET_RECORDER_MODE, mode);
        put(OFFSET_STAGE_NAME_PTR, self.stage_name_ptr);
        put(OFFSET_GHOST_DATA_INDEX, self.ghost_data_index);
        put(OFFSET_GHOST_DATA_TYPE, self.ghost_type.raw() as u32);

        let g = &self.ghost;
        let base = OFFSET_GHOST_DATA;
        for (offset, v) in [
            (GHOST_POSITION, g.position),
            (GHOST_ROTATION, g.rotation),
            (GHOST_SCALE, g.scale),
            (GHOST_VELOCITY, g.velocity),
        ] {
            put(base + offset, v.x.to_bits());
            put(base + offset + 4, v.y.to_bits());
            put(base + offset + 8, v.z.to_bits());
        }
        put(base + GHOST_ACTION_NAME_PTR, g.action_name_ptr);
        put(base + GHOST_ACTION_HASH, g.action_hash);
        put(base + GHOST_BCK_FRAME, g.bck_frame.to_bits());
        for (i, weight) in g.track_weights.iter().enumerate() {
            put(base + GHOST_TRACK_WEIGHTS + i * 4, weight.to_bits());
        }
        put(base + GHOST_BCK_RATE, g.bck_rate.to_bits());
        put(base + GHOST_PACKET_FLAGS, g.packet_flags);

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_info() -> RecorderInfo {
        RecorderInfo {
            update_frame: 42,
            mode: RecorderMode::Recording,
            stage_name_ptr: 0x8000_5000,
            ghost_data_index: 3,
            ghost_type: GhostType::PichanRacer,
            ghost: GhostData {
                position: Vec3f::new(100.0, -250.5, 3.0),
                rotation: Vec3f::new(0.0, 90.0, -45.0),
                scale: Vec3f::new(1.0, 1.0, 1.0),
                action_name_ptr: 0x8000_5100,
                bck_frame: 12.5,
                track_weights: [1.0, 0.5, 0.0, 0.25],
                bck_rate: 1.0,
                ..GhostData::default()
            },
        }
    }

    #[test]
    fn test_layout_size_matches_game_struct() {
        assert_eq!(RecorderInfo::SIZE, 0x68);
    }

    #[test]
    fn test_decode_reads_big_endian_fields_at_fixed_offsets() {
        let info = sample_info();
        let bytes = info.to_bytes();

        assert_eq!(&bytes[0x00..0x04], &[0, 0, 0, 42]);
        assert_eq!(&bytes[0x04..0x08], &[0, 0, 0, 2]);
        assert_eq!(&bytes[0x14..0x18], &100.0f32.to_be_bytes());
        assert_eq!(&bytes[0x44..0x48], &0x8000_5100u32.to_be_bytes());

        let decoded = RecorderInfo::decode(0x8000_4000, &bytes).unwrap();
        assert_eq!(decoded, info);
    }

    #[test]
    fn test_decode_rejects_unknown_mode() {
        let mut bytes = sample_info().to_bytes();
        bytes[0x07] = 9;
        let err = RecorderInfo::decode(0x8000_4000, &bytes).unwrap_err();
        assert!(matches!(err, MemoryError::ReadError { .. }));
    }

    #[test]
    fn test_object_names() {
        assert_eq!(GhostType::GhostAttackGhost.object_name("X"), "GhostAttackGhostData");
        assert_eq!(GhostType::PlayerMario.object_name("TamakoroGalaxy"), "TamakoroGalaxy");
        assert_eq!(GhostType::PlayerLuigi.object_name("TamakoroGalaxy"), "TamakoroGalaxyLuigi");
        assert_eq!(GhostType::PichanRacer.suffix_digits(), 3);
    }
}
