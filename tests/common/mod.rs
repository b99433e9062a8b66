// Shared fixtures: a fake Dolphin with the game's recorder helper staged in
// memory, and a recorder wired to it.

#![allow(dead_code)]

use galaxy_gst::gst::{GhostData, Vec3f};
use galaxy_gst::memory::MEM1_START;
use galaxy_gst::{
    FakeMemory, GhostType, Recorder, RecorderConfig, RecorderEvent, RecorderInfo, RecorderMode,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

pub const INFO_PTR_ADDR: u32 = 0x8000_3FF8;
pub const INFO_ADDR: u32 = 0x8000_4000;
pub const STAGE_NAME_ADDR: u32 = 0x8000_5000;
pub const ACTION_NAME_ADDR: u32 = 0x8000_5100;
pub const STAGE_NAME: &str = "TwisterTowerGalaxy";

/// Fake emulator running `game_id`, recorder helper not yet published
pub fn booted_memory(game_id: &[u8; 4]) -> FakeMemory {
    let mut memory = FakeMemory::new();
    memory.write_bytes(MEM1_START, game_id).unwrap();
    memory.write_c_string(STAGE_NAME_ADDR, STAGE_NAME).unwrap();
    memory.write_c_string(ACTION_NAME_ADDR, "Wait").unwrap();
    memory
}

/// Recorder info for `frame`, with motion derived from the frame number
pub fn recorder_info(frame: u32, mode: RecorderMode, ghost_type: GhostType) -> RecorderInfo {
    let t = frame as f32;
    RecorderInfo {
        update_frame: frame,
        mode,
        stage_name_ptr: STAGE_NAME_ADDR,
        ghost_data_index: 2,
        ghost_type,
        ghost: GhostData {
            position: Vec3f::new(t * 4.0, 100.0, -t * 8.0),
            rotation: Vec3f::new(0.0, (frame % 360) as f32 - 180.0, 0.0),
            scale: Vec3f::new(1.0, 1.0, 1.0),
            action_name_ptr: ACTION_NAME_ADDR,
            action_hash: 0x1234_5678,
            bck_frame: (frame % 30) as f32,
            track_weights: [1.0, 0.0, 0.0, 0.0],
            bck_rate: 1.0,
            ..GhostData::default()
        },
    }
}

pub fn publish(memory: &mut FakeMemory, info: &RecorderInfo) {
    memory.write_u32(INFO_PTR_ADDR, INFO_ADDR).unwrap();
    memory.write_bytes(INFO_ADDR, &info.to_bytes()).unwrap();
}

pub fn clear_pointer(memory: &mut FakeMemory) {
    memory.write_u32(INFO_PTR_ADDR, 0).unwrap();
}

/// Overwrite the mode field with a value the game never uses
pub fn corrupt_mode(memory: &mut FakeMemory) {
    memory.write_u32(INFO_ADDR + 0x04, 9).unwrap();
}

/// A recorder over a fake emulator writing into a temporary folder
pub struct Harness {
    pub recorder: Recorder<FakeMemory>,
    pub events: mpsc::UnboundedReceiver<RecorderEvent>,
    pub ghost_type: GhostType,
    temp_dir: TempDir,
}

impl Harness {
    pub fn new(ghost_type: GhostType) -> Self {
        Self::with_memory(booted_memory(b"SB4E"), ghost_type)
    }

    pub fn with_memory(memory: FakeMemory, ghost_type: GhostType) -> Self {
        Self::with_config(memory, ghost_type, |config| config)
    }

    /// Like `with_memory`, with `configure` applied to the test defaults
    pub fn with_config<F>(memory: FakeMemory, ghost_type: GhostType, configure: F) -> Self
    where
        F: FnOnce(RecorderConfig) -> RecorderConfig,
    {
        let temp_dir = TempDir::new().unwrap();
        let config = configure(RecorderConfig {
            poll_interval: Duration::from_millis(1),
            connect_interval: Duration::from_millis(1),
            ..RecorderConfig::new(temp_dir.path().to_path_buf())
        });
        let (tx, events) = mpsc::unbounded_channel();

        Self {
            recorder: Recorder::new(memory, config, tx),
            events,
            ghost_type,
            temp_dir,
        }
    }

    pub fn output_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    pub fn stage_dir(&self) -> PathBuf {
        self.output_dir().join(STAGE_NAME)
    }

    pub fn tick(&mut self) {
        self.recorder.tick().unwrap();
    }

    /// Publish the recorder info for `frame` and poll once
    pub fn step(&mut self, frame: u32, mode: RecorderMode) {
        let info = recorder_info(frame, mode, self.ghost_type);
        publish(self.recorder.memory_mut(), &info);
        self.tick();
    }

    /// Connect, find the recorder and start a session at `start_frame`
    pub fn start_recording(&mut self, start_frame: u32) {
        let info = recorder_info(start_frame.wrapping_sub(1), RecorderMode::Waiting, self.ghost_type);
        publish(self.recorder.memory_mut(), &info);
        while self.recorder.state() != galaxy_gst::RecorderState::WaitingForSession {
            self.tick();
        }
        self.tick(); // observe the idle recorder
        self.step(start_frame, RecorderMode::Recording);
    }

    /// Record frames `start..=end` and stop
    pub fn record_session(&mut self, start: u32, end: u32) {
        self.start_recording(start);
        for frame in start + 1..=end {
            self.step(frame, RecorderMode::Recording);
        }
        self.step(end + 1, RecorderMode::Stopped);
    }

    pub fn drain_events(&mut self) -> Vec<RecorderEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    /// Paths of every file reported as dumped so far
    pub fn dumped_paths(events: &[RecorderEvent]) -> Vec<PathBuf> {
        events
            .iter()
            .filter_map(|e| match e {
                RecorderEvent::Dumped { path, .. } => Some(path.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Frame count from a big-endian GST header
pub fn header_frame_count(bytes: &[u8]) -> u32 {
    u32::from_be_bytes([bytes[8], bytes[9], bytes[10], bytes[11]])
}

/// Frame numbers of every record in a big-endian GST file
pub fn record_frames(bytes: &[u8]) -> Vec<u32> {
    bytes[galaxy_gst::gst::HEADER_SIZE..]
        .chunks_exact(galaxy_gst::gst::RECORD_SIZE)
        .map(|r| u32::from_be_bytes([r[0], r[1], r[2], r[3]]))
        .collect()
}
