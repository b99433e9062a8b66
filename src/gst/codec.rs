//! GST motion-capture file writer
//!
//! File layout (all multi-byte fields in the configured byte order):
//!
//! ```text
//! header (32 bytes)
//!   0x00  magic "GST1"
//!   0x04  u16 version
//!   0x06  u16 ghost type
//!   0x08  u32 frame count
//!   0x0C  u16 playback rate (frames per second)
//!   0x0E  u16 record size
//!   0x10  u32 ghost data index
//!   0x14  12 reserved bytes
//! records (80 bytes each, one per frame)
//!   0x00  u32 frame        0x04  u16 flags      0x06  3 x i16 position
//!   0x0C  3 x f32 position 0x18  3 x i16 rot    0x1E  3 x i8 scale
//!   0x21  3 x i8 velocity  0x24  i16 bck frame  0x26  i8 bck rate
//!   0x27  4 x i8 weights   0x2B  pad            0x2C  u32 action hash
//!   0x30  32 bytes action name, NUL padded
//! ```

use serde::Deserialize;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, warn};

use super::info::GhostType;
use super::sample::FrameSample;

pub const GST_MAGIC: [u8; 4] = *b"GST1";
pub const GST_VERSION: u16 = 1;
pub const HEADER_SIZE: usize = 0x20;
pub const RECORD_SIZE: usize = 0x50;
const ACTION_NAME_FIELD: usize = 32;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Header announces {header} frames but {samples} samples were given")]
    FrameCountMismatch { header: u32, samples: usize },

    #[error("Failed to write {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("No free file name for {object_name} in {dir:?}")]
    NoFreeFileName { dir: PathBuf, object_name: String },
}

/// Byte order of multi-byte fields in the output file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ByteOrder {
    /// Matches the console (PowerPC)
    #[default]
    Big,
    Little,
}

/// Fixed header preceding the frame records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GstHeader {
    pub ghost_type: GhostType,
    pub frame_count: u32,
    /// Frames per second
    pub playback_rate: u16,
    pub ghost_data_index: u32,
}

impl GstHeader {
    pub fn for_samples(
        ghost_type: GhostType,
        ghost_data_index: u32,
        playback_rate: u16,
        samples: &[FrameSample],
    ) -> Self {
        Self {
            ghost_type,
            frame_count: samples.len() as u32,
            playback_rate,
            ghost_data_index,
        }
    }

    /// Playback length of the recording
    pub fn duration(&self) -> Duration {
        if self.playback_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frame_count as f64 / self.playback_rate as f64)
    }
}

struct FieldWriter {
    out: Vec<u8>,
    order: ByteOrder,
}

impl FieldWriter {
    fn u16(&mut self, v: u16) {
        let bytes = match self.order {
            ByteOrder::Big => v.to_be_bytes(),
            ByteOrder::Little => v.to_le_bytes(),
        };
        self.out.extend_from_slice(&bytes);
    }

    fn u32(&mut self, v: u32) {
        let bytes = match self.order {
            ByteOrder::Big => v.to_be_bytes(),
            ByteOrder::Little => v.to_le_bytes(),
        };
        self.out.extend_from_slice(&bytes);
    }

    fn i16(&mut self, v: i16) {
        self.u16(v as u16);
    }

    fn f32(&mut self, v: f32) {
        self.u32(v.to_bits());
    }

    fn i8(&mut self, v: i8) {
        self.out.push(v as u8);
    }

    fn padded(&mut self, bytes: &[u8], width: usize) {
        let len = bytes.len().min(width);
        self.out.extend_from_slice(&bytes[..len]);
        self.out.resize(self.out.len() + width - len, 0);
    }
}

/// Serialize a header and its records
pub fn encode(
    header: &GstHeader,
    samples: &[FrameSample],
    order: ByteOrder,
) -> Result<Vec<u8>, CodecError> {
    if header.frame_count as usize != samples.len() {
        return Err(CodecError::FrameCountMismatch {
            header: header.frame_count,
            samples: samples.len(),
        });
    }

    let mut w = FieldWriter {
        out: Vec::with_capacity(HEADER_SIZE + RECORD_SIZE * samples.len()),
        order,
    };

    w.out.extend_from_slice(&GST_MAGIC);
    w.u16(GST_VERSION);
    w.u16(header.ghost_type.raw());
    w.u32(header.frame_count);
    w.u16(header.playback_rate);
    w.u16(RECORD_SIZE as u16);
    w.u32(header.ghost_data_index);
    let written = w.out.len();
    w.padded(&[], HEADER_SIZE - written);

    for sample in samples {
        w.u32(sample.frame);
        w.u16(sample.flags.0);
        sample.position.iter().for_each(|&v| w.i16(v));
        sample.position_f.iter().for_each(|&v| w.f32(v));
        sample.rotation.iter().for_each(|&v| w.i16(v));
        sample.scale.iter().for_each(|&v| w.i8(v));
        sample.velocity.iter().for_each(|&v| w.i8(v));
        w.i16(sample.bck_frame);
        w.i8(sample.bck_rate);
        sample.track_weights.iter().for_each(|&v| w.i8(v));
        w.i8(0);
        w.u32(sample.action_hash);
        // Keep at least one NUL terminator
        let name = sample.action_name.as_bytes();
        w.padded(&name[..name.len().min(ACTION_NAME_FIELD - 1)], ACTION_NAME_FIELD);
    }

    Ok(w.out)
}

/// Make a stage name safe to use as a directory name
fn sanitize_component(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            c => c,
        })
        .collect();
    match cleaned.as_str() {
        "" | "." | ".." => "Unknown".to_string(),
        _ => cleaned,
    }
}

/// Largest numeric suffix tried before giving up
const MAX_SUFFIX: u32 = u16::MAX as u32;

fn numbered_path(dir: &Path, object_name: &str, n: u32, digits: usize) -> PathBuf {
    dir.join(format!("{}{:0width$}.gst", object_name, n, width = digits))
}

/// Anything at `path`, including a dangling symlink, occupies the name
fn is_occupied(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// First `<root>/<context>/<object_name><NN>.gst` that does not exist yet,
/// counting from 1
pub fn next_output_path(
    root: &Path,
    context: &str,
    object_name: &str,
    digits: usize,
) -> Result<PathBuf, CodecError> {
    let dir = root.join(sanitize_component(context));
    let object_name = sanitize_component(object_name);

    let free = (1..=MAX_SUFFIX)
        .map(|n| numbered_path(&dir, &object_name, n, digits))
        .find(|path| !is_occupied(path));
    free.ok_or(CodecError::NoFreeFileName { dir, object_name })
}

/// Metadata deciding where a recording is written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputTarget<'a> {
    pub root: &'a Path,
    pub context: &'a str,
    pub object_name: &'a str,
    pub digits: usize,
}

/// Encode `samples` and write them to the next free path under `target`.
/// Never overwrites an existing file; a partially written file is removed.
pub fn write_gst_file(
    target: &OutputTarget<'_>,
    header: &GstHeader,
    samples: &[FrameSample],
    order: ByteOrder,
) -> Result<PathBuf, CodecError> {
    let bytes = encode(header, samples, order)?;

    let dir = target.root.join(sanitize_component(target.context));
    fs::create_dir_all(&dir).map_err(|source| CodecError::Io {
        path: dir.clone(),
        source,
    })?;

    let object_name = sanitize_component(target.object_name);
    for n in 1..=MAX_SUFFIX {
        let path = numbered_path(&dir, &object_name, n, target.digits);
        if is_occupied(&path) {
            continue;
        }

        let file = OpenOptions::new().write(true).create_new(true).open(&path);
        let mut file = match file {
            Ok(file) => file,
            // Lost a race with another writer, try the next number
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => continue,
            Err(source) => return Err(CodecError::Io { path, source }),
        };

        if let Err(source) = file.write_all(&bytes).and_then(|_| file.sync_all()) {
            drop(file);
            if let Err(e) = fs::remove_file(&path) {
                warn!("Failed to remove partial file {:?}: {}", path, e);
            }
            return Err(CodecError::Io { path, source });
        }

        debug!("Wrote {} bytes to {:?}", bytes.len(), path);
        return Ok(path);
    }

    Err(CodecError::NoFreeFileName { dir, object_name })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_layout_big_endian() {
        let header = GstHeader {
            ghost_type: GhostType::PichanRacer,
            frame_count: 0,
            playback_rate: 60,
            ghost_data_index: 7,
        };
        let bytes = encode(&header, &[], ByteOrder::Big).unwrap();

        assert_eq!(bytes.len(), HEADER_SIZE);
        assert_eq!(&bytes[0..4], b"GST1");
        assert_eq!(&bytes[4..6], &[0, 1]);
        assert_eq!(&bytes[6..8], &[0, 1]);
        assert_eq!(&bytes[12..14], &[0, 60]);
        assert_eq!(&bytes[14..16], &[0, 0x50]);
        assert_eq!(&bytes[16..20], &[0, 0, 0, 7]);
        assert!(bytes[20..].iter().all(|&b| b == 0));
    }

    #[test]
    fn test_record_layout_little_endian() {
        let sample = FrameSample {
            frame: 0x0102_0304,
            action_hash: 0xAABB_CCDD,
            action_name: "Walk".to_string(),
            bck_rate: -1,
            ..FrameSample::default()
        };
        let header = GstHeader::for_samples(GhostType::GhostAttackGhost, 0, 60, &[sample.clone()]);
        let bytes = encode(&header, &[sample], ByteOrder::Little).unwrap();
        let record = &bytes[HEADER_SIZE..];

        assert_eq!(record.len(), RECORD_SIZE);
        assert_eq!(&record[0..4], &[4, 3, 2, 1]);
        assert_eq!(record[0x26], 0xFF);
        assert_eq!(&record[0x2C..0x30], &[0xDD, 0xCC, 0xBB, 0xAA]);
        assert_eq!(&record[0x30..0x35], b"Walk\0");
    }

    #[test]
    fn test_encode_rejects_mismatched_frame_count() {
        let header = GstHeader {
            ghost_type: GhostType::GhostAttackGhost,
            frame_count: 2,
            playback_rate: 60,
            ghost_data_index: 0,
        };
        let result = encode(&header, &[FrameSample::default()], ByteOrder::Big);
        assert!(matches!(result, Err(CodecError::FrameCountMismatch { .. })));
    }

    #[test]
    fn test_sanitize_component() {
        assert_eq!(sanitize_component("RedBlueExGalaxy"), "RedBlueExGalaxy");
        assert_eq!(sanitize_component("../etc"), ".._etc");
        assert_eq!(sanitize_component(""), "Unknown");
    }
}
