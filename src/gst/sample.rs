use super::info::{GhostData, GhostType};

/// Bitset of fields that changed since the previous sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PacketFlags(pub u16);

impl PacketFlags {
    pub const POSITION_INT: u16 = 0x0001;
    pub const ROTATION_X: u16 = 0x0002;
    pub const ROTATION_Y: u16 = 0x0004;
    pub const ROTATION_Z: u16 = 0x0008;
    pub const ACTION_NAME: u16 = 0x0010;
    pub const BCK_FRAME: u16 = 0x0020;
    pub const TRACK_WEIGHT_0: u16 = 0x0040;
    pub const TRACK_WEIGHT_1: u16 = 0x0080;
    pub const TRACK_WEIGHT_2: u16 = 0x0100;
    pub const TRACK_WEIGHT_3: u16 = 0x0200;
    pub const SCALE: u16 = 0x0400;
    pub const VELOCITY: u16 = 0x0800;
    pub const BCK_RATE: u16 = 0x1000;
    pub const ACTION_HASH: u16 = 0x2000;
    pub const POSITION_FLOAT: u16 = 0x4000;

    pub fn contains(self, flag: u16) -> bool {
        self.0 & flag == flag
    }

    fn set(&mut self, flag: u16, changed: bool) {
        if changed {
            self.0 |= flag;
        }
    }
}

/// Longest action name kept in a sample
pub const ACTION_NAME_MAX: usize = 31;

/// `2^shift`, the fixed-point scale the game uses per field
fn shift_ratio(shift: i32) -> f32 {
    2f32.powi(shift)
}

/// One frame of quantized object motion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FrameSample {
    /// Game frame counter the sample was taken at
    pub frame: u32,
    pub flags: PacketFlags,
    pub position: [i16; 3],
    pub position_f: [f32; 3],
    pub rotation: [i16; 3],
    pub scale: [i8; 3],
    pub velocity: [i8; 3],
    pub action_name: String,
    pub action_hash: u32,
    pub bck_frame: i16,
    pub bck_rate: i8,
    pub track_weights: [i8; 4],
}

impl FrameSample {
    /// Quantize the raw ghost state. Float to int casts saturate.
    pub fn capture(frame: u32, ghost: &GhostData, action_name: &str) -> Self {
        let position_ratio = shift_ratio(-2);
        let rotation_ratio = shift_ratio(7);
        let scale_ratio = shift_ratio(3);
        let velocity_ratio = shift_ratio(0);
        let weight_ratio = shift_ratio(7);

        let p = ghost.position;
        let r = ghost.rotation;
        let s = ghost.scale;
        let v = ghost.velocity;
        let rot = |deg: f32| (deg.clamp(-180.0, 180.0) * rotation_ratio) as i16;

        let mut name = action_name.to_string();
        if name.len() > ACTION_NAME_MAX {
            let mut end = ACTION_NAME_MAX;
            while !name.is_char_boundary(end) {
                end -= 1;
            }
            name.truncate(end);
        }

        Self {
            frame,
            flags: PacketFlags::default(),
            position: [
                (p.x * position_ratio) as i16,
                (p.y * position_ratio) as i16,
                (p.z * position_ratio) as i16,
            ],
            position_f: [p.x, p.y, p.z],
            rotation: [rot(r.x), rot(r.y), rot(r.z)],
            scale: [
                (s.x * scale_ratio) as i8,
                (s.y * scale_ratio) as i8,
                (s.z * scale_ratio) as i8,
            ],
            velocity: [
                (v.x * velocity_ratio) as i8,
                (v.y * velocity_ratio) as i8,
                (v.z * velocity_ratio) as i8,
            ],
            action_name: name,
            action_hash: ghost.action_hash,
            bck_frame: (ghost.bck_frame * shift_ratio(2)) as i16,
            bck_rate: (ghost.bck_rate * shift_ratio(3)) as i8,
            track_weights: ghost.track_weights.map(|w| {
                if w == 1.0 {
                    -128
                } else {
                    (w * weight_ratio) as i8
                }
            }),
        }
    }

    /// Compute which fields differ from `previous`.
    ///
    /// Velocity and the float position are never compared; the action name
    /// only counts for Pichan racers and the action hash only for ghosts.
    pub fn diff_flags(&self, previous: &FrameSample, ghost_type: GhostType) -> PacketFlags {
        let mut flags = PacketFlags::default();

        flags.set(PacketFlags::POSITION_INT, self.position != previous.position);
        flags.set(PacketFlags::SCALE, self.scale != previous.scale);
        flags.set(PacketFlags::ROTATION_X, self.rotation[0] != previous.rotation[0]);
        flags.set(PacketFlags::ROTATION_Y, self.rotation[1] != previous.rotation[1]);
        flags.set(PacketFlags::ROTATION_Z, self.rotation[2] != previous.rotation[2]);
        flags.set(
            PacketFlags::ACTION_NAME,
            ghost_type == GhostType::PichanRacer && self.action_name != previous.action_name,
        );
        flags.set(
            PacketFlags::ACTION_HASH,
            ghost_type == GhostType::GhostAttackGhost && self.action_hash != previous.action_hash,
        );
        flags.set(PacketFlags::BCK_FRAME, self.bck_frame != previous.bck_frame);
        flags.set(PacketFlags::BCK_RATE, self.bck_rate != previous.bck_rate);

        let weight_flags = [
            PacketFlags::TRACK_WEIGHT_0,
            PacketFlags::TRACK_WEIGHT_1,
            PacketFlags::TRACK_WEIGHT_2,
            PacketFlags::TRACK_WEIGHT_3,
        ];
        for (i, flag) in weight_flags.into_iter().enumerate() {
            flags.set(flag, self.track_weights[i] != previous.track_weights[i]);
        }

        flags
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gst::info::Vec3f;

    fn ghost() -> GhostData {
        GhostData {
            position: Vec3f::new(400.0, -80.0, 1.0),
            rotation: Vec3f::new(0.5, 270.0, -1.0),
            scale: Vec3f::new(1.0, 1.0, 1.0),
            velocity: Vec3f::new(2.0, 0.0, 0.0),
            action_hash: 0xDEAD_BEEF,
            bck_frame: 7.5,
            track_weights: [1.0, 0.5, 0.0, 0.0],
            bck_rate: 1.0,
            ..GhostData::default()
        }
    }

    #[test]
    fn test_capture_quantizes_fields() {
        let sample = FrameSample::capture(10, &ghost(), "Run");

        assert_eq!(sample.frame, 10);
        assert_eq!(sample.position, [100, -20, 0]);
        assert_eq!(sample.position_f, [400.0, -80.0, 1.0]);
        // 270 degrees clamps to 180
        assert_eq!(sample.rotation, [64, 23040, -128]);
        assert_eq!(sample.scale, [8, 8, 8]);
        assert_eq!(sample.velocity, [2, 0, 0]);
        assert_eq!(sample.bck_frame, 30);
        assert_eq!(sample.bck_rate, 8);
        assert_eq!(sample.track_weights, [-128, 64, 0, 0]);
        assert_eq!(sample.action_name, "Run");
    }

    #[test]
    fn test_capture_truncates_long_action_names() {
        let long_name = "A".repeat(40);
        let sample = FrameSample::capture(0, &ghost(), &long_name);
        assert_eq!(sample.action_name.len(), ACTION_NAME_MAX);
    }

    #[test]
    fn test_diff_flags_against_zero_state() {
        let sample = FrameSample::capture(0, &ghost(), "Run");
        let flags = sample.diff_flags(&FrameSample::default(), GhostType::GhostAttackGhost);

        assert!(flags.contains(PacketFlags::POSITION_INT));
        assert!(flags.contains(PacketFlags::SCALE));
        assert!(flags.contains(PacketFlags::ROTATION_X));
        assert!(flags.contains(PacketFlags::ACTION_HASH));
        assert!(!flags.contains(PacketFlags::ACTION_NAME));
        assert!(!flags.contains(PacketFlags::VELOCITY));
        assert!(!flags.contains(PacketFlags::TRACK_WEIGHT_2));
    }

    #[test]
    fn test_diff_flags_action_name_only_for_pichan_racer() {
        let previous = FrameSample::capture(0, &ghost(), "Run");
        let current = FrameSample::capture(1, &ghost(), "Jump");

        let racer = current.diff_flags(&previous, GhostType::PichanRacer);
        assert_eq!(racer, PacketFlags(PacketFlags::ACTION_NAME));

        let ghost_flags = current.diff_flags(&previous, GhostType::GhostAttackGhost);
        assert_eq!(ghost_flags, PacketFlags::default());
    }
}
