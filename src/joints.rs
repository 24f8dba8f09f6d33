//! Joint registry — the fixed mapping from named joints to PWM channels.
//!
//! Sixteen servos, one per channel. The left side occupies channels 0–7 top
//! to bottom, the right side mirrors it on 15–8. The mapping is a fixed
//! bijection established here at compile time; nothing mutates it.

/// Servo angle domain in degrees.
pub const ANGLE_MIN: f64 = 0.0;
pub const ANGLE_MAX: f64 = 270.0;

pub const NUM_JOINTS: usize = 16;

/// Clamp an angle into the servo's mechanical range.
#[inline]
pub fn clamp_angle(deg: f64) -> f64 {
    deg.clamp(ANGLE_MIN, ANGLE_MAX)
}

/// One of the 16 physical joints. The discriminant is the PWM channel index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum JointId {
    LeftWrist = 0,
    LeftShoulder = 1,
    LeftChest = 2,
    LeftHip = 3,
    LeftThigh = 4,
    LeftKnee = 5,
    LeftAnkle = 6,
    LeftFoot = 7,
    RightFoot = 8,
    RightAnkle = 9,
    RightKnee = 10,
    RightThigh = 11,
    RightHip = 12,
    RightChest = 13,
    RightShoulder = 14,
    RightWrist = 15,
}

/// All joints in channel order.
pub const ALL_JOINTS: [JointId; NUM_JOINTS] = [
    JointId::LeftWrist,
    JointId::LeftShoulder,
    JointId::LeftChest,
    JointId::LeftHip,
    JointId::LeftThigh,
    JointId::LeftKnee,
    JointId::LeftAnkle,
    JointId::LeftFoot,
    JointId::RightFoot,
    JointId::RightAnkle,
    JointId::RightKnee,
    JointId::RightThigh,
    JointId::RightHip,
    JointId::RightChest,
    JointId::RightShoulder,
    JointId::RightWrist,
];

impl JointId {
    /// PWM controller channel (0–15).
    #[inline]
    pub fn channel(self) -> u8 {
        self as u8
    }

    /// Index into per-joint state arrays. Same as the channel.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Joint name as used in the calibration file.
    pub fn name(self) -> &'static str {
        match self {
            JointId::LeftWrist => "left_wrist",
            JointId::LeftShoulder => "left_shoulder",
            JointId::LeftChest => "left_chest",
            JointId::LeftHip => "left_hip",
            JointId::LeftThigh => "left_thigh",
            JointId::LeftKnee => "left_knee",
            JointId::LeftAnkle => "left_ankle",
            JointId::LeftFoot => "left_foot",
            JointId::RightFoot => "right_foot",
            JointId::RightAnkle => "right_ankle",
            JointId::RightKnee => "right_knee",
            JointId::RightThigh => "right_thigh",
            JointId::RightHip => "right_hip",
            JointId::RightChest => "right_chest",
            JointId::RightShoulder => "right_shoulder",
            JointId::RightWrist => "right_wrist",
        }
    }

    /// Reverse lookup for calibration file keys.
    pub fn from_name(name: &str) -> Option<JointId> {
        ALL_JOINTS.iter().copied().find(|j| j.name() == name)
    }

    pub fn side(self) -> Side {
        if self.channel() < 8 {
            Side::Left
        } else {
            Side::Right
        }
    }
}

impl std::fmt::Display for JointId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Body side. The legs are mirrored, so gait deltas flip sign per side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Sign applied to mirrored leg deltas: +1 right, -1 left.
    #[inline]
    pub fn sign(self) -> f64 {
        match self {
            Side::Left => -1.0,
            Side::Right => 1.0,
        }
    }

    pub fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }

    pub fn chest(self) -> JointId {
        match self {
            Side::Left => JointId::LeftChest,
            Side::Right => JointId::RightChest,
        }
    }

    pub fn shoulder(self) -> JointId {
        match self {
            Side::Left => JointId::LeftShoulder,
            Side::Right => JointId::RightShoulder,
        }
    }

    pub fn wrist(self) -> JointId {
        match self {
            Side::Left => JointId::LeftWrist,
            Side::Right => JointId::RightWrist,
        }
    }

    pub fn hip(self) -> JointId {
        match self {
            Side::Left => JointId::LeftHip,
            Side::Right => JointId::RightHip,
        }
    }

    pub fn thigh(self) -> JointId {
        match self {
            Side::Left => JointId::LeftThigh,
            Side::Right => JointId::RightThigh,
        }
    }

    pub fn knee(self) -> JointId {
        match self {
            Side::Left => JointId::LeftKnee,
            Side::Right => JointId::RightKnee,
        }
    }
}

impl std::fmt::Display for Side {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Side::Left => f.write_str("left"),
            Side::Right => f.write_str("right"),
        }
    }
}

/// Default standing pose (degrees), indexed by channel. Overridden per robot
/// by the calibration file.
pub fn default_home_pose() -> [f64; NUM_JOINTS] {
    let mut pose = [0.0; NUM_JOINTS];
    for (joint, deg) in [
        (JointId::LeftWrist, 155.0),
        (JointId::LeftShoulder, 20.0),
        (JointId::LeftChest, 262.0),
        (JointId::LeftHip, 135.0),
        (JointId::LeftThigh, 157.0),
        (JointId::LeftKnee, 257.0),
        (JointId::LeftAnkle, 149.0),
        (JointId::LeftFoot, 190.0),
        (JointId::RightFoot, 20.0),
        (JointId::RightAnkle, 134.0),
        (JointId::RightKnee, 30.0),
        (JointId::RightThigh, 80.0),
        (JointId::RightHip, 145.0),
        (JointId::RightChest, 46.0),
        (JointId::RightShoulder, 51.0),
        (JointId::RightWrist, 117.0),
    ] {
        pose[joint.index()] = deg;
    }
    pose
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_mapping_is_a_bijection() {
        let mut seen = [false; NUM_JOINTS];
        for joint in ALL_JOINTS {
            let ch = joint.channel() as usize;
            assert!(!seen[ch], "channel {} mapped twice", ch);
            seen[ch] = true;
        }
        assert!(seen.iter().all(|&s| s));
    }

    #[test]
    fn name_round_trip() {
        for joint in ALL_JOINTS {
            assert_eq!(JointId::from_name(joint.name()), Some(joint));
        }
        assert_eq!(JointId::from_name("left_leg9"), None);
    }

    #[test]
    fn sides_are_mirrored() {
        assert_eq!(JointId::LeftKnee.side(), Side::Left);
        assert_eq!(JointId::RightKnee.side(), Side::Right);
        assert_eq!(Side::Left.knee().channel() + Side::Right.knee().channel(), 15);
        assert_eq!(Side::Left.sign(), -Side::Right.sign());
    }
}
