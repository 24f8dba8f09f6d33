//! Calibration persistence — per-joint neutral angles tuned by hand.
//!
//! A flat JSON object mapping joint names to degrees, produced by the
//! interactive calibration tool and read once when the controller is built.
//! A missing file is tolerated by the caller (defaults apply); a malformed
//! file surfaces as a distinct error kind.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RobotError};
use crate::joints::{clamp_angle, JointId, NUM_JOINTS};

/// Calibrated neutral angle per joint name. Sorted map so the file on disk
/// is stable and diffable.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Calibration {
    angles: BTreeMap<String, f64>,
}

impl Calibration {
    /// Read a calibration file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| RobotError::CalibrationFormat {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&contents).map_err(|e| RobotError::CalibrationFormat {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Read a calibration file, falling back to empty when it doesn't exist.
    ///
    /// Matches the startup policy: no calibration means hard-coded defaults,
    /// a present-but-broken file is still an error for the caller to handle.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::warn!("no calibration file at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Truncate and rewrite the calibration file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self).map_err(|e| {
            RobotError::CalibrationFormat {
                path: path.to_path_buf(),
                message: e.to_string(),
            }
        })?;
        fs::write(path, json).map_err(|e| RobotError::CalibrationFormat {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    pub fn set(&mut self, joint: JointId, deg: f64) {
        self.angles.insert(joint.name().to_string(), clamp_angle(deg));
    }

    pub fn get(&self, joint: JointId) -> Option<f64> {
        self.angles.get(joint.name()).copied()
    }

    pub fn len(&self) -> usize {
        self.angles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.angles.is_empty()
    }

    /// Overlay calibrated angles onto a home pose. Unknown joint names are
    /// skipped with a warning; values are clamped into the servo range.
    pub fn apply(&self, home: &mut [f64; NUM_JOINTS]) {
        for (name, &deg) in &self.angles {
            match JointId::from_name(name) {
                Some(joint) => home[joint.index()] = clamp_angle(deg),
                None => tracing::warn!("calibration file names unknown joint '{}'", name),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joints::default_home_pose;

    #[test]
    fn apply_overrides_known_joints_and_skips_unknown() {
        let calibration: Calibration =
            serde_json::from_str(r#"{"left_wrist": 140, "left_leg9": 33, "right_knee": 500}"#)
                .unwrap();
        let mut home = default_home_pose();
        calibration.apply(&mut home);
        assert_eq!(home[JointId::LeftWrist.index()], 140.0);
        // out-of-range values are clamped
        assert_eq!(home[JointId::RightKnee.index()], 270.0);
        // everything else untouched
        assert_eq!(
            home[JointId::LeftChest.index()],
            default_home_pose()[JointId::LeftChest.index()]
        );
    }

    #[test]
    fn malformed_file_is_a_calibration_format_error() {
        let dir = std::env::temp_dir().join("strider-calibration-test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("broken.json");
        fs::write(&path, "{not json").unwrap();

        let err = Calibration::load(&path).unwrap_err();
        assert!(matches!(err, RobotError::CalibrationFormat { .. }));
    }

    #[test]
    fn missing_file_falls_back_to_empty() {
        let path = Path::new("/nonexistent/strider/calibration.json");
        let calibration = Calibration::load_or_default(path).unwrap();
        assert!(calibration.is_empty());
    }

    #[test]
    fn save_writes_sorted_flat_json() {
        let mut calibration = Calibration::default();
        calibration.set(JointId::RightWrist, 117.0);
        calibration.set(JointId::LeftChest, 262.0);

        let dir = std::env::temp_dir().join("strider-calibration-test");
        fs::create_dir_all(&dir).unwrap();
        let path = dir.join("saved.json");
        calibration.save(&path).unwrap();

        let text = fs::read_to_string(&path).unwrap();
        let left = text.find("left_chest").unwrap();
        let right = text.find("right_wrist").unwrap();
        assert!(left < right, "keys must be sorted");

        let reloaded = Calibration::load(&path).unwrap();
        assert_eq!(reloaded.get(JointId::RightWrist), Some(117.0));
    }
}
