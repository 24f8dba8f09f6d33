//! Robot controller — joint state register and the smooth motion primitive.
//!
//! Owns the servo driver (injected at construction, no module globals) and
//! the per-joint angle register. The register holds the last commanded angle
//! for every joint; only motion code mutates it. A separate home pose, fixed
//! at construction from defaults plus calibration, defines the standby
//! recovery target and the gait baselines.

use std::time::Duration;

use crate::calibration::Calibration;
use crate::driver::ServoDriver;
use crate::error::Result;
use crate::joints::{clamp_angle, default_home_pose, JointId, ALL_JOINTS, NUM_JOINTS};

pub struct Robot<D: ServoDriver> {
    driver: D,
    /// Last commanded angle per joint, indexed by channel.
    angles: [f64; NUM_JOINTS],
    /// Calibrated standby pose. Never mutated after construction.
    home: [f64; NUM_JOINTS],
}

impl<D: ServoDriver> Robot<D> {
    /// Controller with the built-in default pose.
    pub fn new(driver: D) -> Self {
        let home = default_home_pose();
        Self {
            driver,
            angles: home,
            home,
        }
    }

    /// Controller with calibrated angles overriding the defaults.
    pub fn with_calibration(driver: D, calibration: &Calibration) -> Self {
        let mut home = default_home_pose();
        calibration.apply(&mut home);
        Self {
            driver,
            angles: home,
            home,
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Last commanded angle for a joint.
    pub fn angle(&self, joint: JointId) -> f64 {
        self.angles[joint.index()]
    }

    /// Calibrated standby angle for a joint.
    pub fn home_angle(&self, joint: JointId) -> f64 {
        self.home[joint.index()]
    }

    /// Command a joint to an absolute angle (clamped) and record it.
    pub fn set_joint(&mut self, joint: JointId, deg: f64) -> Result<()> {
        let deg = clamp_angle(deg);
        self.driver.write_angle(joint.channel(), deg)?;
        self.angles[joint.index()] = deg;
        Ok(())
    }

    /// Move a joint by a delta, clamped at the range ends.
    pub fn nudge_joint(&mut self, joint: JointId, delta: f64) -> Result<()> {
        self.set_joint(joint, self.angle(joint) + delta)
    }

    /// Move one joint gradually from `start` to `end`.
    ///
    /// Iterates the angle sequence in `step`-degree increments with `delay`
    /// between writes, then force-sets the exact end angle so a step that
    /// doesn't divide the span still lands on target. Blocks the calling
    /// thread for the whole motion; there is no cancellation.
    pub fn move_servo_smooth(
        &mut self,
        joint: JointId,
        start: f64,
        end: f64,
        step: f64,
        delay: Duration,
    ) -> Result<()> {
        let start = clamp_angle(start);
        let end = clamp_angle(end);
        if start == end {
            return Ok(());
        }

        let step = step.abs().max(1.0);
        let dir = if end > start { 1.0 } else { -1.0 };

        let mut deg = start;
        while (end - deg) * dir >= 0.0 {
            self.set_joint(joint, deg)?;
            spin_sleep::sleep(delay);
            deg += step * dir;
        }

        // Land exactly on target regardless of step truncation.
        self.set_joint(joint, end)
    }

    /// Glide a joint from wherever it is to `target`.
    pub fn glide_to(&mut self, joint: JointId, target: f64, step: f64, delay: Duration) -> Result<()> {
        self.move_servo_smooth(joint, self.angle(joint), target, step, delay)
    }

    /// Drive every joint to its calibrated standby angle.
    ///
    /// This is the system's recovery pose: gait errors fall back here.
    pub fn go_to_standby(&mut self) -> Result<()> {
        for joint in ALL_JOINTS {
            self.set_joint(joint, self.home[joint.index()])?;
        }
        tracing::info!("standby pose applied");
        Ok(())
    }

    /// De-energize all servos.
    pub fn release_all(&mut self) -> Result<()> {
        for joint in ALL_JOINTS {
            self.driver.release(joint.channel())?;
        }
        tracing::info!("all servos released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MockDriver;

    fn robot() -> Robot<MockDriver> {
        Robot::new(MockDriver::new())
    }

    #[test]
    fn smooth_motion_lands_exactly_on_target() {
        let mut robot = robot();
        robot
            .move_servo_smooth(JointId::LeftShoulder, 10.0, 20.0, 3.0, Duration::ZERO)
            .unwrap();
        assert_eq!(
            robot.driver().writes_for(JointId::LeftShoulder.channel()),
            vec![10.0, 13.0, 16.0, 19.0, 20.0]
        );
        assert_eq!(robot.angle(JointId::LeftShoulder), 20.0);
    }

    #[test]
    fn smooth_motion_final_write_is_target_even_when_step_divides() {
        let mut robot = robot();
        robot
            .move_servo_smooth(JointId::LeftWrist, 10.0, 20.0, 5.0, Duration::ZERO)
            .unwrap();
        let writes = robot.driver().writes_for(JointId::LeftWrist.channel());
        assert_eq!(writes.last(), Some(&20.0));
        assert_eq!(writes.first(), Some(&10.0));
    }

    #[test]
    fn smooth_motion_runs_downward() {
        let mut robot = robot();
        robot
            .move_servo_smooth(JointId::RightKnee, 20.0, 10.0, 3.0, Duration::ZERO)
            .unwrap();
        assert_eq!(
            robot.driver().writes_for(JointId::RightKnee.channel()),
            vec![20.0, 17.0, 14.0, 11.0, 10.0]
        );
    }

    #[test]
    fn smooth_motion_equal_endpoints_is_a_noop() {
        let mut robot = robot();
        robot
            .move_servo_smooth(JointId::LeftKnee, 90.0, 90.0, 1.0, Duration::ZERO)
            .unwrap();
        assert!(robot.driver().calls().is_empty());
    }

    #[test]
    fn nudge_clamps_at_range_ends() {
        let mut robot = robot();
        robot.set_joint(JointId::LeftHip, 260.0).unwrap();
        robot.nudge_joint(JointId::LeftHip, 50.0).unwrap();
        assert_eq!(robot.angle(JointId::LeftHip), 270.0);
        robot.nudge_joint(JointId::LeftHip, -300.0).unwrap();
        assert_eq!(robot.angle(JointId::LeftHip), 0.0);
        for deg in robot.driver().writes_for(JointId::LeftHip.channel()) {
            assert!((0.0..=270.0).contains(&deg));
        }
    }

    #[test]
    fn standby_writes_home_pose_for_every_joint() {
        let mut robot = robot();
        robot.set_joint(JointId::LeftChest, 12.0).unwrap();
        robot.go_to_standby().unwrap();
        for joint in ALL_JOINTS {
            assert_eq!(
                robot.driver().last_write(joint.channel()),
                Some(robot.home_angle(joint))
            );
            assert_eq!(robot.angle(joint), robot.home_angle(joint));
        }
    }
}
