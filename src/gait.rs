//! Gait sequencer — open-loop forward walking.
//!
//! One step is a fixed five-phase choreography per leg: shift weight onto the
//! support leg, lift the moving leg, swing it forward, place it down, and
//! (after both legs) recenter the chest onto the calibrated baseline. There
//! is no sensing and no balance feedback; the sequence is a pure function of
//! the fixed deltas below. Any error inside a phase aborts the step and the
//! rest of the walk and drops the robot back to its standby pose — that is
//! the only recovery policy in the system.

use std::time::Duration;

use crate::driver::ServoDriver;
use crate::error::{Result, RobotError};
use crate::joints::Side;
use crate::robot::Robot;

// Chest weight-shift deltas (degrees)
const CHEST_LEAN: f64 = 15.0;
const CHEST_COUNTER: f64 = 10.0;
const STANCE_TUCK: f64 = 10.0;

// Leg deltas (degrees); sign mirrors per side
const KNEE_BEND: f64 = 30.0;
const THIGH_LIFT: f64 = 20.0;
const HIP_SWING: f64 = 25.0;

// Smooth-motion tuning
const CHEST_STEP: f64 = 2.0;
const CHEST_DELAY: Duration = Duration::from_millis(20);
const LEG_STEP: f64 = 2.0;
const LEG_DELAY: Duration = Duration::from_millis(30);

// Settle pauses after each phase
const SHIFT_SETTLE: Duration = Duration::from_millis(300);
const LIFT_SETTLE: Duration = Duration::from_millis(200);
const SWING_SETTLE: Duration = Duration::from_millis(200);
const PLACE_SETTLE: Duration = Duration::from_millis(300);
const RECENTER_SETTLE: Duration = Duration::from_millis(500);

/// Default pause between consecutive steps.
pub const DEFAULT_STEP_PAUSE: Duration = Duration::from_millis(500);

/// One unit of work inside a step. `ShiftWeight` names the support side;
/// the leg phases name the moving leg.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GaitPhase {
    ShiftWeight(Side),
    LiftLeg(Side),
    SwingLeg(Side),
    PlaceLeg(Side),
    Recenter,
}

impl std::fmt::Display for GaitPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GaitPhase::ShiftWeight(side) => write!(f, "shift-weight({})", side),
            GaitPhase::LiftLeg(side) => write!(f, "lift-leg({})", side),
            GaitPhase::SwingLeg(side) => write!(f, "swing-leg({})", side),
            GaitPhase::PlaceLeg(side) => write!(f, "place-leg({})", side),
            GaitPhase::Recenter => f.write_str("recenter"),
        }
    }
}

/// Phase order for one full step: right leg first, then left, then recenter.
const STEP_PHASES: [GaitPhase; 9] = [
    GaitPhase::ShiftWeight(Side::Left),
    GaitPhase::LiftLeg(Side::Right),
    GaitPhase::SwingLeg(Side::Right),
    GaitPhase::PlaceLeg(Side::Right),
    GaitPhase::ShiftWeight(Side::Right),
    GaitPhase::LiftLeg(Side::Left),
    GaitPhase::SwingLeg(Side::Left),
    GaitPhase::PlaceLeg(Side::Left),
    GaitPhase::Recenter,
];

impl<D: ServoDriver> Robot<D> {
    /// Execute one forward step. A phase error is logged and answered with
    /// standby recovery; it does not escape.
    pub fn step_forward(&mut self) -> Result<()> {
        if let Err(e) = self.try_step() {
            tracing::error!(error = %e, "step aborted");
            self.recover_to_standby();
        }
        Ok(())
    }

    /// Walk forward `steps` steps with a pause in between. An error in any
    /// step recovers to standby and abandons the remaining steps.
    pub fn walk_forward(&mut self, steps: u32) -> Result<()> {
        self.walk_forward_with_pause(steps, DEFAULT_STEP_PAUSE)
    }

    pub fn walk_forward_with_pause(&mut self, steps: u32, pause: Duration) -> Result<()> {
        tracing::info!(steps, "starting forward walk");
        for i in 0..steps {
            tracing::info!(step = i + 1, of = steps, "step");
            if let Err(e) = self.try_step() {
                tracing::error!(error = %e, "walk aborted");
                self.recover_to_standby();
                return Ok(());
            }
            if i + 1 < steps {
                spin_sleep::sleep(pause);
            }
        }
        tracing::info!(steps, "walk completed");
        Ok(())
    }

    /// Run the phases of one step, stopping at the first failure.
    fn try_step(&mut self) -> Result<()> {
        for phase in STEP_PHASES {
            self.run_phase(phase).map_err(|e| RobotError::GaitPhase {
                phase: phase.to_string(),
                source: Box::new(e),
            })?;
        }
        Ok(())
    }

    /// The recovery policy: best-effort return to the calibrated standby
    /// pose. A failure here is logged, not propagated — by this point the
    /// walk is already over.
    fn recover_to_standby(&mut self) {
        tracing::warn!("recovering to standby pose");
        if let Err(e) = self.go_to_standby() {
            tracing::warn!(error = %e, "standby recovery failed");
        }
    }

    fn run_phase(&mut self, phase: GaitPhase) -> Result<()> {
        tracing::debug!(%phase, "gait phase");
        match phase {
            GaitPhase::ShiftWeight(support) => self.shift_weight(support),
            GaitPhase::LiftLeg(side) => self.lift_leg(side),
            GaitPhase::SwingLeg(side) => self.swing_leg(side),
            GaitPhase::PlaceLeg(side) => self.place_leg(side),
            GaitPhase::Recenter => self.recenter(),
        }
    }

    /// Tilt the chest toward the support leg and tuck its thigh slightly so
    /// the opposite foot can leave the ground.
    fn shift_weight(&mut self, support: Side) -> Result<()> {
        let lean_chest = support.chest();
        let counter_chest = support.opposite().chest();

        self.glide_to(
            lean_chest,
            self.angle(lean_chest) + CHEST_LEAN,
            CHEST_STEP,
            CHEST_DELAY,
        )?;
        self.glide_to(
            counter_chest,
            self.angle(counter_chest) - CHEST_COUNTER,
            CHEST_STEP,
            CHEST_DELAY,
        )?;

        let thigh = support.thigh();
        self.glide_to(thigh, self.angle(thigh) - STANCE_TUCK, CHEST_STEP, CHEST_DELAY)?;

        spin_sleep::sleep(SHIFT_SETTLE);
        Ok(())
    }

    /// Bend the knee and raise the thigh to clear the foot.
    fn lift_leg(&mut self, side: Side) -> Result<()> {
        let sign = side.sign();
        let knee = side.knee();
        let thigh = side.thigh();

        self.glide_to(knee, self.angle(knee) + sign * KNEE_BEND, LEG_STEP, LEG_DELAY)?;
        self.glide_to(thigh, self.angle(thigh) + sign * THIGH_LIFT, LEG_STEP, LEG_DELAY)?;

        spin_sleep::sleep(LIFT_SETTLE);
        Ok(())
    }

    /// Rotate the hip to carry the lifted leg forward.
    fn swing_leg(&mut self, side: Side) -> Result<()> {
        let hip = side.hip();
        self.glide_to(hip, self.angle(hip) + side.sign() * HIP_SWING, LEG_STEP, LEG_DELAY)?;

        spin_sleep::sleep(SWING_SETTLE);
        Ok(())
    }

    /// Reverse the lift: straighten the knee and lower the thigh.
    fn place_leg(&mut self, side: Side) -> Result<()> {
        let sign = side.sign();
        let knee = side.knee();
        let thigh = side.thigh();

        self.glide_to(knee, self.angle(knee) - sign * KNEE_BEND, LEG_STEP, LEG_DELAY)?;
        self.glide_to(thigh, self.angle(thigh) - sign * THIGH_LIFT, LEG_STEP, LEG_DELAY)?;

        spin_sleep::sleep(PLACE_SETTLE);
        Ok(())
    }

    /// Bring the chest joints back to their calibrated baseline.
    fn recenter(&mut self) -> Result<()> {
        for side in [Side::Left, Side::Right] {
            let chest = side.chest();
            self.glide_to(chest, self.home_angle(chest), CHEST_STEP, CHEST_DELAY)?;
        }

        spin_sleep::sleep(RECENTER_SETTLE);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::driver::MockDriver;
    use crate::joints::{JointId, ALL_JOINTS};

    #[test]
    fn a_step_returns_the_chest_to_baseline() {
        let mut robot = Robot::new(MockDriver::new());
        robot.step_forward().unwrap();
        assert_eq!(
            robot.angle(JointId::LeftChest),
            robot.home_angle(JointId::LeftChest)
        );
        assert_eq!(
            robot.angle(JointId::RightChest),
            robot.home_angle(JointId::RightChest)
        );
    }

    #[test]
    fn walking_never_commands_out_of_range() {
        let mut robot = Robot::new(MockDriver::new());
        robot.walk_forward_with_pause(2, Duration::ZERO).unwrap();
        for call in robot.driver().calls() {
            if let crate::driver::DriverCall::Write { deg, .. } = call {
                assert!((0.0..=270.0).contains(&deg), "angle {} out of range", deg);
            }
        }
    }

    #[test]
    fn three_steps_leave_chest_joints_at_their_pre_walk_baseline() {
        let mut robot = Robot::new(MockDriver::new());
        let left_before = robot.angle(JointId::LeftChest);
        let right_before = robot.angle(JointId::RightChest);

        robot.walk_forward_with_pause(3, Duration::ZERO).unwrap();

        assert_eq!(robot.angle(JointId::LeftChest), left_before);
        assert_eq!(robot.angle(JointId::RightChest), right_before);
        assert_eq!(
            robot.driver().last_write(JointId::LeftChest.channel()),
            Some(left_before)
        );
    }

    #[test]
    fn a_three_step_walk_runs_the_phase_table_three_times() {
        // one recenter per step, no more, no fewer
        let recenters = STEP_PHASES
            .iter()
            .filter(|p| **p == GaitPhase::Recenter)
            .count();
        assert_eq!(recenters, 1);

        let mut walked = Robot::new(MockDriver::new());
        walked.walk_forward_with_pause(3, Duration::ZERO).unwrap();

        // the walk's driver traffic must be exactly three passes over the
        // phase table, so three recenter phases were executed
        let mut replayed = Robot::new(MockDriver::new());
        for _ in 0..3 {
            for phase in STEP_PHASES {
                replayed.run_phase(phase).unwrap();
            }
        }
        assert_eq!(walked.driver().calls(), replayed.driver().calls());
    }

    #[test]
    fn phase_error_triggers_standby_recovery_and_does_not_escape() {
        let mut robot = Robot::new(MockDriver::new());
        // let the weight shift complete, then fault inside the leg lift
        robot.driver().fail_after_writes(60);

        robot.step_forward().unwrap();

        // recovery rewrote the full home pose last
        for joint in ALL_JOINTS {
            assert_eq!(
                robot.driver().last_write(joint.channel()),
                Some(robot.home_angle(joint)),
                "{} must be back at standby",
                joint
            );
        }
    }

    #[test]
    fn a_failed_step_abandons_the_rest_of_the_walk() {
        let mut robot = Robot::new(MockDriver::new());
        robot.driver().fail_after_writes(60);

        robot.walk_forward_with_pause(3, Duration::ZERO).unwrap();

        // a clean 3-step walk recenters three times; the faulted walk stops
        // after the recovery writes instead
        let mut healthy = Robot::new(MockDriver::new());
        healthy.walk_forward_with_pause(3, Duration::ZERO).unwrap();
        assert!(robot.driver().calls().len() < healthy.driver().calls().len());

        // and the robot is parked at standby
        for joint in ALL_JOINTS {
            assert_eq!(
                robot.driver().last_write(joint.channel()),
                Some(robot.home_angle(joint))
            );
        }
    }
}
