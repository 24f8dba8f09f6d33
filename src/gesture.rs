//! Gesture library — fixed arm animations with save/restore semantics.
//!
//! A wave disturbs one arm's chest, shoulder and wrist joints. The original
//! angles are captured up front and written back in a cleanup phase that runs
//! whether or not the animation completed, so a gesture never leaves the arm
//! somewhere unexpected. The frame loop writes the driver directly and the
//! restore returns the arm to the captured pose, so the controller's angle
//! register stays valid without sharing it across threads.

use std::thread;
use std::time::Duration;

use crate::driver::ServoDriver;
use crate::error::{Result, RobotError};
use crate::joints::Side;
use crate::robot::Robot;

/// Per-side wave tuning. The two arms are not symmetric: the right shoulder
/// servo sweeps a much wider arc than the left.
#[derive(Debug, Clone, Copy)]
struct WaveProfile {
    side: Side,
    chest_ready: f64,
    shoulder_rest: f64,
    shoulder_peak: f64,
    wrist_ready: f64,
    sweep_deg: u32,
}

const LEFT_WAVE: WaveProfile = WaveProfile {
    side: Side::Left,
    chest_ready: 50.0,
    shoulder_rest: 30.0,
    shoulder_peak: 65.0,
    wrist_ready: 120.0,
    sweep_deg: 60,
};

const RIGHT_WAVE: WaveProfile = WaveProfile {
    side: Side::Right,
    chest_ready: 46.0,
    shoulder_rest: 116.0,
    shoulder_peak: 250.0,
    wrist_ready: 120.0,
    sweep_deg: 140,
};

/// Delays between animation events.
#[derive(Debug, Clone, Copy)]
pub struct GestureTiming {
    /// Delay between per-frame servo writes.
    pub frame: Duration,
    /// Pause at the top and bottom of each sweep.
    pub cycle_pause: Duration,
    /// Settle time after moving into (and back out of) the ready pose.
    pub settle: Duration,
}

impl Default for GestureTiming {
    fn default() -> Self {
        Self {
            frame: Duration::from_millis(10),
            cycle_pause: Duration::from_millis(100),
            settle: Duration::from_secs(1),
        }
    }
}

/// Captured arm pose, restored after the animation.
#[derive(Debug, Clone, Copy)]
struct ArmPose {
    chest: f64,
    shoulder: f64,
    wrist: f64,
}

impl<D: ServoDriver> Robot<D> {
    /// Wave one hand.
    pub fn wave(&self, side: Side, cycles: u32) -> Result<()> {
        self.wave_with_timing(side, cycles, GestureTiming::default())
    }

    pub fn wave_with_timing(&self, side: Side, cycles: u32, timing: GestureTiming) -> Result<()> {
        let profile = profile_for(side);
        let pose = self.capture_arm(side);
        wave_arm(self.driver(), &profile, pose, cycles, timing)
    }

    /// Wave both hands at once: one thread per arm, disjoint joint sets,
    /// joined before returning.
    pub fn wave_both(&self, cycles: u32) -> Result<()> {
        self.wave_both_with_timing(cycles, GestureTiming::default())
    }

    pub fn wave_both_with_timing(&self, cycles: u32, timing: GestureTiming) -> Result<()> {
        let left_pose = self.capture_arm(Side::Left);
        let right_pose = self.capture_arm(Side::Right);
        let driver = self.driver();

        let (left, right) = thread::scope(|scope| {
            let left = scope.spawn(move || wave_arm(driver, &LEFT_WAVE, left_pose, cycles, timing));
            let right =
                scope.spawn(move || wave_arm(driver, &RIGHT_WAVE, right_pose, cycles, timing));
            (left.join(), right.join())
        });

        let left =
            left.unwrap_or_else(|_| Err(RobotError::Gesture("left wave thread panicked".into())));
        let right =
            right.unwrap_or_else(|_| Err(RobotError::Gesture("right wave thread panicked".into())));
        left.and(right)
    }

    fn capture_arm(&self, side: Side) -> ArmPose {
        ArmPose {
            chest: self.angle(side.chest()),
            shoulder: self.angle(side.shoulder()),
            wrist: self.angle(side.wrist()),
        }
    }
}

fn profile_for(side: Side) -> WaveProfile {
    match side {
        Side::Left => LEFT_WAVE,
        Side::Right => RIGHT_WAVE,
    }
}

/// Run one arm's wave and put the arm back where it was, no matter what.
fn wave_arm<D: ServoDriver>(
    driver: &D,
    profile: &WaveProfile,
    pose: ArmPose,
    cycles: u32,
    timing: GestureTiming,
) -> Result<()> {
    tracing::info!(side = %profile.side, "wave gesture starting");
    let outcome = run_wave(driver, profile, cycles, timing);
    if let Err(e) = &outcome {
        tracing::error!(side = %profile.side, error = %e, "wave animation aborted");
    }

    let restore = restore_arm(driver, profile, pose);
    spin_sleep::sleep(timing.settle);
    outcome.and(restore)
}

fn run_wave<D: ServoDriver>(
    driver: &D,
    profile: &WaveProfile,
    cycles: u32,
    timing: GestureTiming,
) -> Result<()> {
    let side = profile.side;

    // Ready pose: arm out, hand up.
    driver.write_angle(side.chest().channel(), profile.chest_ready)?;
    spin_sleep::sleep(timing.settle);
    driver.write_angle(side.shoulder().channel(), profile.shoulder_rest)?;
    driver.write_angle(side.wrist().channel(), profile.wrist_ready)?;

    for cycle in 0..cycles {
        tracing::debug!(side = %side, cycle = cycle + 1, "wave cycle");

        for j in 0..profile.sweep_deg {
            let j = j as f64;
            let shoulder = (profile.shoulder_rest + j).min(profile.shoulder_peak);
            driver.write_angle(side.shoulder().channel(), shoulder)?;
            driver.write_angle(side.wrist().channel(), profile.wrist_ready + j)?;
            spin_sleep::sleep(timing.frame);
        }
        spin_sleep::sleep(timing.cycle_pause);

        for j in (1..=profile.sweep_deg).rev() {
            let j = j as f64;
            let dropped = profile.sweep_deg as f64 - j;
            let shoulder = (profile.shoulder_peak - dropped).max(profile.shoulder_rest);
            driver.write_angle(side.shoulder().channel(), shoulder)?;
            driver.write_angle(side.wrist().channel(), profile.wrist_ready + j)?;
            spin_sleep::sleep(timing.frame);
        }
        spin_sleep::sleep(timing.cycle_pause);
    }

    Ok(())
}

fn restore_arm<D: ServoDriver>(driver: &D, profile: &WaveProfile, pose: ArmPose) -> Result<()> {
    let side = profile.side;
    driver.write_angle(side.chest().channel(), pose.chest)?;
    driver.write_angle(side.shoulder().channel(), pose.shoulder)?;
    driver.write_angle(side.wrist().channel(), pose.wrist)?;
    tracing::debug!(side = %side, "arm restored to original pose");
    Ok(())
}
