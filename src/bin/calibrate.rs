//! strider-calibrate — interactive per-joint neutral angle tuning.
//!
//! Steps through all 16 joints. For each one the servo tracks the displayed
//! angle live; nudge it until the joint sits at its neutral pose, then save
//! and advance. Saved angles are written to the calibration file (the
//! previous file is kept as a timestamped backup) and loaded by the runtime
//! at startup.

use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use clap::Parser;

use strider::joints::ALL_JOINTS;
use strider::keyboard::{read_key, Key, RawMode};
use strider::{Calibration, JointId, MockDriver, RobotConfig, ServoDriver};

/// Starting angle when a joint has no previous calibration.
const MID_ANGLE: f64 = 135.0;

#[derive(Parser, Debug)]
#[command(name = "strider-calibrate")]
#[command(about = "Interactive servo calibration for the humanoid robot")]
struct Args {
    /// Path to the calibration JSON file to write.
    #[arg(long, default_value = "servo_calibration.json")]
    calibration_path: PathBuf,

    /// Path to the robot configuration JSON file.
    #[arg(long, default_value = "robot_config.json")]
    config_path: PathBuf,

    /// Ignore an existing calibration and start every joint at 135 degrees.
    #[arg(long)]
    fresh: bool,

    /// Run against a simulated driver instead of the PCA9685.
    #[arg(long)]
    sim: bool,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();
    let config = RobotConfig::load(&args.config_path).context("Failed to load robot config")?;

    if args.sim {
        tracing::info!("using simulated servo driver");
        return run_session(&MockDriver::new(), &args);
    }

    // Real hardware on Linux, simulated elsewhere
    #[cfg(target_os = "linux")]
    let driver = strider::Pca9685Driver::new(config.pulse_range())
        .context("Failed to initialize PCA9685")?;

    #[cfg(not(target_os = "linux"))]
    let driver = {
        let _ = &config;
        tracing::warn!("no PCA9685 support on this platform, using simulated driver");
        MockDriver::new()
    };

    run_session(&driver, &args)
}

enum TuneOutcome {
    Saved(f64),
    Skipped,
    Aborted,
}

fn run_session<D: ServoDriver>(driver: &D, args: &Args) -> Result<()> {
    let existing = if !args.fresh && args.calibration_path.exists() {
        match Calibration::load(&args.calibration_path) {
            Ok(existing) => {
                tracing::info!(
                    joints = existing.len(),
                    "seeding from existing calibration"
                );
                existing
            }
            Err(e) => {
                tracing::warn!(error = %e, "existing calibration unreadable, starting fresh");
                Calibration::default()
            }
        }
    } else {
        Calibration::default()
    };

    println!("Servo calibration — find each joint's neutral pose.");
    println!("  <-/->  +/-1 deg    a/d  +/-5 deg    up/down  +/-10 deg");
    println!("  s save & next      k skip           r reset to 135    q abort");
    println!();

    // Start slack so joints can be posed by hand.
    release_all(driver)?;

    let mut calibrated = Calibration::default();

    for (i, joint) in ALL_JOINTS.into_iter().enumerate() {
        println!("[{}/{}] {}", i + 1, ALL_JOINTS.len(), joint);
        let start = existing.get(joint).unwrap_or(MID_ANGLE);

        let outcome = tune_joint(driver, joint, start)?;
        match outcome {
            TuneOutcome::Saved(deg) => println!("  saved {} = {:.0} deg", joint, deg),
            TuneOutcome::Skipped => match existing.get(joint) {
                Some(prev) => println!("  skipped {}, keeping {:.0} deg", joint, prev),
                None => println!("  skipped {}", joint),
            },
            TuneOutcome::Aborted => {
                println!("  aborted, nothing written");
                release_all(driver)?;
                return Ok(());
            }
        }
        record_outcome(&mut calibrated, &existing, joint, &outcome);
        driver.release(joint.channel())?;
    }

    if calibrated.is_empty() {
        tracing::warn!("no joints calibrated, file untouched");
    } else {
        backup_existing(&args.calibration_path)?;
        calibrated.save(&args.calibration_path)?;
        tracing::info!(
            joints = calibrated.len(),
            path = %args.calibration_path.display(),
            "calibration written"
        );
    }

    release_all(driver)?;
    Ok(())
}

fn tune_joint<D: ServoDriver>(driver: &D, joint: JointId, start: f64) -> Result<TuneOutcome> {
    let mut deg = start;

    loop {
        driver.write_angle(joint.channel(), deg)?;
        print!("\r  {:15} ch{:02}  {:3.0} deg   ", joint.name(), joint.channel(), deg);
        io::stdout().flush()?;

        let key = {
            let _raw = RawMode::enter()?;
            read_key()?
        };

        match key {
            Key::Left => deg = (deg - 1.0).max(0.0),
            Key::Right => deg = (deg + 1.0).min(270.0),
            Key::Char('a') => deg = (deg - 5.0).max(0.0),
            Key::Char('d') => deg = (deg + 5.0).min(270.0),
            Key::Down => deg = (deg - 10.0).max(0.0),
            Key::Up => deg = (deg + 10.0).min(270.0),
            Key::Char('r') => deg = MID_ANGLE,
            Key::Char('s') => {
                println!();
                return Ok(TuneOutcome::Saved(deg));
            }
            Key::Char('k') => {
                println!();
                return Ok(TuneOutcome::Skipped);
            }
            Key::Char('q') => {
                println!();
                return Ok(TuneOutcome::Aborted);
            }
            _ => {}
        }
    }
}

/// Fold one joint's outcome into the calibration to be written. Skipping a
/// joint keeps whatever the previous file had, so a partial session never
/// loses earlier tuning.
fn record_outcome(
    calibrated: &mut Calibration,
    existing: &Calibration,
    joint: JointId,
    outcome: &TuneOutcome,
) {
    match outcome {
        TuneOutcome::Saved(deg) => calibrated.set(joint, *deg),
        TuneOutcome::Skipped => {
            if let Some(prev) = existing.get(joint) {
                calibrated.set(joint, prev);
            }
        }
        TuneOutcome::Aborted => {}
    }
}

fn release_all<D: ServoDriver>(driver: &D) -> Result<()> {
    for joint in ALL_JOINTS {
        driver.release(joint.channel())?;
    }
    Ok(())
}

/// Keep the previous calibration around as a timestamped backup.
fn backup_existing(path: &Path) -> Result<()> {
    if !path.exists() {
        return Ok(());
    }
    let stamp = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0);
    let backup = path.with_extension(format!("{}.json", stamp));
    std::fs::rename(path, &backup)
        .with_context(|| format!("Failed to back up calibration to {}", backup.display()))?;
    tracing::info!(backup = %backup.display(), "previous calibration backed up");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skipping_a_joint_keeps_its_previously_saved_angle() {
        let mut existing = Calibration::default();
        existing.set(JointId::LeftHip, 140.0);

        let mut out = Calibration::default();
        record_outcome(&mut out, &existing, JointId::LeftHip, &TuneOutcome::Skipped);
        record_outcome(&mut out, &existing, JointId::LeftKnee, &TuneOutcome::Skipped);
        record_outcome(&mut out, &existing, JointId::LeftWrist, &TuneOutcome::Saved(150.0));

        // skipped with a prior value: carried through
        assert_eq!(out.get(JointId::LeftHip), Some(140.0));
        // skipped with no prior value: still absent
        assert_eq!(out.get(JointId::LeftKnee), None);
        // freshly tuned: the new angle wins
        assert_eq!(out.get(JointId::LeftWrist), Some(150.0));
    }

    #[test]
    fn a_saved_angle_overrides_the_seeded_value() {
        let mut existing = Calibration::default();
        existing.set(JointId::RightKnee, 30.0);

        let mut out = Calibration::default();
        record_outcome(&mut out, &existing, JointId::RightKnee, &TuneOutcome::Saved(42.0));
        assert_eq!(out.get(JointId::RightKnee), Some(42.0));
    }
}
