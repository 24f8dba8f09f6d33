//! strider — keyboard control and motion commands for the servo humanoid.
//!
//! Usage:
//!   strider [--sim] [--calibration-path servo_calibration.json] [COMMAND]
//!
//! Without a command it drops into the interactive control loop: pick a
//! joint, nudge it with the arrow keys, and trigger walks and gestures with
//! single keys.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use strider::joints::ALL_JOINTS;
use strider::keyboard::{read_key, Key, RawMode};
use strider::{Calibration, MockDriver, Robot, RobotConfig, ServoDriver, Side};

#[derive(Parser, Debug)]
#[command(name = "strider")]
#[command(about = "Choreography runtime for a 16-servo humanoid robot")]
struct Args {
    /// Path to the per-robot calibration JSON file.
    #[arg(long, default_value = "servo_calibration.json")]
    calibration_path: PathBuf,

    /// Path to the robot configuration JSON file.
    #[arg(long, default_value = "robot_config.json")]
    config_path: PathBuf,

    /// Run against a simulated driver instead of the PCA9685.
    #[arg(long)]
    sim: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Interactive keyboard control (the default).
    Control,
    /// Walk forward a number of steps.
    Walk {
        #[arg(short, long, default_value_t = 3)]
        steps: u32,
    },
    /// Wave one hand.
    Wave {
        #[arg(value_enum)]
        side: SideArg,
    },
    /// Wave both hands at once.
    Both,
    /// Move every joint to its calibrated standby angle.
    Standby,
    /// De-energize all servos.
    Release,
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum SideArg {
    Left,
    Right,
}

impl From<SideArg> for Side {
    fn from(side: SideArg) -> Self {
        match side {
            SideArg::Left => Side::Left,
            SideArg::Right => Side::Right,
        }
    }
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

    // A broken calibration file is tolerated: warn and stand on the defaults.
    let calibration = match Calibration::load_or_default(&args.calibration_path) {
        Ok(calibration) => calibration,
        Err(e) => {
            tracing::warn!(error = %e, "ignoring calibration, using default pose");
            Calibration::default()
        }
    };

    let command = args.command.unwrap_or(Command::Control);

    if args.sim {
        tracing::info!("using simulated servo driver");
        let robot = Robot::with_calibration(MockDriver::new(), &calibration);
        return run(robot, command, &config);
    }

    // Real hardware on Linux, simulated elsewhere
    #[cfg(target_os = "linux")]
    let robot = {
        let driver = strider::Pca9685Driver::new(config.pulse_range())
            .context("Failed to initialize PCA9685")?;
        Robot::with_calibration(driver, &calibration)
    };

    #[cfg(not(target_os = "linux"))]
    let robot = {
        tracing::warn!("no PCA9685 support on this platform, using simulated driver");
        Robot::with_calibration(MockDriver::new(), &calibration)
    };

    run(robot, command, &config)
}

fn run<D: ServoDriver>(mut robot: Robot<D>, command: Command, config: &RobotConfig) -> Result<()> {
    robot.go_to_standby()?;

    match command {
        Command::Control => control_loop(&mut robot, config),
        Command::Walk { steps } => {
            robot.walk_forward_with_pause(steps, Duration::from_millis(config.step_pause_ms))?;
            Ok(())
        }
        Command::Wave { side } => {
            robot.wave(side.into(), config.wave_cycles)?;
            Ok(())
        }
        Command::Both => {
            robot.wave_both(config.wave_cycles)?;
            Ok(())
        }
        Command::Standby => Ok(()),
        Command::Release => {
            robot.release_all()?;
            Ok(())
        }
    }
}

/// Acquire raw mode only for the duration of one keypress so ordinary
/// printing (and log lines) stay well-formed in between.
fn next_key() -> io::Result<Key> {
    let _raw = RawMode::enter()?;
    read_key()
}

fn control_loop<D: ServoDriver>(robot: &mut Robot<D>, config: &RobotConfig) -> Result<()> {
    println!("Keyboard servo control");
    println!("  1-9     select joint       n/p  next/prev joint");
    println!("  <-/->   nudge +/-5 deg");
    println!("  w walk  s step  h wave  b both hands  r standby  q quit");

    let mut selected = 0usize;

    loop {
        let joint = ALL_JOINTS[selected];
        print!(
            "\r[{}] {} (ch {}) at {:.0} deg > ",
            selected + 1,
            joint,
            joint.channel(),
            robot.angle(joint)
        );
        io::stdout().flush()?;

        match next_key()? {
            Key::Char('q') => {
                println!();
                break;
            }
            Key::Char('w') => {
                println!("\nwalking forward...");
                robot.walk_forward_with_pause(3, Duration::from_millis(config.step_pause_ms))?;
            }
            Key::Char('s') => {
                println!("\nsingle step...");
                robot.step_forward()?;
            }
            Key::Char('h') => {
                println!("\nwaving...");
                if let Err(e) = robot.wave(Side::Right, config.wave_cycles) {
                    tracing::error!(error = %e, "wave failed");
                }
            }
            Key::Char('b') => {
                println!("\nwaving both hands...");
                if let Err(e) = robot.wave_both(config.wave_cycles) {
                    tracing::error!(error = %e, "wave failed");
                }
            }
            Key::Char('r') => {
                println!("\nback to standby...");
                robot.go_to_standby()?;
            }
            Key::Char('n') => selected = (selected + 1) % ALL_JOINTS.len(),
            Key::Char('p') => selected = (selected + ALL_JOINTS.len() - 1) % ALL_JOINTS.len(),
            Key::Char(c) if c.is_ascii_digit() && c != '0' => {
                selected = (c as usize - '1' as usize).min(ALL_JOINTS.len() - 1);
            }
            Key::Right => robot.nudge_joint(joint, 5.0)?,
            Key::Left => robot.nudge_joint(joint, -5.0)?,
            _ => {}
        }
    }

    Ok(())
}
