//! Choreography runtime for a 16-servo humanoid robot.
//!
//! Open-loop motion control over a PCA9685 PWM controller: a joint registry,
//! a smooth interpolation primitive, wave gestures, and a five-phase walking
//! gait, with per-robot calibration persisted as JSON. No sensors, no
//! inverse kinematics — every motion is a fixed angle choreography.

pub mod calibration;
pub mod config;
pub mod driver;
pub mod error;
pub mod gait;
pub mod gesture;
pub mod joints;
pub mod keyboard;
pub mod robot;

pub use calibration::Calibration;
pub use config::RobotConfig;
pub use driver::{MockDriver, PulseRange, ServoDriver};
pub use error::{Result, RobotError};
pub use joints::{JointId, Side};
pub use robot::Robot;

#[cfg(target_os = "linux")]
pub use driver::Pca9685Driver;
