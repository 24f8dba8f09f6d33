//! Error kinds for the choreography core.
//!
//! A small closed taxonomy: hardware faults from the PWM bus, calibration
//! file problems, and gait phase failures (which wrap the underlying fault).

use std::path::PathBuf;

pub type Result<T> = std::result::Result<T, RobotError>;

#[derive(Debug, thiserror::Error)]
pub enum RobotError {
    /// A write to the PWM controller failed. Never retried.
    #[error("servo channel {channel}: {message}")]
    Hardware { channel: u8, message: String },

    /// The calibration file exists but could not be parsed.
    #[error("calibration file {}: {message}", path.display())]
    CalibrationFormat { path: PathBuf, message: String },

    /// A gait phase aborted. Carries the phase name for the log line.
    #[error("gait phase {phase} failed")]
    GaitPhase {
        phase: String,
        #[source]
        source: Box<RobotError>,
    },

    /// A gesture animation failed (including a panicked gesture thread).
    #[error("gesture failed: {0}")]
    Gesture(String),
}

impl RobotError {
    pub fn hardware(channel: u8, message: impl Into<String>) -> Self {
        Self::Hardware {
            channel,
            message: message.into(),
        }
    }
}
