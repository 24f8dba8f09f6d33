//! PCA9685 servo driver — logical angles to PWM pulses.
//!
//! The controller runs at 50 Hz (20 ms period, 4096 ticks). A logical angle
//! in [0,270] maps linearly onto a pulse-width window and from there to a
//! tick count. Writes are fire-and-forget: a failed bus write surfaces as a
//! hardware fault and is never retried.

use std::sync::Mutex;

use crate::error::{Result, RobotError};
use crate::joints::{clamp_angle, ANGLE_MAX};

/// PWM ticks per period (12-bit counter).
const TICKS_PER_PERIOD: f64 = 4096.0;
/// Highest tick the OFF register can hold. Bit 12 of LEDn_OFF_H is the
/// full-off flag, so a larger count would de-energize the channel.
const TICKS_MAX: f64 = 4095.0;
/// Period length at 50 Hz, in microseconds.
const PERIOD_US: f64 = 20_000.0;

/// Pulse-width window the angle range maps onto.
///
/// The default is 500–3000 µs. Some of the servos were originally tuned
/// against a 300–2900 µs window instead; that variant is reachable through
/// the config file rather than a second code path.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PulseRange {
    pub min_us: f64,
    pub max_us: f64,
}

impl Default for PulseRange {
    fn default() -> Self {
        Self {
            min_us: 500.0,
            max_us: 3000.0,
        }
    }
}

impl PulseRange {
    /// Pulse width for a (pre-clamped) angle.
    #[inline]
    pub fn pulse_us(&self, deg: f64) -> f64 {
        self.min_us + (deg / ANGLE_MAX) * (self.max_us - self.min_us)
    }

    /// Tick count for a (pre-clamped) angle, assuming 50 Hz / 4096 ticks.
    /// Bounded to the counter so a misconfigured pulse window (wider than
    /// the 20 ms period) can never set the full-off bit.
    #[inline]
    pub fn ticks(&self, deg: f64) -> u16 {
        let ticks = self.pulse_us(deg) * TICKS_PER_PERIOD / PERIOD_US;
        ticks.clamp(0.0, TICKS_MAX) as u16
    }
}

/// Hardware seam for the 16-channel PWM controller.
///
/// Methods take `&self` (impls guard the bus internally) so the two-handed
/// gesture can drive disjoint channels from two threads through one driver.
pub trait ServoDriver: Send + Sync {
    /// Clamp `deg` to [0,270] and command the channel. Side effect only.
    fn write_angle(&self, channel: u8, deg: f64) -> Result<()>;

    /// De-energize the channel (duty cycle to zero).
    fn release(&self, channel: u8) -> Result<()>;
}

// ── Hardware implementation (Linux only — requires rppal / I2C) ──

#[cfg(target_os = "linux")]
mod hw {
    use super::{PulseRange, ServoDriver};
    use crate::error::{Result, RobotError};
    use crate::joints::clamp_angle;
    use anyhow::Context;
    use rppal::i2c::I2c;
    use std::sync::Mutex;
    use std::thread;
    use std::time::Duration;

    // PCA9685 at its default address
    const PCA9685_ADDR: u16 = 0x40;

    // Register map
    const MODE1: u8 = 0x00;
    const PRESCALE: u8 = 0xFE;
    const LED0_ON_L: u8 = 0x06;

    // MODE1 bits
    const MODE1_SLEEP: u8 = 0x10;
    const MODE1_RESTART: u8 = 0x80;
    const MODE1_AUTO_INC: u8 = 0x20;

    // LEDn_OFF_H bit that forces the output permanently low
    const FULL_OFF: u8 = 0x10;

    /// PCA9685 over the Pi's I2C bus.
    pub struct Pca9685Driver {
        i2c: Mutex<I2c>,
        pulse: PulseRange,
    }

    impl Pca9685Driver {
        /// Open the bus and program the controller for 50 Hz output.
        pub fn new(pulse: PulseRange) -> anyhow::Result<Self> {
            let mut i2c = I2c::new().context("Failed to open I2C bus")?;
            i2c.set_slave_address(PCA9685_ADDR)
                .context("Failed to set I2C slave address")?;

            // prescale = 25 MHz / (4096 * 50 Hz) - 1
            let prescale: u8 = 121;

            i2c.smbus_write_byte(MODE1, MODE1_SLEEP)
                .context("Failed to put PCA9685 to sleep")?;
            i2c.smbus_write_byte(PRESCALE, prescale)
                .context("Failed to set PCA9685 prescale")?;
            i2c.smbus_write_byte(MODE1, 0x00)
                .context("Failed to wake PCA9685")?;
            thread::sleep(Duration::from_millis(5));
            i2c.smbus_write_byte(MODE1, MODE1_RESTART | MODE1_AUTO_INC)
                .context("Failed to restart PCA9685")?;

            tracing::info!("PCA9685 initialized at 50 Hz (pulse window {:?})", pulse);

            Ok(Self {
                i2c: Mutex::new(i2c),
                pulse,
            })
        }

        fn write_channel(&self, channel: u8, on: u16, off_l: u8, off_h: u8) -> Result<()> {
            let reg = LED0_ON_L + 4 * channel;
            let buf = [(on & 0xFF) as u8, (on >> 8) as u8, off_l, off_h];
            let mut i2c = self.i2c.lock().unwrap_or_else(|e| e.into_inner());
            i2c.block_write(reg, &buf)
                .map_err(|e| RobotError::hardware(channel, e.to_string()))
        }
    }

    impl ServoDriver for Pca9685Driver {
        fn write_angle(&self, channel: u8, deg: f64) -> Result<()> {
            let ticks = self.pulse.ticks(clamp_angle(deg));
            self.write_channel(channel, 0, (ticks & 0xFF) as u8, (ticks >> 8) as u8)
        }

        fn release(&self, channel: u8) -> Result<()> {
            self.write_channel(channel, 0, 0, FULL_OFF)
        }
    }
}

#[cfg(target_os = "linux")]
pub use hw::Pca9685Driver;

// ── Mock implementation (always available) ──

/// One recorded driver call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DriverCall {
    /// Angle as commanded, after clamping.
    Write { channel: u8, deg: f64 },
    Release { channel: u8 },
}

/// Recording driver for tests and for running without hardware.
///
/// Records every call post-clamp; can be armed to fail after a number of
/// writes to exercise recovery paths.
#[derive(Default)]
pub struct MockDriver {
    calls: Mutex<Vec<DriverCall>>,
    writes_before_failure: Mutex<Option<usize>>,
}

impl MockDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n`th write fail (0 = the very next write).
    pub fn fail_after_writes(&self, n: usize) {
        *self.writes_before_failure.lock().unwrap_or_else(|e| e.into_inner()) = Some(n);
    }

    pub fn calls(&self) -> Vec<DriverCall> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Last angle commanded on a channel, if any.
    pub fn last_write(&self, channel: u8) -> Option<f64> {
        self.calls()
            .iter()
            .rev()
            .find_map(|call| match call {
                DriverCall::Write { channel: ch, deg } if *ch == channel => Some(*deg),
                _ => None,
            })
    }

    /// Full angle sequence commanded on a channel.
    pub fn writes_for(&self, channel: u8) -> Vec<f64> {
        self.calls()
            .iter()
            .filter_map(|call| match call {
                DriverCall::Write { channel: ch, deg } if *ch == channel => Some(*deg),
                _ => None,
            })
            .collect()
    }
}

impl ServoDriver for MockDriver {
    fn write_angle(&self, channel: u8, deg: f64) -> Result<()> {
        let deg = clamp_angle(deg);
        {
            let mut fail = self.writes_before_failure.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(remaining) = fail.as_mut() {
                if *remaining == 0 {
                    *fail = None;
                    return Err(RobotError::hardware(channel, "injected fault"));
                }
                *remaining -= 1;
            }
        }
        tracing::debug!(channel, deg, "mock write");
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(DriverCall::Write { channel, deg });
        Ok(())
    }

    fn release(&self, channel: u8) -> Result<()> {
        tracing::debug!(channel, "mock release");
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(DriverCall::Release { channel });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pulse_window_endpoints() {
        let pulse = PulseRange::default();
        assert!((pulse.pulse_us(0.0) - 500.0).abs() < 1e-9);
        assert!((pulse.pulse_us(270.0) - 3000.0).abs() < 1e-9);
        // 500 µs * 4096 / 20000 = 102.4 → 102 ticks
        assert_eq!(pulse.ticks(0.0), 102);
        // 3000 µs → 614.4 → 614 ticks
        assert_eq!(pulse.ticks(270.0), 614);
    }

    #[test]
    fn oversized_pulse_window_never_exceeds_the_counter() {
        // a window wider than the 20 ms period must saturate, not wrap into
        // the full-off bit
        let pulse = PulseRange {
            min_us: 500.0,
            max_us: 30_000.0,
        };
        assert_eq!(pulse.ticks(270.0), 4095);
        for deg in [0.0, 135.0, 270.0] {
            assert!(pulse.ticks(deg) <= 4095);
        }

        let negative = PulseRange {
            min_us: -100.0,
            max_us: 3000.0,
        };
        assert_eq!(negative.ticks(0.0), 0);
    }

    #[test]
    fn out_of_range_angle_is_clamped() {
        let driver = MockDriver::new();
        driver.write_angle(0, 999.0).unwrap();
        driver.write_angle(0, -40.0).unwrap();
        assert_eq!(
            driver.writes_for(0),
            vec![270.0, 0.0],
            "driver must clamp before commanding"
        );
    }

    #[test]
    fn injected_fault_fires_once() {
        let driver = MockDriver::new();
        driver.fail_after_writes(1);
        assert!(driver.write_angle(3, 90.0).is_ok());
        assert!(driver.write_angle(3, 91.0).is_err());
        assert!(driver.write_angle(3, 92.0).is_ok());
        assert_eq!(driver.writes_for(3), vec![90.0, 92.0]);
    }
}
