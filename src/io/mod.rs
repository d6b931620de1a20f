//! Hardware boundary: digital inputs and the duty-cycle output.

pub mod export;
pub mod gpio;

use chrono::NaiveDateTime;
use thiserror::Error;

/// Failure talking to the I/O layer.
///
/// Construction errors (unexported pin, missing PWM channel) are programming
/// or wiring errors and abort startup; per-tick read/write errors propagate
/// out of the control loop.
#[derive(Debug, Error)]
pub enum IoError {
    /// GPIO access failed.
    #[error("gpio error: {0}")]
    Gpio(#[from] sysfs_gpio::Error),
    /// Sysfs PWM access failed.
    #[error("pwm error on {path}: {source}")]
    Pwm {
        /// Sysfs path being written.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
}

/// The heater's electrical interface, already normalized.
///
/// Implementations receive the current time so the simulated adapter can
/// derive its waveforms without sharing a clock with the control loop; the
/// hardware adapter ignores it.
pub trait HeaterIo {
    /// Samples the night-tariff signal.
    ///
    /// # Errors
    ///
    /// Returns an [`IoError`] if the input cannot be read.
    fn tariff_active(&mut self, now: NaiveDateTime) -> Result<bool, IoError>;

    /// Samples the charge-enable signal.
    ///
    /// # Errors
    ///
    /// Returns an [`IoError`] if the input cannot be read.
    fn charge_enabled(&mut self, now: NaiveDateTime) -> Result<bool, IoError>;

    /// Applies a duty cycle in percent to the charging output.
    ///
    /// # Errors
    ///
    /// Returns an [`IoError`] if the output cannot be driven.
    fn set_duty(&mut self, now: NaiveDateTime, duty_pct: f64) -> Result<(), IoError>;
}
