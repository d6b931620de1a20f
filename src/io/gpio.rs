//! Raspberry Pi adapter: sysfs GPIO inputs and a sysfs PWM duty output.

use std::fs;
use std::path::PathBuf;

use chrono::NaiveDateTime;
use sysfs_gpio::{Direction, Pin};

use super::{HeaterIo, IoError};
use crate::config::GpioConfig;

/// PWM period matching the original 0.1 Hz software PWM (nanoseconds).
const PWM_PERIOD_NS: u64 = 10_000_000_000;

/// Slow PWM channel exposed through `/sys/class/pwm`.
struct SysfsPwm {
    dir: PathBuf,
}

impl SysfsPwm {
    /// Exports and configures the channel; fails fast on any setup problem.
    fn new(chip: u32, channel: u32) -> Result<Self, IoError> {
        let chip_dir = PathBuf::from(format!("/sys/class/pwm/pwmchip{chip}"));
        let dir = chip_dir.join(format!("pwm{channel}"));
        if !dir.exists() {
            write_sysfs(chip_dir.join("export"), &channel.to_string())?;
        }
        let pwm = Self { dir };
        pwm.write("period", &PWM_PERIOD_NS.to_string())?;
        pwm.write("enable", "1")?;
        Ok(pwm)
    }

    fn write(&self, file: &str, value: &str) -> Result<(), IoError> {
        write_sysfs(self.dir.join(file), value)
    }

    fn set_duty_pct(&self, duty_pct: f64) -> Result<(), IoError> {
        let clamped = duty_pct.clamp(0.0, 100.0);
        let ns = (PWM_PERIOD_NS as f64 * clamped / 100.0) as u64;
        self.write("duty_cycle", &ns.to_string())
    }
}

fn write_sysfs(path: PathBuf, value: &str) -> Result<(), IoError> {
    fs::write(&path, value).map_err(|source| IoError::Pwm {
        path: path.display().to_string(),
        source,
    })
}

/// Hardware adapter for the relay cabinet wiring.
///
/// Both inputs sit behind pull-ups and read active low, exactly as the
/// original installation was wired; the normalization happens here so the
/// control loop only ever sees plain booleans.
pub struct GpioHeater {
    tariff_pin: Pin,
    enable_pin: Pin,
    pwm: SysfsPwm,
}

impl GpioHeater {
    /// Sets up pins and the PWM channel from the GPIO configuration.
    ///
    /// # Errors
    ///
    /// Any export, direction, or PWM setup failure is returned immediately;
    /// an unusable I/O layer must abort startup rather than surface later
    /// as per-tick noise.
    pub fn new(cfg: &GpioConfig) -> Result<Self, IoError> {
        let tariff_pin = Pin::new(cfg.tariff_pin);
        tariff_pin.export()?;
        tariff_pin.set_direction(Direction::In)?;

        let enable_pin = Pin::new(cfg.enable_pin);
        enable_pin.export()?;
        enable_pin.set_direction(Direction::In)?;

        let pwm = SysfsPwm::new(cfg.pwm_chip, cfg.pwm_channel)?;

        Ok(Self {
            tariff_pin,
            enable_pin,
            pwm,
        })
    }

    fn read_active_low(pin: Pin) -> Result<bool, IoError> {
        Ok(pin.get_value()? == 0)
    }
}

impl HeaterIo for GpioHeater {
    fn tariff_active(&mut self, _now: NaiveDateTime) -> Result<bool, IoError> {
        Self::read_active_low(self.tariff_pin)
    }

    fn charge_enabled(&mut self, _now: NaiveDateTime) -> Result<bool, IoError> {
        Self::read_active_low(self.enable_pin)
    }

    fn set_duty(&mut self, _now: NaiveDateTime, duty_pct: f64) -> Result<(), IoError> {
        self.pwm.set_duty_pct(duty_pct)
    }
}
