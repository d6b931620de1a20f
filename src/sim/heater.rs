//! A virtual heater driven by a scripted day of input signals.

use chrono::{NaiveDateTime, NaiveTime, Timelike};

use crate::control::duty::charge_from_duty;
use crate::io::{HeaterIo, IoError};

fn at(hour: u32, minute: u32) -> NaiveTime {
    NaiveTime::from_hms_opt(hour, minute, 0).unwrap_or(NaiveTime::MIN)
}

/// Simulated heater reproducing the signal pattern of a recorded winter day.
///
/// The night tariff runs 22:50 to 04:50 with an extra evening block from
/// 19:50 to 21:50; the utility additionally enables charging over midday
/// (12:00 to 16:30) and the early evening (17:20 to 21:50). Applied duty
/// cycles are recorded as charge percentages for later inspection.
pub struct SimulatedHeater {
    history: Vec<(NaiveDateTime, f64)>,
}

impl SimulatedHeater {
    pub fn new() -> Self {
        Self {
            history: Vec::new(),
        }
    }

    /// Recorded `(time, charge percent)` pairs, one per applied duty.
    pub fn history(&self) -> &[(NaiveDateTime, f64)] {
        &self.history
    }

    fn tariff_at(time: NaiveTime) -> bool {
        time < at(4, 50) || time >= at(22, 50) || (time > at(19, 50) && time <= at(21, 50))
    }

    fn enabled_at(time: NaiveTime) -> bool {
        Self::tariff_at(time)
            || (time > at(12, 0) && time <= at(16, 30))
            || (time > at(17, 20) && time <= at(21, 50))
    }
}

impl Default for SimulatedHeater {
    fn default() -> Self {
        Self::new()
    }
}

impl HeaterIo for SimulatedHeater {
    fn tariff_active(&mut self, now: NaiveDateTime) -> Result<bool, IoError> {
        Ok(Self::tariff_at(now.time()))
    }

    fn charge_enabled(&mut self, now: NaiveDateTime) -> Result<bool, IoError> {
        Ok(Self::enabled_at(now.time()))
    }

    fn set_duty(&mut self, now: NaiveDateTime, duty_pct: f64) -> Result<(), IoError> {
        // drop the sub-minute remainder so history lines up with sim ticks
        let stamp = now.with_second(0).unwrap_or(now);
        self.history.push((stamp, charge_from_duty(duty_pct)));
        Ok(())
    }
}
