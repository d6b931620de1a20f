//! Shared test fixtures for integration tests.

use chrono::{NaiveDate, NaiveDateTime};

use night_charger::config::{HeaterConfig, StaticConfig};
use night_charger::control::calendar::{ChargeCalendar, StaticCalendar};
use night_charger::forecast::FixedForecast;
use night_charger::runner::{ControlLoop, TickReport};
use night_charger::sim::clock::SimClock;
use night_charger::sim::heater::SimulatedHeater;
use night_charger::telemetry::RecordingTelemetry;

/// The reference day all fixtures run on.
pub fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 11, 18).unwrap()
}

/// A time on the reference day.
pub fn at(hour: u32, minute: u32) -> NaiveDateTime {
    day().and_hms_opt(hour, minute, 0).unwrap()
}

pub type SimController =
    ControlLoop<SimulatedHeater, FixedForecast, RecordingTelemetry, StaticConfig, StaticCalendar>;

/// Starts a controller wired entirely to in-memory adapters.
pub fn start_controller(
    start: NaiveDateTime,
    temperature: f64,
    calendar: ChargeCalendar,
) -> SimController {
    ControlLoop::start(
        SimulatedHeater::new(),
        FixedForecast { temperature },
        RecordingTelemetry::default(),
        StaticConfig(HeaterConfig::default()),
        StaticCalendar(calendar),
        start,
    )
    .expect("startup should succeed")
}

/// Runs one simulated day at 60 s ticks and returns the full record.
pub fn run_one_day(controller: &mut SimController, start: NaiveDateTime) -> Vec<TickReport> {
    let mut clock = SimClock::one_day(start);
    let mut reports = Vec::new();
    controller
        .run(&mut clock, |report| reports.push(*report))
        .expect("simulated run should not fail");
    reports
}
