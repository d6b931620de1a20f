//! The control loop: signals in, duty cycle out, once per tick.

use std::fmt;
use std::thread;
use std::time::Duration as StdDuration;

use chrono::{Duration, Local, NaiveDate, NaiveDateTime, Timelike};
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{ConfigError, ConfigProvider, HeaterConfig};
use crate::control::calendar::{CalendarError, CalendarSource};
use crate::control::duty::duty_from_charge;
use crate::control::ramp::{self, RampInput};
use crate::control::target::{charge_target, TargetError};
use crate::control::tariff::{TariffEvent, TariffTracker};
use crate::forecast::{ForecastError, ForecastProvider};
use crate::io::{HeaterIo, IoError};
use crate::telemetry::{TariffLabel, TelemetrySink};

/// Nominal evening start of the night-tariff window, used only to seed the
/// tracker when the process starts mid-window.
const BOOTSTRAP_WINDOW_HOUR: u32 = 19;
const BOOTSTRAP_WINDOW_MINUTE: u32 = 50;

/// Outcome of one control tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TickReport {
    /// Time the tick ran.
    pub now: NaiveDateTime,
    /// Night-tariff signal as sampled this tick.
    pub tariff_active: bool,
    /// Charge-enable signal as sampled this tick.
    pub charge_enabled: bool,
    /// Setpoint applied to the heater (%).
    pub setpoint_pct: f64,
    /// End-of-night charge target in effect (%).
    pub target_pct: f64,
}

impl fmt::Display for TickReport {
    /// Formats the operator console row: `NT` while on night tariff, `LF`
    /// while charging is enabled, setpoint (Soll) and target (Doel).
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}   {} {}  Soll = {:4.1}%  Doel = {:4.1}%",
            self.now.format("%d-%m-%Y %H:%M"),
            if self.tariff_active { "NT" } else { "  " },
            if self.charge_enabled { "LF" } else { "  " },
            self.setpoint_pct,
            self.target_pct,
        )
    }
}

/// Source of tick times. The wall clock never runs out; the simulated clock
/// ends the loop by returning `None`.
pub trait TickClock {
    /// Returns the time of the next tick, or `None` when the run is over.
    fn now(&mut self) -> Option<NaiveDateTime>;

    /// Blocks until the next tick is due. A no-op for simulated time.
    fn wait(&mut self);
}

/// Real time, one tick every `tick_secs`.
pub struct WallClock {
    tick: StdDuration,
}

impl WallClock {
    pub fn new(tick_secs: u64) -> Self {
        Self {
            tick: StdDuration::from_secs(tick_secs),
        }
    }
}

impl TickClock for WallClock {
    fn now(&mut self) -> Option<NaiveDateTime> {
        Some(Local::now().naive_local())
    }

    fn wait(&mut self) {
        thread::sleep(self.tick);
    }
}

/// Seeds a tariff tracker for a process starting with no knowledge of the
/// current window.
///
/// The window is assumed to have begun at the most recent nominal evening
/// start (19:50 today if that has passed, otherwise 19:50 yesterday), with
/// the previous window ending 14 hours before that. The first real signal
/// edge replaces these assumptions.
pub fn bootstrap_tracker(now: NaiveDateTime, active: bool) -> TariffTracker {
    let evening = now
        .date()
        .and_hms_opt(BOOTSTRAP_WINDOW_HOUR, BOOTSTRAP_WINDOW_MINUTE, 0)
        .unwrap_or(now);
    let begin = if now > evening {
        evening
    } else {
        evening - Duration::days(1)
    };
    TariffTracker::new(begin, begin - Duration::hours(14), 0, active)
}

/// Startup failure. Unlike per-tick trouble, these abort the process.
#[derive(Debug, Error)]
pub enum StartupError {
    /// Initial configuration could not be loaded.
    #[error(transparent)]
    Config(#[from] ConfigError),
    /// The I/O layer could not be read or driven.
    #[error(transparent)]
    Io(#[from] IoError),
}

/// Failure while recomputing the charge target.
#[derive(Debug, Error)]
enum RefreshError {
    #[error(transparent)]
    Calendar(#[from] CalendarError),
    #[error(transparent)]
    Forecast(#[from] ForecastError),
    #[error(transparent)]
    Target(#[from] TargetError),
}

/// The charge controller, generic over all of its boundaries.
///
/// Production wires GPIO, OpenWeatherMap, and the HTTP sink; simulation and
/// tests substitute in-memory implementations without touching the loop.
pub struct ControlLoop<H, F, T, P, S> {
    heater: H,
    forecaster: F,
    telemetry: T,
    config_provider: P,
    calendar_source: S,
    cfg: HeaterConfig,
    tracker: TariffTracker,
    target_pct: f64,
    target_fresh: bool,
    prev_enabled: bool,
    last_setpoint: f64,
}

impl<H, F, T, P, S> ControlLoop<H, F, T, P, S>
where
    H: HeaterIo,
    F: ForecastProvider,
    T: TelemetrySink,
    P: ConfigProvider,
    S: CalendarSource,
{
    /// Brings the controller up: loads configuration, seeds the tariff
    /// tracker from the current signals, attempts a first target refresh,
    /// and drives the duty output to zero.
    ///
    /// # Errors
    ///
    /// Returns a [`StartupError`] if the configuration cannot be loaded or
    /// the I/O layer is unusable. A failed first refresh is not fatal; the
    /// target stays at zero until the next successful refresh.
    pub fn start(
        heater: H,
        forecaster: F,
        telemetry: T,
        config_provider: P,
        calendar_source: S,
        now: NaiveDateTime,
    ) -> Result<Self, StartupError> {
        let cfg = config_provider.load()?;

        let mut heater = heater;
        let active = heater.tariff_active(now)?;
        let enabled = heater.charge_enabled(now)?;
        let tracker = bootstrap_tracker(now, active);

        let mut controller = Self {
            heater,
            forecaster,
            telemetry,
            config_provider,
            calendar_source,
            cfg,
            tracker,
            target_pct: 0.0,
            target_fresh: false,
            prev_enabled: enabled,
            last_setpoint: 0.0,
        };

        controller.refresh_target(now.date());
        controller.heater.set_duty(now, duty_from_charge(0.0))?;

        info!(
            tariff = active,
            enabled,
            target_pct = controller.target_pct,
            "controller started"
        );
        Ok(controller)
    }

    /// The heater adapter, for inspection after a simulated run.
    pub fn heater(&self) -> &H {
        &self.heater
    }

    /// Runs one control tick at the given time.
    ///
    /// # Errors
    ///
    /// Only I/O failures propagate; configuration, forecast, calendar, and
    /// telemetry trouble is logged and bridged with the previous good values.
    pub fn tick(&mut self, now: NaiveDateTime) -> Result<TickReport, IoError> {
        self.reload_config();

        let tariff_active = self.heater.tariff_active(now)?;
        let charge_enabled = self.heater.charge_enabled(now)?;

        match self.tracker.observe(now, tariff_active) {
            Some(TariffEvent::Started) => info!(%now, "night tariff window started"),
            Some(TariffEvent::Resumed { gap_secs }) => {
                info!(%now, gap_secs, "night tariff resumed after interruption");
            }
            Some(TariffEvent::Ended) => info!(%now, "night tariff window ended"),
            None => {}
        }
        if charge_enabled != self.prev_enabled {
            info!(%now, charge_enabled, "charge-enable signal changed");
            self.prev_enabled = charge_enabled;
        }

        // The target is recomputed once per night, shortly after 23:00. The
        // cycle counts as spent even when the refresh fails, so a bad night
        // costs one forecast call, not one per tick; the flag rearms as soon
        // as the clock leaves the window.
        if now.hour() >= 23 && now.minute() >= 3 {
            if !self.target_fresh {
                self.target_fresh = true;
                self.refresh_target(now.date());
            }
        } else {
            self.target_fresh = false;
        }

        let setpoint_pct = ramp::setpoint(
            &RampInput {
                final_target: self.target_pct,
                tariff_active,
                charge_enabled,
                seconds_into_tariff: self.tracker.seconds_into_tariff(now),
                now,
            },
            self.cfg.tariff.night_duration_secs,
        );

        if (setpoint_pct - self.last_setpoint).abs() > 1.0 {
            info!(
                from = self.last_setpoint,
                to = setpoint_pct,
                "setpoint changed"
            );
        }
        self.last_setpoint = setpoint_pct;

        self.heater.set_duty(now, duty_from_charge(setpoint_pct))?;

        if let Err(e) = self
            .telemetry
            .publish(TariffLabel::from_active(tariff_active), setpoint_pct)
        {
            warn!(error = %e, "telemetry publish failed");
        }

        Ok(TickReport {
            now,
            tariff_active,
            charge_enabled,
            setpoint_pct,
            target_pct: self.target_pct,
        })
    }

    /// Ticks until the clock runs out, passing each report to the callback.
    ///
    /// # Errors
    ///
    /// Returns the first [`IoError`] a tick produces.
    pub fn run(
        &mut self,
        clock: &mut impl TickClock,
        mut on_tick: impl FnMut(&TickReport),
    ) -> Result<(), IoError> {
        while let Some(now) = clock.now() {
            let report = self.tick(now)?;
            on_tick(&report);
            clock.wait();
        }
        Ok(())
    }

    fn reload_config(&mut self) {
        match self.config_provider.load() {
            Ok(cfg) => {
                let errors = cfg.validate();
                if errors.is_empty() {
                    self.cfg = cfg;
                } else {
                    warn!(
                        count = errors.len(),
                        first = %errors[0],
                        "config reload produced invalid values, keeping previous"
                    );
                }
            }
            Err(e) => warn!(error = %e, "config reload failed, keeping previous"),
        }
    }

    fn refresh_target(&mut self, today: NaiveDate) {
        match self.compute_target(today) {
            Ok(target) => {
                self.target_pct = target;
                self.target_fresh = true;
                info!(target_pct = target, "charge target refreshed");
            }
            Err(RefreshError::Target(e)) => {
                // a broken curve is a configuration problem, not weather
                error!(error = %e, "charge target not computable, keeping previous");
            }
            Err(e) => {
                warn!(error = %e, "target refresh failed, keeping previous");
            }
        }
    }

    fn compute_target(&self, today: NaiveDate) -> Result<f64, RefreshError> {
        let calendar = self.calendar_source.load()?;
        let discount = calendar.discount_for(today);
        let forecast = self
            .forecaster
            .tomorrow_forecast(today, self.cfg.forecast.sun_weight_zk)?;
        let target = charge_target(
            forecast.corrected_temperature,
            discount,
            &self.cfg.charge_curve,
        )?;
        Ok(target)
    }
}
