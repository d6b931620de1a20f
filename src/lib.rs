//! Charge controller for an electric night-storage heater.
//!
//! Once per control tick the loop decides what fraction of the night-tariff
//! charging window to use, based on a forecast-derived end-of-night target,
//! a vacation/season discount, and a piecewise ramp over time-of-day and
//! elapsed tariff time.

pub mod config;
/// Duty conversion, target curve, calendar policy, tariff tracking, ramp.
pub mod control;
pub mod forecast;
pub mod io;
pub mod reporting;
pub mod runner;
pub mod sim;
pub mod telemetry;
