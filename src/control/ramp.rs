//! Instantaneous setpoint from the final target and the clock.
//!
//! Two independent linear ramps, combined by maximum:
//!
//! * an evening taper between 18:00 and 22:00 that starts at the full target
//!   and decays to zero, topping the heater up for the evening hours, and
//! * a backwards-controlled pre-morning ramp that starts charging as late as
//!   possible and reaches the full target ten minutes before the tariff
//!   window closes.

use chrono::NaiveDateTime;

/// Lead subtracted from the elapsed tariff time so the morning ramp lands
/// ten minutes before tariff end.
pub const RAMP_LEAD_SECS: i64 = 600;

const EVENING_START_HOUR: u32 = 18;
const EVENING_END_HOUR: u32 = 22;

/// Inputs for one setpoint computation. Built fresh each tick, never stored.
#[derive(Debug, Clone, Copy)]
pub struct RampInput {
    /// Desired end-of-night charge level (%).
    pub final_target: f64,
    /// Night tariff currently active.
    pub tariff_active: bool,
    /// External charge-enable signal asserted.
    pub charge_enabled: bool,
    /// Tariff benefit so far, interruptions excluded (may be negative).
    pub seconds_into_tariff: i64,
    /// Current time of day.
    pub now: NaiveDateTime,
}

/// Computes the instantaneous charge setpoint in percent.
///
/// Zero whenever charging is not both enabled and on night tariff. Otherwise
/// the maximum of the evening taper and the pre-morning ramp. Pure function;
/// assumes `night_duration_secs > 0`.
pub fn setpoint(input: &RampInput, night_duration_secs: u32) -> f64 {
    if !input.charge_enabled || !input.tariff_active {
        return 0.0;
    }

    f64::max(
        evening_contribution(input.final_target, input.now),
        morning_contribution(
            input.final_target,
            input.seconds_into_tariff,
            night_duration_secs,
        ),
    )
}

/// Evening taper: full target at 18:00 decaying linearly to zero at 22:00.
///
/// Active only strictly inside the window; outside it contributes nothing.
fn evening_contribution(final_target: f64, now: NaiveDateTime) -> f64 {
    let date = now.date();
    let Some(start) = date.and_hms_opt(EVENING_START_HOUR, 0, 0) else {
        return 0.0;
    };
    let Some(end) = date.and_hms_opt(EVENING_END_HOUR, 0, 0) else {
        return 0.0;
    };
    if !(start < now && now < end) {
        return 0.0;
    }
    let remaining = (end - now).num_seconds() as f64;
    let window = (end - start).num_seconds() as f64;
    final_target * remaining / window
}

/// Pre-morning ramp, backwards-controlled from the end of the tariff window.
///
/// `remaining` is the percentage of the window still ahead, with the
/// ten-minute lead already spent. Too early contributes nothing; in the
/// final ten minutes the target is halved so the relay is not switched off
/// under full load right at cutoff.
fn morning_contribution(final_target: f64, seconds_into_tariff: i64, night_duration_secs: u32) -> f64 {
    // negative elapsed (clock skew) clamps here, not in the tracker
    let elapsed = seconds_into_tariff.max(0) as f64;
    let remaining = 100.0 - 100.0 * (elapsed + RAMP_LEAD_SECS as f64) / f64::from(night_duration_secs);

    if remaining > final_target {
        0.0
    } else if remaining < 0.0 {
        final_target / 2.0
    } else {
        final_target - remaining
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    const NIGHT_8H: u32 = 28_800;

    fn at(h: u32, m: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 11, 18)
            .unwrap()
            .and_hms_opt(h, m, s)
            .unwrap()
    }

    fn input(target: f64, secs: i64, now: NaiveDateTime) -> RampInput {
        RampInput {
            final_target: target,
            tariff_active: true,
            charge_enabled: true,
            seconds_into_tariff: secs,
            now,
        }
    }

    #[test]
    fn disabled_or_day_fare_means_zero() {
        let mut i = input(60.0, 20_000, at(20, 0, 0));
        i.charge_enabled = false;
        assert_eq!(setpoint(&i, NIGHT_8H), 0.0);

        let mut i = input(60.0, 20_000, at(20, 0, 0));
        i.tariff_active = false;
        assert_eq!(setpoint(&i, NIGHT_8H), 0.0);
    }

    #[test]
    fn evening_taper_full_at_window_open() {
        // one second inside the (exclusive) window, essentially the full target
        let i = input(60.0, 0, at(18, 0, 1));
        let s = setpoint(&i, NIGHT_8H);
        assert!((s - 60.0).abs() < 0.01, "got {s}");
    }

    #[test]
    fn evening_taper_zero_at_window_close() {
        let i = input(60.0, 0, at(22, 0, 0));
        assert_eq!(setpoint(&i, NIGHT_8H), 0.0);
    }

    #[test]
    fn evening_taper_halfway() {
        let i = input(60.0, 0, at(20, 0, 0));
        let s = setpoint(&i, NIGHT_8H);
        assert!((s - 30.0).abs() < 1e-9, "got {s}");
    }

    #[test]
    fn setpoint_continuous_at_window_close() {
        let before = setpoint(&input(60.0, 0, at(21, 59, 59)), NIGHT_8H);
        let after = setpoint(&input(60.0, 0, at(22, 0, 1)), NIGHT_8H);
        assert!(before < 0.05, "taper should have decayed, got {before}");
        assert_eq!(after, 0.0);
    }

    #[test]
    fn morning_ramp_quiet_early_in_window() {
        // at window start, remaining ~97.9% > 60% target
        let i = input(60.0, 0, at(23, 0, 0));
        assert_eq!(setpoint(&i, NIGHT_8H), 0.0);
    }

    #[test]
    fn morning_ramp_reaches_target_at_lead() {
        // ten minutes remaining: elapsed + lead == duration, remaining == 0
        let i = input(50.0, i64::from(NIGHT_8H) - RAMP_LEAD_SECS, at(5, 40, 0));
        let s = setpoint(&i, NIGHT_8H);
        assert!((s - 50.0).abs() < 1e-9, "got {s}");
    }

    #[test]
    fn morning_ramp_midpoint() {
        // remaining = 100 - 100*(13800+600)/28800 = 50; target 60 -> 60-50 = 10
        let i = input(60.0, 13_800, at(3, 0, 0));
        let s = setpoint(&i, NIGHT_8H);
        assert!((s - 10.0).abs() < 1e-9, "got {s}");
    }

    #[test]
    fn final_ten_minutes_halve_the_target() {
        let i = input(50.0, i64::from(NIGHT_8H) - RAMP_LEAD_SECS + 60, at(5, 41, 0));
        let s = setpoint(&i, NIGHT_8H);
        assert!((s - 25.0).abs() < 1e-9, "got {s}");
    }

    #[test]
    fn negative_elapsed_clamps_to_window_start() {
        let skewed = input(60.0, -500, at(23, 30, 0));
        let clean = input(60.0, 0, at(23, 30, 0));
        assert_eq!(setpoint(&skewed, NIGHT_8H), setpoint(&clean, NIGHT_8H));
    }

    #[test]
    fn maximum_of_both_ramps_wins() {
        // late evening with the window almost closed: taper is small, but a
        // long-running tariff window makes the morning ramp dominate
        let i = input(60.0, 26_000, at(21, 30, 0));
        let taper = 60.0 * (30.0 * 60.0) / (4.0 * 3600.0); // 7.5
        let s = setpoint(&i, NIGHT_8H);
        assert!(s > taper, "morning ramp should dominate: {s}");
    }
}
