//! Post-hoc summary of a simulated (or recorded) day of control ticks.

use std::fmt;

use crate::runner::TickReport;

/// Aggregate figures for one run, computed from the complete tick record so
/// the summary always agrees with the exported history.
#[derive(Debug, Clone)]
pub struct DaySummary {
    /// Number of ticks in the record.
    pub ticks: usize,
    /// Highest setpoint applied (%).
    pub peak_setpoint_pct: f64,
    /// Hours with a nonzero setpoint.
    pub charging_hours: f64,
    /// Hours on night tariff.
    pub tariff_hours: f64,
    /// Charge target in effect at the end of the run (%).
    pub final_target_pct: f64,
}

impl DaySummary {
    /// Computes the summary from the tick record.
    ///
    /// # Arguments
    ///
    /// * `reports` - Complete tick record of the run
    /// * `tick_secs` - Seconds between ticks
    pub fn from_reports(reports: &[TickReport], tick_secs: u64) -> Self {
        let mut peak = 0.0_f64;
        let mut charging_ticks = 0_usize;
        let mut tariff_ticks = 0_usize;

        for r in reports {
            peak = peak.max(r.setpoint_pct);
            if r.setpoint_pct > 0.0 {
                charging_ticks += 1;
            }
            if r.tariff_active {
                tariff_ticks += 1;
            }
        }

        let tick_hours = tick_secs as f64 / 3600.0;
        Self {
            ticks: reports.len(),
            peak_setpoint_pct: peak,
            charging_hours: charging_ticks as f64 * tick_hours,
            tariff_hours: tariff_ticks as f64 * tick_hours,
            final_target_pct: reports.last().map_or(0.0, |r| r.target_pct),
        }
    }
}

impl fmt::Display for DaySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "--- Day Summary ---")?;
        writeln!(f, "Ticks:            {}", self.ticks)?;
        writeln!(f, "Peak setpoint:    {:.1}%", self.peak_setpoint_pct)?;
        writeln!(f, "Charging time:    {:.1} h", self.charging_hours)?;
        writeln!(f, "Night tariff:     {:.1} h", self.tariff_hours)?;
        write!(f, "Final target:     {:.1}%", self.final_target_pct)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn make_report(minute: u32, setpoint_pct: f64, tariff_active: bool) -> TickReport {
        TickReport {
            now: NaiveDate::from_ymd_opt(2024, 11, 18)
                .unwrap()
                .and_hms_opt(23, minute, 0)
                .unwrap(),
            tariff_active,
            charge_enabled: tariff_active,
            setpoint_pct,
            target_pct: 60.0,
        }
    }

    #[test]
    fn peak_and_hours() {
        let reports = vec![
            make_report(0, 0.0, false),
            make_report(1, 10.0, true),
            make_report(2, 25.0, true),
            make_report(3, 0.0, true),
        ];
        let summary = DaySummary::from_reports(&reports, 3600);
        assert_eq!(summary.ticks, 4);
        assert_eq!(summary.peak_setpoint_pct, 25.0);
        assert!((summary.charging_hours - 2.0).abs() < 1e-9);
        assert!((summary.tariff_hours - 3.0).abs() < 1e-9);
        assert_eq!(summary.final_target_pct, 60.0);
    }

    #[test]
    fn empty_record() {
        let summary = DaySummary::from_reports(&[], 60);
        assert_eq!(summary.ticks, 0);
        assert_eq!(summary.peak_setpoint_pct, 0.0);
        assert_eq!(summary.final_target_pct, 0.0);
    }
}
