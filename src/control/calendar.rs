//! Vacation and blackout-season discount policy.
//!
//! Two independent range tables decide the discount factor applied to the
//! nightly charge target: a blackout season (day-month ranges, year-agnostic)
//! during which charging is suppressed entirely, and listed vacation ranges
//! (full dates) during which the target is cut to one third. The policy
//! always evaluates *tomorrow*, since targets are set for the coming night.

use std::fs;
use std::path::PathBuf;

use chrono::{Datelike, Days, NaiveDate};
use serde::Deserialize;
use thiserror::Error;

/// Factor during the blackout season.
pub const BLACKOUT_FACTOR: f64 = 0.0;
/// Factor during a listed vacation range.
pub const VACATION_FACTOR: f64 = 1.0 / 3.0;

/// Failure loading or parsing a calendar table.
#[derive(Debug, Error)]
pub enum CalendarError {
    /// A table file could not be read.
    #[error("cannot read calendar file \"{path}\": {source}")]
    Read {
        /// Offending file path.
        path: String,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// A table file is not valid JSON.
    #[error("invalid calendar JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A date string does not match the expected format.
    #[error("invalid calendar date \"{value}\" (expected {expected})")]
    BadDate {
        /// The rejected string.
        value: String,
        /// Expected format description.
        expected: &'static str,
    },
}

/// A day-month pair, resolved against a concrete year at lookup time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MonthDay {
    /// Month 1–12.
    pub month: u32,
    /// Day of month 1–31.
    pub day: u32,
}

impl MonthDay {
    /// Parses a `"DD-MM"` string.
    fn parse(s: &str) -> Result<Self, CalendarError> {
        let bad = || CalendarError::BadDate {
            value: s.to_string(),
            expected: "DD-MM",
        };
        let (day, month) = s.split_once('-').ok_or_else(bad)?;
        let day: u32 = day.parse().map_err(|_| bad())?;
        let month: u32 = month.parse().map_err(|_| bad())?;
        if !(1..=31).contains(&day) || !(1..=12).contains(&month) {
            return Err(bad());
        }
        Ok(Self { month, day })
    }

    /// Resolves this day-month in the given year.
    ///
    /// `None` for combinations that do not exist that year (Feb 29).
    fn in_year(self, year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.month, self.day)
    }
}

/// Year-agnostic blackout range. Both ends are exclusive.
#[derive(Debug, Clone)]
pub struct SeasonRange {
    /// First excluded boundary.
    pub start: MonthDay,
    /// Last excluded boundary.
    pub end: MonthDay,
}

/// Fixed-date vacation range. Both ends are exclusive.
#[derive(Debug, Clone)]
pub struct VacationRange {
    /// First excluded boundary.
    pub start: NaiveDate,
    /// Last excluded boundary.
    pub end: NaiveDate,
}

/// Raw `{start, end}` entry as stored in the JSON tables.
#[derive(Debug, Deserialize)]
struct RawRange {
    start: String,
    end: String,
}

/// The two discount tables.
#[derive(Debug, Clone, Default)]
pub struct ChargeCalendar {
    blackout: Vec<SeasonRange>,
    vacation: Vec<VacationRange>,
}

impl ChargeCalendar {
    /// Builds a calendar from already-parsed ranges (tests, fixtures).
    pub fn new(blackout: Vec<SeasonRange>, vacation: Vec<VacationRange>) -> Self {
        Self { blackout, vacation }
    }

    /// Parses the two JSON tables.
    ///
    /// Blackout entries use `"DD-MM"` dates, vacation entries `"DD-MM-YYYY"`.
    ///
    /// # Errors
    ///
    /// Returns a `CalendarError` on malformed JSON or date strings.
    pub fn from_json_strs(blackout_json: &str, vacation_json: &str) -> Result<Self, CalendarError> {
        let raw_blackout: Vec<RawRange> = serde_json::from_str(blackout_json)?;
        let raw_vacation: Vec<RawRange> = serde_json::from_str(vacation_json)?;

        let blackout = raw_blackout
            .iter()
            .map(|r| {
                Ok(SeasonRange {
                    start: MonthDay::parse(&r.start)?,
                    end: MonthDay::parse(&r.end)?,
                })
            })
            .collect::<Result<Vec<_>, CalendarError>>()?;

        let vacation = raw_vacation
            .iter()
            .map(|r| {
                Ok(VacationRange {
                    start: parse_full_date(&r.start)?,
                    end: parse_full_date(&r.end)?,
                })
            })
            .collect::<Result<Vec<_>, CalendarError>>()?;

        Ok(Self { blackout, vacation })
    }

    /// Returns the discount factor for the night following `today`.
    ///
    /// The blackout season is checked first and short-circuits; range bounds
    /// are exclusive on both ends, so boundary dates do not match.
    pub fn discount_for(&self, today: NaiveDate) -> f64 {
        let tomorrow = today.checked_add_days(Days::new(1)).unwrap_or(today);

        for range in &self.blackout {
            let start = range.start.in_year(tomorrow.year());
            let end = range.end.in_year(tomorrow.year());
            if let (Some(start), Some(end)) = (start, end) {
                if start < tomorrow && tomorrow < end {
                    return BLACKOUT_FACTOR;
                }
            }
        }

        for range in &self.vacation {
            if range.start < tomorrow && tomorrow < range.end {
                return VACATION_FACTOR;
            }
        }

        1.0
    }
}

fn parse_full_date(s: &str) -> Result<NaiveDate, CalendarError> {
    NaiveDate::parse_from_str(s, "%d-%m-%Y").map_err(|_| CalendarError::BadDate {
        value: s.to_string(),
        expected: "DD-MM-YYYY",
    })
}

/// Source of the calendar tables, consulted at each target refresh.
pub trait CalendarSource {
    /// Loads the current tables.
    ///
    /// # Errors
    ///
    /// Returns a `CalendarError` if a table cannot be read or parsed; the
    /// control loop then keeps the previous charge target.
    fn load(&self) -> Result<ChargeCalendar, CalendarError>;
}

/// File-backed source re-reading the JSON tables on every call.
///
/// A missing path is treated as an empty table so the controller can run
/// without vacation data configured.
pub struct FileCalendar {
    blackout_path: Option<PathBuf>,
    vacation_path: Option<PathBuf>,
}

impl FileCalendar {
    /// Creates a source reading from the given optional file paths.
    pub fn new(blackout_path: Option<PathBuf>, vacation_path: Option<PathBuf>) -> Self {
        Self {
            blackout_path,
            vacation_path,
        }
    }
}

fn read_or_empty(path: &Option<PathBuf>) -> Result<String, CalendarError> {
    match path {
        Some(p) => fs::read_to_string(p).map_err(|e| CalendarError::Read {
            path: p.display().to_string(),
            source: e,
        }),
        None => Ok("[]".to_string()),
    }
}

impl CalendarSource for FileCalendar {
    fn load(&self) -> Result<ChargeCalendar, CalendarError> {
        let blackout = read_or_empty(&self.blackout_path)?;
        let vacation = read_or_empty(&self.vacation_path)?;
        ChargeCalendar::from_json_strs(&blackout, &vacation)
    }
}

/// Source returning a fixed in-memory calendar (simulation, tests).
pub struct StaticCalendar(pub ChargeCalendar);

impl CalendarSource for StaticCalendar {
    fn load(&self) -> Result<ChargeCalendar, CalendarError> {
        Ok(self.0.clone())
    }
}
