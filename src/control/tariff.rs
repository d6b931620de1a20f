//! Night-tariff window tracking across signal edges.
//!
//! The tariff-active signal can drop out mid-window (the utility switches
//! some evenings to day fare for a while). A short gap is an interruption of
//! the same window and only stretches the accounting; a gap longer than the
//! resume threshold means a genuinely new window has begun.

use chrono::NaiveDateTime;

/// Gap length beyond which a rising edge starts a fresh window.
pub const RESUME_THRESHOLD_SECS: i64 = 6 * 3600;

/// Transition observed on the tariff-active signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TariffEvent {
    /// Rising edge after a long gap: a fresh window begins now.
    Started,
    /// Rising edge within the resume threshold: same window continues.
    Resumed {
        /// Length of the interruption in seconds.
        gap_secs: i64,
    },
    /// Falling edge: window (or interruption) begins.
    Ended,
}

/// State machine tracking the current night-tariff window.
///
/// Mutated only on signal edges via [`observe`](Self::observe); everything
/// else reads the derived [`seconds_into_tariff`](Self::seconds_into_tariff).
/// Construction requires an explicit initial state; the assumptions made
/// when the process starts mid-window live in the caller, not here.
#[derive(Debug, Clone)]
pub struct TariffTracker {
    begin: NaiveDateTime,
    last_end: NaiveDateTime,
    gap_secs: i64,
    active: bool,
}

impl TariffTracker {
    /// Creates a tracker from an explicit initial state.
    ///
    /// # Arguments
    ///
    /// * `begin` - Start of the current (or most recent) tariff window
    /// * `last_end` - When the previous window (or interruption) ended
    /// * `gap_secs` - Accumulated interruption within the current window
    /// * `active` - Current signal level
    pub fn new(begin: NaiveDateTime, last_end: NaiveDateTime, gap_secs: i64, active: bool) -> Self {
        Self {
            begin,
            last_end,
            gap_secs,
            active,
        }
    }

    /// Current signal level as of the last observation.
    pub fn active(&self) -> bool {
        self.active
    }

    /// Start of the current tariff window.
    pub fn begin(&self) -> NaiveDateTime {
        self.begin
    }

    /// Feeds one signal sample; returns the transition, if any.
    ///
    /// A rising edge more than [`RESUME_THRESHOLD_SECS`] after the last
    /// falling edge resets the window; a rising edge within the threshold
    /// records the interruption as the gap and keeps the original begin
    /// time. Only the most recent interruption is held.
    pub fn observe(&mut self, now: NaiveDateTime, signal: bool) -> Option<TariffEvent> {
        if signal == self.active {
            return None;
        }
        self.active = signal;

        if signal {
            let since_end = (now - self.last_end).num_seconds();
            if since_end > RESUME_THRESHOLD_SECS {
                self.begin = now;
                self.gap_secs = 0;
                Some(TariffEvent::Started)
            } else {
                self.gap_secs = since_end;
                Some(TariffEvent::Resumed {
                    gap_secs: since_end,
                })
            }
        } else {
            self.last_end = now;
            Some(TariffEvent::Ended)
        }
    }

    /// Seconds of tariff benefit since the window began, interruptions
    /// excluded.
    ///
    /// May be negative under clock skew; the ramp clamps, not the tracker.
    pub fn seconds_into_tariff(&self, now: NaiveDateTime) -> i64 {
        (now - self.begin).num_seconds() - self.gap_secs
    }
}
