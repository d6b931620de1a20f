//! A simulated clock advancing in fixed increments over a bounded horizon.

use chrono::{Duration, NaiveDateTime};

use crate::runner::TickClock;

/// Virtual clock for driving the control loop through a simulated day.
///
/// Each call to [`TickClock::now`] advances the clock by one increment and
/// returns the new time, until the horizon past the start time is exceeded;
/// the loop then terminates cleanly.
pub struct SimClock {
    start: NaiveDateTime,
    current: NaiveDateTime,
    increment: Duration,
    horizon: Duration,
}

impl SimClock {
    /// Creates a clock covering one simulated day in 60 s steps.
    pub fn one_day(start: NaiveDateTime) -> Self {
        Self::new(start, Duration::seconds(60), Duration::days(1))
    }

    /// Creates a clock with explicit increment and horizon.
    pub fn new(start: NaiveDateTime, increment: Duration, horizon: Duration) -> Self {
        Self {
            start,
            current: start,
            increment,
            horizon,
        }
    }
}

impl TickClock for SimClock {
    fn now(&mut self) -> Option<NaiveDateTime> {
        self.current += self.increment;
        if self.current > self.start + self.horizon {
            None
        } else {
            Some(self.current)
        }
    }

    fn wait(&mut self) {
        // simulated time has nothing to wait for
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn start() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 11, 18)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn first_tick_is_one_increment_past_start() {
        let mut clock = SimClock::one_day(start());
        assert_eq!(clock.now(), Some(start() + Duration::seconds(60)));
    }

    #[test]
    fn terminates_after_horizon() {
        let mut clock = SimClock::new(start(), Duration::seconds(60), Duration::minutes(3));
        assert!(clock.now().is_some());
        assert!(clock.now().is_some());
        assert!(clock.now().is_some());
        assert_eq!(clock.now(), None);
    }

    #[test]
    fn one_day_yields_1440_minutes() {
        let mut clock = SimClock::one_day(start());
        let mut ticks = 0;
        while clock.now().is_some() {
            ticks += 1;
        }
        assert_eq!(ticks, 1440);
    }
}
