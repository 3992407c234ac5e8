//! Time sources
//!
//! Report windows are anchored on "today" and cache entries expire against
//! wall-clock time. Both are read through [`Clock`] so that services can be
//! driven by a fixed instant in tests.

use std::time::SystemTime;

use chrono::{DateTime, Local, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use parking_lot::RwLock;

/// Source of the current instant and calendar date
pub trait Clock: Send + Sync {
    /// Current wall-clock instant, used for cache expiry
    fn now(&self) -> SystemTime;

    /// Current calendar date, used to anchor relative report windows
    fn today(&self) -> NaiveDate;
}

/// Clock backed by the operating system.
///
/// `today` follows the local timezone, matching how the dashboard renders
/// dates.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> SystemTime {
        SystemTime::now()
    }

    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Manually driven clock
#[derive(Debug)]
pub struct FixedClock {
    current: RwLock<NaiveDateTime>,
}

impl FixedClock {
    /// Create a clock frozen at the given UTC instant
    pub fn new(at: NaiveDateTime) -> Self {
        Self {
            current: RwLock::new(at),
        }
    }

    /// Create a clock frozen at midday of the given date
    pub fn on_date(date: NaiveDate) -> Self {
        Self::new(date.and_hms_opt(12, 0, 0).unwrap_or_default())
    }

    /// Move the clock forward
    pub fn advance(&self, by: TimeDelta) {
        let mut current = self.current.write();
        *current += by;
    }

    /// Jump to an absolute instant
    pub fn set(&self, at: NaiveDateTime) {
        *self.current.write() = at;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> SystemTime {
        let at: DateTime<Utc> = self.current.read().and_utc();
        at.into()
    }

    fn today(&self) -> NaiveDate {
        self.current.read().date()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_clock_advance() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let clock = FixedClock::on_date(date);
        assert_eq!(clock.today(), date);

        let before = clock.now();
        clock.advance(TimeDelta::hours(13));
        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        assert_eq!(
            clock.now().duration_since(before).unwrap().as_secs(),
            13 * 3600
        );
    }
}
