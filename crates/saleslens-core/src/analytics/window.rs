//! Report time windows

use std::fmt;

use chrono::{Datelike, Days, Months, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::error::{LensError, Result};
use crate::query::Predicate;

/// Inclusive range of calendar days.
///
/// Queries read it as the half-open instant range
/// `[start 00:00, (end + 1 day) 00:00)`, so every sale of the last day is
/// included regardless of its time of day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    #[serde(rename = "start_date")]
    start: NaiveDate,
    #[serde(rename = "end_date")]
    end: NaiveDate,
}

impl TimeWindow {
    /// Create a window, rejecting `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(LensError::validation(format!(
                "start date {start} is after end date {end}"
            )));
        }
        Ok(Self { start, end })
    }

    /// `[today - days, today]`, the dashboard's default window
    pub fn trailing(today: NaiveDate, days: u32) -> Self {
        let start = today
            .checked_sub_days(Days::new(u64::from(days)))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end: today }
    }

    /// First of the current month through `today`
    pub fn month_to_date(today: NaiveDate) -> Self {
        Self {
            start: first_of_month(today),
            end: today,
        }
    }

    /// First of the previous month through the same day-of-month as
    /// `today`, clamped to the previous month's last day (March 31 maps to
    /// February 28 or 29).
    pub fn previous_month_same_day(today: NaiveDate) -> Self {
        let start = shift_months_back(first_of_month(today), 1);
        let end = today
            .checked_sub_months(Months::new(1))
            .unwrap_or(start)
            .min(last_of_month(start));
        Self { start, end }
    }

    /// The `months_back`-th full calendar month before the one containing
    /// `today` (1 = previous month)
    pub fn full_month_before(today: NaiveDate, months_back: u32) -> Self {
        let start = shift_months_back(first_of_month(today), months_back);
        Self {
            start,
            end: last_of_month(start),
        }
    }

    /// First day (inclusive)
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day (inclusive)
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Midnight at the start of the window
    pub fn start_instant(&self) -> NaiveDateTime {
        self.start.and_time(NaiveTime::MIN)
    }

    /// Midnight after the last day
    pub fn end_exclusive(&self) -> NaiveDateTime {
        self.end
            .checked_add_days(Days::new(1))
            .map(|d| d.and_time(NaiveTime::MIN))
            .unwrap_or(NaiveDateTime::MAX)
    }

    /// Row predicate selecting sales created inside the window
    pub fn predicate(&self) -> Predicate {
        Predicate::CreatedWithin {
            start: self.start_instant(),
            end_exclusive: self.end_exclusive(),
        }
    }

    /// Number of days covered
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Check whether `date` falls inside the window
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..{}", self.start, self.end)
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

fn shift_months_back(first: NaiveDate, months: u32) -> NaiveDate {
    first.checked_sub_months(Months::new(months)).unwrap_or(first)
}

fn last_of_month(first: NaiveDate) -> NaiveDate {
    first
        .checked_add_months(Months::new(1))
        .and_then(|next| next.pred_opt())
        .unwrap_or(first)
}
