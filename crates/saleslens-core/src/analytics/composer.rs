//! Derived month-over-month metrics
//!
//! The monthly summary is not a query of its own: it is composed from
//! several overview aggregates over shifted windows.

use chrono::NaiveDate;

use super::models::MonthlySummary;
use super::repository::AggregateRepository;
use super::window::TimeWindow;
use crate::error::Result;

/// Full calendar months averaged into `last_3_months_avg_revenue`
pub const TRAILING_MONTHS: u32 = 3;

/// Windows the summary for `today` reads, in evaluation order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SummaryWindows {
    /// First of this month through today
    pub current: TimeWindow,
    /// Same span one month earlier, clamped to that month's end
    pub previous_same_day: TimeWindow,
    /// The full calendar months before the current one, most recent first
    pub trailing: Vec<TimeWindow>,
}

impl SummaryWindows {
    /// Windows anchored on `today`
    pub fn for_date(today: NaiveDate) -> Self {
        Self {
            current: TimeWindow::month_to_date(today),
            previous_same_day: TimeWindow::previous_month_same_day(today),
            trailing: (1..=TRAILING_MONTHS)
                .map(|i| TimeWindow::full_month_before(today, i))
                .collect(),
        }
    }
}

/// Composes the monthly KPI summary from overview aggregates
#[derive(Debug, Clone)]
pub struct MonthlySummaryComposer {
    repository: AggregateRepository,
}

impl MonthlySummaryComposer {
    /// Create a composer reading through `repository`
    pub fn new(repository: AggregateRepository) -> Self {
        Self { repository }
    }

    /// Revenue month-to-date, the same span last month, and the average of
    /// the three full months before this one. Months without sales count
    /// as zero and still divide the average.
    pub fn compose(&self, today: NaiveDate) -> Result<MonthlySummary> {
        let windows = SummaryWindows::for_date(today);

        let current_month_revenue = self.repository.overview(windows.current)?.total_revenue;
        let previous_month_revenue_same_day = self
            .repository
            .overview(windows.previous_same_day)?
            .total_revenue;

        let mut trailing_total = 0.0;
        for window in &windows.trailing {
            trailing_total += self.repository.overview(*window)?.total_revenue;
        }

        Ok(MonthlySummary {
            current_month_revenue,
            previous_month_revenue_same_day,
            last_3_months_avg_revenue: trailing_total / f64::from(TRAILING_MONTHS),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_summary_windows_end_of_march() {
        let windows = SummaryWindows::for_date(d(2024, 3, 31));
        assert_eq!(windows.current.start(), d(2024, 3, 1));
        assert_eq!(windows.current.end(), d(2024, 3, 31));
        assert_eq!(windows.previous_same_day.end(), d(2024, 2, 29));
        assert_eq!(windows.trailing.len(), 3);
        assert_eq!(windows.trailing[0].start(), d(2024, 2, 1));
        assert_eq!(windows.trailing[2].start(), d(2023, 12, 1));
        assert_eq!(windows.trailing[2].end(), d(2023, 12, 31));
    }

    #[test]
    fn test_trailing_windows_do_not_overlap_current_month() {
        let today = d(2024, 7, 1);
        let windows = SummaryWindows::for_date(today);
        for window in &windows.trailing {
            assert!(window.end() < windows.current.start());
        }
    }
}
