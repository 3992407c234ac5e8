//! Canonical cache keys
//!
//! A key is the report tag followed by every parameter that can change the
//! report, in a fixed order, joined with `:`. Each parameter has a single
//! rendering: ISO-8601 dates, decimal integers, lowercase dimension tags,
//! `start-end` hour ranges and `~` for an absent optional value. Equal
//! parameters therefore always produce equal keys and any one differing
//! parameter produces a different key.
//!
//! ```text
//! top_products:2024-01-01:2024-01-31:10:2:~:5:18-22
//! ```

use std::fmt;

use chrono::NaiveDate;

use super::filters::{Dimension, FilterSet, HourRange};
use super::window::TimeWindow;

/// Separator between key segments
pub const KEY_SEPARATOR: char = ':';

/// Rendering of an absent optional parameter
pub const ABSENT: &str = "~";

/// Cached report families; the tag leads every key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReportKind {
    SalesOverview,
    TopProducts,
    SalesBreakdown,
    DeliveryPerformance,
    TicketTrend,
    TicketComposition,
    ChurnRisk,
    MonthlySummary,
}

impl ReportKind {
    /// Key prefix and metrics label
    pub fn tag(&self) -> &'static str {
        match self {
            ReportKind::SalesOverview => "sales_overview",
            ReportKind::TopProducts => "top_products",
            ReportKind::SalesBreakdown => "sales_breakdown",
            ReportKind::DeliveryPerformance => "delivery_performance",
            ReportKind::TicketTrend => "ticket_trend",
            ReportKind::TicketComposition => "ticket_composition",
            ReportKind::ChurnRisk => "churn_risk",
            ReportKind::MonthlySummary => "monthly_summary",
        }
    }
}

impl fmt::Display for ReportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// Segment-by-segment key builder
#[derive(Debug, Clone)]
pub struct CacheKey {
    kind: ReportKind,
    key: String,
}

impl CacheKey {
    /// Start a key for `kind`
    pub fn new(kind: ReportKind) -> Self {
        Self {
            kind,
            key: kind.tag().to_string(),
        }
    }

    fn push(mut self, segment: impl fmt::Display) -> Self {
        use fmt::Write;
        self.key.push(KEY_SEPARATOR);
        // Writing to a String cannot fail
        let _ = write!(self.key, "{}", segment);
        self
    }

    /// Append a date
    pub fn date(self, date: NaiveDate) -> Self {
        self.push(date.format("%Y-%m-%d"))
    }

    /// Append both window bounds
    pub fn window(self, window: &TimeWindow) -> Self {
        self.date(window.start()).date(window.end())
    }

    /// Append an integer
    pub fn int(self, value: i64) -> Self {
        self.push(value)
    }

    /// Append an optional integer
    pub fn opt_int(self, value: Option<i64>) -> Self {
        match value {
            Some(v) => self.push(v),
            None => self.push(ABSENT),
        }
    }

    /// Append a dimension tag
    pub fn dimension(self, dimension: Dimension) -> Self {
        self.push(dimension.as_str())
    }

    /// Append an optional hour range
    pub fn hours(self, range: Option<HourRange>) -> Self {
        match range {
            Some(r) => self.push(r),
            None => self.push(ABSENT),
        }
    }

    /// Append all four filters: channel, store, weekday, hours
    pub fn filters(self, filters: &FilterSet) -> Self {
        self.opt_int(filters.channel_id)
            .opt_int(filters.store_id)
            .opt_int(filters.day_of_week.map(i64::from))
            .hours(filters.hour_range)
    }

    /// Append the time-of-sale filters only: weekday, hours
    pub fn time_filters(self, filters: &FilterSet) -> Self {
        self.opt_int(filters.day_of_week.map(i64::from))
            .hours(filters.hour_range)
    }

    /// Report family of the key
    pub fn kind(&self) -> ReportKind {
        self.kind
    }

    /// Finished key text
    pub fn as_str(&self) -> &str {
        &self.key
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.key)
    }
}

// ---------------------------------------------------------------------------
// Per-report keys
// ---------------------------------------------------------------------------

/// `sales_overview:{start}:{end}`
pub fn overview(window: &TimeWindow) -> CacheKey {
    CacheKey::new(ReportKind::SalesOverview).window(window)
}

/// `top_products:{start}:{end}:{limit}:{channel}:{store}:{weekday}:{hours}`
pub fn top_products(window: &TimeWindow, limit: u32, filters: &FilterSet) -> CacheKey {
    CacheKey::new(ReportKind::TopProducts)
        .window(window)
        .int(i64::from(limit))
        .filters(filters)
}

/// `sales_breakdown:{start}:{end}:{dimension}`
pub fn sales_breakdown(window: &TimeWindow, dimension: Dimension) -> CacheKey {
    CacheKey::new(ReportKind::SalesBreakdown)
        .window(window)
        .dimension(dimension)
}

/// `delivery_performance:{start}:{end}:{dimension}:{weekday}:{hours}`
pub fn delivery_performance(
    window: &TimeWindow,
    dimension: Dimension,
    filters: &FilterSet,
) -> CacheKey {
    CacheKey::new(ReportKind::DeliveryPerformance)
        .window(window)
        .dimension(dimension)
        .time_filters(filters)
}

/// `ticket_trend:{start}:{end}`
pub fn ticket_trend(window: &TimeWindow) -> CacheKey {
    CacheKey::new(ReportKind::TicketTrend).window(window)
}

/// `ticket_composition:{start}:{end}`
pub fn ticket_composition(window: &TimeWindow) -> CacheKey {
    CacheKey::new(ReportKind::TicketComposition).window(window)
}

/// `churn_risk:{min_purchases}:{inactive_days}:{today}`
pub fn churn_risk(min_purchases: u32, inactive_days: u32, today: NaiveDate) -> CacheKey {
    CacheKey::new(ReportKind::ChurnRisk)
        .int(i64::from(min_purchases))
        .int(i64::from(inactive_days))
        .date(today)
}

/// `monthly_summary:{today}`
pub fn monthly_summary(today: NaiveDate) -> CacheKey {
    CacheKey::new(ReportKind::MonthlySummary).date(today)
}
