//! Report filters and grouping dimensions

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{LensError, Result};
use crate::query::{Column, Join, Predicate};

/// Inclusive hour-of-day range, both bounds in `0..=23`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HourRange {
    start_hour: u8,
    end_hour: u8,
}

impl HourRange {
    /// Create a range, rejecting out-of-day hours and inverted bounds
    pub fn new(start_hour: u8, end_hour: u8) -> Result<Self> {
        if start_hour > 23 || end_hour > 23 {
            return Err(LensError::validation(format!(
                "hours must be between 0 and 23, got {start_hour}-{end_hour}"
            )));
        }
        if start_hour > end_hour {
            return Err(LensError::validation(format!(
                "start hour {start_hour} is after end hour {end_hour}"
            )));
        }
        Ok(Self {
            start_hour,
            end_hour,
        })
    }

    /// Build a range from two optional bounds. Both absent means no range;
    /// exactly one present is rejected.
    pub fn from_bounds(start_hour: Option<u8>, end_hour: Option<u8>) -> Result<Option<Self>> {
        match (start_hour, end_hour) {
            (None, None) => Ok(None),
            (Some(start), Some(end)) => Self::new(start, end).map(Some),
            _ => Err(LensError::validation(
                "both start_hour and end_hour must be provided for time-based filtering",
            )),
        }
    }

    /// Inclusive first hour
    pub fn start_hour(&self) -> u8 {
        self.start_hour
    }

    /// Inclusive last hour
    pub fn end_hour(&self) -> u8 {
        self.end_hour
    }
}

impl fmt::Display for HourRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.start_hour, self.end_hour)
    }
}

/// Optional, independent sale filters. An absent field never constrains
/// the result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FilterSet {
    /// Only sales through this channel
    pub channel_id: Option<i64>,
    /// Only sales from this store
    pub store_id: Option<i64>,
    /// Only sales on this ISO weekday (1 = Monday, 7 = Sunday)
    pub day_of_week: Option<u8>,
    /// Only sales created within these hours
    pub hour_range: Option<HourRange>,
}

impl FilterSet {
    /// Filters that constrain nothing
    pub fn none() -> Self {
        Self::default()
    }

    /// Restrict to a channel
    pub fn with_channel(mut self, channel_id: i64) -> Self {
        self.channel_id = Some(channel_id);
        self
    }

    /// Restrict to a store
    pub fn with_store(mut self, store_id: i64) -> Self {
        self.store_id = Some(store_id);
        self
    }

    /// Restrict to a weekday
    pub fn with_day_of_week(mut self, day: u8) -> Self {
        self.day_of_week = Some(day);
        self
    }

    /// Restrict to an hour range
    pub fn with_hours(mut self, range: HourRange) -> Self {
        self.hour_range = Some(range);
        self
    }

    /// Check every present filter
    pub fn validate(&self) -> Result<()> {
        if let Some(day) = self.day_of_week {
            if !(1..=7).contains(&day) {
                return Err(LensError::validation(format!(
                    "day_of_week must be between 1 (Monday) and 7 (Sunday), got {day}"
                )));
            }
        }
        if let Some(range) = self.hour_range {
            HourRange::new(range.start_hour, range.end_hour)?;
        }
        Ok(())
    }

    /// Check a filter set that may only narrow by time of sale; channel and
    /// store are rejected
    pub fn validate_time_only(&self) -> Result<()> {
        if self.channel_id.is_some() || self.store_id.is_some() {
            return Err(LensError::validation(
                "only day_of_week and hour_range filters apply to this report",
            ));
        }
        self.validate()
    }

    /// Whether no filter is set
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// One optional predicate per filter, in a fixed order
    pub fn predicates(&self) -> [Option<Predicate>; 4] {
        [
            self.channel_id.map(Predicate::ChannelEquals),
            self.store_id.map(Predicate::StoreEquals),
            self.day_of_week.map(Predicate::DayOfWeekEquals),
            self.hour_range.map(|r| Predicate::HourRangeBetween {
                start_hour: r.start_hour,
                end_hour: r.end_hour,
            }),
        ]
    }

    /// Weekday and hour-range predicates only
    pub fn time_predicates(&self) -> [Option<Predicate>; 2] {
        let [_, _, weekday, hours] = self.predicates();
        [weekday, hours]
    }
}

/// Grouping dimension tag accepted on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Dimension {
    Channel,
    Store,
    Neighborhood,
    City,
}

impl Dimension {
    /// Lowercase tag
    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Channel => "channel",
            Dimension::Store => "store",
            Dimension::Neighborhood => "neighborhood",
            Dimension::City => "city",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Dimension {
    type Err = LensError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "channel" => Ok(Dimension::Channel),
            "store" => Ok(Dimension::Store),
            "neighborhood" => Ok(Dimension::Neighborhood),
            "city" => Ok(Dimension::City),
            other => Err(LensError::validation(format!("unknown dimension '{other}'"))),
        }
    }
}

/// Dimensions a sales breakdown can group by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SalesDimension {
    Channel,
    Store,
}

impl SalesDimension {
    /// Join that brings the dimension table into scope
    pub fn join(&self) -> Join {
        match self {
            SalesDimension::Channel => Join::Channel,
            SalesDimension::Store => Join::Store,
        }
    }

    /// Dimension id column
    pub fn id_column(&self) -> Column {
        match self {
            SalesDimension::Channel => Column::ChannelId,
            SalesDimension::Store => Column::StoreId,
        }
    }

    /// Dimension name column
    pub fn name_column(&self) -> Column {
        match self {
            SalesDimension::Channel => Column::ChannelName,
            SalesDimension::Store => Column::StoreName,
        }
    }
}

impl From<SalesDimension> for Dimension {
    fn from(d: SalesDimension) -> Self {
        match d {
            SalesDimension::Channel => Dimension::Channel,
            SalesDimension::Store => Dimension::Store,
        }
    }
}

impl TryFrom<Dimension> for SalesDimension {
    type Error = LensError;

    fn try_from(d: Dimension) -> Result<Self> {
        match d {
            Dimension::Channel => Ok(SalesDimension::Channel),
            Dimension::Store => Ok(SalesDimension::Store),
            other => Err(LensError::validation(format!(
                "invalid dimension '{other}' for sales breakdown (expected channel or store)"
            ))),
        }
    }
}

/// Dimensions delivery performance can group by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeliveryDimension {
    Store,
    Neighborhood,
    City,
}

impl DeliveryDimension {
    /// Grouping column
    pub fn column(&self) -> Column {
        match self {
            DeliveryDimension::Store => Column::StoreName,
            DeliveryDimension::Neighborhood => Column::Neighborhood,
            DeliveryDimension::City => Column::City,
        }
    }
}

impl From<DeliveryDimension> for Dimension {
    fn from(d: DeliveryDimension) -> Self {
        match d {
            DeliveryDimension::Store => Dimension::Store,
            DeliveryDimension::Neighborhood => Dimension::Neighborhood,
            DeliveryDimension::City => Dimension::City,
        }
    }
}

impl TryFrom<Dimension> for DeliveryDimension {
    type Error = LensError;

    fn try_from(d: Dimension) -> Result<Self> {
        match d {
            Dimension::Store => Ok(DeliveryDimension::Store),
            Dimension::Neighborhood => Ok(DeliveryDimension::Neighborhood),
            Dimension::City => Ok(DeliveryDimension::City),
            other => Err(LensError::validation(format!(
                "invalid dimension '{other}' for delivery performance (expected store, neighborhood or city)"
            ))),
        }
    }
}
