//! Tagged row predicates
//!
//! Every filter clause is a [`Predicate`] value. A query's row filter is a
//! [`Conjunction`]: all of its predicates must hold. Optional filters are
//! folded in with [`conjoin`], which drops absent clauses so that an unset
//! filter never constrains the result.

use std::fmt;

use chrono::NaiveDateTime;

use super::ast::{Column, Relation};

/// Lifecycle status of a sale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SaleStatus {
    /// Paid and fulfilled; the only status reports aggregate over
    Completed,
    /// Cancelled before fulfilment
    Cancelled,
}

impl SaleStatus {
    /// Status label as stored in `sales.sale_status_desc`
    pub fn as_str(&self) -> &'static str {
        match self {
            SaleStatus::Completed => "COMPLETED",
            SaleStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for SaleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single row-level condition
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// `sales.sale_status_desc = status`
    StatusEquals(SaleStatus),
    /// `start <= sales.created_at < end_exclusive`
    CreatedWithin {
        /// Inclusive lower instant
        start: NaiveDateTime,
        /// Exclusive upper instant
        end_exclusive: NaiveDateTime,
    },
    /// Column is not NULL
    NotNull(Column),
    /// `sales.channel_id = id`
    ChannelEquals(i64),
    /// `sales.store_id = id`
    StoreEquals(i64),
    /// ISO day of week of `sales.created_at` (1 = Monday, 7 = Sunday)
    DayOfWeekEquals(u8),
    /// Hour of `sales.created_at` within `start_hour..=end_hour`
    HourRangeBetween {
        /// Inclusive first hour
        start_hour: u8,
        /// Inclusive last hour
        end_hour: u8,
    },
}

impl Predicate {
    /// Table the predicate reads
    pub fn relation(&self) -> Relation {
        match self {
            Predicate::NotNull(column) => column.relation(),
            _ => Relation::Sale,
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Predicate::StatusEquals(status) => write!(f, "s.sale_status_desc = '{}'", status),
            Predicate::CreatedWithin {
                start,
                end_exclusive,
            } => write!(
                f,
                "s.created_at >= '{}' AND s.created_at < '{}'",
                start, end_exclusive
            ),
            Predicate::NotNull(column) => write!(f, "{} IS NOT NULL", column),
            Predicate::ChannelEquals(id) => write!(f, "s.channel_id = {}", id),
            Predicate::StoreEquals(id) => write!(f, "s.store_id = {}", id),
            Predicate::DayOfWeekEquals(day) => {
                write!(f, "EXTRACT(ISODOW FROM s.created_at) = {}", day)
            }
            Predicate::HourRangeBetween {
                start_hour,
                end_hour,
            } => write!(
                f,
                "EXTRACT(HOUR FROM s.created_at) BETWEEN {} AND {}",
                start_hour, end_hour
            ),
        }
    }
}

/// AND-composition of predicates. An empty conjunction accepts every row.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Conjunction {
    predicates: Vec<Predicate>,
}

impl Conjunction {
    /// Create an empty conjunction
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a required predicate
    pub fn and(mut self, predicate: Predicate) -> Self {
        self.predicates.push(predicate);
        self
    }

    /// Add a predicate only when present
    pub fn and_maybe(mut self, predicate: Option<Predicate>) -> Self {
        self.predicates.extend(predicate);
        self
    }

    /// The composed predicates, in insertion order
    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }

    /// Number of composed predicates
    pub fn len(&self) -> usize {
        self.predicates.len()
    }

    /// Whether the conjunction accepts every row
    pub fn is_empty(&self) -> bool {
        self.predicates.is_empty()
    }
}

impl FromIterator<Predicate> for Conjunction {
    fn from_iter<I: IntoIterator<Item = Predicate>>(iter: I) -> Self {
        Self {
            predicates: iter.into_iter().collect(),
        }
    }
}

impl Extend<Predicate> for Conjunction {
    fn extend<I: IntoIterator<Item = Predicate>>(&mut self, iter: I) {
        self.predicates.extend(iter);
    }
}

impl fmt::Display for Conjunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.predicates.is_empty() {
            return f.write_str("TRUE");
        }
        for (i, predicate) in self.predicates.iter().enumerate() {
            if i > 0 {
                f.write_str(" AND ")?;
            }
            write!(f, "{}", predicate)?;
        }
        Ok(())
    }
}

/// AND-combine required predicates with optional ones, skipping every
/// optional clause that is absent.
pub fn conjoin<R, O>(required: R, optional: O) -> Conjunction
where
    R: IntoIterator<Item = Predicate>,
    O: IntoIterator<Item = Option<Predicate>>,
{
    required
        .into_iter()
        .chain(optional.into_iter().flatten())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conjoin_skips_absent_filters() {
        let filter = conjoin(
            [Predicate::StatusEquals(SaleStatus::Completed)],
            [None, Some(Predicate::StoreEquals(4)), None],
        );
        assert_eq!(
            filter.predicates(),
            &[
                Predicate::StatusEquals(SaleStatus::Completed),
                Predicate::StoreEquals(4)
            ]
        );
    }

    #[test]
    fn test_empty_conjunction_renders_true() {
        assert_eq!(Conjunction::new().to_string(), "TRUE");
        assert!(Conjunction::new().and_maybe(None).is_empty());
    }

    #[test]
    fn test_display_joins_with_and() {
        let filter = Conjunction::new()
            .and(Predicate::ChannelEquals(2))
            .and(Predicate::HourRangeBetween {
                start_hour: 18,
                end_hour: 22,
            });
        assert_eq!(
            filter.to_string(),
            "s.channel_id = 2 AND EXTRACT(HOUR FROM s.created_at) BETWEEN 18 AND 22"
        );
    }
}
