//! Typed aggregate query builder
//!
//! ```
//! use saleslens_core::query::{AggFunction, Column, QueryBuilder, SortDirection, Source};
//!
//! let query = QueryBuilder::from(Source::Sales)
//!     .group_by(Column::SaleDate, "date")
//!     .aggregate(AggFunction::Avg, Column::SaleTotalAmount, "value")
//!     .order_by("date", SortDirection::Asc)
//!     .build()
//!     .unwrap();
//! assert_eq!(query.output_columns(), vec!["date", "value"]);
//! ```

use std::collections::HashSet;

use super::ast::{
    AggFunction, Aggregate, AggregateQuery, Column, GroupKey, Having, Join, OrderBy, Relation,
    SortDirection, Source,
};
use super::predicate::{Conjunction, Predicate};
use super::types::Value;
use crate::error::{LensError, Result};

/// Builder for [`AggregateQuery`]. `build` rejects shapes no executor
/// could evaluate, so executors may assume a well-formed query.
#[derive(Debug, Clone)]
pub struct QueryBuilder {
    source: Source,
    joins: Vec<Join>,
    filter: Conjunction,
    group_by: Vec<GroupKey>,
    aggregates: Vec<Aggregate>,
    having: Vec<Having>,
    order_by: Vec<OrderBy>,
    limit: Option<usize>,
}

impl QueryBuilder {
    /// Start a query over `source`
    pub fn from(source: Source) -> Self {
        Self {
            source,
            joins: Vec::new(),
            filter: Conjunction::new(),
            group_by: Vec::new(),
            aggregates: Vec::new(),
            having: Vec::new(),
            order_by: Vec::new(),
            limit: None,
        }
    }

    /// Join another relation
    pub fn join(mut self, join: Join) -> Self {
        self.joins.push(join);
        self
    }

    /// AND a predicate into the row filter
    pub fn filter(mut self, predicate: Predicate) -> Self {
        self.filter.extend([predicate]);
        self
    }

    /// AND every predicate of `conjunction` into the row filter
    pub fn filter_all(mut self, conjunction: Conjunction) -> Self {
        self.filter.extend(conjunction.predicates().iter().cloned());
        self
    }

    /// Add a grouping key
    pub fn group_by(mut self, column: Column, alias: impl Into<String>) -> Self {
        self.group_by.push(GroupKey {
            column,
            alias: alias.into(),
        });
        self
    }

    /// Add an aggregate output column
    pub fn aggregate(
        mut self,
        function: AggFunction,
        column: Column,
        alias: impl Into<String>,
    ) -> Self {
        self.aggregates.push(Aggregate {
            function,
            column,
            alias: alias.into(),
        });
        self
    }

    /// Keep only groups whose `alias` is at least `value`
    pub fn having_at_least(mut self, alias: impl Into<String>, value: impl Into<Value>) -> Self {
        self.having.push(Having::AtLeast {
            alias: alias.into(),
            value: value.into(),
        });
        self
    }

    /// Keep only groups whose `alias` is at most `value`
    pub fn having_at_most(mut self, alias: impl Into<String>, value: impl Into<Value>) -> Self {
        self.having.push(Having::AtMost {
            alias: alias.into(),
            value: value.into(),
        });
        self
    }

    /// Append a sort key; earlier keys take precedence
    pub fn order_by(mut self, alias: impl Into<String>, direction: SortDirection) -> Self {
        self.order_by.push(OrderBy {
            alias: alias.into(),
            direction,
        });
        self
    }

    /// Cap the number of result rows
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Check the query shape and produce the query
    pub fn build(self) -> Result<AggregateQuery> {
        if self.group_by.is_empty() && self.aggregates.is_empty() {
            return Err(LensError::invalid_query("query selects no columns"));
        }
        if self.limit == Some(0) {
            return Err(LensError::invalid_query("limit must be positive"));
        }

        let mut in_scope: HashSet<Relation> = self.source.relations().iter().copied().collect();
        for join in &self.joins {
            if !in_scope.contains(&join.requires()) {
                return Err(LensError::invalid_query(format!(
                    "join {:?} needs {:?} in scope",
                    join,
                    join.requires()
                )));
            }
            if !in_scope.insert(join.relation()) {
                return Err(LensError::invalid_query(format!(
                    "relation {:?} joined twice",
                    join.relation()
                )));
            }
        }

        let require = |relation: Relation, what: &dyn std::fmt::Display| -> Result<()> {
            if in_scope.contains(&relation) {
                Ok(())
            } else {
                Err(LensError::invalid_query(format!(
                    "{} reads {:?}, which is not joined",
                    what, relation
                )))
            }
        };
        for predicate in self.filter.predicates() {
            require(predicate.relation(), predicate)?;
        }
        for key in &self.group_by {
            require(key.column.relation(), &key.column)?;
        }
        for agg in &self.aggregates {
            require(agg.column.relation(), &agg.column)?;
            if let AggFunction::PercentileCont(p) = agg.function {
                if !(0.0..=1.0).contains(&p) {
                    return Err(LensError::invalid_query(format!(
                        "percentile fraction {p} outside 0..=1"
                    )));
                }
            }
        }

        let mut outputs = HashSet::new();
        for alias in self
            .group_by
            .iter()
            .map(|g| &g.alias)
            .chain(self.aggregates.iter().map(|a| &a.alias))
        {
            if !outputs.insert(alias.as_str()) {
                return Err(LensError::invalid_query(format!(
                    "duplicate output column '{alias}'"
                )));
            }
        }
        let referenced = self
            .having
            .iter()
            .map(Having::alias)
            .chain(self.order_by.iter().map(|o| o.alias.as_str()));
        for alias in referenced {
            if !outputs.contains(alias) {
                return Err(LensError::invalid_query(format!(
                    "unknown output column '{alias}'"
                )));
            }
        }

        Ok(AggregateQuery {
            source: self.source,
            joins: self.joins,
            filter: self.filter,
            group_by: self.group_by,
            aggregates: self.aggregates,
            having: self.having,
            order_by: self.order_by,
            limit: self.limit,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::predicate::SaleStatus;

    #[test]
    fn test_build_valid_query() {
        let query = QueryBuilder::from(Source::SaleItems)
            .join(Join::Product)
            .filter(Predicate::StatusEquals(SaleStatus::Completed))
            .group_by(Column::ProductId, "product_id")
            .aggregate(AggFunction::Sum, Column::ItemTotalPrice, "total_revenue")
            .order_by("total_revenue", SortDirection::Desc)
            .order_by("product_id", SortDirection::Asc)
            .limit(10)
            .build()
            .unwrap();

        assert_eq!(query.output_columns(), vec!["product_id", "total_revenue"]);
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.predicates().len(), 1);
    }

    #[test]
    fn test_join_requires_prerequisite() {
        let err = QueryBuilder::from(Source::Sales)
            .join(Join::Category)
            .aggregate(AggFunction::Count, Column::SaleId, "n")
            .build()
            .unwrap_err();
        assert!(matches!(err, LensError::InvalidQuery(_)));
    }

    #[test]
    fn test_column_outside_scope_rejected() {
        let err = QueryBuilder::from(Source::Sales)
            .group_by(Column::City, "city")
            .aggregate(AggFunction::Count, Column::SaleId, "n")
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("not joined"));
    }

    #[test]
    fn test_unknown_order_alias_rejected() {
        let err = QueryBuilder::from(Source::Sales)
            .aggregate(AggFunction::Sum, Column::SaleTotalAmount, "revenue")
            .order_by("missing", SortDirection::Asc)
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_percentile_fraction_checked() {
        assert!(QueryBuilder::from(Source::Sales)
            .aggregate(
                AggFunction::PercentileCont(1.5),
                Column::SaleDeliverySeconds,
                "p"
            )
            .build()
            .is_err());
    }

    #[test]
    fn test_explain_lists_steps() {
        let query = QueryBuilder::from(Source::Sales)
            .filter(Predicate::ChannelEquals(3))
            .aggregate(AggFunction::Count, Column::SaleId, "total_sales_count")
            .build()
            .unwrap();
        let plan = query.explain();
        assert_eq!(plan[0], "Scan source: Sales");
        assert!(plan.iter().any(|s| s == "Filter: s.channel_id = 3"));
    }
}
