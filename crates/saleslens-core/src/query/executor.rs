//! Storage capabilities consumed by the report layer

use super::ast::AggregateQuery;
use super::types::ResultSet;
use crate::error::Result;

/// Runs aggregate queries against the sales store.
///
/// Each call is a single read of the store; no transaction spans calls.
/// Implementations translate [`AggregateQuery`] however they like (SQL,
/// direct evaluation) but must honour its join, filter, grouping, having,
/// ordering and limit semantics, and must return the columns in
/// [`AggregateQuery::output_columns`] order.
pub trait QueryExecutor: Send + Sync {
    /// Execute a query and return its rows
    fn execute(&self, query: &AggregateQuery) -> Result<ResultSet>;

    /// Cheap liveness check of the underlying store
    fn ping(&self) -> Result<()>;
}

/// Named numeric goals (`goals` table) with explicit commit
pub trait GoalStore: Send + Sync {
    /// Committed value of a goal, if it exists
    fn read_goal(&self, name: &str) -> Result<Option<f64>>;

    /// Stage a new value for a goal, creating it if missing
    fn update_goal(&self, name: &str, value: f64) -> Result<()>;

    /// Make staged goal writes durable and visible
    fn commit(&self) -> Result<()>;
}
