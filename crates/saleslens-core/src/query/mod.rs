//! # Typed aggregate queries
//!
//! Reports never build SQL text. They describe what they need as an
//! [`AggregateQuery`]: a source relation, joins, tagged [`Predicate`]s
//! AND-combined into a [`Conjunction`], grouping keys, aggregates, `HAVING`
//! bounds, ordering and a limit. A [`QueryExecutor`] turns that description
//! into rows.
//!
//! ## Example
//!
//! ```
//! use saleslens_core::query::{
//!     conjoin, AggFunction, Column, Dataset, MemoryExecutor, Predicate, QueryBuilder,
//!     QueryExecutor, SaleStatus, Source,
//! };
//!
//! let executor = MemoryExecutor::new(Dataset::default());
//! let filter = conjoin(
//!     [Predicate::StatusEquals(SaleStatus::Completed)],
//!     [None, Some(Predicate::ChannelEquals(2))],
//! );
//! let query = QueryBuilder::from(Source::Sales)
//!     .filter_all(filter)
//!     .aggregate(AggFunction::Sum, Column::SaleTotalAmount, "total_revenue")
//!     .build()
//!     .unwrap();
//!
//! let result = executor.execute(&query).unwrap();
//! assert_eq!(result.first().unwrap().float_or_zero("total_revenue").unwrap(), 0.0);
//! ```

pub mod ast;
pub mod builder;
pub mod executor;
pub mod functions;
pub mod memory;
pub mod predicate;
pub mod types;

pub use ast::{
    AggFunction, Aggregate, AggregateQuery, Column, GroupKey, Having, Join, OrderBy, Relation,
    SortDirection, Source,
};
pub use builder::QueryBuilder;
pub use executor::{GoalStore, QueryExecutor};
pub use memory::{
    CategoryRow, ChannelRow, CustomerRow, Dataset, DeliveryAddressRow, GoalRow, MemoryExecutor,
    ProductRow, ProductSaleRow, SaleRow, StoreRow,
};
pub use predicate::{conjoin, Conjunction, Predicate, SaleStatus};
pub use types::{Record, ResultSet, Row, Value};
