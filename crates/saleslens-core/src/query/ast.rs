//! Aggregate query vocabulary
//!
//! An [`AggregateQuery`] describes one grouped aggregation over the sales
//! schema: a source relation, a fixed set of joins, AND-composed predicates,
//! grouping keys, aggregates, post-aggregation filters, ordering and a row
//! limit. Executors are free to translate it into SQL or to evaluate it
//! directly.

use std::fmt;

use super::predicate::{Conjunction, Predicate};
use super::types::Value;

/// Root relation a query scans
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// One row per sale
    Sales,
    /// One row per sale line item, always joined to its sale
    SaleItems,
    /// Channel lookup table
    Channels,
    /// Store lookup table
    Stores,
}

/// Relations that can be joined onto the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Join {
    /// Inner join `channels` on the sale's channel
    Channel,
    /// Inner join `stores` on the sale's store
    Store,
    /// Left join `stores` on the sale's store
    StoreOptional,
    /// Inner join `delivery_addresses` on the sale id
    DeliveryAddress,
    /// Inner join `customers` on the sale's customer
    Customer,
    /// Inner join `products` on the line item's product
    Product,
    /// Inner join `categories` on the product's category (requires [`Join::Product`])
    Category,
}

impl Source {
    /// Relations a scan of this source makes available
    pub fn relations(&self) -> &'static [Relation] {
        match self {
            Source::Sales => &[Relation::Sale],
            Source::SaleItems => &[Relation::Item, Relation::Sale],
            Source::Channels => &[Relation::Channel],
            Source::Stores => &[Relation::Store],
        }
    }
}

impl Join {
    /// Relation the join brings into scope
    pub fn relation(&self) -> Relation {
        match self {
            Join::Channel => Relation::Channel,
            Join::Store | Join::StoreOptional => Relation::Store,
            Join::DeliveryAddress => Relation::DeliveryAddress,
            Join::Customer => Relation::Customer,
            Join::Product => Relation::Product,
            Join::Category => Relation::Category,
        }
    }

    /// Relation that must already be in scope for the join condition
    pub fn requires(&self) -> Relation {
        match self {
            Join::Product => Relation::Item,
            Join::Category => Relation::Product,
            _ => Relation::Sale,
        }
    }
}

/// Tables of the sales schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Relation {
    /// `sales`
    Sale,
    /// `product_sales`
    Item,
    /// `products`
    Product,
    /// `categories`
    Category,
    /// `channels`
    Channel,
    /// `stores`
    Store,
    /// `delivery_addresses`
    DeliveryAddress,
    /// `customers`
    Customer,
}

/// Columns addressable by predicates, grouping keys and aggregates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// `sales.id`
    SaleId,
    /// `sales.sale_status_desc`
    SaleStatus,
    /// `sales.created_at`
    SaleCreatedAt,
    /// `DATE(sales.created_at)`
    SaleDate,
    /// `sales.total_amount`
    SaleTotalAmount,
    /// `sales.channel_id`
    SaleChannelId,
    /// `sales.store_id`
    SaleStoreId,
    /// `sales.customer_id`
    SaleCustomerId,
    /// `sales.delivery_seconds`
    SaleDeliverySeconds,
    /// `product_sales.quantity`
    ItemQuantity,
    /// `product_sales.total_price`
    ItemTotalPrice,
    /// `products.id`
    ProductId,
    /// `products.name`
    ProductName,
    /// `categories.name`
    CategoryName,
    /// `channels.id`
    ChannelId,
    /// `channels.name`
    ChannelName,
    /// `stores.id`
    StoreId,
    /// `stores.name`
    StoreName,
    /// `delivery_addresses.neighborhood`
    Neighborhood,
    /// `delivery_addresses.city`
    City,
    /// `customers.id`
    CustomerId,
    /// `customers.customer_name`
    CustomerName,
}

impl Column {
    /// Table the column belongs to
    pub fn relation(&self) -> Relation {
        match self {
            Column::SaleId
            | Column::SaleStatus
            | Column::SaleCreatedAt
            | Column::SaleDate
            | Column::SaleTotalAmount
            | Column::SaleChannelId
            | Column::SaleStoreId
            | Column::SaleCustomerId
            | Column::SaleDeliverySeconds => Relation::Sale,
            Column::ItemQuantity | Column::ItemTotalPrice => Relation::Item,
            Column::ProductId | Column::ProductName => Relation::Product,
            Column::CategoryName => Relation::Category,
            Column::ChannelId | Column::ChannelName => Relation::Channel,
            Column::StoreId | Column::StoreName => Relation::Store,
            Column::Neighborhood | Column::City => Relation::DeliveryAddress,
            Column::CustomerId | Column::CustomerName => Relation::Customer,
        }
    }

    /// Qualified SQL-style name, used in explain output and error messages
    pub fn qualified_name(&self) -> &'static str {
        match self {
            Column::SaleId => "s.id",
            Column::SaleStatus => "s.sale_status_desc",
            Column::SaleCreatedAt => "s.created_at",
            Column::SaleDate => "DATE(s.created_at)",
            Column::SaleTotalAmount => "s.total_amount",
            Column::SaleChannelId => "s.channel_id",
            Column::SaleStoreId => "s.store_id",
            Column::SaleCustomerId => "s.customer_id",
            Column::SaleDeliverySeconds => "s.delivery_seconds",
            Column::ItemQuantity => "ps.quantity",
            Column::ItemTotalPrice => "ps.total_price",
            Column::ProductId => "p.id",
            Column::ProductName => "p.name",
            Column::CategoryName => "c.name",
            Column::ChannelId => "ch.id",
            Column::ChannelName => "ch.name",
            Column::StoreId => "st.id",
            Column::StoreName => "st.name",
            Column::Neighborhood => "da.neighborhood",
            Column::City => "da.city",
            Column::CustomerId => "cu.id",
            Column::CustomerName => "cu.customer_name",
        }
    }
}

impl fmt::Display for Column {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.qualified_name())
    }
}

/// Supported aggregate functions.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum AggFunction {
    /// Count of non-null values.
    Count,
    /// Numeric sum; NULL over an empty input.
    Sum,
    /// Arithmetic mean; NULL over an empty input.
    Avg,
    /// Maximum value.
    Max,
    /// Continuous (interpolated) percentile, fraction in `0.0..=1.0`.
    PercentileCont(f64),
}

impl fmt::Display for AggFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AggFunction::Count => write!(f, "COUNT"),
            AggFunction::Sum => write!(f, "SUM"),
            AggFunction::Avg => write!(f, "AVG"),
            AggFunction::Max => write!(f, "MAX"),
            AggFunction::PercentileCont(p) => write!(f, "PERCENTILE_CONT({p})"),
        }
    }
}

/// A named aggregate output column
#[derive(Clone, Debug, PartialEq)]
pub struct Aggregate {
    /// Function applied to the column
    pub function: AggFunction,
    /// Input column
    pub column: Column,
    /// Output column name
    pub alias: String,
}

/// A named grouping key output column
#[derive(Clone, Debug, PartialEq)]
pub struct GroupKey {
    /// Grouped column
    pub column: Column,
    /// Output column name
    pub alias: String,
}

/// Filter applied to aggregated rows (SQL `HAVING`)
#[derive(Clone, Debug, PartialEq)]
pub enum Having {
    /// Output column is greater than or equal to the value
    AtLeast {
        /// Output column name
        alias: String,
        /// Inclusive lower bound
        value: Value,
    },
    /// Output column is less than or equal to the value
    AtMost {
        /// Output column name
        alias: String,
        /// Inclusive upper bound
        value: Value,
    },
}

impl Having {
    /// Output column the condition reads
    pub fn alias(&self) -> &str {
        match self {
            Having::AtLeast { alias, .. } | Having::AtMost { alias, .. } => alias,
        }
    }
}

/// Sort direction
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortDirection {
    /// Smallest first
    Asc,
    /// Largest first
    Desc,
}

/// An ORDER BY clause over an output column.
#[derive(Clone, Debug, PartialEq)]
pub struct OrderBy {
    /// Output column name to sort on
    pub alias: String,
    /// Sort direction
    pub direction: SortDirection,
}

/// A fully described grouped aggregation
#[derive(Clone, Debug, PartialEq)]
pub struct AggregateQuery {
    /// Root relation
    pub source: Source,
    /// Joined relations, in join order
    pub joins: Vec<Join>,
    /// Row filter; every predicate must hold
    pub filter: Conjunction,
    /// Grouping keys (empty means a single global group)
    pub group_by: Vec<GroupKey>,
    /// Aggregate output columns
    pub aggregates: Vec<Aggregate>,
    /// Post-aggregation filters; every condition must hold
    pub having: Vec<Having>,
    /// Ordering over output columns
    pub order_by: Vec<OrderBy>,
    /// Maximum number of result rows
    pub limit: Option<usize>,
}

impl AggregateQuery {
    /// Output column names: grouping keys first, then aggregates
    pub fn output_columns(&self) -> Vec<String> {
        self.group_by
            .iter()
            .map(|g| g.alias.clone())
            .chain(self.aggregates.iter().map(|a| a.alias.clone()))
            .collect()
    }

    /// Predicates of the row filter
    pub fn predicates(&self) -> &[Predicate] {
        self.filter.predicates()
    }

    /// Human-readable plan steps
    pub fn explain(&self) -> Vec<String> {
        let mut steps = vec![format!("Scan source: {:?}", self.source)];
        for join in &self.joins {
            steps.push(format!("Join: {:?}", join));
        }
        for predicate in self.predicates() {
            steps.push(format!("Filter: {}", predicate));
        }
        if !self.group_by.is_empty() {
            let keys: Vec<String> = self
                .group_by
                .iter()
                .map(|g| format!("{} AS {}", g.column, g.alias))
                .collect();
            steps.push(format!("Group by: {}", keys.join(", ")));
        }
        for agg in &self.aggregates {
            steps.push(format!("Aggregate: {}({}) AS {}", agg.function, agg.column, agg.alias));
        }
        for having in &self.having {
            steps.push(format!("Having: {:?}", having));
        }
        if !self.order_by.is_empty() {
            let order: Vec<String> = self
                .order_by
                .iter()
                .map(|o| {
                    let dir = match o.direction {
                        SortDirection::Asc => "ASC",
                        SortDirection::Desc => "DESC",
                    };
                    format!("{} {}", o.alias, dir)
                })
                .collect();
            steps.push(format!("Order by: {}", order.join(", ")));
        }
        if let Some(limit) = self.limit {
            steps.push(format!("Limit: {}", limit));
        }
        steps
    }
}
