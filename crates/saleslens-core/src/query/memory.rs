//! In-memory reference executor
//!
//! Evaluates [`AggregateQuery`] directly over a [`Dataset`] held in memory.
//! Joins, filters, grouping and ordering follow the semantics the SQL store
//! gives the same query: inner joins drop unmatched rows, a left join keeps
//! them with NULL columns, aggregates skip NULL inputs, and a query without
//! grouping keys always yields exactly one row.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use chrono::{Datelike, NaiveDateTime, Timelike};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};

use super::ast::{AggregateQuery, Column, Having, Join, SortDirection, Source};
use super::executor::{GoalStore, QueryExecutor};
use super::functions::{accumulator, Accumulator};
use super::predicate::Predicate;
use super::types::{ResultSet, Row, Value};
use crate::error::{LensError, Result};

// ---------------------------------------------------------------------------
// Dataset
// ---------------------------------------------------------------------------

/// `channels` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChannelRow {
    pub id: i64,
    pub name: String,
}

/// `stores` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreRow {
    pub id: i64,
    pub name: String,
}

/// `categories` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoryRow {
    pub id: i64,
    pub name: String,
}

/// `products` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductRow {
    pub id: i64,
    pub name: String,
    pub category_id: i64,
}

/// `customers` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomerRow {
    pub id: i64,
    pub customer_name: String,
}

/// `sales` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleRow {
    pub id: i64,
    #[serde(default)]
    pub customer_id: Option<i64>,
    pub channel_id: i64,
    pub store_id: i64,
    pub created_at: NaiveDateTime,
    pub total_amount: f64,
    pub sale_status_desc: String,
    #[serde(default)]
    pub delivery_seconds: Option<i64>,
}

/// `product_sales` row (one line item of a sale)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductSaleRow {
    pub id: i64,
    pub sale_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub total_price: f64,
}

/// `delivery_addresses` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryAddressRow {
    pub sale_id: i64,
    #[serde(default)]
    pub neighborhood: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
}

/// `goals` row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GoalRow {
    pub goal_name: String,
    pub goal_value: f64,
}

/// Every table of the sales schema. Missing tables load as empty.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dataset {
    pub channels: Vec<ChannelRow>,
    pub stores: Vec<StoreRow>,
    pub categories: Vec<CategoryRow>,
    pub products: Vec<ProductRow>,
    pub customers: Vec<CustomerRow>,
    pub sales: Vec<SaleRow>,
    pub product_sales: Vec<ProductSaleRow>,
    pub delivery_addresses: Vec<DeliveryAddressRow>,
    pub goals: Vec<GoalRow>,
}

impl Dataset {
    /// Parse a dataset from JSON text
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| LensError::storage(format!("invalid dataset: {}", e)))
    }

    /// Load a dataset from a JSON file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Write the dataset to a JSON file through a temp file and rename, so
    /// readers never observe a partial document
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)?;

        let temp_path = path.with_extension("json.tmp");
        std::fs::write(&temp_path, content)?;

        std::fs::rename(&temp_path, path).map_err(|e| {
            let _ = std::fs::remove_file(&temp_path);
            LensError::from(e)
        })?;

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Joined tuples
// ---------------------------------------------------------------------------

/// One joined row; relations not in scope (or unmatched by a left join) are `None`
#[derive(Clone, Copy, Default)]
struct Tuple<'a> {
    sale: Option<&'a SaleRow>,
    item: Option<&'a ProductSaleRow>,
    product: Option<&'a ProductRow>,
    category: Option<&'a CategoryRow>,
    channel: Option<&'a ChannelRow>,
    store: Option<&'a StoreRow>,
    address: Option<&'a DeliveryAddressRow>,
    customer: Option<&'a CustomerRow>,
}

impl<'a> Tuple<'a> {
    fn column(&self, column: Column) -> Value {
        match column {
            Column::SaleId => self.sale.map(|s| s.id).into(),
            Column::SaleStatus => self.sale.map(|s| s.sale_status_desc.as_str()).into(),
            Column::SaleCreatedAt => self
                .sale
                .map(|s| Value::Timestamp(s.created_at))
                .unwrap_or(Value::Null),
            Column::SaleDate => self.sale.map(|s| s.created_at.date()).into(),
            Column::SaleTotalAmount => self.sale.map(|s| s.total_amount).into(),
            Column::SaleChannelId => self.sale.map(|s| s.channel_id).into(),
            Column::SaleStoreId => self.sale.map(|s| s.store_id).into(),
            Column::SaleCustomerId => self.sale.and_then(|s| s.customer_id).into(),
            Column::SaleDeliverySeconds => self.sale.and_then(|s| s.delivery_seconds).into(),
            Column::ItemQuantity => self.item.map(|i| i.quantity).into(),
            Column::ItemTotalPrice => self.item.map(|i| i.total_price).into(),
            Column::ProductId => self.product.map(|p| p.id).into(),
            Column::ProductName => self.product.map(|p| p.name.as_str()).into(),
            Column::CategoryName => self.category.map(|c| c.name.as_str()).into(),
            Column::ChannelId => self.channel.map(|c| c.id).into(),
            Column::ChannelName => self.channel.map(|c| c.name.as_str()).into(),
            Column::StoreId => self.store.map(|s| s.id).into(),
            Column::StoreName => self.store.map(|s| s.name.as_str()).into(),
            Column::Neighborhood => self.address.and_then(|a| a.neighborhood.as_deref()).into(),
            Column::City => self.address.and_then(|a| a.city.as_deref()).into(),
            Column::CustomerId => self.customer.map(|c| c.id).into(),
            Column::CustomerName => self.customer.map(|c| c.customer_name.as_str()).into(),
        }
    }

    fn matches(&self, predicate: &Predicate) -> bool {
        match predicate {
            Predicate::NotNull(column) => !self.column(*column).is_null(),
            Predicate::StatusEquals(status) => self
                .sale
                .is_some_and(|s| s.sale_status_desc == status.as_str()),
            Predicate::CreatedWithin {
                start,
                end_exclusive,
            } => self
                .sale
                .is_some_and(|s| s.created_at >= *start && s.created_at < *end_exclusive),
            Predicate::ChannelEquals(id) => self.sale.is_some_and(|s| s.channel_id == *id),
            Predicate::StoreEquals(id) => self.sale.is_some_and(|s| s.store_id == *id),
            Predicate::DayOfWeekEquals(day) => self
                .sale
                .is_some_and(|s| s.created_at.weekday().number_from_monday() == u32::from(*day)),
            Predicate::HourRangeBetween {
                start_hour,
                end_hour,
            } => self.sale.is_some_and(|s| {
                (u32::from(*start_hour)..=u32::from(*end_hour)).contains(&s.created_at.hour())
            }),
        }
    }
}

/// Primary-key lookups built once per query
struct Indexes<'a> {
    sales: HashMap<i64, &'a SaleRow>,
    products: HashMap<i64, &'a ProductRow>,
    categories: HashMap<i64, &'a CategoryRow>,
    channels: HashMap<i64, &'a ChannelRow>,
    stores: HashMap<i64, &'a StoreRow>,
    customers: HashMap<i64, &'a CustomerRow>,
    addresses: HashMap<i64, Vec<&'a DeliveryAddressRow>>,
}

impl<'a> Indexes<'a> {
    fn build(data: &'a Dataset, query: &AggregateQuery) -> Self {
        let needs_sales = query.source == Source::SaleItems;
        let needs_addresses = query.joins.contains(&Join::DeliveryAddress);
        let mut addresses: HashMap<i64, Vec<&DeliveryAddressRow>> = HashMap::new();
        if needs_addresses {
            for address in &data.delivery_addresses {
                addresses.entry(address.sale_id).or_default().push(address);
            }
        }
        Self {
            sales: if needs_sales {
                data.sales.iter().map(|s| (s.id, s)).collect()
            } else {
                HashMap::new()
            },
            products: data.products.iter().map(|p| (p.id, p)).collect(),
            categories: data.categories.iter().map(|c| (c.id, c)).collect(),
            channels: data.channels.iter().map(|c| (c.id, c)).collect(),
            stores: data.stores.iter().map(|s| (s.id, s)).collect(),
            customers: data.customers.iter().map(|c| (c.id, c)).collect(),
            addresses,
        }
    }
}

fn scan<'a>(data: &'a Dataset, source: Source, idx: &Indexes<'a>) -> Vec<Tuple<'a>> {
    match source {
        Source::Sales => data
            .sales
            .iter()
            .map(|sale| Tuple {
                sale: Some(sale),
                ..Tuple::default()
            })
            .collect(),
        Source::SaleItems => data
            .product_sales
            .iter()
            .filter_map(|item| {
                idx.sales.get(&item.sale_id).map(|sale| Tuple {
                    sale: Some(*sale),
                    item: Some(item),
                    ..Tuple::default()
                })
            })
            .collect(),
        Source::Channels => data
            .channels
            .iter()
            .map(|channel| Tuple {
                channel: Some(channel),
                ..Tuple::default()
            })
            .collect(),
        Source::Stores => data
            .stores
            .iter()
            .map(|store| Tuple {
                store: Some(store),
                ..Tuple::default()
            })
            .collect(),
    }
}

fn apply_join<'a>(tuples: Vec<Tuple<'a>>, join: Join, idx: &Indexes<'a>) -> Vec<Tuple<'a>> {
    let mut out = Vec::with_capacity(tuples.len());
    for tuple in tuples {
        match join {
            Join::Channel => {
                if let Some(channel) = tuple.sale.and_then(|s| idx.channels.get(&s.channel_id)) {
                    out.push(Tuple {
                        channel: Some(*channel),
                        ..tuple
                    });
                }
            }
            Join::Store => {
                if let Some(store) = tuple.sale.and_then(|s| idx.stores.get(&s.store_id)) {
                    out.push(Tuple {
                        store: Some(*store),
                        ..tuple
                    });
                }
            }
            Join::StoreOptional => out.push(Tuple {
                store: tuple
                    .sale
                    .and_then(|s| idx.stores.get(&s.store_id))
                    .copied(),
                ..tuple
            }),
            Join::DeliveryAddress => {
                let matches = tuple.sale.and_then(|s| idx.addresses.get(&s.id));
                for address in matches.into_iter().flatten() {
                    out.push(Tuple {
                        address: Some(*address),
                        ..tuple
                    });
                }
            }
            Join::Customer => {
                let customer = tuple
                    .sale
                    .and_then(|s| s.customer_id)
                    .and_then(|id| idx.customers.get(&id));
                if let Some(customer) = customer {
                    out.push(Tuple {
                        customer: Some(*customer),
                        ..tuple
                    });
                }
            }
            Join::Product => {
                if let Some(product) = tuple.item.and_then(|i| idx.products.get(&i.product_id)) {
                    out.push(Tuple {
                        product: Some(*product),
                        ..tuple
                    });
                }
            }
            Join::Category => {
                let category = tuple
                    .product
                    .and_then(|p| idx.categories.get(&p.category_id));
                if let Some(category) = category {
                    out.push(Tuple {
                        category: Some(*category),
                        ..tuple
                    });
                }
            }
        }
    }
    out
}

/// Hashable rendering of a grouping key; `Value` holds floats and is not `Hash`
fn group_fingerprint(values: &[Value]) -> String {
    format!("{:?}", values)
}

fn evaluate(data: &Dataset, query: &AggregateQuery) -> Result<ResultSet> {
    let idx = Indexes::build(data, query);
    let mut tuples = scan(data, query.source, &idx);
    for join in &query.joins {
        tuples = apply_join(tuples, *join, &idx);
    }
    tuples.retain(|t| query.predicates().iter().all(|p| t.matches(p)));

    // Groups keep first-seen order so unordered output is still deterministic
    let mut groups: Vec<(Vec<Value>, Vec<Box<dyn Accumulator>>)> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    let fresh = || -> Vec<Box<dyn Accumulator>> {
        query.aggregates.iter().map(|a| accumulator(a.function)).collect()
    };
    if query.group_by.is_empty() {
        groups.push((Vec::new(), fresh()));
    }
    for tuple in &tuples {
        let key: Vec<Value> = query.group_by.iter().map(|g| tuple.column(g.column)).collect();
        let slot = match positions.get(&group_fingerprint(&key)) {
            Some(slot) => *slot,
            None if query.group_by.is_empty() => 0,
            None => {
                positions.insert(group_fingerprint(&key), groups.len());
                groups.push((key, fresh()));
                groups.len() - 1
            }
        };
        for (acc, agg) in groups[slot].1.iter_mut().zip(&query.aggregates) {
            acc.update(&tuple.column(agg.column));
        }
    }

    let columns = query.output_columns();
    let position_of = |alias: &str| -> Result<usize> {
        columns
            .iter()
            .position(|c| c == alias)
            .ok_or_else(|| LensError::invalid_query(format!("unknown output column '{alias}'")))
    };

    let mut rows: Vec<Row> = groups
        .into_iter()
        .map(|(mut key, accs)| {
            key.extend(accs.iter().map(|acc| acc.finalize()));
            Row::new(key)
        })
        .collect();

    for having in &query.having {
        let col = position_of(having.alias())?;
        rows.retain(|row| {
            let value = &row.values[col];
            if value.is_null() {
                return false;
            }
            match having {
                Having::AtLeast { value: bound, .. } => value.compare(bound).is_ge(),
                Having::AtMost { value: bound, .. } => value.compare(bound).is_le(),
            }
        });
    }

    let sort_keys = query
        .order_by
        .iter()
        .map(|o| Ok((position_of(&o.alias)?, o.direction)))
        .collect::<Result<Vec<_>>>()?;
    if !sort_keys.is_empty() {
        rows.sort_by(|a, b| {
            sort_keys
                .iter()
                .map(|(col, direction)| {
                    let ord = a.values[*col].compare(&b.values[*col]);
                    match direction {
                        SortDirection::Asc => ord,
                        SortDirection::Desc => ord.reverse(),
                    }
                })
                .find(|ord| ord.is_ne())
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    if let Some(limit) = query.limit {
        rows.truncate(limit);
    }

    Ok(ResultSet::new(columns, rows))
}

// ---------------------------------------------------------------------------
// Executor
// ---------------------------------------------------------------------------

/// [`QueryExecutor`] and [`GoalStore`] over an in-memory [`Dataset`]
#[derive(Debug, Default)]
pub struct MemoryExecutor {
    data: RwLock<Dataset>,
    staged_goals: Mutex<Vec<GoalRow>>,
    executions: AtomicU64,
    offline: AtomicBool,
}

impl MemoryExecutor {
    /// Create an executor serving `dataset`
    pub fn new(dataset: Dataset) -> Self {
        Self {
            data: RwLock::new(dataset),
            ..Self::default()
        }
    }

    /// Create an executor from a JSON dataset file
    pub fn from_file(path: &Path) -> Result<Self> {
        Ok(Self::new(Dataset::from_file(path)?))
    }

    /// Number of queries executed so far
    pub fn execution_count(&self) -> u64 {
        self.executions.load(Ordering::Relaxed)
    }

    /// Simulate the store going away (or coming back). While offline every
    /// call fails with a storage error.
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::Relaxed);
    }

    /// Mutate the dataset in place
    pub fn modify<F: FnOnce(&mut Dataset)>(&self, f: F) {
        f(&mut self.data.write());
    }

    /// Clone of the current dataset, including committed goals
    pub fn snapshot(&self) -> Dataset {
        self.data.read().clone()
    }

    fn check_online(&self) -> Result<()> {
        if self.offline.load(Ordering::Relaxed) {
            Err(LensError::storage("database unavailable"))
        } else {
            Ok(())
        }
    }
}

impl QueryExecutor for MemoryExecutor {
    fn execute(&self, query: &AggregateQuery) -> Result<ResultSet> {
        self.executions.fetch_add(1, Ordering::Relaxed);
        self.check_online()?;
        let data = self.data.read();
        evaluate(&data, query)
    }

    fn ping(&self) -> Result<()> {
        self.check_online()
    }
}

impl GoalStore for MemoryExecutor {
    fn read_goal(&self, name: &str) -> Result<Option<f64>> {
        self.check_online()?;
        Ok(self
            .data
            .read()
            .goals
            .iter()
            .find(|g| g.goal_name == name)
            .map(|g| g.goal_value))
    }

    fn update_goal(&self, name: &str, value: f64) -> Result<()> {
        self.check_online()?;
        self.staged_goals.lock().push(GoalRow {
            goal_name: name.to_string(),
            goal_value: value,
        });
        Ok(())
    }

    fn commit(&self) -> Result<()> {
        self.check_online()?;
        let staged = std::mem::take(&mut *self.staged_goals.lock());
        let mut data = self.data.write();
        for write in staged {
            match data.goals.iter_mut().find(|g| g.goal_name == write.goal_name) {
                Some(goal) => goal.goal_value = write.goal_value,
                None => data.goals.push(write),
            }
        }
        Ok(())
    }
}
