//! Shared fixtures for SalesLens integration tests.
//!
//! Import via `mod common;` in integration test files:
//! ```rust,ignore
//! mod common;
//! use common::*;
//! ```

use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};

use saleslens::analytics::{ReportService, TimeWindow};
use saleslens::cache::MemoryCache;
use saleslens::clock::FixedClock;
use saleslens::query::{
    CategoryRow, ChannelRow, CustomerRow, Dataset, DeliveryAddressRow, MemoryExecutor, ProductRow,
    ProductSaleRow, SaleRow, StoreRow,
};

// ============================================================================
// Dates
// ============================================================================

#[allow(dead_code)]
pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

#[allow(dead_code)]
pub fn at(day: NaiveDate, hour: u32) -> NaiveDateTime {
    day.and_hms_opt(hour, 0, 0).expect("valid hour")
}

#[allow(dead_code)]
pub fn window(start: NaiveDate, end: NaiveDate) -> TimeWindow {
    TimeWindow::new(start, end).expect("ordered window")
}

// ============================================================================
// Dataset builder
// ============================================================================

/// Channel ids in the catalog
#[allow(dead_code)]
pub const IFOOD: i64 = 1;
#[allow(dead_code)]
pub const COUNTER: i64 = 2;

/// Store ids in the catalog
#[allow(dead_code)]
pub const CENTRO: i64 = 10;
#[allow(dead_code)]
pub const NORTE: i64 = 20;

/// Product ids in the catalog
#[allow(dead_code)]
pub const BACON: i64 = 1000;
#[allow(dead_code)]
pub const SALADA: i64 = 1001;
#[allow(dead_code)]
pub const SODA: i64 = 2000;

/// Incremental dataset builder. Sale ids follow insertion order and the
/// `by`/`item`/`delivered` modifiers apply to the most recent sale.
#[derive(Debug, Default)]
pub struct DatasetBuilder {
    dataset: Dataset,
}

#[allow(dead_code)]
impl DatasetBuilder {
    /// Two channels, two stores, two categories and three products
    pub fn with_catalog() -> Self {
        let mut builder = Self::default();
        let d = &mut builder.dataset;
        d.channels = vec![named_channel(IFOOD, "iFood"), named_channel(COUNTER, "Balcao")];
        d.stores = vec![named_store(CENTRO, "Centro"), named_store(NORTE, "Norte")];
        d.categories = vec![
            CategoryRow {
                id: 100,
                name: "Burgers".to_string(),
            },
            CategoryRow {
                id: 200,
                name: "Drinks".to_string(),
            },
        ];
        d.products = vec![
            product(BACON, "X-Bacon", 100),
            product(SALADA, "X-Salada", 100),
            product(SODA, "Soda", 200),
        ];
        builder
    }

    pub fn customer(mut self, id: i64, name: &str) -> Self {
        self.dataset.customers.push(CustomerRow {
            id,
            customer_name: name.to_string(),
        });
        self
    }

    /// Completed sale through `channel_id` at `store_id`
    pub fn sale(
        mut self,
        created_at: NaiveDateTime,
        amount: f64,
        channel_id: i64,
        store_id: i64,
    ) -> Self {
        let id = self.dataset.sales.len() as i64 + 1;
        self.dataset.sales.push(SaleRow {
            id,
            customer_id: None,
            channel_id,
            store_id,
            created_at,
            total_amount: amount,
            sale_status_desc: "COMPLETED".to_string(),
            delivery_seconds: None,
        });
        self
    }

    /// Cancelled sale; no report counts it
    pub fn cancelled(self, created_at: NaiveDateTime, amount: f64) -> Self {
        let mut this = self.sale(created_at, amount, IFOOD, CENTRO);
        if let Some(last) = this.dataset.sales.last_mut() {
            last.sale_status_desc = "CANCELLED".to_string();
        }
        this
    }

    pub fn by(mut self, customer_id: i64) -> Self {
        if let Some(last) = self.dataset.sales.last_mut() {
            last.customer_id = Some(customer_id);
        }
        self
    }

    pub fn item(mut self, product_id: i64, quantity: i64, total_price: f64) -> Self {
        let sale_id = self.dataset.sales.len() as i64;
        let id = self.dataset.product_sales.len() as i64 + 1;
        self.dataset.product_sales.push(ProductSaleRow {
            id,
            sale_id,
            product_id,
            quantity,
            total_price,
        });
        self
    }

    pub fn delivered(mut self, seconds: i64, neighborhood: &str, city: &str) -> Self {
        if let Some(last) = self.dataset.sales.last_mut() {
            last.delivery_seconds = Some(seconds);
            self.dataset.delivery_addresses.push(DeliveryAddressRow {
                sale_id: last.id,
                neighborhood: Some(neighborhood.to_string()),
                city: Some(city.to_string()),
            });
        }
        self
    }

    pub fn build(self) -> Dataset {
        self.dataset
    }
}

fn named_channel(id: i64, name: &str) -> ChannelRow {
    ChannelRow {
        id,
        name: name.to_string(),
    }
}

fn named_store(id: i64, name: &str) -> StoreRow {
    StoreRow {
        id,
        name: name.to_string(),
    }
}

fn product(id: i64, name: &str, category_id: i64) -> ProductRow {
    ProductRow {
        id,
        name: name.to_string(),
        category_id,
    }
}

// ============================================================================
// Service harness
// ============================================================================

/// Report service over an in-memory dataset with a manually driven clock
#[allow(dead_code)]
pub struct Harness {
    pub executor: Arc<MemoryExecutor>,
    pub cache: Arc<MemoryCache>,
    pub clock: Arc<FixedClock>,
    pub service: ReportService,
}

/// Harness whose clock reads noon on `today`
#[allow(dead_code)]
pub fn harness(dataset: Dataset, today: NaiveDate) -> Harness {
    let clock = Arc::new(FixedClock::new(at(today, 12)));
    let executor = Arc::new(MemoryExecutor::new(dataset));
    let cache = Arc::new(MemoryCache::with_clock(clock.clone()));
    let service = ReportService::new(
        executor.clone(),
        executor.clone(),
        cache.clone(),
        clock.clone(),
    );
    Harness {
        executor,
        cache,
        clock,
        service,
    }
}
