//! # Sales analytics
//!
//! Reports over the sales store, composed from typed aggregate queries and
//! served through a read-through cache.
//!
//! - [`repository`] builds and runs one aggregation per report
//! - [`composer`] derives the monthly summary from several overviews
//! - [`keys`] renders canonical cache keys
//! - [`service`] validates requests and applies the read-through protocol
//! - [`goal`] reads and writes the average ticket goal, uncached
//!
//! ## Example
//!
//! ```
//! use std::sync::Arc;
//! use chrono::NaiveDate;
//! use saleslens_core::analytics::{ReportService, TimeWindow};
//! use saleslens_core::cache::MemoryCache;
//! use saleslens_core::clock::SystemClock;
//! use saleslens_core::query::{Dataset, MemoryExecutor};
//!
//! let executor = Arc::new(MemoryExecutor::new(Dataset::default()));
//! let service = ReportService::new(
//!     executor.clone(),
//!     executor,
//!     Arc::new(MemoryCache::new()),
//!     Arc::new(SystemClock),
//! );
//!
//! let window = TimeWindow::new(
//!     NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
//!     NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
//! )
//! .unwrap();
//! let overview = service.overview(window).unwrap();
//! assert_eq!(overview.total_sales_count, 0);
//! ```

pub mod composer;
pub mod filters;
pub mod goal;
pub mod keys;
pub mod models;
pub mod repository;
pub mod service;
pub mod window;

pub use composer::{MonthlySummaryComposer, SummaryWindows};
pub use filters::{DeliveryDimension, Dimension, FilterSet, HourRange, SalesDimension};
pub use goal::GoalService;
pub use keys::{CacheKey, ReportKind};
pub use models::*;
pub use repository::AggregateRepository;
pub use service::ReportService;
pub use window::TimeWindow;
