//! # SalesLens core
//!
//! Operational sales analytics for a dashboard: parameterized aggregation
//! queries over time windows and dimensions, derived month-over-month
//! metrics, and a read-through report cache keyed by canonical parameter
//! strings.
//!
//! ## Layout
//!
//! - [`cache`]: key-value report cache with per-entry expiry
//! - [`query`]: typed aggregate queries, the executor capability and an
//!   in-memory reference executor
//! - [`analytics`]: report repository, monthly composer, cache keys and the
//!   [`ReportService`](analytics::ReportService) front door
//! - [`config`], [`error`], [`clock`], [`metrics`]: ambient plumbing

pub mod analytics;
pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod metrics;
pub mod query;
mod storage;

pub use error::{LensError, Result};
