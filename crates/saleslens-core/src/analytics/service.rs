//! Report service: validation, canonical keys and the read-through cache
//!
//! Every cached report follows the same protocol:
//!
//! 1. Validate the parameters. Invalid input fails before the cache or the
//!    store is touched.
//! 2. Derive the canonical key.
//! 3. On a hit, decode and return the cached report.
//! 4. On a miss, compute the report, encode it as JSON, store it for
//!    [`CACHE_TTL`] and return it.
//!
//! A cached payload that no longer decodes is treated as a miss and
//! overwritten. Two requests missing the same key concurrently both compute
//! and the later write wins.

use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use super::composer::MonthlySummaryComposer;
use super::filters::{DeliveryDimension, Dimension, FilterSet, SalesDimension};
use super::goal::GoalService;
use super::keys::{self, CacheKey};
use super::models::{
    AverageTicketGoal, ChurnRiskReport, DatabaseStatus, DeliveryPerformanceReport, FilterOptions,
    HealthStatus, MonthlySummary, SalesBreakdownReport, SalesOverview, TicketCompositionReport,
    TicketTrendReport, TopProductsReport,
};
use super::repository::{validate_churn_params, validate_top_limit, AggregateRepository};
use super::window::TimeWindow;
use crate::cache::{CacheBackend, CACHE_TTL};
use crate::clock::Clock;
use crate::config::AnalyticsConfig;
use crate::error::Result;
use crate::metrics;
use crate::query::{GoalStore, QueryExecutor};

/// Entry point for every dashboard report
pub struct ReportService {
    repository: AggregateRepository,
    composer: MonthlySummaryComposer,
    goals: GoalService,
    cache: Arc<dyn CacheBackend>,
    clock: Arc<dyn Clock>,
    defaults: AnalyticsConfig,
}

impl ReportService {
    /// Wire a service from its collaborators
    pub fn new(
        executor: Arc<dyn QueryExecutor>,
        goal_store: Arc<dyn GoalStore>,
        cache: Arc<dyn CacheBackend>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let repository = AggregateRepository::new(executor);
        Self {
            composer: MonthlySummaryComposer::new(repository.clone()),
            repository,
            goals: GoalService::new(goal_store),
            cache,
            clock,
            defaults: AnalyticsConfig::default(),
        }
    }

    /// Replace the parameter defaults
    pub fn with_defaults(mut self, defaults: AnalyticsConfig) -> Self {
        self.defaults = defaults;
        self
    }

    /// Parameter defaults in effect
    pub fn defaults(&self) -> &AnalyticsConfig {
        &self.defaults
    }

    /// Window used when a request names no dates
    pub fn default_window(&self) -> TimeWindow {
        TimeWindow::trailing(self.clock.today(), self.defaults.default_window_days)
    }

    // ------------------------------------------------------------------
    // Read-through protocol
    // ------------------------------------------------------------------

    fn read_through<T, F>(&self, key: CacheKey, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        let started = Instant::now();
        let report = key.kind().tag();
        let result = self.lookup_or_compute(&key, compute);
        metrics::record_report(report, started.elapsed(), result.is_ok());
        result
    }

    fn lookup_or_compute<T, F>(&self, key: &CacheKey, compute: F) -> Result<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Result<T>,
    {
        let report = key.kind().tag();

        if let Some(payload) = self.cache.get(key.as_str())? {
            match serde_json::from_slice::<T>(&payload) {
                Ok(value) => {
                    debug!(key = %key, "cache hit");
                    metrics::record_cache_hit(report);
                    return Ok(value);
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "discarding undecodable cache entry");
                    metrics::record_cache_decode_failure(report);
                }
            }
        }

        debug!(key = %key, "cache miss");
        metrics::record_cache_miss(report);

        let value = compute()?;
        let payload = serde_json::to_vec(&value)?;
        self.cache.set(key.as_str(), Bytes::from(payload), CACHE_TTL)?;
        Ok(value)
    }

    /// Pass a validation outcome through, counting rejections
    fn validated<T>(operation: &'static str, outcome: Result<T>) -> Result<T> {
        if let Err(e) = &outcome {
            if e.is_validation() {
                metrics::record_validation_error(operation);
                debug!(operation, error = %e, "rejected request");
            }
        }
        outcome
    }

    // ------------------------------------------------------------------
    // Cached reports
    // ------------------------------------------------------------------

    /// Revenue, sale count and average ticket over `window`
    pub fn overview(&self, window: TimeWindow) -> Result<SalesOverview> {
        self.read_through(keys::overview(&window), || self.repository.overview(window))
    }

    /// Top `limit` products by revenue, narrowed by `filters`
    pub fn top_products(
        &self,
        window: TimeWindow,
        limit: u32,
        filters: FilterSet,
    ) -> Result<TopProductsReport> {
        Self::validated(
            "top_products",
            validate_top_limit(limit).and_then(|_| filters.validate()),
        )?;
        self.read_through(keys::top_products(&window, limit, &filters), || {
            self.repository.top_products(window, limit, &filters)
        })
    }

    /// Revenue breakdown by channel or store
    pub fn sales_breakdown(
        &self,
        window: TimeWindow,
        dimension: Dimension,
    ) -> Result<SalesBreakdownReport> {
        Self::validated("sales_breakdown", SalesDimension::try_from(dimension))?;
        self.read_through(keys::sales_breakdown(&window, dimension), || {
            self.repository.sales_breakdown(window, dimension)
        })
    }

    /// Delivery time statistics by store, neighborhood or city
    pub fn delivery_performance(
        &self,
        window: TimeWindow,
        dimension: Dimension,
        filters: FilterSet,
    ) -> Result<DeliveryPerformanceReport> {
        Self::validated(
            "delivery_performance",
            DeliveryDimension::try_from(dimension)
                .and_then(|_| filters.validate_time_only()),
        )?;
        self.read_through(
            keys::delivery_performance(&window, dimension, &filters),
            || self.repository.delivery_performance(window, dimension, &filters),
        )
    }

    /// Daily average ticket over `window`
    pub fn ticket_trend(&self, window: TimeWindow) -> Result<TicketTrendReport> {
        self.read_through(keys::ticket_trend(&window), || {
            self.repository.ticket_trend(window)
        })
    }

    /// Category share of line-item revenue over `window`
    pub fn ticket_composition(&self, window: TimeWindow) -> Result<TicketCompositionReport> {
        self.read_through(keys::ticket_composition(&window), || {
            self.repository.ticket_composition(window)
        })
    }

    /// Repeat customers who have gone quiet, relative to today
    pub fn churn_risk(&self, min_purchases: u32, inactive_days: u32) -> Result<ChurnRiskReport> {
        Self::validated(
            "churn_risk",
            validate_churn_params(min_purchases, inactive_days),
        )?;
        let today = self.clock.today();
        self.read_through(keys::churn_risk(min_purchases, inactive_days, today), || {
            self.repository.churn_risk(min_purchases, inactive_days, today)
        })
    }

    /// Month-over-month revenue KPIs for today
    pub fn monthly_summary(&self) -> Result<MonthlySummary> {
        let today = self.clock.today();
        self.read_through(keys::monthly_summary(today), || self.composer.compose(today))
    }

    // ------------------------------------------------------------------
    // Uncached operations
    // ------------------------------------------------------------------

    /// Current average ticket goal
    pub fn average_ticket_goal(&self) -> Result<AverageTicketGoal> {
        self.goals.average_ticket_goal()
    }

    /// Replace the average ticket goal; committed before returning
    pub fn update_average_ticket_goal(&self, goal_value: f64) -> Result<AverageTicketGoal> {
        Self::validated(
            "update_average_ticket_goal",
            super::goal::validate_goal(goal_value),
        )?;
        self.goals.update_average_ticket_goal(goal_value)
    }

    /// Channels and stores for the filter pickers
    pub fn filter_options(&self) -> Result<FilterOptions> {
        self.repository.filter_options()
    }

    /// Service health; a failed store ping reports `disconnected` rather
    /// than an error
    pub fn health(&self) -> HealthStatus {
        match self.repository.ping() {
            Ok(()) => HealthStatus::with_database(DatabaseStatus::Connected),
            Err(e) => {
                warn!(error = %e, "database ping failed");
                HealthStatus::with_database(DatabaseStatus::Disconnected)
            }
        }
    }
}

impl std::fmt::Debug for ReportService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReportService")
            .field("defaults", &self.defaults)
            .finish_non_exhaustive()
    }
}
