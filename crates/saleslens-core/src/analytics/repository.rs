//! Aggregate repository
//!
//! One operation per report. Each builds an [`AggregateQuery`] from typed
//! parameters, runs it on the injected [`QueryExecutor`] and maps the rows
//! into a report. Operations are pure functions of their inputs and the
//! store contents; caching happens a layer above.

use std::sync::Arc;

use chrono::{Days, NaiveDate};
use tracing::debug;

use super::filters::{DeliveryDimension, Dimension, FilterSet, SalesDimension};
use super::models::{
    ChurnRiskCustomer, ChurnRiskReport, DeliveryPerformanceItem, DeliveryPerformanceReport,
    FilterOptions, NamedEntity, SalesBreakdownItem, SalesBreakdownReport, SalesOverview,
    TicketCompositionItem, TicketCompositionReport, TicketTrendReport, TimeSeriesPoint, TopProduct,
    TopProductsReport,
};
use super::window::TimeWindow;
use crate::error::{LensError, Result};
use crate::query::{
    conjoin, AggFunction, AggregateQuery, Column, Join, Predicate, QueryBuilder, QueryExecutor,
    ResultSet, SaleStatus, SortDirection, Source,
};

/// Largest accepted top-products limit
pub const MAX_TOP_LIMIT: u32 = 100;

/// Groups with fewer deliveries than this are left out of delivery reports
pub const MIN_DELIVERIES_PER_GROUP: i64 = 10;

/// Percentile reported as `p90_delivery_seconds`
pub const DELIVERY_PERCENTILE: f64 = 0.9;

/// Display name for a delivery group whose dimension value is NULL
pub const UNKNOWN_GROUP: &str = "unknown";

/// Reject limits outside `1..=100`
pub fn validate_top_limit(limit: u32) -> Result<()> {
    if limit == 0 || limit > MAX_TOP_LIMIT {
        return Err(LensError::validation(format!(
            "limit must be between 1 and {MAX_TOP_LIMIT}, got {limit}"
        )));
    }
    Ok(())
}

/// Reject churn thresholds below one
pub fn validate_churn_params(min_purchases: u32, inactive_days: u32) -> Result<()> {
    if min_purchases < 1 {
        return Err(LensError::validation("min_purchases must be at least 1"));
    }
    if inactive_days < 1 {
        return Err(LensError::validation("inactive_days must be at least 1"));
    }
    Ok(())
}

/// Last purchase date at or before which a customer counts as inactive
pub fn churn_cutoff(today: NaiveDate, inactive_days: u32) -> NaiveDate {
    today
        .checked_sub_days(Days::new(u64::from(inactive_days)))
        .unwrap_or(NaiveDate::MIN)
}

/// Builds and runs the aggregation behind every report
#[derive(Clone)]
pub struct AggregateRepository {
    executor: Arc<dyn QueryExecutor>,
}

impl AggregateRepository {
    /// Create a repository over `executor`
    pub fn new(executor: Arc<dyn QueryExecutor>) -> Self {
        Self { executor }
    }

    fn run(&self, report: &'static str, query: &AggregateQuery) -> Result<ResultSet> {
        debug!(report, plan = ?query.explain(), "executing aggregate query");
        self.executor.execute(query)
    }

    /// Completed sales inside `window`
    fn completed_in(window: &TimeWindow) -> [Predicate; 2] {
        [Predicate::StatusEquals(SaleStatus::Completed), window.predicate()]
    }

    /// Revenue, count and average ticket of completed sales
    pub fn overview(&self, window: TimeWindow) -> Result<SalesOverview> {
        let query = QueryBuilder::from(Source::Sales)
            .filter_all(conjoin(Self::completed_in(&window), []))
            .aggregate(AggFunction::Sum, Column::SaleTotalAmount, "total_revenue")
            .aggregate(AggFunction::Count, Column::SaleId, "total_sales_count")
            .aggregate(AggFunction::Avg, Column::SaleTotalAmount, "average_ticket_value")
            .build()?;

        let result = self.run("sales_overview", &query)?;
        let (total_revenue, total_sales_count, average_ticket_value) = match result.first() {
            Some(row) => (
                row.float_or_zero("total_revenue")?,
                row.int_or_zero("total_sales_count")?,
                row.float_or_zero("average_ticket_value")?,
            ),
            None => (0.0, 0, 0.0),
        };
        Ok(SalesOverview {
            total_revenue,
            total_sales_count,
            average_ticket_value,
            window,
        })
    }

    /// Products ranked by line-item revenue, narrowed by `filters`
    pub fn top_products(
        &self,
        window: TimeWindow,
        limit: u32,
        filters: &FilterSet,
    ) -> Result<TopProductsReport> {
        validate_top_limit(limit)?;
        filters.validate()?;

        let query = QueryBuilder::from(Source::SaleItems)
            .join(Join::Product)
            .filter_all(conjoin(Self::completed_in(&window), filters.predicates()))
            .group_by(Column::ProductId, "product_id")
            .group_by(Column::ProductName, "product_name")
            .aggregate(AggFunction::Sum, Column::ItemTotalPrice, "total_revenue")
            .aggregate(AggFunction::Sum, Column::ItemQuantity, "total_sales_count")
            .order_by("total_revenue", SortDirection::Desc)
            .order_by("product_id", SortDirection::Asc)
            .limit(limit as usize)
            .build()?;

        let result = self.run("top_products", &query)?;
        let top_products = result
            .records()
            .map(|row| {
                Ok(TopProduct {
                    product_id: row.int("product_id")?,
                    product_name: row.text_or("product_name", "")?,
                    total_revenue: row.float_or_zero("total_revenue")?,
                    total_sales_count: row.int_or_zero("total_sales_count")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(TopProductsReport {
            window,
            top_products,
        })
    }

    /// Completed sales grouped by channel or store
    pub fn sales_breakdown(
        &self,
        window: TimeWindow,
        dimension: Dimension,
    ) -> Result<SalesBreakdownReport> {
        let family = SalesDimension::try_from(dimension)?;

        let query = QueryBuilder::from(Source::Sales)
            .join(family.join())
            .filter_all(conjoin(Self::completed_in(&window), []))
            .group_by(family.id_column(), "dimension_id")
            .group_by(family.name_column(), "dimension_name")
            .aggregate(AggFunction::Sum, Column::SaleTotalAmount, "total_revenue")
            .aggregate(AggFunction::Count, Column::SaleId, "total_sales_count")
            .aggregate(AggFunction::Avg, Column::SaleTotalAmount, "average_ticket_value")
            .order_by("total_revenue", SortDirection::Desc)
            .order_by("dimension_id", SortDirection::Asc)
            .build()?;

        let result = self.run("sales_breakdown", &query)?;
        let breakdown = result
            .records()
            .map(|row| {
                Ok(SalesBreakdownItem {
                    dimension_id: row.int("dimension_id")?,
                    dimension_name: row.text_or("dimension_name", "")?,
                    total_revenue: row.float_or_zero("total_revenue")?,
                    total_sales_count: row.int_or_zero("total_sales_count")?,
                    average_ticket_value: row.float_or_zero("average_ticket_value")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(SalesBreakdownReport {
            window,
            dimension,
            breakdown,
        })
    }

    /// Delivery time statistics grouped by store, neighborhood or city
    pub fn delivery_performance(
        &self,
        window: TimeWindow,
        dimension: Dimension,
        filters: &FilterSet,
    ) -> Result<DeliveryPerformanceReport> {
        let family = DeliveryDimension::try_from(dimension)?;
        filters.validate_time_only()?;

        let base = Self::completed_in(&window)
            .into_iter()
            .chain([Predicate::NotNull(Column::SaleDeliverySeconds)]);
        let query = QueryBuilder::from(Source::Sales)
            .join(Join::DeliveryAddress)
            .join(Join::StoreOptional)
            .filter_all(conjoin(base, filters.time_predicates()))
            .group_by(family.column(), "dimension_name")
            .aggregate(
                AggFunction::Avg,
                Column::SaleDeliverySeconds,
                "average_delivery_seconds",
            )
            .aggregate(
                AggFunction::PercentileCont(DELIVERY_PERCENTILE),
                Column::SaleDeliverySeconds,
                "p90_delivery_seconds",
            )
            .aggregate(AggFunction::Count, Column::SaleId, "total_deliveries")
            .having_at_least("total_deliveries", MIN_DELIVERIES_PER_GROUP)
            .order_by("average_delivery_seconds", SortDirection::Desc)
            .order_by("dimension_name", SortDirection::Asc)
            .build()?;

        let result = self.run("delivery_performance", &query)?;
        let performance_breakdown = result
            .records()
            .map(|row| {
                Ok(DeliveryPerformanceItem {
                    dimension_name: row.text_or("dimension_name", UNKNOWN_GROUP)?,
                    average_delivery_seconds: row.float_or_zero("average_delivery_seconds")?,
                    p90_delivery_seconds: row.float_or_zero("p90_delivery_seconds")?,
                    total_deliveries: row.int_or_zero("total_deliveries")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(DeliveryPerformanceReport {
            window,
            dimension,
            performance_breakdown,
        })
    }

    /// Daily average ticket, oldest day first
    pub fn ticket_trend(&self, window: TimeWindow) -> Result<TicketTrendReport> {
        let query = QueryBuilder::from(Source::Sales)
            .filter_all(conjoin(Self::completed_in(&window), []))
            .group_by(Column::SaleDate, "date")
            .aggregate(AggFunction::Avg, Column::SaleTotalAmount, "value")
            .order_by("date", SortDirection::Asc)
            .build()?;

        let result = self.run("ticket_trend", &query)?;
        let trend = result
            .records()
            .map(|row| {
                Ok(TimeSeriesPoint {
                    date: row.date("date")?,
                    value: row.float_or_zero("value")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(TicketTrendReport { window, trend })
    }

    /// Line-item revenue per product category
    pub fn ticket_composition(&self, window: TimeWindow) -> Result<TicketCompositionReport> {
        let query = QueryBuilder::from(Source::SaleItems)
            .join(Join::Product)
            .join(Join::Category)
            .filter_all(conjoin(Self::completed_in(&window), []))
            .group_by(Column::CategoryName, "category_name")
            .aggregate(AggFunction::Sum, Column::ItemTotalPrice, "total_revenue")
            .order_by("total_revenue", SortDirection::Desc)
            .order_by("category_name", SortDirection::Asc)
            .build()?;

        let result = self.run("ticket_composition", &query)?;
        let composition = result
            .records()
            .map(|row| {
                Ok(TicketCompositionItem {
                    category_name: row.text_or("category_name", "")?,
                    total_revenue: row.float_or_zero("total_revenue")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(TicketCompositionReport {
            window,
            composition,
        })
    }

    /// Repeat customers whose last completed purchase is at least
    /// `inactive_days` before `today`
    pub fn churn_risk(
        &self,
        min_purchases: u32,
        inactive_days: u32,
        today: NaiveDate,
    ) -> Result<ChurnRiskReport> {
        validate_churn_params(min_purchases, inactive_days)?;
        let cutoff = churn_cutoff(today, inactive_days);

        let query = QueryBuilder::from(Source::Sales)
            .join(Join::Customer)
            .filter(Predicate::StatusEquals(SaleStatus::Completed))
            .group_by(Column::CustomerId, "customer_id")
            .group_by(Column::CustomerName, "customer_name")
            .aggregate(AggFunction::Count, Column::SaleId, "total_purchases")
            .aggregate(AggFunction::Max, Column::SaleDate, "last_purchase_date")
            .having_at_least("total_purchases", i64::from(min_purchases))
            .having_at_most("last_purchase_date", cutoff)
            .order_by("last_purchase_date", SortDirection::Asc)
            .order_by("total_purchases", SortDirection::Desc)
            .order_by("customer_id", SortDirection::Asc)
            .build()?;

        let result = self.run("churn_risk", &query)?;
        let churn_risk_customers = result
            .records()
            .map(|row| {
                Ok(ChurnRiskCustomer {
                    customer_id: row.int("customer_id")?,
                    customer_name: row.text_or("customer_name", "")?,
                    total_purchases: row.int_or_zero("total_purchases")?,
                    last_purchase_date: row.date("last_purchase_date")?,
                })
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(ChurnRiskReport {
            min_purchases,
            inactive_days,
            churn_risk_customers,
        })
    }

    /// All channels and stores, each ordered by name
    pub fn filter_options(&self) -> Result<FilterOptions> {
        let channels = self.lookup(Source::Channels, Column::ChannelId, Column::ChannelName)?;
        let stores = self.lookup(Source::Stores, Column::StoreId, Column::StoreName)?;
        Ok(FilterOptions { channels, stores })
    }

    fn lookup(&self, source: Source, id: Column, name: Column) -> Result<Vec<NamedEntity>> {
        let query = QueryBuilder::from(source)
            .group_by(id, "id")
            .group_by(name, "name")
            .order_by("name", SortDirection::Asc)
            .order_by("id", SortDirection::Asc)
            .build()?;

        self.run("filter_options", &query)?
            .records()
            .map(|row| {
                Ok(NamedEntity {
                    id: row.int("id")?,
                    name: row.text_or("name", "")?,
                })
            })
            .collect()
    }

    /// Liveness of the underlying store
    pub fn ping(&self) -> Result<()> {
        self.executor.ping()
    }
}

impl std::fmt::Debug for AggregateRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AggregateRepository").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::{Dataset, MemoryExecutor};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn repo_over(dataset: Dataset) -> (Arc<MemoryExecutor>, AggregateRepository) {
        let executor = Arc::new(MemoryExecutor::new(dataset));
        let repo = AggregateRepository::new(executor.clone());
        (executor, repo)
    }

    #[test]
    fn test_overview_of_empty_window_is_zero() {
        let (_, repo) = repo_over(Dataset::default());
        let window = TimeWindow::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap();
        let overview = repo.overview(window).unwrap();
        assert_eq!(overview.total_revenue, 0.0);
        assert_eq!(overview.total_sales_count, 0);
        assert_eq!(overview.average_ticket_value, 0.0);
        assert_eq!(overview.window, window);
    }

    #[test]
    fn test_wrong_family_fails_before_execution() {
        let (executor, repo) = repo_over(Dataset::default());
        let window = TimeWindow::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap();

        let err = repo.sales_breakdown(window, Dimension::City).unwrap_err();
        assert!(err.is_validation());
        let err = repo
            .delivery_performance(window, Dimension::Channel, &FilterSet::none())
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(executor.execution_count(), 0);
    }

    #[test]
    fn test_top_limit_bounds() {
        assert!(validate_top_limit(0).is_err());
        assert!(validate_top_limit(1).is_ok());
        assert!(validate_top_limit(100).is_ok());
        assert!(validate_top_limit(101).is_err());
    }

    #[test]
    fn test_churn_cutoff() {
        assert_eq!(churn_cutoff(d(2024, 3, 1), 30), d(2024, 1, 31));
        assert!(validate_churn_params(0, 30).is_err());
        assert!(validate_churn_params(3, 0).is_err());
    }

    #[test]
    fn test_storage_failure_propagates() {
        let (executor, repo) = repo_over(Dataset::default());
        executor.set_offline(true);
        let window = TimeWindow::new(d(2024, 1, 1), d(2024, 1, 31)).unwrap();
        assert!(repo.ticket_trend(window).unwrap_err().is_storage_fault());
    }
}
