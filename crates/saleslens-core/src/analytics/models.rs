//! Report result types
//!
//! Every report carries the window (and dimension or parameters) that
//! produced it. Field names are the JSON names the dashboard reads.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::filters::Dimension;
use super::window::TimeWindow;

/// Revenue, count and average ticket over completed sales
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesOverview {
    pub total_revenue: f64,
    pub total_sales_count: i64,
    pub average_ticket_value: f64,
    #[serde(flatten)]
    pub window: TimeWindow,
}

/// One ranked product
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopProduct {
    pub product_id: i64,
    pub product_name: String,
    pub total_revenue: f64,
    /// Units sold (summed line-item quantity)
    pub total_sales_count: i64,
}

/// Best-selling products by line-item revenue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopProductsReport {
    #[serde(flatten)]
    pub window: TimeWindow,
    pub top_products: Vec<TopProduct>,
}

/// One channel or store in a sales breakdown
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesBreakdownItem {
    pub dimension_id: i64,
    pub dimension_name: String,
    pub total_revenue: f64,
    pub total_sales_count: i64,
    pub average_ticket_value: f64,
}

/// Completed sales grouped by channel or store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SalesBreakdownReport {
    #[serde(flatten)]
    pub window: TimeWindow,
    pub dimension: Dimension,
    pub breakdown: Vec<SalesBreakdownItem>,
}

/// Delivery statistics of one group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPerformanceItem {
    pub dimension_name: String,
    pub average_delivery_seconds: f64,
    pub p90_delivery_seconds: f64,
    pub total_deliveries: i64,
}

/// Delivery times grouped by store, neighborhood or city
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeliveryPerformanceReport {
    #[serde(flatten)]
    pub window: TimeWindow,
    pub dimension: Dimension,
    pub performance_breakdown: Vec<DeliveryPerformanceItem>,
}

/// One day of a time series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimeSeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

/// Daily average ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketTrendReport {
    #[serde(flatten)]
    pub window: TimeWindow,
    pub trend: Vec<TimeSeriesPoint>,
}

/// Revenue attributed to one product category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketCompositionItem {
    pub category_name: String,
    pub total_revenue: f64,
}

/// Line-item revenue by category
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TicketCompositionReport {
    #[serde(flatten)]
    pub window: TimeWindow,
    pub composition: Vec<TicketCompositionItem>,
}

/// A repeat customer who stopped buying
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnRiskCustomer {
    pub customer_id: i64,
    pub customer_name: String,
    pub total_purchases: i64,
    pub last_purchase_date: NaiveDate,
}

/// Customers at risk of churning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChurnRiskReport {
    pub min_purchases: u32,
    pub inactive_days: u32,
    pub churn_risk_customers: Vec<ChurnRiskCustomer>,
}

/// Month-over-month revenue KPIs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonthlySummary {
    pub current_month_revenue: f64,
    pub previous_month_revenue_same_day: f64,
    pub last_3_months_avg_revenue: f64,
}

/// Target average ticket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AverageTicketGoal {
    pub goal_value: f64,
}

/// Id and display name of a lookup row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedEntity {
    pub id: i64,
    pub name: String,
}

/// Values the dashboard offers in its filter pickers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    pub channels: Vec<NamedEntity>,
    pub stores: Vec<NamedEntity>,
}

/// Reachability of the sales store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseStatus {
    Connected,
    Disconnected,
}

/// Service health
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthStatus {
    /// Always `"ok"`: the service itself answered
    pub status: String,
    pub database: DatabaseStatus,
}

impl HealthStatus {
    /// Health report for the given store state
    pub fn with_database(database: DatabaseStatus) -> Self {
        Self {
            status: "ok".to_string(),
            database,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_overview_json_shape() {
        let window = TimeWindow::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
        )
        .unwrap();
        let overview = SalesOverview {
            total_revenue: 0.0,
            total_sales_count: 0,
            average_ticket_value: 0.0,
            window,
        };
        let json = serde_json::to_value(&overview).unwrap();
        assert_eq!(json["start_date"], "2024-01-01");
        assert_eq!(json["end_date"], "2024-01-31");
        assert_eq!(json["total_sales_count"], 0);

        let back: SalesOverview = serde_json::from_value(json).unwrap();
        assert_eq!(back, overview);
    }

    #[test]
    fn test_health_json_shape() {
        let json = serde_json::to_string(&HealthStatus::with_database(DatabaseStatus::Disconnected))
            .unwrap();
        assert_eq!(json, r#"{"status":"ok","database":"disconnected"}"#);
    }
}
