//! Property-based tests for report keys and report invariants
//!
//! Uses proptest to verify invariants across randomly generated parameters
//! and datasets.
#![allow(clippy::unwrap_used)]

mod common;

use proptest::prelude::*;

use chrono::{NaiveDate, TimeDelta};

use common::*;
use saleslens::analytics::{keys, Dimension, FilterSet, HourRange, TimeWindow};

// ============================================================================
// Test Strategies
// ============================================================================

fn date_strategy() -> impl Strategy<Value = NaiveDate> {
    (0i64..1500).prop_map(|offset| date(2022, 1, 1) + TimeDelta::days(offset))
}

fn window_strategy() -> impl Strategy<Value = TimeWindow> {
    (date_strategy(), 0i64..120)
        .prop_map(|(start, span)| window(start, start + TimeDelta::days(span)))
}

fn hours_strategy() -> impl Strategy<Value = Option<HourRange>> {
    prop::option::of((0u8..24, 0u8..24).prop_map(|(a, b)| {
        HourRange::new(a.min(b), a.max(b)).unwrap()
    }))
}

fn filters_strategy() -> impl Strategy<Value = FilterSet> {
    (
        prop::option::of(0i64..5),
        prop::option::of(0i64..5),
        prop::option::of(1u8..=7),
        hours_strategy(),
    )
        .prop_map(|(channel_id, store_id, day_of_week, hour_range)| FilterSet {
            channel_id,
            store_id,
            day_of_week,
            hour_range,
        })
}

fn delivery_dimension_strategy() -> impl Strategy<Value = Dimension> {
    prop_oneof![
        Just(Dimension::Store),
        Just(Dimension::Neighborhood),
        Just(Dimension::City),
    ]
}

/// (day of January, hour, product, quantity, price, channel, store)
type SaleParams = (u32, u32, i64, i64, u32, i64, i64);

fn sale_strategy() -> impl Strategy<Value = SaleParams> {
    (
        1u32..=31,
        0u32..24,
        prop_oneof![Just(BACON), Just(SALADA), Just(SODA)],
        1i64..5,
        1u32..500,
        prop_oneof![Just(IFOOD), Just(COUNTER)],
        prop_oneof![Just(CENTRO), Just(NORTE)],
    )
}

fn dataset_from(sales: &[SaleParams]) -> saleslens::query::Dataset {
    let mut builder = DatasetBuilder::with_catalog();
    for &(day, hour, product, quantity, price, channel, store) in sales {
        let price = f64::from(price);
        builder = builder
            .sale(at(date(2024, 1, day), hour), price, channel, store)
            .item(product, quantity, price);
    }
    builder.build()
}

// ============================================================================
// Cache Key Properties
// ============================================================================

proptest! {
    /// Equal parameters always render the same key
    #[test]
    fn prop_keys_are_deterministic(
        window in window_strategy(),
        limit in 1u32..=100,
        filters in filters_strategy(),
        dimension in delivery_dimension_strategy(),
    ) {
        prop_assert_eq!(
            keys::top_products(&window, limit, &filters).to_string(),
            keys::top_products(&window, limit, &filters).to_string()
        );
        prop_assert_eq!(
            keys::delivery_performance(&window, dimension, &filters).to_string(),
            keys::delivery_performance(&window, dimension, &filters).to_string()
        );
    }

    /// Delivery keys carry the time-of-sale filters and nothing else
    #[test]
    fn prop_delivery_key_tracks_time_filters(
        window in window_strategy(),
        filters in filters_strategy(),
        dimension in delivery_dimension_strategy(),
    ) {
        let key = keys::delivery_performance(&window, dimension, &filters);
        let time_only = FilterSet {
            channel_id: None,
            store_id: None,
            ..filters
        };
        let time_only_key = keys::delivery_performance(&window, dimension, &time_only);
        prop_assert_eq!(
            key.as_str(),
            time_only_key.as_str()
        );

        let mut other = filters;
        other.day_of_week = match filters.day_of_week {
            Some(7) => None,
            Some(d) => Some(d + 1),
            None => Some(1),
        };
        let other_key = keys::delivery_performance(&window, dimension, &other);
        prop_assert_ne!(
            key.as_str(),
            other_key.as_str()
        );
    }

    /// Changing any single parameter changes the key
    #[test]
    fn prop_single_parameter_changes_key(
        span in window_strategy(),
        limit in 1u32..100,
        filters in filters_strategy(),
        shift in 1i64..30,
    ) {
        let base = keys::top_products(&span, limit, &filters);

        let moved = window(span.start(), span.end() + TimeDelta::days(shift));
        let changed = keys::top_products(&moved, limit, &filters);
        prop_assert_ne!(base.as_str(), changed.as_str());
        let changed = keys::top_products(&span, limit + 1, &filters);
        prop_assert_ne!(base.as_str(), changed.as_str());

        let mut other = filters;
        other.channel_id = match filters.channel_id {
            Some(id) => Some(id + 10),
            None => Some(0),
        };
        let changed = keys::top_products(&span, limit, &other);
        prop_assert_ne!(base.as_str(), changed.as_str());

        let mut other = filters;
        other.store_id = match filters.store_id {
            Some(_) => None,
            None => Some(0),
        };
        let changed = keys::top_products(&span, limit, &other);
        prop_assert_ne!(base.as_str(), changed.as_str());

        let mut other = filters;
        other.day_of_week = match filters.day_of_week {
            Some(7) => Some(1),
            Some(d) => Some(d + 1),
            None => Some(1),
        };
        let changed = keys::top_products(&span, limit, &other);
        prop_assert_ne!(base.as_str(), changed.as_str());

        let mut other = filters;
        other.hour_range = match filters.hour_range {
            Some(_) => None,
            None => Some(HourRange::new(0, 23).unwrap()),
        };
        let changed = keys::top_products(&span, limit, &other);
        prop_assert_ne!(base.as_str(), changed.as_str());
    }

    /// Keys from different report families never collide
    #[test]
    fn prop_report_families_do_not_collide(window in window_strategy()) {
        let overview = keys::overview(&window);
        let trend = keys::ticket_trend(&window);
        let composition = keys::ticket_composition(&window);
        prop_assert_ne!(overview.as_str(), trend.as_str());
        prop_assert_ne!(trend.as_str(), composition.as_str());
        prop_assert_ne!(overview.as_str(), composition.as_str());
    }
}

// ============================================================================
// Report Properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Top products never exceed the limit and are sorted by revenue
    #[test]
    fn prop_top_products_bounded_and_sorted(
        sales in prop::collection::vec(sale_strategy(), 0..40),
        limit in 1u32..=4,
        filters in filters_strategy(),
    ) {
        let h = harness(dataset_from(&sales), date(2024, 3, 31));
        let report = h
            .service
            .top_products(window(date(2024, 1, 1), date(2024, 1, 31)), limit, filters)
            .unwrap();

        prop_assert!(report.top_products.len() <= limit as usize);
        for pair in report.top_products.windows(2) {
            prop_assert!(pair[0].total_revenue >= pair[1].total_revenue);
        }
    }

    /// Overview revenue equals the sum of completed sales inside the window
    #[test]
    fn prop_overview_matches_window_sum(
        sales in prop::collection::vec(sale_strategy(), 0..40),
        first in 1u32..=31,
        span in 0u32..31,
    ) {
        let last = (first + span).min(31);
        let h = harness(dataset_from(&sales), date(2024, 3, 31));
        let overview = h
            .service
            .overview(window(date(2024, 1, first), date(2024, 1, last)))
            .unwrap();

        let expected: Vec<u32> = sales
            .iter()
            .filter(|s| s.0 >= first && s.0 <= last)
            .map(|s| s.4)
            .collect();
        let total: u32 = expected.iter().sum();
        prop_assert_eq!(overview.total_sales_count, expected.len() as i64);
        prop_assert!((overview.total_revenue - f64::from(total)).abs() < 1e-6);
    }

    /// No delivery group is reported with fewer than ten deliveries
    #[test]
    fn prop_delivery_groups_meet_minimum(
        deliveries in prop::collection::vec((0usize..3, 60i64..4000), 0..60),
        dimension in delivery_dimension_strategy(),
    ) {
        const PLACES: [(&str, &str, i64); 3] = [
            ("Savassi", "Belo Horizonte", CENTRO),
            ("Pampulha", "Belo Horizonte", NORTE),
            ("Centro", "Contagem", NORTE),
        ];
        let mut builder = DatasetBuilder::with_catalog();
        for &(place, seconds) in &deliveries {
            let (neighborhood, city, store) = PLACES[place];
            builder = builder
                .sale(at(date(2024, 1, 15), 19), 40.0, IFOOD, store)
                .delivered(seconds, neighborhood, city);
        }
        let h = harness(builder.build(), date(2024, 3, 31));

        let report = h
            .service
            .delivery_performance(
                window(date(2024, 1, 1), date(2024, 1, 31)),
                dimension,
                FilterSet::none(),
            )
            .unwrap();
        for item in &report.performance_breakdown {
            prop_assert!(item.total_deliveries >= 10);
            prop_assert!(item.p90_delivery_seconds >= 60.0);
            prop_assert!(item.p90_delivery_seconds <= 4000.0);
        }
    }
}
