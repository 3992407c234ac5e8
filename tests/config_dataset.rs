//! Configuration and dataset loading from disk
#![allow(clippy::unwrap_used)]

mod common;

use std::sync::Arc;

use common::*;
use saleslens::analytics::ReportService;
use saleslens::cache::MemoryCache;
use saleslens::clock::FixedClock;
use saleslens::config::{Config, LogFormat};
use saleslens::query::{Dataset, MemoryExecutor};

#[test]
fn test_service_from_config_files() {
    let dir = tempfile::tempdir().unwrap();
    let dataset_path = dir.path().join("sales.json");
    DatasetBuilder::with_catalog()
        .sale(at(date(2024, 3, 20), 12), 42.0, IFOOD, CENTRO)
        .build()
        .to_file(&dataset_path)
        .unwrap();

    let config_path = dir.path().join("saleslens.toml");
    let mut config = Config::default();
    config.dataset.path = dataset_path.clone();
    config.analytics.default_window_days = 7;
    config.logging.format = LogFormat::Json;
    config.to_file(&config_path).unwrap();

    let loaded = Config::from_file(&config_path).unwrap();
    loaded.validate().unwrap();
    assert_eq!(loaded, config);

    let clock = Arc::new(FixedClock::on_date(date(2024, 3, 25)));
    let executor = Arc::new(MemoryExecutor::from_file(&loaded.dataset.path).unwrap());
    let service = ReportService::new(
        executor.clone(),
        executor,
        Arc::new(MemoryCache::with_clock(clock.clone())),
        clock,
    )
    .with_defaults(loaded.analytics.clone());

    let window = service.default_window();
    assert_eq!(window.start(), date(2024, 3, 18));
    assert_eq!(window.end(), date(2024, 3, 25));
    assert_eq!(service.overview(window).unwrap().total_revenue, 42.0);
}

#[test]
fn test_dataset_json_uses_table_names() {
    let json = r#"{
        "channels": [{"id": 1, "name": "iFood"}],
        "stores": [{"id": 10, "name": "Centro"}],
        "sales": [{
            "id": 1,
            "channel_id": 1,
            "store_id": 10,
            "created_at": "2024-03-20T12:30:00",
            "total_amount": 58.9,
            "sale_status_desc": "COMPLETED"
        }],
        "goals": [{"goal_name": "average_ticket_goal", "goal_value": 70.0}]
    }"#;

    let dataset = Dataset::from_json(json).unwrap();
    assert_eq!(dataset.sales.len(), 1);
    assert_eq!(dataset.sales[0].customer_id, None);
    assert!(dataset.products.is_empty());

    let h = harness(dataset, date(2024, 3, 31));
    assert_eq!(h.service.average_ticket_goal().unwrap().goal_value, 70.0);
}

#[test]
fn test_missing_dataset_file_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    assert!(MemoryExecutor::from_file(&dir.path().join("absent.json")).is_err());
}

#[test]
fn test_malformed_dataset_is_storage_error() {
    let err = Dataset::from_json("{\"sales\": 3}").unwrap_err();
    assert!(err.is_storage_fault());
}
