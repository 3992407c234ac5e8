//! Configuration module for SalesLens
//!
//! This module handles loading and parsing configuration from TOML files,
//! with sensible defaults for all optional values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::analytics::repository::MAX_TOP_LIMIT;
use crate::error::{LensError, Result};

/// Main configuration structure for SalesLens
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Logging configuration
    pub logging: LoggingConfig,

    /// Report parameter defaults
    pub analytics: AnalyticsConfig,

    /// Sales dataset location
    pub dataset: DatasetConfig,
}

impl Config {
    /// Load configuration from a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| {
            LensError::Config(format!("Failed to read config file {:?}: {}", path, e))
        })?;

        Self::parse_str(&contents)
    }

    /// Parse configuration from a TOML string
    pub fn parse_str(contents: &str) -> Result<Self> {
        toml::from_str(contents)
            .map_err(|e| LensError::Config(format!("Failed to parse config: {}", e)))
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        const LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];
        if !LEVELS.contains(&self.logging.level.to_ascii_lowercase().as_str()) {
            return Err(LensError::Config(format!(
                "Unknown log level '{}'",
                self.logging.level
            )));
        }

        let analytics = &self.analytics;
        if analytics.default_top_limit == 0 || analytics.default_top_limit > MAX_TOP_LIMIT {
            return Err(LensError::Config(format!(
                "default_top_limit must be between 1 and {}",
                MAX_TOP_LIMIT
            )));
        }

        if analytics.default_min_purchases == 0 {
            return Err(LensError::Config(
                "default_min_purchases cannot be 0".to_string(),
            ));
        }

        if analytics.default_inactive_days == 0 {
            return Err(LensError::Config(
                "default_inactive_days cannot be 0".to_string(),
            ));
        }

        Ok(())
    }

    /// Write configuration to a TOML file
    ///
    /// Uses atomic write (temp file + rename) to prevent corruption.
    pub fn to_file(&self, path: &Path) -> Result<()> {
        let toml_str = toml::to_string_pretty(self)
            .map_err(|e| LensError::Config(format!("Failed to serialize config: {}", e)))?;

        let temp_path = path.with_extension("toml.tmp");
        std::fs::write(&temp_path, toml_str).map_err(|e| {
            LensError::Config(format!("Failed to write temp config file: {}", e))
        })?;

        std::fs::rename(&temp_path, path).map_err(|e| {
            let _ = std::fs::remove_file(&temp_path);
            LensError::Config(format!("Failed to rename config file: {}", e))
        })?;

        Ok(())
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (pretty, json)
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable format
    #[default]
    Pretty,

    /// JSON format
    Json,
}

/// Defaults applied when a request leaves a parameter out
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyticsConfig {
    /// Length of the default `[today - n, today]` window
    pub default_window_days: u32,

    /// Number of products in a top-products report
    pub default_top_limit: u32,

    /// Minimum completed purchases for churn risk
    pub default_min_purchases: u32,

    /// Days without a purchase before a customer counts as inactive
    pub default_inactive_days: u32,
}

impl Default for AnalyticsConfig {
    fn default() -> Self {
        Self {
            default_window_days: 30,
            default_top_limit: 10,
            default_min_purchases: 3,
            default_inactive_days: 30,
        }
    }
}

/// Dataset configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// JSON file loaded by the in-memory executor
    pub path: PathBuf,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./data/sales.json"),
        }
    }
}
