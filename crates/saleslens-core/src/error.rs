//! Error types for SalesLens
//!
//! This module defines the error taxonomy shared by the cache, the query
//! layer and the report services. Uses `thiserror` for ergonomic error
//! definitions.

use std::io;
use thiserror::Error;

/// Main error type for SalesLens operations
#[derive(Error, Debug)]
pub enum LensError {
    /// Caller supplied parameters that can never produce a valid report
    /// (bad dimension, half an hour range, inverted window, ...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// The query executor failed or returned rows the report cannot read
    #[error("Storage error: {0}")]
    Storage(String),

    /// An aggregate query definition is malformed (unknown output column,
    /// join without its prerequisite, ...)
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The cache backend failed to read or write an entry
    #[error("Cache error: {0}")]
    Cache(String),

    /// A report could not be encoded for the cache
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration parsing or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Underlying I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// Result type alias for SalesLens operations
pub type Result<T> = std::result::Result<T, LensError>;

impl LensError {
    /// Shorthand for building a validation error
    pub fn validation(message: impl Into<String>) -> Self {
        LensError::Validation(message.into())
    }

    /// Shorthand for building a storage error
    pub fn storage(message: impl Into<String>) -> Self {
        LensError::Storage(message.into())
    }

    /// Shorthand for building an invalid query error
    pub fn invalid_query(message: impl Into<String>) -> Self {
        LensError::InvalidQuery(message.into())
    }

    /// Returns true if the error was caused by caller input
    #[cold]
    pub fn is_validation(&self) -> bool {
        matches!(self, LensError::Validation(_))
    }

    /// Returns true if the error came from the store or the cache backend.
    /// These are surfaced as-is and never retried.
    #[cold]
    pub fn is_storage_fault(&self) -> bool {
        matches!(self, LensError::Storage(_) | LensError::Cache(_))
    }

    /// Short, stable label used for metrics and log fields
    pub fn kind(&self) -> &'static str {
        match self {
            LensError::Validation(_) => "validation",
            LensError::Storage(_) => "storage",
            LensError::InvalidQuery(_) => "invalid_query",
            LensError::Cache(_) => "cache",
            LensError::Serialization(_) => "serialization",
            LensError::Config(_) => "config",
            LensError::Io(_) => "io",
        }
    }
}
