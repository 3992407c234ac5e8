//! Metrics for SalesLens
//!
//! Report services emit counters and histograms through the `metrics`
//! facade. Nothing is exported unless the embedding process installs a
//! recorder.

mod recorder;

pub use recorder::*;
