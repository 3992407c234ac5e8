//! # SalesLens
//!
//! Operational sales analytics for a restaurant-chain dashboard.
//!
//! This is the top-level crate re-exporting the workspace crates for a
//! unified API. `saleslens-core` can also be used on its own.
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`analytics`] | Report service, repository, cache keys, monthly composer |
//! | [`query`] | Typed aggregate queries and the in-memory reference executor |
//! | [`cache`] | Report cache with per-entry expiry |
//! | [`config`] | TOML configuration |

pub use saleslens_core::analytics;
pub use saleslens_core::cache;
pub use saleslens_core::clock;
pub use saleslens_core::config;
pub use saleslens_core::error;
pub use saleslens_core::metrics;
pub use saleslens_core::query;

pub use saleslens_core::{LensError, Result};
