//! Storage module for SalesLens
//!
//! In-memory keyspace that backs the report cache. Entries are opaque byte
//! payloads with an expiration instant; expired entries are
//! removed lazily on access and eagerly by [`Database::purge_expired`].

pub(crate) mod expiration;
mod memory;

pub use memory::Database;
