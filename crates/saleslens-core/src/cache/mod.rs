//! Report cache
//!
//! A pure key-value capability with per-entry expiration. The cache knows
//! nothing about analytics: reports are handed to it as serialized bytes and
//! come back the same way.
//!
//! ## Contract
//!
//! - `get` returns `Ok(None)` on a miss or on an expired entry. Neither is an
//!   error.
//! - `set` either stores the entry or fails with a backend error that the
//!   caller surfaces.
//! - Every entry lives for [`CACHE_TTL`]. There is no delete or invalidate
//!   operation; a later write to the same key silently supersedes the old
//!   entry.
//!
//! Concurrent writers to the same key are allowed. The last write wins.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use tracing::debug;

use crate::clock::{Clock, SystemClock};
use crate::error::Result;
use crate::storage::expiration::expiry_after;
use crate::storage::Database;

/// Fixed lifetime of every cache entry (15 minutes)
pub const CACHE_TTL: Duration = Duration::from_secs(900);

/// Writes between active sweeps of expired entries
pub const SWEEP_INTERVAL: u64 = 64;

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Pluggable cache backend.
///
/// Implementations must tolerate concurrent `get`/`set` calls from many
/// requests at once.
pub trait CacheBackend: Send + Sync {
    /// Fetch the payload stored under `key`, if it is still live
    fn get(&self, key: &str) -> Result<Option<Bytes>>;

    /// Store `value` under `key` for `ttl`
    fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()>;
}

// ---------------------------------------------------------------------------
// In-memory backend
// ---------------------------------------------------------------------------

/// Process-local cache backed by a DashMap keyspace.
///
/// Expired entries are dropped lazily on read and swept actively every
/// [`SWEEP_INTERVAL`] writes, so keys that are never read again (date-keyed
/// reports from previous days) do not accumulate.
pub struct MemoryCache {
    db: Database,
    clock: Arc<dyn Clock>,
    writes: AtomicU64,
}

impl MemoryCache {
    /// Create an empty cache that expires entries against the system clock
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    /// Create an empty cache that expires entries against `clock`
    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            db: Database::new(),
            clock,
            writes: AtomicU64::new(0),
        }
    }

    /// Drop every expired entry, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        self.db.purge_expired(self.clock.now())
    }

    /// Whole seconds left on `key`; `None` once it is missing or expired
    pub fn ttl(&self, key: &str) -> Option<u64> {
        self.db.ttl(key, self.clock.now())
    }

    /// Number of entries held, including expired ones not yet purged
    pub fn len(&self) -> usize {
        self.db.len()
    }

    /// Check if the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.db.is_empty()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryCache")
            .field("entries", &self.db.len())
            .finish()
    }
}

impl CacheBackend for MemoryCache {
    fn get(&self, key: &str) -> Result<Option<Bytes>> {
        Ok(self.db.get(key, self.clock.now()))
    }

    fn set(&self, key: &str, value: Bytes, ttl: Duration) -> Result<()> {
        let now = self.clock.now();
        self.db
            .set_with_expiry(key.to_string(), value, expiry_after(now, ttl));

        let writes = self.writes.fetch_add(1, Ordering::Relaxed) + 1;
        if writes % SWEEP_INTERVAL == 0 {
            let removed = self.db.purge_expired(now);
            if removed > 0 {
                debug!(removed, remaining = self.db.len(), "swept expired cache entries");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{NaiveDate, TimeDelta};

    fn fixed_cache() -> (Arc<FixedClock>, MemoryCache) {
        let clock = Arc::new(FixedClock::on_date(
            NaiveDate::from_ymd_opt(2024, 5, 10).unwrap(),
        ));
        let cache = MemoryCache::with_clock(clock.clone());
        (clock, cache)
    }

    #[test]
    fn test_miss_is_not_an_error() {
        let (_, cache) = fixed_cache();
        assert_eq!(cache.get("sales_overview:2024-01-01:2024-01-31").unwrap(), None);
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let (clock, cache) = fixed_cache();
        cache.set("k", Bytes::from("v"), CACHE_TTL).unwrap();
        assert_eq!(cache.ttl("k"), Some(900));

        clock.advance(TimeDelta::seconds(899));
        assert_eq!(cache.get("k").unwrap(), Some(Bytes::from("v")));

        clock.advance(TimeDelta::seconds(1));
        assert_eq!(cache.get("k").unwrap(), None);
    }

    #[test]
    fn test_write_supersedes_previous_entry() {
        let (clock, cache) = fixed_cache();
        cache.set("k", Bytes::from("first"), CACHE_TTL).unwrap();
        clock.advance(TimeDelta::seconds(600));
        cache.set("k", Bytes::from("second"), CACHE_TTL).unwrap();

        // The rewrite restarted the lifetime
        clock.advance(TimeDelta::seconds(600));
        assert_eq!(cache.get("k").unwrap(), Some(Bytes::from("second")));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_purge_expired() {
        let (clock, cache) = fixed_cache();
        cache.set("a", Bytes::from("1"), Duration::from_secs(10)).unwrap();
        cache.set("b", Bytes::from("2"), CACHE_TTL).unwrap();

        clock.advance(TimeDelta::seconds(11));
        assert_eq!(cache.purge_expired(), 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_writers_last_write_wins() {
        let (_, cache) = fixed_cache();
        let cache = Arc::new(cache);

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        cache
                            .set("shared", Bytes::from(format!("writer-{i}")), CACHE_TTL)
                            .unwrap();
                        let _ = cache.get("shared").unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let value = cache.get("shared").unwrap().unwrap();
        assert!(String::from_utf8_lossy(&value).starts_with("writer-"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_writes_sweep_entries_never_read_again() {
        let (clock, cache) = fixed_cache();

        // One date-keyed entry per day for a year; none is read back
        for day in 0..365 {
            cache
                .set(&format!("monthly_summary:{day}"), Bytes::from("v"), CACHE_TTL)
                .unwrap();
            clock.advance(TimeDelta::days(1));
        }

        assert!(cache.len() <= SWEEP_INTERVAL as usize);
    }

    #[test]
    fn test_sweep_keeps_live_entries() {
        let (clock, cache) = fixed_cache();
        cache.set("live", Bytes::from("v"), CACHE_TTL).unwrap();
        for i in 0..SWEEP_INTERVAL {
            cache
                .set(&format!("short:{i}"), Bytes::from("v"), Duration::from_secs(1))
                .unwrap();
        }
        clock.advance(TimeDelta::seconds(2));

        for i in 0..SWEEP_INTERVAL {
            cache
                .set(&format!("next:{i}"), Bytes::from("v"), CACHE_TTL)
                .unwrap();
        }

        assert_eq!(cache.get("live").unwrap(), Some(Bytes::from("v")));
        assert_eq!(cache.len(), 1 + SWEEP_INTERVAL as usize);
    }
}
