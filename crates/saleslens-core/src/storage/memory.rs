//! In-memory storage implementation
//!
//! This module implements the keyspace using DashMap for concurrent access.
//! Every operation takes the caller's notion of "now" so that expiry follows
//! the injected clock rather than the process clock.

use std::time::SystemTime;

use bytes::Bytes;
use dashmap::DashMap;

use super::expiration::remaining_secs;

/// A single entry in the keyspace
#[derive(Debug, Clone)]
struct Entry {
    /// The stored payload
    value: Bytes,

    /// Instant from which the entry is no longer served
    expires_at: SystemTime,
}

impl Entry {
    /// Check if the entry has expired at `now`
    #[inline]
    fn is_expired_at(&self, now: SystemTime) -> bool {
        now >= self.expires_at
    }
}

/// A concurrent keyspace of expiring byte payloads
#[derive(Debug, Default)]
pub struct Database {
    /// The underlying concurrent hashmap
    data: DashMap<String, Entry>,
}

impl Database {
    /// Create a new empty database
    pub fn new() -> Self {
        Self {
            data: DashMap::new(),
        }
    }

    /// Get a value by key
    pub fn get(&self, key: &str, now: SystemTime) -> Option<Bytes> {
        let entry = self.data.get(key)?;

        // Lazy expiration check
        if entry.is_expired_at(now) {
            drop(entry);
            self.data.remove_if(key, |_, e| e.is_expired_at(now));
            return None;
        }

        Some(entry.value.clone())
    }

    /// Set a value with expiration. Any previous entry is replaced.
    pub fn set_with_expiry(&self, key: String, value: Bytes, expires_at: SystemTime) {
        self.data.insert(key, Entry { value, expires_at });
    }

    /// Whole seconds left on a live key; `None` if it is missing or expired
    pub fn ttl(&self, key: &str, now: SystemTime) -> Option<u64> {
        let entry = self.data.get(key)?;

        match remaining_secs(entry.expires_at, now) {
            Some(secs) => Some(secs),
            None => {
                drop(entry);
                self.data.remove_if(key, |_, e| e.is_expired_at(now));
                None
            }
        }
    }

    /// Remove every entry that has expired at `now`, returning how many were dropped
    pub fn purge_expired(&self, now: SystemTime) -> usize {
        let before = self.data.len();
        self.data.retain(|_, entry| !entry.is_expired_at(now));
        before.saturating_sub(self.data.len())
    }

    /// Get the number of keys held, including entries not yet purged
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Check if the database is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn in_secs(now: SystemTime, secs: u64) -> SystemTime {
        now + Duration::from_secs(secs)
    }

    #[test]
    fn test_set_get() {
        let db = Database::new();
        let now = SystemTime::now();

        db.set_with_expiry("key".to_string(), Bytes::from("value"), in_secs(now, 60));

        assert_eq!(db.get("key", now), Some(Bytes::from("value")));
        assert_eq!(db.get("missing", now), None);
    }

    #[test]
    fn test_lazy_expiration() {
        let db = Database::new();
        let now = SystemTime::now();
        let expires_at = in_secs(now, 10);

        db.set_with_expiry("key".to_string(), Bytes::from("value"), expires_at);
        assert_eq!(db.ttl("key", now), Some(10));

        // Exactly at the deadline the entry is gone
        assert_eq!(db.get("key", expires_at), None);
        assert!(db.is_empty());
    }

    #[test]
    fn test_overwrite_replaces_expiry() {
        let db = Database::new();
        let now = SystemTime::now();

        db.set_with_expiry("key".to_string(), Bytes::from("old"), in_secs(now, 1));
        db.set_with_expiry("key".to_string(), Bytes::from("new"), in_secs(now, 100));

        let later = in_secs(now, 50);
        assert_eq!(db.get("key", later), Some(Bytes::from("new")));
        assert_eq!(db.len(), 1);
    }

    #[test]
    fn test_ttl_of_expired_and_missing_keys() {
        let db = Database::new();
        let now = SystemTime::now();

        db.set_with_expiry("gone".to_string(), Bytes::from("v"), now);

        assert_eq!(db.ttl("gone", now), None);
        assert_eq!(db.ttl("missing", now), None);
        assert!(db.is_empty());
    }

    #[test]
    fn test_purge_expired() {
        let db = Database::new();
        let now = SystemTime::now();

        for i in 0..5 {
            db.set_with_expiry(format!("short:{i}"), Bytes::from("v"), in_secs(now, 1));
        }
        db.set_with_expiry("long".to_string(), Bytes::from("v"), in_secs(now, 900));

        let later = in_secs(now, 2);
        assert_eq!(db.purge_expired(later), 5);
        assert_eq!(db.len(), 1);
        assert!(db.get("long", later).is_some());
    }
}
