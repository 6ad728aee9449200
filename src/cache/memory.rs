//! In-process coordination store.
//!
//! Stores entries in a DashMap with a per-entry deadline. Create-if-absent goes
//! through the map's entry API, which holds the shard lock for the whole
//! check-and-insert.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::time::{Duration, Instant};

use super::{CacheError, CacheStore, validate_ttl};

struct CacheEntry {
    value: String,
    expires_at: Instant,
}

impl CacheEntry {
    fn new(value: &str, ttl: Duration) -> Self {
        Self {
            value: value.to_string(),
            expires_at: Instant::now() + ttl,
        }
    }

    #[inline]
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at > now
    }
}

/// Thread-safe TTL cache for tests and single-instance deployments.
pub struct MemoryCache {
    store: DashMap<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self {
            store: DashMap::new(),
        }
    }

    /// Number of stored entries, expired ones included until purged.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }
}

impl Default for MemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheStore for MemoryCache {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let now = Instant::now();
        Ok(self
            .store
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone()))
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        validate_ttl(ttl)?;
        self.store.insert(key.to_string(), CacheEntry::new(value, ttl));
        Ok(())
    }

    async fn set_if_not_exists(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        validate_ttl(ttl)?;
        match self.store.entry(key.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().is_live(Instant::now()) {
                    return Ok(false);
                }
                occupied.insert(CacheEntry::new(value, ttl));
                Ok(true)
            }
            Entry::Vacant(vacant) => {
                vacant.insert(CacheEntry::new(value, ttl));
                Ok(true)
            }
        }
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        self.store.remove(key);
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, CacheError> {
        let now = Instant::now();
        let before = self.store.len();
        self.store.retain(|_, entry| entry.is_live(now));
        Ok(before.saturating_sub(self.store.len()) as u64)
    }
}
