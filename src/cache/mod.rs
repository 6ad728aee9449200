//! Key-Value Coordination Store
//!
//! Shared cache used as the substrate for distributed locks (create-if-absent)
//! and memoized responses. Every API instance must see the same backend, so the
//! only in-process implementation ([`MemoryCache`]) is meant for tests and
//! single-instance deployments.
//!
//! # Semantics
//!
//! - Expired entries are invisible to every operation.
//! - `set_if_not_exists` is the only mutual-exclusion primitive: exactly one
//!   concurrent caller observes `true` for an absent (or expired) key.

pub mod janitor;
pub mod memory;
pub mod postgres;

pub use janitor::spawn_janitor;
pub use memory::MemoryCache;
pub use postgres::PgCache;

use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, Clone)]
pub enum CacheError {
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("Invalid TTL: {0:?}")]
    InvalidTtl(Duration),
}

impl From<sqlx::Error> for CacheError {
    fn from(e: sqlx::Error) -> Self {
        CacheError::Unavailable(e.to_string())
    }
}

/// Shared coordination store contract
#[async_trait]
pub trait CacheStore: Send + Sync {
    /// Backend name for logging
    fn name(&self) -> &'static str;

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Unconditional write (overwrites any existing value)
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError>;

    /// Atomic create-if-absent. Returns `true` if this call created the entry.
    async fn set_if_not_exists(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, CacheError>;

    async fn delete(&self, key: &str) -> Result<(), CacheError>;

    /// Drop expired entries, returning how many were removed
    async fn purge_expired(&self) -> Result<u64, CacheError>;
}

/// Builds namespaced cache keys
#[derive(Debug, Clone)]
pub struct KeySpace {
    prefix: String,
}

impl KeySpace {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    /// Idempotency keys are scoped to the calling client
    pub fn idempotency(&self, client_id: &str, client_key: &str) -> String {
        format!("{}:idempotency:{}:{}", self.prefix, client_id, client_key)
    }

    pub fn dlq(&self, process_id: &str) -> String {
        format!("{}:dlq:{}", self.prefix, process_id)
    }
}

pub(crate) fn validate_ttl(ttl: Duration) -> Result<(), CacheError> {
    if ttl.is_zero() {
        return Err(CacheError::InvalidTtl(ttl));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_space_namespacing() {
        let keys = KeySpace::new("lg");
        assert_eq!(keys.idempotency("c1", "k1"), "lg:idempotency:c1:k1");
        assert_eq!(keys.dlq("proc-9"), "lg:dlq:proc-9");
        assert_ne!(keys.idempotency("c1", "x"), keys.dlq("x"));
        assert_ne!(keys.idempotency("c1", "x"), keys.idempotency("c2", "x"));
    }

    #[test]
    fn test_zero_ttl_rejected() {
        assert!(validate_ttl(Duration::ZERO).is_err());
        assert!(validate_ttl(Duration::from_millis(1)).is_ok());
    }
}
