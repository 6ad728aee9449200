//! PostgreSQL-backed coordination store.
//!
//! Shared by every gateway instance pointing at the same database. Create-if-absent
//! is a single `INSERT ... ON CONFLICT DO UPDATE ... WHERE expired` statement, so
//! the row lock taken by PostgreSQL decides the winner.

use async_trait::async_trait;
use sqlx::PgPool;
use std::time::Duration;

use super::{CacheError, CacheStore, validate_ttl};

pub struct PgCache {
    pool: PgPool,
}

impl PgCache {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn ttl_millis(ttl: Duration) -> i64 {
    i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX)
}

#[async_trait]
impl CacheStore for PgCache {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let value = sqlx::query_scalar::<_, String>(
            r#"
            SELECT value FROM cache_entries_tb
            WHERE cache_key = $1 AND expires_at > NOW()
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(value)
    }

    async fn set(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        validate_ttl(ttl)?;
        sqlx::query(
            r#"
            INSERT INTO cache_entries_tb (cache_key, value, expires_at)
            VALUES ($1, $2, NOW() + INTERVAL '1 millisecond' * $3)
            ON CONFLICT (cache_key) DO UPDATE
                SET value = EXCLUDED.value, expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(ttl_millis(ttl))
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn set_if_not_exists(
        &self,
        key: &str,
        value: &str,
        ttl: Duration,
    ) -> Result<bool, CacheError> {
        validate_ttl(ttl)?;
        // An expired row is taken over; a live row leaves rows_affected at 0.
        let result = sqlx::query(
            r#"
            INSERT INTO cache_entries_tb (cache_key, value, expires_at)
            VALUES ($1, $2, NOW() + INTERVAL '1 millisecond' * $3)
            ON CONFLICT (cache_key) DO UPDATE
                SET value = EXCLUDED.value, expires_at = EXCLUDED.expires_at
                WHERE cache_entries_tb.expires_at <= NOW()
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(ttl_millis(ttl))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, key: &str) -> Result<(), CacheError> {
        sqlx::query("DELETE FROM cache_entries_tb WHERE cache_key = $1")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn purge_expired(&self) -> Result<u64, CacheError> {
        let result = sqlx::query("DELETE FROM cache_entries_tb WHERE expires_at <= NOW()")
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_database;

    async fn create_test_cache() -> Option<PgCache> {
        let db = test_database().await?;
        Some(PgCache::new(db.pool().clone()))
    }

    #[test]
    fn test_ttl_millis_saturates() {
        assert_eq!(ttl_millis(Duration::from_secs(2)), 2000);
        assert_eq!(ttl_millis(Duration::MAX), i64::MAX);
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL database"]
    async fn test_pg_set_if_not_exists() {
        let cache = create_test_cache().await.expect("database not available");
        let key = format!("test:{}", ulid::Ulid::new());
        let ttl = Duration::from_secs(30);

        assert!(cache.set_if_not_exists(&key, "a", ttl).await.unwrap());
        assert!(!cache.set_if_not_exists(&key, "b", ttl).await.unwrap());
        assert_eq!(cache.get(&key).await.unwrap().as_deref(), Some("a"));

        cache.delete(&key).await.unwrap();
        assert_eq!(cache.get(&key).await.unwrap(), None);
    }

    #[tokio::test]
    #[ignore = "requires PostgreSQL database"]
    async fn test_pg_expired_row_taken_over() {
        let cache = create_test_cache().await.expect("database not available");
        let key = format!("test:{}", ulid::Ulid::new());

        cache
            .set(&key, "old", Duration::from_millis(10))
            .await
            .unwrap();
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(cache.get(&key).await.unwrap(), None);
        assert!(
            cache
                .set_if_not_exists(&key, "new", Duration::from_secs(30))
                .await
                .unwrap()
        );
    }
}
