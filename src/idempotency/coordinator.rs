//! Idempotency Coordinator
//!
//! Deduplicates mutating requests using a client-supplied key plus a content
//! fingerprint. Keys are namespaced per client, and the fingerprint covers
//! method and path as well as the body, so a key never replays a response
//! produced for another client or another resource. Mutual exclusion comes
//! only from the coordination store's create-if-absent; requests for one key
//! may land on different instances.
//!
//! # Flow
//!
//! ```text
//! guard(scope, key, body)
//!   ├─ absent ──────── set_if_not_exists(PENDING) ─┬─ created ─▶ Acquired(ticket)
//!   │                                              └─ lost ────▶ RequestBeingProcessed
//!   ├─ fingerprint ≠ ─▶ InvalidFingerprint
//!   ├─ PENDING ──────▶ RequestBeingProcessed
//!   └─ FINISHED ─────▶ Replay(response)
//!
//! finalize(ticket, status, body, headers)
//!   ├─ 2xx ─▶ set(FINISHED + response, finished TTL)
//!   └─ else ▶ delete (retry with same key is treated as fresh)
//! ```

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::error::IdempotencyError;
use super::fingerprint::{RequestScope, fingerprint};
use super::record::{CachedResponse, IdempotencyRecord, ProcessStatus};
use crate::cache::{CacheStore, KeySpace};
use crate::config::IdempotencyConfig;

/// Proof that this request owns the pending lock for its key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdempotencyTicket {
    pub cache_key: String,
    pub fingerprint: String,
    /// Retention for the finished record
    pub finished_ttl: Duration,
}

/// Result of a successful pre-check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardOutcome {
    /// Fresh pending lock; run the handler, then call `finalize`
    Acquired(IdempotencyTicket),
    /// Original response; the handler must not run again
    Replay(CachedResponse),
}

/// What `finalize` did with the lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FinalizeAction {
    Persisted,
    Released,
}

#[inline]
pub fn is_success_status(status: u16) -> bool {
    (200..300).contains(&status)
}

pub struct IdempotencyCoordinator {
    cache: Arc<dyn CacheStore>,
    keys: KeySpace,
    pending_ttl: Duration,
    finished_ttl: Duration,
    max_key_len: usize,
    max_client_ttl: Duration,
}

impl IdempotencyCoordinator {
    pub fn new(cache: Arc<dyn CacheStore>, keys: KeySpace, config: &IdempotencyConfig) -> Self {
        Self {
            cache,
            keys,
            pending_ttl: Duration::from_secs(config.pending_ttl_secs),
            finished_ttl: Duration::from_secs(config.finished_ttl_secs),
            max_key_len: config.max_key_len,
            max_client_ttl: Duration::from_secs(config.max_client_ttl_secs),
        }
    }

    /// Parse an `X-Idempotency-TTL` override (seconds), clamped to the configured maximum.
    pub fn resolve_ttl(&self, raw: Option<&str>) -> Result<Duration, IdempotencyError> {
        let Some(raw) = raw else {
            return Ok(self.finished_ttl);
        };
        let secs: u64 = raw
            .trim()
            .parse()
            .map_err(|_| IdempotencyError::InvalidTtl(format!("not a number: {}", raw)))?;
        if secs == 0 {
            return Err(IdempotencyError::InvalidTtl("must be positive".to_string()));
        }
        Ok(Duration::from_secs(secs).min(self.max_client_ttl))
    }

    fn validate_key<'a>(&self, key: Option<&'a str>) -> Result<&'a str, IdempotencyError> {
        let key = key
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or(IdempotencyError::MissingKey)?;
        if key.len() > self.max_key_len {
            return Err(IdempotencyError::InvalidKey(format!(
                "longer than {} bytes",
                self.max_key_len
            )));
        }
        if key.chars().any(char::is_control) {
            return Err(IdempotencyError::InvalidKey(
                "contains control characters".to_string(),
            ));
        }
        Ok(key)
    }

    /// Pre-check with the default retention window.
    pub async fn guard(
        &self,
        scope: &RequestScope<'_>,
        key: Option<&str>,
        body: &[u8],
    ) -> Result<GuardOutcome, IdempotencyError> {
        self.guard_with_ttl(scope, key, body, self.finished_ttl).await
    }

    pub async fn guard_with_ttl(
        &self,
        scope: &RequestScope<'_>,
        key: Option<&str>,
        body: &[u8],
        finished_ttl: Duration,
    ) -> Result<GuardOutcome, IdempotencyError> {
        let key = self.validate_key(key)?;
        let fingerprint = fingerprint(scope, body);
        let cache_key = self.keys.idempotency(scope.client_id, key);

        match self.cache.get(&cache_key).await? {
            None => {
                let pending = IdempotencyRecord::pending(fingerprint.clone()).encode()?;
                let created = self
                    .cache
                    .set_if_not_exists(&cache_key, &pending, self.pending_ttl)
                    .await?;
                if !created {
                    debug!(key = %key, "Lost idempotency lock race");
                    return Err(IdempotencyError::RequestBeingProcessed);
                }
                debug!(key = %key, fingerprint = %fingerprint, "Idempotency lock acquired");
                Ok(GuardOutcome::Acquired(IdempotencyTicket {
                    cache_key,
                    fingerprint,
                    finished_ttl,
                }))
            }
            Some(raw) => {
                let record = IdempotencyRecord::decode(&raw).inspect_err(|e| {
                    error!(key = %key, error = %e, "Corrupt idempotency record in cache");
                })?;

                if record.fingerprint != fingerprint {
                    info!(key = %key, "Idempotency key reused with different body");
                    return Err(IdempotencyError::InvalidFingerprint);
                }

                match (record.status, record.response) {
                    (ProcessStatus::Finished, Some(response)) => {
                        debug!(key = %key, status = response.status_code, "Replaying cached response");
                        Ok(GuardOutcome::Replay(response))
                    }
                    _ => {
                        debug!(key = %key, "Request still being processed");
                        Err(IdempotencyError::RequestBeingProcessed)
                    }
                }
            }
        }
    }

    /// Post-check: persist a success, release the lock on anything else.
    pub async fn finalize(
        &self,
        ticket: &IdempotencyTicket,
        status_code: u16,
        body: &[u8],
        headers: Vec<(String, String)>,
    ) -> Result<FinalizeAction, IdempotencyError> {
        if !is_success_status(status_code) {
            self.cache.delete(&ticket.cache_key).await?;
            debug!(
                cache_key = %ticket.cache_key,
                status = status_code,
                "Handler failed, idempotency lock released"
            );
            return Ok(FinalizeAction::Released);
        }

        let record = IdempotencyRecord::finished(
            ticket.fingerprint.clone(),
            CachedResponse::new(status_code, body, headers),
        );
        self.cache
            .set(&ticket.cache_key, &record.encode()?, ticket.finished_ttl)
            .await?;
        debug!(cache_key = %ticket.cache_key, status = status_code, "Idempotency record finished");
        Ok(FinalizeAction::Persisted)
    }

    /// Best-effort lock release when the handler never produced a response.
    pub async fn release(&self, ticket: &IdempotencyTicket) {
        if let Err(e) = self.cache.delete(&ticket.cache_key).await {
            warn!(cache_key = %ticket.cache_key, error = %e, "Failed to release idempotency lock");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::MemoryCache;

    const SCOPE: RequestScope<'static> = RequestScope {
        client_id: "c1",
        method: "POST",
        path: "/v1/transactions",
    };

    fn coordinator() -> (IdempotencyCoordinator, Arc<MemoryCache>) {
        let cache = Arc::new(MemoryCache::new());
        let config = IdempotencyConfig {
            pending_ttl_secs: 30,
            finished_ttl_secs: 600,
            max_key_len: 16,
            max_client_ttl_secs: 3600,
        };
        (
            IdempotencyCoordinator::new(cache.clone(), KeySpace::new("t"), &config),
            cache,
        )
    }

    #[test]
    fn test_success_range() {
        assert!(is_success_status(200));
        assert!(is_success_status(201));
        assert!(is_success_status(299));
        assert!(!is_success_status(199));
        assert!(!is_success_status(300));
        assert!(!is_success_status(503));
    }

    #[tokio::test]
    async fn test_missing_and_blank_key() {
        let (coord, _) = coordinator();
        assert!(matches!(
            coord.guard(&SCOPE, None, b"{}").await,
            Err(IdempotencyError::MissingKey)
        ));
        assert!(matches!(
            coord.guard(&SCOPE, Some("   "), b"{}").await,
            Err(IdempotencyError::MissingKey)
        ));
    }

    #[tokio::test]
    async fn test_overlong_key_rejected() {
        let (coord, _) = coordinator();
        let result = coord.guard(&SCOPE, Some("a-very-long-key-over-16"), b"{}").await;
        assert!(matches!(result, Err(IdempotencyError::InvalidKey(_))));
    }

    #[tokio::test]
    async fn test_first_request_acquires_pending_lock() {
        let (coord, cache) = coordinator();
        let outcome = coord.guard(&SCOPE, Some("k1"), br#"{"amount":100}"#).await.unwrap();

        let GuardOutcome::Acquired(ticket) = outcome else {
            panic!("expected Acquired");
        };
        assert_eq!(ticket.cache_key, "t:idempotency:c1:k1");
        assert_eq!(ticket.finished_ttl, Duration::from_secs(600));

        let stored = cache.get("t:idempotency:c1:k1").await.unwrap().unwrap();
        let record = IdempotencyRecord::decode(&stored).unwrap();
        assert_eq!(record.status, ProcessStatus::Pending);
        assert_eq!(record.fingerprint, ticket.fingerprint);
    }

    #[tokio::test]
    async fn test_duplicate_while_pending() {
        let (coord, _) = coordinator();
        coord.guard(&SCOPE, Some("k1"), br#"{"amount":100}"#).await.unwrap();
        let second = coord.guard(&SCOPE, Some("k1"), br#"{"amount":100}"#).await;
        assert!(matches!(second, Err(IdempotencyError::RequestBeingProcessed)));
    }

    #[tokio::test]
    async fn test_different_body_while_pending_is_invalid_fingerprint() {
        let (coord, _) = coordinator();
        coord.guard(&SCOPE, Some("k1"), br#"{"amount":100}"#).await.unwrap();
        let second = coord.guard(&SCOPE, Some("k1"), br#"{"amount":200}"#).await;
        assert!(matches!(second, Err(IdempotencyError::InvalidFingerprint)));
    }

    #[tokio::test]
    async fn test_finished_request_is_replayed() {
        let (coord, _) = coordinator();
        let body = br#"{"amount":100}"#;
        let GuardOutcome::Acquired(ticket) = coord.guard(&SCOPE, Some("k1"), body).await.unwrap() else {
            panic!("expected Acquired");
        };
        let headers = vec![("content-type".to_string(), "application/json".to_string())];
        let action = coord
            .finalize(&ticket, 201, br#"{"id":"t1"}"#, headers.clone())
            .await
            .unwrap();
        assert_eq!(action, FinalizeAction::Persisted);

        for _ in 0..3 {
            let GuardOutcome::Replay(cached) = coord.guard(&SCOPE, Some("k1"), body).await.unwrap() else {
                panic!("expected Replay");
            };
            assert_eq!(cached.status_code, 201);
            assert_eq!(cached.body().unwrap(), br#"{"id":"t1"}"#);
            assert_eq!(cached.headers, headers);
        }
    }

    #[tokio::test]
    async fn test_failure_releases_lock() {
        let (coord, cache) = coordinator();
        let body = br#"{"amount":100}"#;
        let GuardOutcome::Acquired(ticket) = coord.guard(&SCOPE, Some("k1"), body).await.unwrap() else {
            panic!("expected Acquired");
        };
        let action = coord.finalize(&ticket, 503, b"", vec![]).await.unwrap();
        assert_eq!(action, FinalizeAction::Released);
        assert!(cache.get("t:idempotency:c1:k1").await.unwrap().is_none());

        // Same key, even a different body, is fresh again
        let retry = coord.guard(&SCOPE, Some("k1"), br#"{"amount":200}"#).await.unwrap();
        assert!(matches!(retry, GuardOutcome::Acquired(_)));
    }

    #[tokio::test]
    async fn test_corrupt_record_surfaces() {
        let (coord, cache) = coordinator();
        cache
            .set("t:idempotency:c1:k1", "{broken", Duration::from_secs(60))
            .await
            .unwrap();
        let result = coord.guard(&SCOPE, Some("k1"), b"{}").await;
        assert!(matches!(result, Err(IdempotencyError::CorruptRecord(_))));
    }

    #[tokio::test]
    async fn test_other_client_same_key_is_independent() {
        let (coord, _) = coordinator();
        let body = br#"{"amount":100}"#;
        let GuardOutcome::Acquired(ticket) = coord.guard(&SCOPE, Some("k1"), body).await.unwrap() else {
            panic!("expected Acquired");
        };
        coord.finalize(&ticket, 201, b"{}", vec![]).await.unwrap();

        let other = RequestScope {
            client_id: "c2",
            ..SCOPE
        };
        let outcome = coord.guard(&other, Some("k1"), body).await.unwrap();
        let GuardOutcome::Acquired(other_ticket) = outcome else {
            panic!("expected Acquired for another client");
        };
        assert_eq!(other_ticket.cache_key, "t:idempotency:c2:k1");
    }

    #[tokio::test]
    async fn test_same_key_other_path_is_invalid_fingerprint() {
        let (coord, _) = coordinator();
        let body = br#"{"action":"commit"}"#;
        let first = RequestScope {
            path: "/v1/transactions/T1/status",
            ..SCOPE
        };
        let GuardOutcome::Acquired(ticket) = coord.guard(&first, Some("k1"), body).await.unwrap() else {
            panic!("expected Acquired");
        };
        coord.finalize(&ticket, 200, b"{}", vec![]).await.unwrap();

        let second = RequestScope {
            path: "/v1/transactions/T2/status",
            ..SCOPE
        };
        let result = coord.guard(&second, Some("k1"), body).await;
        assert!(matches!(result, Err(IdempotencyError::InvalidFingerprint)));
    }

    #[test]
    fn test_resolve_ttl() {
        let (coord, _) = coordinator();
        assert_eq!(coord.resolve_ttl(None).unwrap(), Duration::from_secs(600));
        assert_eq!(coord.resolve_ttl(Some("120")).unwrap(), Duration::from_secs(120));
        assert_eq!(
            coord.resolve_ttl(Some("999999")).unwrap(),
            Duration::from_secs(3600)
        );
        assert!(coord.resolve_ttl(Some("0")).is_err());
        assert!(coord.resolve_ttl(Some("soon")).is_err());
    }
}
