//! DLQ Retry Tracker
//!
//! Tracks how many times an externally re-delivered request has failed and
//! decides between "retry later" and "escalate to a human".
//!
//! ```text
//! post_check(status, code, body)
//!   ├─ 2xx ───────────────────────────────▶ Completed (no-op)
//!   └─ else: current_retry += 1
//!        ├─ current > max || !retryable ──▶ notify(process_name, msg)  → Escalated
//!        └─ otherwise ────────────────────▶ persist incremented status → Retry
//! ```
//!
//! Side-channel failures (persist, notify) are captured in the report and never
//! propagated: the handler's response is already final.

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use super::error::DlqError;
use super::notify::Notifier;
use super::status::{DlqRetryStatus, RetryDecision};
use crate::cache::{CacheStore, KeySpace};
use crate::config::DlqConfig;
use crate::idempotency::is_success_status;

pub const FALLBACK_ERROR_MESSAGE: &str = "unexpected error while processing request";

/// Outcome of `post_check`. `side_effect` is for observability only.
#[derive(Debug)]
pub struct DlqReport {
    pub decision: RetryDecision,
    pub status: DlqRetryStatus,
    pub side_effect: Result<(), DlqError>,
}

/// Best-effort error message from a handler's JSON body.
pub fn extract_error_message(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|value| {
            ["msg", "message", "error"].iter().find_map(|field| {
                value
                    .get(*field)
                    .and_then(|v| v.as_str())
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
        })
        .unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string())
}

pub struct DlqRetryTracker {
    cache: Arc<dyn CacheStore>,
    notifier: Arc<dyn Notifier>,
    keys: KeySpace,
    record_ttl: Duration,
    retryable: Vec<u16>,
    default_max_retry: u32,
}

impl DlqRetryTracker {
    pub fn new(
        cache: Arc<dyn CacheStore>,
        notifier: Arc<dyn Notifier>,
        keys: KeySpace,
        config: &DlqConfig,
    ) -> Self {
        Self {
            cache,
            notifier,
            keys,
            record_ttl: Duration::from_secs(config.record_ttl_secs),
            retryable: config.retryable_status_codes.clone(),
            default_max_retry: config.default_max_retry,
        }
    }

    pub fn is_retryable(&self, status_code: u16) -> bool {
        self.retryable.contains(&status_code)
    }

    /// Fetch the persisted status. `None` means the request is not DLQ-tracked.
    pub async fn pre_check(&self, process_id: &str) -> Result<Option<DlqRetryStatus>, DlqError> {
        let raw = self.cache.get(&self.keys.dlq(process_id)).await?;
        raw.map(|raw| {
            DlqRetryStatus::decode(&raw).inspect_err(|e| {
                error!(process_id = %process_id, error = %e, "Corrupt DLQ retry status in cache");
            })
        })
        .transpose()
    }

    pub async fn post_check(
        &self,
        mut status: DlqRetryStatus,
        status_code: u16,
        body: &[u8],
    ) -> DlqReport {
        if is_success_status(status_code) {
            debug!(process_id = %status.process_id, "DLQ resubmission succeeded");
            return DlqReport {
                decision: RetryDecision::Completed,
                status,
                side_effect: Ok(()),
            };
        }

        status.increment();
        let max_retry_reached = status.max_retry_reached();
        let retryable = self.is_retryable(status_code);

        if max_retry_reached || !retryable {
            let message = format!(
                "{} (process_id: {})",
                extract_error_message(body),
                status.process_id
            );
            let side_effect = self
                .notifier
                .send(&status.process_name, &message)
                .await
                .map_err(DlqError::from);
            match &side_effect {
                Ok(()) => info!(
                    process_id = %status.process_id,
                    current_retry = status.current_retry,
                    max_retry = status.max_retry,
                    status_code,
                    retryable,
                    "DLQ process escalated"
                ),
                Err(e) => error!(
                    process_id = %status.process_id,
                    notifier = self.notifier.name(),
                    error = %e,
                    "DLQ escalation notification failed"
                ),
            }
            return DlqReport {
                decision: RetryDecision::Escalated,
                status,
                side_effect,
            };
        }

        let side_effect = self.persist(&status).await;
        match &side_effect {
            Ok(()) => debug!(
                process_id = %status.process_id,
                current_retry = status.current_retry,
                "DLQ retry status persisted"
            ),
            Err(e) => warn!(
                process_id = %status.process_id,
                error = %e,
                "Failed to persist DLQ retry status"
            ),
        }
        DlqReport {
            decision: RetryDecision::Retry,
            status,
            side_effect,
        }
    }

    async fn persist(&self, status: &DlqRetryStatus) -> Result<(), DlqError> {
        self.cache
            .set(
                &self.keys.dlq(&status.process_id),
                &status.encode()?,
                self.record_ttl,
            )
            .await?;
        Ok(())
    }

    /// Start tracking a process with `current_retry = 0`.
    pub async fn register(
        &self,
        process_id: &str,
        process_name: &str,
        max_retry: Option<u32>,
    ) -> Result<DlqRetryStatus, DlqError> {
        let process_id = process_id.trim();
        let process_name = process_name.trim();
        if process_id.is_empty() || process_name.is_empty() {
            return Err(DlqError::InvalidParameters(
                "process_id and process_name are required".to_string(),
            ));
        }
        let max_retry = max_retry.unwrap_or(self.default_max_retry);
        if max_retry == 0 {
            return Err(DlqError::InvalidParameters(
                "max_retry must be positive".to_string(),
            ));
        }

        let status = DlqRetryStatus::new(process_id, process_name, max_retry);
        let created = self
            .cache
            .set_if_not_exists(&self.keys.dlq(process_id), &status.encode()?, self.record_ttl)
            .await?;
        if !created {
            return Err(DlqError::AlreadyRegistered(process_id.to_string()));
        }
        info!(process_id = %process_id, max_retry, "DLQ process registered");
        Ok(status)
    }

    pub async fn get(&self, process_id: &str) -> Result<DlqRetryStatus, DlqError> {
        self.pre_check(process_id)
            .await?
            .ok_or_else(|| DlqError::NotFound(process_id.to_string()))
    }

    pub async fn remove(&self, process_id: &str) -> Result<(), DlqError> {
        self.cache.delete(&self.keys.dlq(process_id)).await?;
        Ok(())
    }
}
