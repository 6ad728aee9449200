//! Persisted retry state of a dead-lettered unit of work.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

use super::error::DlqError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DlqRetryStatus {
    #[schema(example = "proc-01J9Z")]
    pub process_id: String,
    #[schema(example = "settlement-import")]
    pub process_name: String,
    /// Attempts already failed; only ever increases
    pub current_retry: u32,
    pub max_retry: u32,
}

impl DlqRetryStatus {
    pub fn new(process_id: impl Into<String>, process_name: impl Into<String>, max_retry: u32) -> Self {
        Self {
            process_id: process_id.into(),
            process_name: process_name.into(),
            current_retry: 0,
            max_retry,
        }
    }

    /// Record one more failed attempt.
    pub fn increment(&mut self) {
        self.current_retry = self.current_retry.saturating_add(1);
    }

    #[inline]
    pub fn max_retry_reached(&self) -> bool {
        self.current_retry > self.max_retry
    }

    pub fn encode(&self) -> Result<String, DlqError> {
        serde_json::to_string(self).map_err(|e| DlqError::CorruptStatus(e.to_string()))
    }

    pub fn decode(raw: &str) -> Result<Self, DlqError> {
        serde_json::from_str(raw).map_err(|e| DlqError::CorruptStatus(e.to_string()))
    }
}

/// What the tracker decided after a resubmitted request completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Handler succeeded; nothing to persist
    Completed,
    /// Incremented status persisted; the external queue may redeliver
    Retry,
    /// Retries exhausted or failure not retryable; notification sent
    Escalated,
}

impl RetryDecision {
    pub fn as_str(&self) -> &'static str {
        match self {
            RetryDecision::Completed => "COMPLETED",
            RetryDecision::Retry => "RETRY",
            RetryDecision::Escalated => "ESCALATED",
        }
    }
}

impl fmt::Display for RetryDecision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
