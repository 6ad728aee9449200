//! Idempotency record stored in the coordination store.

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::error::IdempotencyError;

/// Processing status of an idempotency key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcessStatus {
    /// Lock held, handler still running
    Pending,
    /// Handler completed with a success status; response captured
    Finished,
}

impl ProcessStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcessStatus::Pending => "PENDING",
            ProcessStatus::Finished => "FINISHED",
        }
    }
}

impl fmt::Display for ProcessStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Response captured from a successful handler execution, replayed verbatim
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedResponse {
    pub status_code: u16,
    /// Base64-encoded body bytes
    body: String,
    /// Header name/value pairs in original order
    pub headers: Vec<(String, String)>,
}

impl CachedResponse {
    pub fn new(status_code: u16, body: &[u8], headers: Vec<(String, String)>) -> Self {
        Self {
            status_code,
            body: BASE64.encode(body),
            headers,
        }
    }

    pub fn body(&self) -> Result<Vec<u8>, IdempotencyError> {
        BASE64
            .decode(&self.body)
            .map_err(|e| IdempotencyError::CorruptRecord(format!("response body: {}", e)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdempotencyRecord {
    pub fingerprint: String,
    pub status: ProcessStatus,
    /// Present only when `status == Finished`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<CachedResponse>,
}

impl IdempotencyRecord {
    pub fn pending(fingerprint: impl Into<String>) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            status: ProcessStatus::Pending,
            response: None,
        }
    }

    pub fn finished(fingerprint: impl Into<String>, response: CachedResponse) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            status: ProcessStatus::Finished,
            response: Some(response),
        }
    }

    pub fn encode(&self) -> Result<String, IdempotencyError> {
        serde_json::to_string(self).map_err(|e| IdempotencyError::CorruptRecord(e.to_string()))
    }

    /// Parse a cached payload; a record that does not parse means store corruption.
    pub fn decode(raw: &str) -> Result<Self, IdempotencyError> {
        let record: Self = serde_json::from_str(raw)
            .map_err(|e| IdempotencyError::CorruptRecord(e.to_string()))?;
        if record.status == ProcessStatus::Finished && record.response.is_none() {
            return Err(IdempotencyError::CorruptRecord(
                "finished record without response".to_string(),
            ));
        }
        Ok(record)
    }
}
