//! Idempotency error types

use thiserror::Error;

use crate::cache::CacheError;

#[derive(Error, Debug, Clone)]
pub enum IdempotencyError {
    // === Caller errors ===
    #[error("Missing idempotency key")]
    MissingKey,

    #[error("Invalid idempotency key: {0}")]
    InvalidKey(String),

    #[error("Invalid idempotency TTL: {0}")]
    InvalidTtl(String),

    #[error("Idempotency key reused with a different request body")]
    InvalidFingerprint,

    #[error("Request body too large")]
    PayloadTooLarge,

    // === Contention ===
    #[error("Request with this idempotency key is being processed")]
    RequestBeingProcessed,

    // === Coordination store ===
    #[error("Coordination store error: {0}")]
    Cache(#[from] CacheError),

    #[error("Corrupt idempotency record: {0}")]
    CorruptRecord(String),
}

impl IdempotencyError {
    pub fn code(&self) -> &'static str {
        match self {
            IdempotencyError::MissingKey => "MissingIdempotencyKey",
            IdempotencyError::InvalidKey(_) => "InvalidIdempotencyKey",
            IdempotencyError::InvalidTtl(_) => "InvalidIdempotencyTTL",
            IdempotencyError::InvalidFingerprint => "InvalidFingerprint",
            IdempotencyError::PayloadTooLarge => "PayloadTooLarge",
            IdempotencyError::RequestBeingProcessed => "RequestBeingProcessed",
            IdempotencyError::Cache(_) => "CoordinationStoreError",
            IdempotencyError::CorruptRecord(_) => "CorruptIdempotencyRecord",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            IdempotencyError::MissingKey
            | IdempotencyError::InvalidKey(_)
            | IdempotencyError::InvalidTtl(_) => 400,
            IdempotencyError::PayloadTooLarge => 413,
            IdempotencyError::RequestBeingProcessed => 409,
            IdempotencyError::InvalidFingerprint => 422,
            IdempotencyError::Cache(_) | IdempotencyError::CorruptRecord(_) => 500,
        }
    }

    /// Contention outcomes are expected under concurrency and are not failures.
    pub fn is_contention(&self) -> bool {
        matches!(self, IdempotencyError::RequestBeingProcessed)
    }
}
