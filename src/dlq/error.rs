use thiserror::Error;

use crate::cache::CacheError;

#[derive(Error, Debug, Clone)]
pub enum DlqError {
    #[error("Invalid DLQ parameters: {0}")]
    InvalidParameters(String),

    #[error("DLQ process already registered: {0}")]
    AlreadyRegistered(String),

    #[error("DLQ process not found: {0}")]
    NotFound(String),

    #[error("Coordination store error: {0}")]
    Cache(#[from] CacheError),

    #[error("Corrupt DLQ retry status: {0}")]
    CorruptStatus(String),

    #[error("Notification failed: {0}")]
    Notify(#[from] NotifyError),
}

impl DlqError {
    pub fn code(&self) -> &'static str {
        match self {
            DlqError::InvalidParameters(_) => "INVALID_DLQ_PARAMETERS",
            DlqError::AlreadyRegistered(_) => "DLQ_PROCESS_EXISTS",
            DlqError::NotFound(_) => "DLQ_PROCESS_NOT_FOUND",
            DlqError::Cache(_) => "COORDINATION_STORE_ERROR",
            DlqError::CorruptStatus(_) => "CORRUPT_DLQ_STATUS",
            DlqError::Notify(_) => "NOTIFICATION_FAILED",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            DlqError::InvalidParameters(_) => 400,
            DlqError::NotFound(_) => 404,
            DlqError::AlreadyRegistered(_) => 409,
            DlqError::Cache(_) | DlqError::CorruptStatus(_) | DlqError::Notify(_) => 500,
        }
    }
}

#[derive(Error, Debug, Clone)]
pub enum NotifyError {
    #[error("Notification transport error: {0}")]
    Transport(String),

    #[error("Notification rejected with status {0}")]
    Rejected(u16),
}

impl From<reqwest::Error> for NotifyError {
    fn from(e: reqwest::Error) -> Self {
        NotifyError::Transport(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status() {
        assert_eq!(DlqError::InvalidParameters("x".into()).http_status(), 400);
        assert_eq!(DlqError::NotFound("p".into()).http_status(), 404);
        assert_eq!(DlqError::AlreadyRegistered("p".into()).http_status(), 409);
        assert_eq!(
            DlqError::Cache(CacheError::Unavailable("down".into())).http_status(),
            500
        );
    }

    #[test]
    fn test_display() {
        let err = DlqError::Notify(NotifyError::Rejected(502));
        assert_eq!(
            err.to_string(),
            "Notification failed: Notification rejected with status 502"
        );
    }
}
