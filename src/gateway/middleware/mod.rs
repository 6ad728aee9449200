//! Request-coordination middleware for mutating routes
//!
//! Layer order (outermost first): idempotency, then DLQ tracking. Replays and
//! contention responses therefore never count as DLQ attempts. Read-only
//! methods bypass both.

pub mod dlq;
pub mod idempotency;

pub use dlq::{DLQ_PROCESS_ID_HEADER, dlq_middleware};
pub use idempotency::{
    IDEMPOTENCY_KEY_HEADER, IDEMPOTENCY_REPLAYED_HEADER, IDEMPOTENCY_TTL_HEADER,
    idempotency_middleware,
};

use axum::http::{HeaderMap, Method};

pub(crate) fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Reads are neither deduplicated nor counted as DLQ attempts
pub(crate) fn is_read_only(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_only_methods() {
        assert!(is_read_only(&Method::GET));
        assert!(is_read_only(&Method::HEAD));
        assert!(is_read_only(&Method::OPTIONS));
        assert!(!is_read_only(&Method::POST));
        assert!(!is_read_only(&Method::DELETE));
    }
}
