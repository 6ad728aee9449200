//! Idempotency middleware
//!
//! Buffers the request body, runs the coordinator pre-check, and either replays
//! the memoized response or runs the handler and records its outcome.
//! Read-only methods pass straight through.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderMap, HeaderName, HeaderValue, Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use tracing::{error, warn};

use super::{header_str, is_read_only};
use crate::gateway::state::AppState;
use crate::gateway::types::{ApiError, CLIENT_ID_HEADER};
use crate::idempotency::{CachedResponse, GuardOutcome, IdempotencyError, RequestScope};

pub const IDEMPOTENCY_KEY_HEADER: &str = "x-idempotency-key";
pub const IDEMPOTENCY_TTL_HEADER: &str = "x-idempotency-ttl";
pub const IDEMPOTENCY_REPLAYED_HEADER: &str = "x-idempotency-replayed";

/// Headers that describe the framing of one specific response
const UNSTORED_HEADERS: [HeaderName; 3] = [
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
    header::CONNECTION,
];

fn stored_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .filter(|(name, _)| !UNSTORED_HEADERS.contains(name))
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect()
}

fn replay_response(cached: CachedResponse) -> Result<Response, ApiError> {
    let status = StatusCode::from_u16(cached.status_code).map_err(|_| {
        IdempotencyError::CorruptRecord(format!("status code {}", cached.status_code))
    })?;
    let body = cached.body()?;

    let mut response = Response::new(Body::from(body));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    for (name, value) in &cached.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => warn!(header = %name, "Skipping unreplayable cached header"),
        }
    }
    headers.insert(IDEMPOTENCY_REPLAYED_HEADER, HeaderValue::from_static("true"));
    Ok(response)
}

pub async fn idempotency_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if is_read_only(request.method()) {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();
    let body: Bytes = axum::body::to_bytes(body, state.max_body_bytes)
        .await
        .map_err(|_| IdempotencyError::PayloadTooLarge)?;

    let coordinator = &state.idempotency;
    let ttl = coordinator.resolve_ttl(header_str(&parts.headers, IDEMPOTENCY_TTL_HEADER))?;
    // A missing client id is rejected by the handler; its key space is the empty one
    let scope = RequestScope {
        client_id: header_str(&parts.headers, CLIENT_ID_HEADER).unwrap_or_default(),
        method: parts.method.as_str(),
        path: parts
            .uri
            .path_and_query()
            .map_or(parts.uri.path(), |pq| pq.as_str()),
    };
    let outcome = coordinator
        .guard_with_ttl(
            &scope,
            header_str(&parts.headers, IDEMPOTENCY_KEY_HEADER),
            &body,
            ttl,
        )
        .await?;

    let ticket = match outcome {
        GuardOutcome::Replay(cached) => return replay_response(cached),
        GuardOutcome::Acquired(ticket) => ticket,
    };

    let response = next.run(Request::from_parts(parts, Body::from(body))).await;
    let (mut parts, body) = response.into_parts();
    let body = match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => bytes,
        Err(e) => {
            coordinator.release(&ticket).await;
            error!(cache_key = %ticket.cache_key, error = %e, "Failed to read handler response");
            return Err(ApiError::internal("failed to read handler response"));
        }
    };

    if let Err(e) = coordinator
        .finalize(
            &ticket,
            parts.status.as_u16(),
            &body,
            stored_headers(&parts.headers),
        )
        .await
    {
        // The lock stays pending until its TTL; the response is already final
        error!(cache_key = %ticket.cache_key, error = %e, "Failed to finalize idempotency record");
    }

    parts.headers.insert(
        IDEMPOTENCY_REPLAYED_HEADER,
        HeaderValue::from_static("false"),
    );
    Ok(Response::from_parts(parts, Body::from(body)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stored_headers_drop_framing() {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(header::CONTENT_LENGTH, HeaderValue::from_static("12"));
        headers.insert("x-request-id", HeaderValue::from_static("r1"));

        let stored = stored_headers(&headers);
        assert!(stored.contains(&("content-type".to_string(), "application/json".to_string())));
        assert!(stored.contains(&("x-request-id".to_string(), "r1".to_string())));
        assert!(!stored.iter().any(|(n, _)| n == "content-length"));
    }

    #[test]
    fn test_replay_restores_status_headers_and_body() {
        let cached = CachedResponse::new(
            201,
            br#"{"code":0}"#,
            vec![("content-type".into(), "application/json".into())],
        );
        let response = replay_response(cached).unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers()["content-type"], "application/json");
        assert_eq!(response.headers()[IDEMPOTENCY_REPLAYED_HEADER], "true");
    }
}
