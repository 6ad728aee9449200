//! DLQ retry middleware
//!
//! Active only for mutating requests that carry `X-DLQ-Process-Id` for a
//! process with a stored retry status. The handler's response is returned unchanged; the
//! tracker's persistence / notification outcome is logged only.

use axum::{body::Body, extract::State, http::Request, middleware::Next, response::Response};
use std::sync::Arc;
use tracing::{debug, error, info};

use super::{header_str, is_read_only};
use crate::dlq::RetryDecision;
use crate::gateway::state::AppState;
use crate::gateway::types::ApiError;

pub const DLQ_PROCESS_ID_HEADER: &str = "x-dlq-process-id";

pub async fn dlq_middleware(
    State(state): State<Arc<AppState>>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    if is_read_only(request.method()) {
        return Ok(next.run(request).await);
    }

    let Some(process_id) = header_str(request.headers(), DLQ_PROCESS_ID_HEADER)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
    else {
        return Ok(next.run(request).await);
    };

    let Some(status) = state.dlq.pre_check(&process_id).await? else {
        debug!(process_id = %process_id, "No DLQ retry status; passing through");
        return Ok(next.run(request).await);
    };

    let response = next.run(request).await;
    let (parts, body) = response.into_parts();
    let body = axum::body::to_bytes(body, usize::MAX).await.map_err(|e| {
        error!(process_id = %process_id, error = %e, "Failed to read handler response");
        ApiError::internal("failed to read handler response")
    })?;

    let report = state
        .dlq
        .post_check(status, parts.status.as_u16(), &body)
        .await;
    if report.decision == RetryDecision::Escalated {
        info!(
            process_id = %process_id,
            current_retry = report.status.current_retry,
            delivered = report.side_effect.is_ok(),
            "DLQ process will not be retried"
        );
    }

    Ok(Response::from_parts(parts, Body::from(body)))
}
