//! DLQ process admin handlers

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};

use super::super::state::AppState;
use super::super::types::{ApiResult, RegisterDlqProcessRequest, created, ok};
use crate::dlq::DlqRetryStatus;

/// Register a dead-lettered process for retry tracking
#[utoipa::path(
    post,
    path = "/v1/dlq/processes",
    request_body = RegisterDlqProcessRequest,
    responses(
        (status = 201, description = "Process registered with current_retry = 0", body = DlqRetryStatus),
        (status = 400, description = "Invalid DLQ action parameters"),
        (status = 409, description = "Process already registered")
    ),
    tag = "DLQ"
)]
pub async fn register_dlq_process(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<RegisterDlqProcessRequest>, JsonRejection>,
) -> ApiResult<DlqRetryStatus> {
    let Json(req) = payload?;
    let status = state
        .dlq
        .register(&req.process_id, &req.process_name, req.max_retry)
        .await?;
    created(status)
}

#[utoipa::path(
    get,
    path = "/v1/dlq/processes/{process_id}",
    params(("process_id" = String, Path, description = "DLQ process id")),
    responses(
        (status = 200, description = "Stored retry status", body = DlqRetryStatus),
        (status = 404, description = "Process not tracked")
    ),
    tag = "DLQ"
)]
pub async fn get_dlq_process(
    State(state): State<Arc<AppState>>,
    Path(process_id): Path<String>,
) -> ApiResult<DlqRetryStatus> {
    ok(state.dlq.get(&process_id).await?)
}

/// Stop tracking a process
#[utoipa::path(
    delete,
    path = "/v1/dlq/processes/{process_id}",
    params(("process_id" = String, Path, description = "DLQ process id")),
    responses((status = 200, description = "Process removed")),
    tag = "DLQ"
)]
pub async fn delete_dlq_process(
    State(state): State<Arc<AppState>>,
    Path(process_id): Path<String>,
) -> ApiResult<String> {
    state.dlq.remove(&process_id).await?;
    ok(process_id)
}
