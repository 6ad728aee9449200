//! Transaction handlers
//!
//! Mutating routes sit behind the idempotency and DLQ middleware; the handlers
//! themselves only translate between HTTP and the lifecycle manager.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
};

use super::super::state::AppState;
use super::super::types::{
    ApiResult, ClientId, CreateTransactionRequest, TransactionResponse,
    UpdateTransactionStatusRequest, created, ok, parse_transaction_id,
};

/// Create a transaction
///
/// `reserve = true` holds funds and returns `PENDING`; otherwise the transfer
/// settles immediately and returns `SUCCESS`.
#[utoipa::path(
    post,
    path = "/v1/transactions",
    request_body = CreateTransactionRequest,
    params(
        ("X-Client-Id" = String, Header, description = "Calling client"),
        ("X-Idempotency-Key" = String, Header, description = "Client-chosen deduplication key"),
        ("X-Idempotency-TTL" = Option<u64>, Header, description = "Replay retention override (seconds)"),
        ("X-DLQ-Process-Id" = Option<String>, Header, description = "Dead-lettered process being resubmitted")
    ),
    responses(
        (status = 201, description = "Transaction created", body = TransactionResponse),
        (status = 400, description = "Missing idempotency key, client id, or invalid fields"),
        (status = 409, description = "Request with this key is being processed"),
        (status = 422, description = "Key reused with a different body, or insufficient balance"),
        (status = 500, description = "Coordination store or ledger failure")
    ),
    tag = "Transactions"
)]
pub async fn create_transaction(
    State(state): State<Arc<AppState>>,
    ClientId(client_id): ClientId,
    payload: Result<Json<CreateTransactionRequest>, JsonRejection>,
) -> ApiResult<TransactionResponse> {
    let Json(req) = payload?;
    let reserve = req.reserve;
    let tx = state
        .lifecycle
        .create(req.into_new_transaction(client_id), reserve)
        .await?;
    created(tx.into())
}

/// Get a transaction owned by the caller
#[utoipa::path(
    get,
    path = "/v1/transactions/{transaction_id}",
    params(
        ("transaction_id" = String, Path, description = "Transaction ULID"),
        ("X-Client-Id" = String, Header, description = "Calling client")
    ),
    responses(
        (status = 200, description = "Transaction", body = TransactionResponse),
        (status = 400, description = "Invalid transaction id or missing client id"),
        (status = 404, description = "Transaction not found")
    ),
    tag = "Transactions"
)]
pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    ClientId(client_id): ClientId,
    Path(transaction_id): Path<String>,
) -> ApiResult<TransactionResponse> {
    let id = parse_transaction_id(&transaction_id)?;
    let tx = state.lifecycle.get(id, &client_id).await?;
    ok(tx.into())
}

/// Commit or cancel a reserved transaction
#[utoipa::path(
    post,
    path = "/v1/transactions/{transaction_id}/status",
    request_body = UpdateTransactionStatusRequest,
    params(
        ("transaction_id" = String, Path, description = "Transaction ULID"),
        ("X-Client-Id" = String, Header, description = "Calling client"),
        ("X-Idempotency-Key" = String, Header, description = "Client-chosen deduplication key")
    ),
    responses(
        (status = 200, description = "Transaction moved to SUCCESS or CANCELED", body = TransactionResponse),
        (status = 400, description = "Invalid id or action"),
        (status = 404, description = "Transaction not found"),
        (status = 409, description = "transaction status not reserved"),
        (status = 500, description = "Ledger failure; transaction stays reserved")
    ),
    tag = "Transactions"
)]
pub async fn update_transaction_status(
    State(state): State<Arc<AppState>>,
    ClientId(client_id): ClientId,
    Path(transaction_id): Path<String>,
    payload: Result<Json<UpdateTransactionStatusRequest>, JsonRejection>,
) -> ApiResult<TransactionResponse> {
    let id = parse_transaction_id(&transaction_id)?;
    let Json(req) = payload?;
    let tx = state
        .lifecycle
        .transition(id, req.action, &client_id)
        .await?;
    ok(tx.into())
}
