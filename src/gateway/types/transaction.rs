//! Transaction and DLQ request / response DTOs

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::response::ApiError;
use crate::transaction::{NewTransaction, ReservedTransaction, TransactionId, TransitionAction};

pub const CLIENT_ID_HEADER: &str = "x-client-id";

/// Calling client, from the `X-Client-Id` header
#[derive(Debug, Clone)]
pub struct ClientId(pub String);

impl<S: Send + Sync> FromRequestParts<S> for ClientId {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(CLIENT_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| ClientId(s.to_string()))
            .ok_or_else(ApiError::missing_client_id)
    }
}

/// Parse a transaction id path segment
pub fn parse_transaction_id(raw: &str) -> Result<TransactionId, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request(format!("invalid transaction id: {}", raw)))
}

/// Create transaction request
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateTransactionRequest {
    /// Amount as a decimal string
    #[schema(value_type = String, example = "100.50")]
    pub amount: Decimal,
    #[schema(example = "USD")]
    pub currency: String,
    #[schema(example = "acc-1001")]
    pub source_account: String,
    #[schema(example = "acc-2002")]
    pub destination_account: String,
    /// Hold funds and wait for commit/cancel instead of settling immediately
    #[serde(default)]
    pub reserve: bool,
}

impl CreateTransactionRequest {
    pub fn into_new_transaction(self, client_id: String) -> NewTransaction {
        NewTransaction {
            client_id,
            amount: self.amount,
            currency: self.currency,
            source_account: self.source_account,
            destination_account: self.destination_account,
        }
    }
}

/// Second-phase action on a reserved transaction
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateTransactionStatusRequest {
    pub action: TransitionAction,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TransactionResponse {
    #[schema(value_type = String, example = "01JA8Z6Q7V3Y5K2M4N6P8R0T2W")]
    pub transaction_id: TransactionId,
    /// PENDING | SUCCESS | CANCELED
    #[schema(example = "PENDING")]
    pub status: String,
    #[schema(value_type = String, example = "100.50")]
    pub amount: Decimal,
    pub currency: String,
    pub source_account: String,
    pub destination_account: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ReservedTransaction> for TransactionResponse {
    fn from(tx: ReservedTransaction) -> Self {
        Self {
            transaction_id: tx.transaction_id,
            status: tx.status.api_status().to_string(),
            amount: tx.amount,
            currency: tx.currency,
            source_account: tx.source_account,
            destination_account: tx.destination_account,
            created_at: tx.created_at,
            updated_at: tx.updated_at,
        }
    }
}

/// Register a DLQ-tracked process
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterDlqProcessRequest {
    #[schema(example = "proc-01J9Z")]
    pub process_id: String,
    #[schema(example = "settlement-import")]
    pub process_name: String,
    /// Defaults to the configured `default_max_retry`
    pub max_retry: Option<u32>,
}
