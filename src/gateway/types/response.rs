//! API Response types and error codes
//!
//! - `ApiResponse<T>`: Unified response wrapper
//! - `ApiError`: Domain errors mapped onto HTTP status + envelope
//! - `error_codes`: Standard error code constants

use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::dlq::DlqError;
use crate::idempotency::IdempotencyError;
use crate::transaction::LifecycleError;

// ============================================================================
// Unified API Response Format
// ============================================================================

/// Unified API response wrapper
///
/// All API responses follow this structure:
/// - code: 0 = success, non-zero = error code
/// - msg: short message description
/// - error: stable error name (errors only)
/// - data: actual data (success) or absent (error)
#[derive(Debug, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Response code: 0 for success, non-zero for errors
    #[schema(example = 0)]
    pub code: i32,
    /// Response message
    #[schema(example = "ok")]
    pub msg: String,
    /// Error name, e.g. `MissingIdempotencyKey`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Response data (only present when code == 0)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    /// Create success response
    pub fn success(data: T) -> Self {
        Self {
            code: error_codes::SUCCESS,
            msg: "ok".to_string(),
            error: None,
            data: Some(data),
        }
    }

    /// Create error response
    pub fn error(code: i32, error: &str, msg: impl Into<String>) -> ApiResponse<()> {
        ApiResponse {
            code,
            msg: msg.into(),
            error: Some(error.to_string()),
            data: None,
        }
    }
}

pub type ApiResult<T> = Result<(StatusCode, Json<ApiResponse<T>>), ApiError>;

/// 200 OK with data
pub fn ok<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::OK, Json(ApiResponse::success(data))))
}

/// 201 Created with data
pub fn created<T>(data: T) -> ApiResult<T> {
    Ok((StatusCode::CREATED, Json(ApiResponse::success(data))))
}

// ============================================================================
// ApiError
// ============================================================================

/// Error rendered as `(status, {code, msg, error})`
#[derive(Debug, Clone)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: i32,
    pub error: &'static str,
    pub msg: String,
}

impl ApiError {
    pub fn new(status: StatusCode, code: i32, error: &'static str, msg: impl Into<String>) -> Self {
        Self {
            status,
            code,
            error,
            msg: msg.into(),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            error_codes::INVALID_PARAMETER,
            "INVALID_PARAMETER",
            msg,
        )
    }

    pub fn missing_client_id() -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            error_codes::MISSING_CLIENT_ID,
            "MISSING_CLIENT_ID",
            "missing X-Client-Id header",
        )
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            error_codes::INTERNAL_ERROR,
            "INTERNAL_ERROR",
            msg,
        )
    }
}

fn status_from(code: u16) -> StatusCode {
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

impl From<IdempotencyError> for ApiError {
    fn from(e: IdempotencyError) -> Self {
        let code = match &e {
            IdempotencyError::MissingKey => error_codes::MISSING_IDEMPOTENCY_KEY,
            IdempotencyError::InvalidKey(_) | IdempotencyError::InvalidTtl(_) => {
                error_codes::INVALID_IDEMPOTENCY_KEY
            }
            IdempotencyError::InvalidFingerprint => error_codes::INVALID_FINGERPRINT,
            IdempotencyError::PayloadTooLarge => error_codes::PAYLOAD_TOO_LARGE,
            IdempotencyError::RequestBeingProcessed => error_codes::REQUEST_BEING_PROCESSED,
            IdempotencyError::Cache(_) | IdempotencyError::CorruptRecord(_) => {
                error_codes::COORDINATION_STORE_ERROR
            }
        };
        Self::new(status_from(e.http_status()), code, e.code(), e.to_string())
    }
}

impl From<DlqError> for ApiError {
    fn from(e: DlqError) -> Self {
        let code = match &e {
            DlqError::InvalidParameters(_) => error_codes::INVALID_PARAMETER,
            DlqError::AlreadyRegistered(_) => error_codes::DLQ_PROCESS_EXISTS,
            DlqError::NotFound(_) => error_codes::DLQ_PROCESS_NOT_FOUND,
            DlqError::Cache(_) | DlqError::CorruptStatus(_) => {
                error_codes::COORDINATION_STORE_ERROR
            }
            DlqError::Notify(_) => error_codes::INTERNAL_ERROR,
        };
        Self::new(status_from(e.http_status()), code, e.code(), e.to_string())
    }
}

impl From<LifecycleError> for ApiError {
    fn from(e: LifecycleError) -> Self {
        let code = match &e {
            LifecycleError::InvalidAmount
            | LifecycleError::MissingField(_)
            | LifecycleError::SameAccount => error_codes::INVALID_PARAMETER,
            LifecycleError::InsufficientFunds => error_codes::INSUFFICIENT_BALANCE,
            LifecycleError::NotFound(_) => error_codes::TRANSACTION_NOT_FOUND,
            LifecycleError::NotReserved => error_codes::TRANSACTION_NOT_RESERVED,
            LifecycleError::Ledger(_) => error_codes::INTERNAL_ERROR,
        };
        Self::new(status_from(e.http_status()), code, e.code(), e.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        Self::bad_request(format!("Invalid JSON: {}", e.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ApiResponse::<()>::error(self.code, self.error, self.msg));
        (self.status, body).into_response()
    }
}

// ============================================================================
// Error Codes
// ============================================================================

/// Standard API error codes
pub mod error_codes {
    // Success
    pub const SUCCESS: i32 = 0;

    // Client errors (1xxx)
    pub const INVALID_PARAMETER: i32 = 1001;
    pub const INSUFFICIENT_BALANCE: i32 = 1002;
    pub const MISSING_IDEMPOTENCY_KEY: i32 = 1101;
    pub const INVALID_IDEMPOTENCY_KEY: i32 = 1102;
    pub const INVALID_FINGERPRINT: i32 = 1103;
    pub const PAYLOAD_TOO_LARGE: i32 = 1104;

    // Caller identity (2xxx)
    pub const MISSING_CLIENT_ID: i32 = 2001;

    // Resource errors (4xxx)
    pub const TRANSACTION_NOT_FOUND: i32 = 4001;
    pub const DLQ_PROCESS_NOT_FOUND: i32 = 4002;
    pub const REQUEST_BEING_PROCESSED: i32 = 4091;
    pub const TRANSACTION_NOT_RESERVED: i32 = 4092;
    pub const DLQ_PROCESS_EXISTS: i32 = 4093;

    // Server errors (5xxx)
    pub const INTERNAL_ERROR: i32 = 5000;
    pub const SERVICE_UNAVAILABLE: i32 = 5001;
    pub const COORDINATION_STORE_ERROR: i32 = 5002;
}
