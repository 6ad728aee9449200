//! Gateway types module
//!
//! ## Input Types
//! - [`ClientId`]: caller identity extractor (`X-Client-Id`)
//! - [`CreateTransactionRequest`], [`UpdateTransactionStatusRequest`], [`RegisterDlqProcessRequest`]
//!
//! ## Output Types
//! - [`ApiResponse<T>`]: Unified API response wrapper
//! - [`ApiError`]: Domain errors rendered through the same envelope
//! - [`TransactionResponse`]

pub mod response;
pub mod transaction;

pub use response::{ApiError, ApiResponse, ApiResult, created, error_codes, ok};
pub use transaction::{
    CLIENT_ID_HEADER, ClientId, CreateTransactionRequest, RegisterDlqProcessRequest,
    TransactionResponse, UpdateTransactionStatusRequest, parse_transaction_id,
};
