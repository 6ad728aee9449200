//! Transaction lifecycle error types

use thiserror::Error;

use crate::db::ColumnError;

/// Ledger (storage + balance engine) failures
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LedgerError {
    #[error("Insufficient available balance in {account} ({currency})")]
    InsufficientFunds { account: String, currency: String },

    #[error("Ledger storage error: {0}")]
    Storage(String),

    #[error("Corrupt ledger row: {0}")]
    Corrupt(String),
}

impl From<sqlx::Error> for LedgerError {
    fn from(e: sqlx::Error) -> Self {
        LedgerError::Storage(e.to_string())
    }
}

impl From<ColumnError> for LedgerError {
    fn from(e: ColumnError) -> Self {
        LedgerError::Corrupt(e.to_string())
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum LifecycleError {
    // === Validation Errors ===
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Source and destination account cannot be the same")]
    SameAccount,

    #[error("Insufficient balance")]
    InsufficientFunds,

    // === State Errors ===
    #[error("Transaction not found: {0}")]
    NotFound(String),

    #[error("transaction status not reserved")]
    NotReserved,

    // === System Errors ===
    #[error("Ledger error: {0}")]
    Ledger(LedgerError),
}

impl From<LedgerError> for LifecycleError {
    fn from(e: LedgerError) -> Self {
        match e {
            LedgerError::InsufficientFunds { .. } => LifecycleError::InsufficientFunds,
            other => LifecycleError::Ledger(other),
        }
    }
}

impl LifecycleError {
    pub fn code(&self) -> &'static str {
        match self {
            LifecycleError::InvalidAmount => "INVALID_AMOUNT",
            LifecycleError::MissingField(_) => "MISSING_FIELD",
            LifecycleError::SameAccount => "SAME_ACCOUNT",
            LifecycleError::InsufficientFunds => "INSUFFICIENT_BALANCE",
            LifecycleError::NotFound(_) => "TRANSACTION_NOT_FOUND",
            LifecycleError::NotReserved => "TRANSACTION_NOT_RESERVED",
            LifecycleError::Ledger(_) => "LEDGER_ERROR",
        }
    }

    pub fn http_status(&self) -> u16 {
        match self {
            LifecycleError::InvalidAmount
            | LifecycleError::MissingField(_)
            | LifecycleError::SameAccount => 400,
            LifecycleError::NotFound(_) => 404,
            LifecycleError::NotReserved => 409,
            LifecycleError::InsufficientFunds => 422,
            LifecycleError::Ledger(_) => 500,
        }
    }

    /// Expected under concurrent transitions; not a failure to alert on
    pub fn is_contention(&self) -> bool {
        matches!(self, LifecycleError::NotReserved)
    }
}
