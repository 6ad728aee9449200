//! Reserved transaction status machine
//!
//! ```text
//! RESERVED ──commit──▶ COMMITTED
//!     └─────cancel───▶ CANCELLED
//! ```
//!
//! Status IDs are stored in PostgreSQL as SMALLINT.

use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Terminal states: COMMITTED (20), CANCELLED (-10)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(i16)]
pub enum TransactionStatus {
    /// Funds moved from available to on-hold; awaiting commit or cancel
    Reserved = 10,

    /// Terminal: held funds settled to the destination
    Committed = 20,

    /// Terminal: held funds released back to the source
    Cancelled = -10,
}

impl TransactionStatus {
    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TransactionStatus::Committed | TransactionStatus::Cancelled
        )
    }

    /// Only `Reserved` may move, and only to a terminal state.
    #[inline]
    pub fn can_transition_to(&self, next: TransactionStatus) -> bool {
        matches!(self, TransactionStatus::Reserved) && next.is_terminal()
    }

    #[inline]
    pub fn id(&self) -> i16 {
        *self as i16
    }

    pub fn from_id(id: i16) -> Option<Self> {
        match id {
            10 => Some(TransactionStatus::Reserved),
            20 => Some(TransactionStatus::Committed),
            -10 => Some(TransactionStatus::Cancelled),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionStatus::Reserved => "RESERVED",
            TransactionStatus::Committed => "COMMITTED",
            TransactionStatus::Cancelled => "CANCELLED",
        }
    }

    /// Client-facing status name
    pub fn api_status(&self) -> &'static str {
        match self {
            TransactionStatus::Reserved => "PENDING",
            TransactionStatus::Committed => "SUCCESS",
            TransactionStatus::Cancelled => "CANCELED",
        }
    }
}

impl fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Requested second-phase action on a reserved transaction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum TransitionAction {
    Commit,
    Cancel,
}

impl TransitionAction {
    /// Status reached when the action succeeds
    pub fn target(&self) -> TransactionStatus {
        match self {
            TransitionAction::Commit => TransactionStatus::Committed,
            TransitionAction::Cancel => TransactionStatus::Cancelled,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransitionAction::Commit => "commit",
            TransitionAction::Cancel => "cancel",
        }
    }
}

impl fmt::Display for TransitionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
