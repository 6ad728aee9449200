//! Ledger contract
//!
//! The ledger persists transactions and account balances. Every method that
//! changes a transaction's status also applies its balance effect, and both
//! commit atomically.
//!
//! | Step | Source account | Destination account |
//! |---|---|---|
//! | reserve | `available -= amount`, `on_hold += amount` | |
//! | immediate | `available -= amount` | `available += amount` |
//! | commit | `on_hold -= amount` | `available += amount` |
//! | cancel | `on_hold -= amount`, `available += amount` | |

use async_trait::async_trait;

use super::error::LedgerError;
use super::state::TransactionStatus;
use super::types::{Balance, ReservedTransaction, TransactionId};

#[async_trait]
pub trait Ledger: Send + Sync {
    /// Ledger name for logging
    fn name(&self) -> &'static str;

    /// Persist a new transaction in `Reserved` (hold) or `Committed`
    /// (immediate settle) status and apply its balance effect.
    ///
    /// Fails with `InsufficientFunds` if the source's available balance is short.
    async fn record(&self, transaction: &ReservedTransaction) -> Result<(), LedgerError>;

    async fn get(&self, id: TransactionId) -> Result<Option<ReservedTransaction>, LedgerError>;

    /// Conditional transition: `UPDATE ... WHERE status = expected`.
    ///
    /// Returns the updated transaction, or `None` if the stored status no longer
    /// matched `expected` (or the row is gone). On `Err` nothing changed.
    async fn transition_if(
        &self,
        id: TransactionId,
        expected: TransactionStatus,
        next: TransactionStatus,
    ) -> Result<Option<ReservedTransaction>, LedgerError>;

    async fn balance(&self, account: &str, currency: &str) -> Result<Balance, LedgerError>;
}

/// Balance effect of a status change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum BalanceEffect {
    Hold,
    Settle,
    Commit,
    Release,
}

impl BalanceEffect {
    /// Effect of creating a transaction in `status`
    pub(crate) fn on_create(status: TransactionStatus) -> Option<Self> {
        match status {
            TransactionStatus::Reserved => Some(BalanceEffect::Hold),
            TransactionStatus::Committed => Some(BalanceEffect::Settle),
            TransactionStatus::Cancelled => None,
        }
    }

    /// Effect of moving a reserved transaction to `next`
    pub(crate) fn on_transition(next: TransactionStatus) -> Option<Self> {
        match next {
            TransactionStatus::Committed => Some(BalanceEffect::Commit),
            TransactionStatus::Cancelled => Some(BalanceEffect::Release),
            TransactionStatus::Reserved => None,
        }
    }

    /// Whether the effect draws on the source's available balance
    pub(crate) fn debits_available(&self) -> bool {
        matches!(self, BalanceEffect::Hold | BalanceEffect::Settle)
    }
}
