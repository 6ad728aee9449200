//! In-process ledger for single-instance runs and tests.
//!
//! One async mutex guards transactions and balances together, so a status
//! change and its balance effect are a single critical section.

use async_trait::async_trait;
use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashMap;
use tokio::sync::Mutex;
use tracing::debug;

use super::error::LedgerError;
use super::ledger::{BalanceEffect, Ledger};
use super::state::TransactionStatus;
use super::types::{Balance, ReservedTransaction, TransactionId};

type AccountKey = (String, String);

#[derive(Default)]
struct LedgerBook {
    transactions: HashMap<TransactionId, ReservedTransaction>,
    balances: HashMap<AccountKey, Balance>,
}

impl LedgerBook {
    fn balance_mut(&mut self, account: &str, currency: &str) -> &mut Balance {
        self.balances
            .entry((account.to_string(), currency.to_string()))
            .or_default()
    }

    /// Check first, then mutate: on `Err` no balance has changed.
    fn apply(
        &mut self,
        effect: BalanceEffect,
        transaction: &ReservedTransaction,
    ) -> Result<(), LedgerError> {
        let amount = transaction.amount;
        let currency = transaction.currency.as_str();
        let source = *self.balance_mut(&transaction.source_account, currency);

        if effect.debits_available() && source.available < amount {
            return Err(LedgerError::InsufficientFunds {
                account: transaction.source_account.clone(),
                currency: currency.to_string(),
            });
        }
        if !effect.debits_available() && source.on_hold < amount {
            return Err(LedgerError::Corrupt(format!(
                "on_hold below reserved amount for {}",
                transaction.transaction_id
            )));
        }

        let src = self.balance_mut(&transaction.source_account, currency);
        match effect {
            BalanceEffect::Hold => {
                src.available -= amount;
                src.on_hold += amount;
            }
            BalanceEffect::Settle => src.available -= amount,
            BalanceEffect::Commit => src.on_hold -= amount,
            BalanceEffect::Release => {
                src.on_hold -= amount;
                src.available += amount;
            }
        }
        if matches!(effect, BalanceEffect::Settle | BalanceEffect::Commit) {
            self.balance_mut(&transaction.destination_account, currency)
                .available += amount;
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryLedger {
    book: Mutex<LedgerBook>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Credit an account's available balance
    pub async fn deposit(&self, account: &str, currency: &str, amount: Decimal) {
        let mut book = self.book.lock().await;
        book.balance_mut(account, currency).available += amount;
        debug!(account = %account, currency = %currency, amount = %amount, "Deposit applied");
    }
}

#[async_trait]
impl Ledger for MemoryLedger {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn record(&self, transaction: &ReservedTransaction) -> Result<(), LedgerError> {
        let mut book = self.book.lock().await;
        if book.transactions.contains_key(&transaction.transaction_id) {
            return Err(LedgerError::Storage(format!(
                "duplicate transaction id {}",
                transaction.transaction_id
            )));
        }
        if let Some(effect) = BalanceEffect::on_create(transaction.status) {
            book.apply(effect, transaction)?;
        }
        book.transactions
            .insert(transaction.transaction_id, transaction.clone());
        Ok(())
    }

    async fn get(&self, id: TransactionId) -> Result<Option<ReservedTransaction>, LedgerError> {
        Ok(self.book.lock().await.transactions.get(&id).cloned())
    }

    async fn transition_if(
        &self,
        id: TransactionId,
        expected: TransactionStatus,
        next: TransactionStatus,
    ) -> Result<Option<ReservedTransaction>, LedgerError> {
        let mut book = self.book.lock().await;
        let current = match book.transactions.get(&id) {
            Some(tx) if tx.status == expected => tx.clone(),
            _ => return Ok(None),
        };

        if let Some(effect) = BalanceEffect::on_transition(next) {
            book.apply(effect, &current)?;
        }

        let mut updated = current;
        updated.status = next;
        updated.updated_at = Utc::now();
        book.transactions.insert(id, updated.clone());
        Ok(Some(updated))
    }

    async fn balance(&self, account: &str, currency: &str) -> Result<Balance, LedgerError> {
        let book = self.book.lock().await;
        Ok(book
            .balances
            .get(&(account.to_string(), currency.to_string()))
            .copied()
            .unwrap_or_default())
    }
}
