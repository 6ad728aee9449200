//! Lifecycle Manager
//!
//! Validates creation requests and enforces the reserved → terminal rule before
//! delegating the balance mutation to the [`Ledger`]. The ledger's conditional
//! update is what actually serializes racing commit/cancel calls; the local
//! `can_transition_to` check only short-circuits the obvious cases.

use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, error, info};

use super::error::LifecycleError;
use super::ledger::Ledger;
use super::state::{TransactionStatus, TransitionAction};
use super::types::{NewTransaction, ReservedTransaction, TransactionId};

pub struct LifecycleManager {
    ledger: Arc<dyn Ledger>,
}

impl LifecycleManager {
    pub fn new(ledger: Arc<dyn Ledger>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &Arc<dyn Ledger> {
        &self.ledger
    }

    fn validate(request: &NewTransaction) -> Result<(), LifecycleError> {
        if request.amount <= Decimal::ZERO {
            return Err(LifecycleError::InvalidAmount);
        }
        let required = [
            ("client_id", &request.client_id),
            ("currency", &request.currency),
            ("source_account", &request.source_account),
            ("destination_account", &request.destination_account),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(LifecycleError::MissingField(*field));
        }
        if request.source_account == request.destination_account {
            return Err(LifecycleError::SameAccount);
        }
        Ok(())
    }

    /// Create a transaction. `reserve = true` holds funds (`Reserved`),
    /// otherwise the transfer settles immediately (`Committed`).
    pub async fn create(
        &self,
        request: NewTransaction,
        reserve: bool,
    ) -> Result<ReservedTransaction, LifecycleError> {
        Self::validate(&request)?;

        let status = if reserve {
            TransactionStatus::Reserved
        } else {
            TransactionStatus::Committed
        };
        let transaction = ReservedTransaction::from_request(request, status);

        if let Err(e) = self.ledger.record(&transaction).await {
            let err = LifecycleError::from(e);
            match &err {
                LifecycleError::InsufficientFunds => info!(
                    source_account = %transaction.source_account,
                    amount = %transaction.amount,
                    "Transaction rejected: insufficient balance"
                ),
                _ => error!(
                    transaction_id = %transaction.transaction_id,
                    ledger = self.ledger.name(),
                    error = %err,
                    "Failed to record transaction"
                ),
            }
            return Err(err);
        }

        info!(
            transaction_id = %transaction.transaction_id,
            client_id = %transaction.client_id,
            amount = %transaction.amount,
            currency = %transaction.currency,
            status = %transaction.status,
            "Transaction created"
        );
        Ok(transaction)
    }

    /// Fetch a transaction visible to `client_id`. Another client's
    /// transaction reads as not found.
    pub async fn get(
        &self,
        id: TransactionId,
        client_id: &str,
    ) -> Result<ReservedTransaction, LifecycleError> {
        match self.ledger.get(id).await? {
            Some(tx) if tx.is_owned_by(client_id) => Ok(tx),
            _ => Err(LifecycleError::NotFound(id.to_string())),
        }
    }

    /// Move a reserved transaction to its terminal state.
    ///
    /// Exactly one commit/cancel succeeds per transaction; every later call,
    /// including a repeat of the winning action, fails with `NotReserved`.
    /// A ledger failure leaves the transaction `Reserved`.
    pub async fn transition(
        &self,
        id: TransactionId,
        action: TransitionAction,
        client_id: &str,
    ) -> Result<ReservedTransaction, LifecycleError> {
        let current = self.get(id, client_id).await?;
        let next = action.target();

        if !current.status.can_transition_to(next) {
            debug!(
                transaction_id = %id,
                status = %current.status,
                action = %action,
                "Transition rejected: not reserved"
            );
            return Err(LifecycleError::NotReserved);
        }

        let updated = match self
            .ledger
            .transition_if(id, TransactionStatus::Reserved, next)
            .await
        {
            Ok(Some(tx)) => tx,
            Ok(None) => {
                debug!(transaction_id = %id, action = %action, "Lost transition race");
                return Err(LifecycleError::NotReserved);
            }
            Err(e) => {
                error!(
                    transaction_id = %id,
                    action = %action,
                    ledger = self.ledger.name(),
                    error = %e,
                    "Ledger transition failed; transaction stays reserved"
                );
                return Err(e.into());
            }
        };

        info!(
            transaction_id = %id,
            action = %action,
            status = %updated.status,
            "Transaction transitioned"
        );
        Ok(updated)
    }
}
