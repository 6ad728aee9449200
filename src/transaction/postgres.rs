//! PostgreSQL ledger
//!
//! `transactions_tb` holds transaction rows (status as SMALLINT id),
//! `balances_tb` holds per-account available / on-hold amounts. Every write
//! runs in one SQL transaction. Balance rows touched by a write are locked with
//! `SELECT ... FOR UPDATE` ordered by account id, so opposite-direction
//! transfers between the same pair of accounts cannot deadlock.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::postgres::{PgPool, PgRow};
use sqlx::{Postgres, Transaction};

use super::error::LedgerError;
use super::ledger::{BalanceEffect, Ledger};
use super::state::TransactionStatus;
use super::types::{Balance, ReservedTransaction, TransactionId};
use crate::db::SafeRow;

const SELECT_TRANSACTION: &str = r#"
    SELECT transaction_id, client_id, amount, currency, source_account,
           destination_account, status, created_at, updated_at
    FROM transactions_tb
"#;

pub struct PgLedger {
    pool: PgPool,
}

impl PgLedger {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Credit an account's available balance (creates the row if missing)
    pub async fn deposit(
        &self,
        account: &str,
        currency: &str,
        amount: Decimal,
    ) -> Result<(), LedgerError> {
        credit_available(&self.pool, account, currency, amount).await
    }

    async fn apply(
        tx: &mut Transaction<'_, Postgres>,
        effect: BalanceEffect,
        transaction: &ReservedTransaction,
    ) -> Result<(), LedgerError> {
        let amount = transaction.amount;
        let currency = transaction.currency.as_str();
        let source = transaction.source_account.as_str();
        let destination = transaction.destination_account.as_str();
        let credits_destination = matches!(effect, BalanceEffect::Settle | BalanceEffect::Commit);

        let mut accounts = vec![source];
        if credits_destination {
            // Materialize the destination row so it is locked alongside the source
            sqlx::query(
                r#"
                INSERT INTO balances_tb (account_id, currency, available, on_hold)
                VALUES ($1, $2, 0, 0)
                ON CONFLICT (account_id, currency) DO NOTHING
                "#,
            )
            .bind(destination)
            .bind(currency)
            .execute(&mut **tx)
            .await?;
            accounts.push(destination);
        }

        let rows: Vec<(String, Decimal, Decimal)> = sqlx::query_as(
            r#"
            SELECT account_id, available, on_hold FROM balances_tb
            WHERE currency = $1 AND account_id = ANY($2)
            ORDER BY account_id
            FOR UPDATE
            "#,
        )
        .bind(currency)
        .bind(&accounts)
        .fetch_all(&mut **tx)
        .await?;
        let (available, on_hold) = rows
            .iter()
            .find(|(account, _, _)| account == source)
            .map(|(_, available, on_hold)| (*available, *on_hold))
            .unwrap_or((Decimal::ZERO, Decimal::ZERO));

        if effect.debits_available() && available < amount {
            return Err(LedgerError::InsufficientFunds {
                account: source.to_string(),
                currency: currency.to_string(),
            });
        }
        if !effect.debits_available() && on_hold < amount {
            return Err(LedgerError::Corrupt(format!(
                "on_hold below reserved amount for {}",
                transaction.transaction_id
            )));
        }

        let (available_delta, on_hold_delta) = match effect {
            BalanceEffect::Hold => (-amount, amount),
            BalanceEffect::Settle => (-amount, Decimal::ZERO),
            BalanceEffect::Commit => (Decimal::ZERO, -amount),
            BalanceEffect::Release => (amount, -amount),
        };
        sqlx::query(
            r#"
            UPDATE balances_tb
            SET available = available + $1, on_hold = on_hold + $2, updated_at = NOW()
            WHERE account_id = $3 AND currency = $4
            "#,
        )
        .bind(available_delta)
        .bind(on_hold_delta)
        .bind(source)
        .bind(currency)
        .execute(&mut **tx)
        .await?;

        if credits_destination {
            credit_available(&mut **tx, destination, currency, amount).await?;
        }
        Ok(())
    }
}

async fn credit_available<'e, E>(
    executor: E,
    account: &str,
    currency: &str,
    amount: Decimal,
) -> Result<(), LedgerError>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    sqlx::query(
        r#"
        INSERT INTO balances_tb (account_id, currency, available, on_hold)
        VALUES ($1, $2, $3, 0)
        ON CONFLICT (account_id, currency)
        DO UPDATE SET available = balances_tb.available + EXCLUDED.available, updated_at = NOW()
        "#,
    )
    .bind(account)
    .bind(currency)
    .bind(amount)
    .execute(executor)
    .await?;
    Ok(())
}

fn row_to_transaction(row: &PgRow) -> Result<ReservedTransaction, LedgerError> {
    let id: String = row.column("transaction_id")?;
    let status_id: i16 = row.column("status")?;
    let status = TransactionStatus::from_id(status_id)
        .ok_or_else(|| LedgerError::Corrupt(format!("unknown status id {}", status_id)))?;

    Ok(ReservedTransaction {
        transaction_id: id
            .parse()
            .map_err(|_| LedgerError::Corrupt(format!("invalid transaction id {}", id)))?,
        client_id: row.column("client_id")?,
        amount: row.column("amount")?,
        currency: row.column("currency")?,
        source_account: row.column("source_account")?,
        destination_account: row.column("destination_account")?,
        status,
        created_at: row.column::<DateTime<Utc>>("created_at")?,
        updated_at: row.column::<DateTime<Utc>>("updated_at")?,
    })
}

#[async_trait]
impl Ledger for PgLedger {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn record(&self, transaction: &ReservedTransaction) -> Result<(), LedgerError> {
        let mut tx = self.pool.begin().await?;

        if let Some(effect) = BalanceEffect::on_create(transaction.status) {
            Self::apply(&mut tx, effect, transaction).await?;
        }

        sqlx::query(
            r#"
            INSERT INTO transactions_tb
                (transaction_id, client_id, amount, currency, source_account,
                 destination_account, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(transaction.transaction_id.to_string())
        .bind(&transaction.client_id)
        .bind(transaction.amount)
        .bind(&transaction.currency)
        .bind(&transaction.source_account)
        .bind(&transaction.destination_account)
        .bind(transaction.status.id())
        .bind(transaction.created_at)
        .bind(transaction.updated_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn get(&self, id: TransactionId) -> Result<Option<ReservedTransaction>, LedgerError> {
        let row = sqlx::query(&format!("{} WHERE transaction_id = $1", SELECT_TRANSACTION))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_transaction).transpose()
    }

    async fn transition_if(
        &self,
        id: TransactionId,
        expected: TransactionStatus,
        next: TransactionStatus,
    ) -> Result<Option<ReservedTransaction>, LedgerError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query(
            r#"
            UPDATE transactions_tb
            SET status = $1, updated_at = NOW()
            WHERE transaction_id = $2 AND status = $3
            RETURNING transaction_id, client_id, amount, currency, source_account,
                      destination_account, status, created_at, updated_at
            "#,
        )
        .bind(next.id())
        .bind(id.to_string())
        .bind(expected.id())
        .fetch_optional(&mut *tx)
        .await?;

        // Status no longer matches; dropping `tx` rolls back
        let Some(row) = row else {
            return Ok(None);
        };
        let updated = row_to_transaction(&row)?;

        if let Some(effect) = BalanceEffect::on_transition(next) {
            Self::apply(&mut tx, effect, &updated).await?;
        }

        tx.commit().await?;
        Ok(Some(updated))
    }

    async fn balance(&self, account: &str, currency: &str) -> Result<Balance, LedgerError> {
        let row: Option<(Decimal, Decimal)> = sqlx::query_as(
            "SELECT available, on_hold FROM balances_tb WHERE account_id = $1 AND currency = $2",
        )
        .bind(account)
        .bind(currency)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row
            .map(|(available, on_hold)| Balance { available, on_hold })
            .unwrap_or_default())
    }
}
