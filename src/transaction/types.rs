//! Transaction domain types

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::state::TransactionStatus;

/// Transaction ID backed by ULID
///
/// - Time-ordered (sortable by creation)
/// - No coordination needed between instances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransactionId(ulid::Ulid);

impl TransactionId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    pub fn inner(&self) -> ulid::Ulid {
        self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for TransactionId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(ulid::Ulid::from_string(s)?))
    }
}

impl Serialize for TransactionId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for TransactionId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Caller input for a new transaction, before validation
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub client_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub source_account: String,
    pub destination_account: String,
}

/// Persisted transaction
#[derive(Debug, Clone, PartialEq)]
pub struct ReservedTransaction {
    pub transaction_id: TransactionId,
    /// Owning API client
    pub client_id: String,
    pub amount: Decimal,
    pub currency: String,
    pub source_account: String,
    pub destination_account: String,
    pub status: TransactionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReservedTransaction {
    /// Build a record for a validated request in the given initial status
    pub fn from_request(request: NewTransaction, status: TransactionStatus) -> Self {
        let now = Utc::now();
        Self {
            transaction_id: TransactionId::new(),
            client_id: request.client_id,
            amount: request.amount,
            currency: request.currency,
            source_account: request.source_account,
            destination_account: request.destination_account,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_owned_by(&self, client_id: &str) -> bool {
        self.client_id == client_id
    }
}

/// Balance of one account in one currency
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct Balance {
    pub available: Decimal,
    pub on_hold: Decimal,
}
