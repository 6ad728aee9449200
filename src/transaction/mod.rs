//! Reserved Transaction Lifecycle
//!
//! Two-phase transactions: a transaction created with `reserve = true` holds
//! funds in the source account (`RESERVED`); a second request commits or
//! cancels it exactly once.
//!
//! ```text
//! create(reserve=true)  ──▶ RESERVED ──commit──▶ COMMITTED
//!                               └─────cancel──▶ CANCELLED
//! create(reserve=false) ──▶ COMMITTED
//! ```
//!
//! # Safety Invariants
//!
//! 1. **Conditional update**: transitions go through `Ledger::transition_if`
//!    (`UPDATE ... WHERE status = RESERVED`), never read-then-write.
//! 2. **All or nothing**: a status change and its balance effect commit together;
//!    a ledger failure leaves the transaction `RESERVED` so the call can be retried.
//! 3. **Terminal is final**: `COMMITTED` and `CANCELLED` accept no transitions.

pub mod error;
pub mod ledger;
pub mod lifecycle;
pub mod memory;
pub mod postgres;
pub mod state;
pub mod types;

pub use error::{LedgerError, LifecycleError};
pub use ledger::Ledger;
pub use lifecycle::LifecycleManager;
pub use memory::MemoryLedger;
pub use postgres::PgLedger;
pub use state::{TransactionStatus, TransitionAction};
pub use types::{Balance, NewTransaction, ReservedTransaction, TransactionId};
