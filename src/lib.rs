//! Ledger Gate - consistency core for a financial transaction API
//!
//! Three mechanisms in front of a ledger:
//!
//! - [`idempotency`] - deduplicates mutating requests (`X-Idempotency-Key` + body fingerprint)
//! - [`dlq`] - bounds retries of dead-lettered requests and escalates when exhausted
//! - [`transaction`] - reserve → commit/cancel lifecycle with a conditional ledger update
//!
//! # Modules
//!
//! - [`config`] - YAML configuration (`config/<env>.yaml`)
//! - [`logging`] - tracing subscriber setup
//! - [`db`] - PostgreSQL pool and migrations
//! - [`cache`] - shared key-value coordination store
//! - [`gateway`] - axum router, middleware, handlers, OpenAPI

pub mod cache;
pub mod config;
pub mod db;
pub mod dlq;
pub mod gateway;
pub mod idempotency;
pub mod logging;
pub mod transaction;

// Convenient re-exports at crate root
pub use cache::{CacheStore, KeySpace, MemoryCache, PgCache};
pub use config::AppConfig;
pub use dlq::{DlqRetryTracker, LogNotifier, Notifier, WebhookNotifier};
pub use gateway::{build_router, state::AppState};
pub use idempotency::IdempotencyCoordinator;
pub use transaction::{Ledger, LifecycleManager, MemoryLedger, PgLedger};
