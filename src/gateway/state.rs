use std::sync::Arc;

use crate::cache::{CacheStore, KeySpace};
use crate::config::AppConfig;
use crate::db::Database;
use crate::dlq::{DlqRetryTracker, Notifier};
use crate::idempotency::IdempotencyCoordinator;
use crate::transaction::{Ledger, LifecycleManager};

/// Gateway shared state
#[derive(Clone)]
pub struct AppState {
    /// Idempotency pre/post checks for mutating routes
    pub idempotency: Arc<IdempotencyCoordinator>,
    /// DLQ retry tracking for re-delivered requests
    pub dlq: Arc<DlqRetryTracker>,
    /// Reserved transaction lifecycle
    pub lifecycle: Arc<LifecycleManager>,
    /// PostgreSQL (optional; health check pings it when present)
    pub pg_db: Option<Arc<Database>>,
    /// Upper bound for buffered request bodies
    pub max_body_bytes: usize,
}

impl AppState {
    /// Wire the coordination components over one shared cache.
    pub fn new(
        config: &AppConfig,
        cache: Arc<dyn CacheStore>,
        ledger: Arc<dyn Ledger>,
        notifier: Arc<dyn Notifier>,
        pg_db: Option<Arc<Database>>,
    ) -> Self {
        let keys = KeySpace::new(config.cache.key_prefix.clone());
        Self {
            idempotency: Arc::new(IdempotencyCoordinator::new(
                cache.clone(),
                keys.clone(),
                &config.idempotency,
            )),
            dlq: Arc::new(DlqRetryTracker::new(cache, notifier, keys, &config.dlq)),
            lifecycle: Arc::new(LifecycleManager::new(ledger)),
            pg_db,
            max_body_bytes: config.gateway.max_body_bytes,
        }
    }
}
