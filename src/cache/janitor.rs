//! Background purge of expired cache entries.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::CacheStore;

/// Spawn a task that periodically drops expired entries from `cache`.
pub fn spawn_janitor(cache: Arc<dyn CacheStore>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        // The first tick completes immediately
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match cache.purge_expired().await {
                Ok(0) => {}
                Ok(purged) => debug!(backend = cache.name(), purged, "Purged expired cache entries"),
                Err(e) => warn!(backend = cache.name(), error = %e, "Cache purge failed"),
            }
        }
    })
}
