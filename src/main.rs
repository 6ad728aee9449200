//! Ledger Gate server
//!
//! Usage:
//!   ledger_gate [--env <name>] [--port <n>]
//!
//! Loads `config/<env>.yaml` (default `dev`). With `postgres_url` set, the
//! ledger and (unless `cache.backend: memory`) the coordination store live in
//! PostgreSQL; otherwise everything runs in-process.

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use ledger_gate::cache::{CacheStore, MemoryCache, PgCache, spawn_janitor};
use ledger_gate::config::{AppConfig, CacheBackend};
use ledger_gate::db::Database;
use ledger_gate::dlq::{LogNotifier, Notifier, WebhookNotifier};
use ledger_gate::gateway::{self, handlers::VERSION, state::AppState};
use ledger_gate::logging;
use ledger_gate::transaction::{Ledger, MemoryLedger, PgLedger};

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

fn build_notifier(config: &AppConfig) -> anyhow::Result<Arc<dyn Notifier>> {
    match &config.notification.webhook_url {
        Some(url) => {
            let notifier = WebhookNotifier::new(
                url.clone(),
                Duration::from_millis(config.notification.timeout_ms),
            )
            .context("Failed to build webhook notifier")?;
            info!(url = %url, "DLQ escalations go to webhook");
            Ok(Arc::new(notifier))
        }
        None => {
            info!("DLQ escalations are log-only (no webhook_url)");
            Ok(Arc::new(LogNotifier))
        }
    }
}

async fn run(config: AppConfig, env: &str) -> anyhow::Result<()> {
    info!(env = %env, version = VERSION, "Starting Ledger Gate");

    let pg_db = match &config.postgres_url {
        Some(url) => {
            let db = Database::connect(url, &config.database)
                .await
                .context("Failed to connect to PostgreSQL")?;
            db.migrate().await.context("Failed to apply migrations")?;
            Some(Arc::new(db))
        }
        None => {
            warn!("postgres_url not set: ledger and cache are in-process only");
            None
        }
    };

    let cache: Arc<dyn CacheStore> = match (config.cache_backend(), &pg_db) {
        (CacheBackend::Postgres, Some(db)) => Arc::new(PgCache::new(db.pool().clone())),
        _ => Arc::new(MemoryCache::new()),
    };
    info!(backend = cache.name(), prefix = %config.cache.key_prefix, "Coordination store ready");

    let janitor = spawn_janitor(
        cache.clone(),
        Duration::from_secs(config.cache.purge_interval_secs.max(1)),
    );

    let ledger: Arc<dyn Ledger> = match &pg_db {
        Some(db) => Arc::new(PgLedger::new(db.pool().clone())),
        None => Arc::new(MemoryLedger::new()),
    };
    info!(ledger = ledger.name(), "Ledger ready");

    let notifier = build_notifier(&config)?;
    let state = Arc::new(AppState::new(&config, cache, ledger, notifier, pg_db));

    let port = get_port_override().unwrap_or(config.gateway.port);
    let result = gateway::run_server(&config.gateway.host, port, state, shutdown_signal()).await;

    janitor.abort();
    result
}

fn main() -> anyhow::Result<()> {
    let env = get_env();
    let config = AppConfig::load(&env)?;
    let _log_guard = logging::init_logging(&config);

    let rt = tokio::runtime::Runtime::new().context("Failed to start tokio runtime")?;
    rt.block_on(run(config, &env))
}
