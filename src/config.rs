use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub gateway: GatewayConfig,
    /// PostgreSQL connection URL for the ledger (and the shared cache backend)
    #[serde(default)]
    pub postgres_url: Option<String>,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub idempotency: IdempotencyConfig,
    #[serde(default)]
    pub dlq: DlqConfig,
    #[serde(default)]
    pub notification: NotificationConfig,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GatewayConfig {
    pub host: String,
    pub port: u16,
    /// Upper bound for buffered request/response bodies
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub max_connections: u32,
    pub acquire_timeout_ms: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            max_connections: 20,
            acquire_timeout_ms: 5000,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CacheBackend {
    Memory,
    Postgres,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct CacheConfig {
    pub backend: CacheBackend,
    /// Namespace prepended to every cache key
    pub key_prefix: String,
    pub purge_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            backend: CacheBackend::Memory,
            key_prefix: "ledger_gate".to_string(),
            purge_interval_secs: 60,
        }
    }
}

/// Idempotency lock and replay retention. Both TTLs are tuned independently.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct IdempotencyConfig {
    /// TTL of a `pending` lock; bounds how long a crashed worker wedges a key
    pub pending_ttl_secs: u64,
    /// TTL of a `finished` record; the replay window
    pub finished_ttl_secs: u64,
    pub max_key_len: usize,
    /// Upper bound for the per-request `X-Idempotency-TTL` override
    pub max_client_ttl_secs: u64,
}

impl Default for IdempotencyConfig {
    fn default() -> Self {
        Self {
            pending_ttl_secs: 30,
            finished_ttl_secs: 24 * 60 * 60,
            max_key_len: 255,
            max_client_ttl_secs: 7 * 24 * 60 * 60,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct DlqConfig {
    pub record_ttl_secs: u64,
    pub retryable_status_codes: Vec<u16>,
    pub default_max_retry: u32,
}

impl Default for DlqConfig {
    fn default() -> Self {
        Self {
            record_ttl_secs: 7 * 24 * 60 * 60,
            retryable_status_codes: vec![408, 500, 503, 504],
            default_max_retry: 3,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct NotificationConfig {
    /// Escalation webhook; `None` falls back to log-only notifications
    #[serde(default)]
    pub webhook_url: Option<String>,
    pub timeout_ms: u64,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            webhook_url: None,
            timeout_ms: 3000,
        }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> anyhow::Result<Self> {
        let config_path = format!("config/{}.yaml", env);
        let content = fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse {}", config_path))
    }

    pub fn from_yaml(content: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Effective cache backend: postgres is only usable with a connection URL.
    pub fn cache_backend(&self) -> CacheBackend {
        match (self.cache.backend, &self.postgres_url) {
            (CacheBackend::Postgres, Some(_)) => CacheBackend::Postgres,
            _ => CacheBackend::Memory,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
log_level: info
log_dir: ./logs
log_file: ledger_gate.log
use_json: false
rotation: never
gateway:
  host: 0.0.0.0
  port: 8080
"#;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = AppConfig::from_yaml(MINIMAL).unwrap();
        assert_eq!(config.gateway.port, 8080);
        assert_eq!(config.gateway.max_body_bytes, 1024 * 1024);
        assert_eq!(config.idempotency.finished_ttl_secs, 86_400);
        assert_eq!(config.database.max_connections, 20);
        assert_eq!(config.dlq.retryable_status_codes, vec![408, 500, 503, 504]);
        assert_eq!(config.cache_backend(), CacheBackend::Memory);
        assert!(config.notification.webhook_url.is_none());
    }

    #[test]
    fn test_postgres_backend_requires_url() {
        let yaml = format!("{}cache:\n  backend: postgres\n  key_prefix: t\n  purge_interval_secs: 5\n", MINIMAL);
        let mut config = AppConfig::from_yaml(&yaml).unwrap();
        assert_eq!(config.cache_backend(), CacheBackend::Memory);

        config.postgres_url = Some("postgres://localhost/ledger".to_string());
        assert_eq!(config.cache_backend(), CacheBackend::Postgres);
    }

    #[test]
    fn test_independent_ttls() {
        let yaml = format!(
            "{}idempotency:\n  pending_ttl_secs: 5\n  finished_ttl_secs: 600\n  max_key_len: 64\n  max_client_ttl_secs: 3600\n",
            MINIMAL
        );
        let config = AppConfig::from_yaml(&yaml).unwrap();
        assert_eq!(config.idempotency.pending_ttl_secs, 5);
        assert_eq!(config.idempotency.finished_ttl_secs, 600);
    }
}
