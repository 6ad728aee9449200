//! Shared harness for the black-box HTTP tests.
//!
//! Drives the real router with `tower::ServiceExt::oneshot`; every collaborator
//! is in-process so the tests need no network or database.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use http_body_util::BodyExt;
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

use ledger_gate::cache::{CacheStore, MemoryCache};
use ledger_gate::config::AppConfig;
use ledger_gate::dlq::{Notifier, NotifyError};
use ledger_gate::gateway::{build_router, state::AppState};
use ledger_gate::transaction::{
    Balance, Ledger, LedgerError, MemoryLedger, ReservedTransaction, TransactionId,
    TransactionStatus,
};

pub const TEST_CONFIG: &str = r#"
log_level: debug
log_dir: ./logs
log_file: test.log
use_json: false
rotation: never
gateway:
  host: 127.0.0.1
  port: 0
  max_body_bytes: 4096
cache:
  backend: memory
  key_prefix: test
  purge_interval_secs: 60
"#;

/// Records every escalation instead of delivering it
#[derive(Default)]
pub struct RecordingNotifier {
    pub sent: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn count(&self) -> usize {
        self.sent.lock().unwrap().len()
    }

    pub fn messages(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, process_name: &str, message: &str) -> Result<(), NotifyError> {
        self.sent
            .lock()
            .unwrap()
            .push((process_name.to_string(), message.to_string()));
        Ok(())
    }
}

/// `MemoryLedger` whose writes can be switched to fail with a storage error
pub struct SwitchableLedger {
    pub inner: MemoryLedger,
    failing: AtomicBool,
}

impl SwitchableLedger {
    pub fn new() -> Self {
        Self {
            inner: MemoryLedger::new(),
            failing: AtomicBool::new(false),
        }
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check(&self) -> Result<(), LedgerError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(LedgerError::Storage("ledger unavailable".into()))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Ledger for SwitchableLedger {
    fn name(&self) -> &'static str {
        "switchable"
    }

    async fn record(&self, transaction: &ReservedTransaction) -> Result<(), LedgerError> {
        self.check()?;
        self.inner.record(transaction).await
    }

    async fn get(&self, id: TransactionId) -> Result<Option<ReservedTransaction>, LedgerError> {
        self.inner.get(id).await
    }

    async fn transition_if(
        &self,
        id: TransactionId,
        expected: TransactionStatus,
        next: TransactionStatus,
    ) -> Result<Option<ReservedTransaction>, LedgerError> {
        self.check()?;
        self.inner.transition_if(id, expected, next).await
    }

    async fn balance(&self, account: &str, currency: &str) -> Result<Balance, LedgerError> {
        self.inner.balance(account, currency).await
    }
}

pub struct TestApp {
    pub router: Router,
    pub ledger: Arc<SwitchableLedger>,
    pub cache: Arc<MemoryCache>,
    pub notifier: Arc<RecordingNotifier>,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Vec<u8>,
}

impl TestResponse {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.bytes).unwrap_or(serde_json::Value::Null)
    }

    pub fn replayed(&self) -> Option<&str> {
        self.headers
            .get("x-idempotency-replayed")
            .and_then(|v| v.to_str().ok())
    }
}

impl TestApp {
    pub fn new() -> Self {
        Self::with_config(TEST_CONFIG)
    }

    pub fn with_config(yaml: &str) -> Self {
        let config = AppConfig::from_yaml(yaml).expect("test config");
        let ledger = Arc::new(SwitchableLedger::new());
        let cache = Arc::new(MemoryCache::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let state = AppState::new(
            &config,
            cache.clone() as Arc<dyn CacheStore>,
            ledger.clone(),
            notifier.clone(),
            None,
        );
        Self {
            router: build_router(Arc::new(state)),
            ledger,
            cache,
            notifier,
        }
    }

    pub async fn deposit(&self, account: &str, amount: i64) {
        self.ledger
            .inner
            .deposit(account, "USD", Decimal::new(amount, 0))
            .await;
    }

    pub async fn available(&self, account: &str) -> Decimal {
        self.ledger.balance(account, "USD").await.unwrap().available
    }

    pub async fn send(&self, request: Request<Body>) -> TestResponse {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let headers = response.headers().clone();
        let bytes = response
            .into_body()
            .collect()
            .await
            .unwrap()
            .to_bytes()
            .to_vec();
        TestResponse {
            status,
            headers,
            bytes,
        }
    }

    pub async fn get(&self, uri: &str, client_id: Option<&str>) -> TestResponse {
        self.get_with(uri, client_id, &[]).await
    }

    pub async fn get_with(
        &self,
        uri: &str,
        client_id: Option<&str>,
        extra: &[(&str, &str)],
    ) -> TestResponse {
        let mut builder = Request::builder().method("GET").uri(uri);
        if let Some(client) = client_id {
            builder = builder.header("x-client-id", client);
        }
        for (name, value) in extra {
            builder = builder.header(*name, *value);
        }
        self.send(builder.body(Body::empty()).unwrap()).await
    }

    /// POST with optional client id, idempotency key, and extra headers
    pub async fn post(
        &self,
        uri: &str,
        client_id: Option<&str>,
        idempotency_key: Option<&str>,
        extra: &[(&str, &str)],
        body: &str,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(client) = client_id {
            builder = builder.header("x-client-id", client);
        }
        if let Some(key) = idempotency_key {
            builder = builder.header("x-idempotency-key", key);
        }
        for (name, value) in extra {
            builder = builder.header(*name, *value);
        }
        self.send(builder.body(Body::from(body.to_string())).unwrap())
            .await
    }

    /// Create a transaction as `client-a` from `acc-1` to `acc-2`
    pub async fn create_transaction(&self, key: &str, amount: &str, reserve: bool) -> TestResponse {
        let body = serde_json::json!({
            "amount": amount,
            "currency": "USD",
            "source_account": "acc-1",
            "destination_account": "acc-2",
            "reserve": reserve,
        })
        .to_string();
        self.post("/v1/transactions", Some("client-a"), Some(key), &[], &body)
            .await
    }

    pub async fn set_status(&self, id: &str, key: &str, action: &str) -> TestResponse {
        let body = serde_json::json!({ "action": action }).to_string();
        self.post(
            &format!("/v1/transactions/{}/status", id),
            Some("client-a"),
            Some(key),
            &[],
            &body,
        )
        .await
    }
}
