//! Notification sinks for escalated DLQ processes.
//!
//! Sends are best-effort: callers log failures and never let them change the
//! HTTP response already produced for the request.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

use super::error::NotifyError;

#[async_trait]
pub trait Notifier: Send + Sync {
    /// Sink name for logging
    fn name(&self) -> &'static str;

    async fn send(&self, process_name: &str, message: &str) -> Result<(), NotifyError>;
}

/// Emits escalations as structured log events only.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, process_name: &str, message: &str) -> Result<(), NotifyError> {
        warn!(process_name = %process_name, message = %message, "DLQ escalation");
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct EscalationPayload<'a> {
    process_name: &'a str,
    message: &'a str,
}

/// POSTs escalations as JSON to an operator-facing webhook.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, NotifyError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &'static str {
        "webhook"
    }

    async fn send(&self, process_name: &str, message: &str) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(&EscalationPayload {
                process_name,
                message,
            })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Rejected(status.as_u16()));
        }
        info!(process_name = %process_name, "DLQ escalation delivered to webhook");
        Ok(())
    }
}
