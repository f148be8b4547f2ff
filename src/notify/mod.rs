use crate::config::NotifierConfig;
use anyhow::{Context, Result};
use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

/// Outbound notification transport.
///
/// Delivery is at-most-once from the scheduler's point of view: the fire
/// record is marked before `send` is awaited, so a failing transport
/// drops that day's notification rather than duplicating it.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, target_id: &str, text: &str) -> Result<()>;
}

/// Notifier that POSTs JSON to a configured webhook endpoint.
pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(config: &NotifierConfig) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .unwrap_or_default();
        Self {
            client,
            url: config.webhook_url.clone(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, target_id: &str, text: &str) -> Result<()> {
        let body = serde_json::json!({
            "target_id": target_id,
            "text": text,
        });

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .context("Failed to deliver webhook notification")?;

        response
            .error_for_status()
            .context("Webhook endpoint rejected notification")?;

        Ok(())
    }
}

/// Log-only notifier used when no webhook URL is configured.
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, target_id: &str, text: &str) -> Result<()> {
        info!(target_id = %target_id, text = %text, "Notification (log-only)");
        Ok(())
    }
}
