// src/notify/slack.rs
use anyhow::{Context, Result};
use reqwest::Client;
use tokio_util::sync::CancellationToken;

use super::{message, Notifier};
use crate::http::{send_with_retry, DEFAULT_MAX_ATTEMPTS};
use crate::model::AnalysisReport;

/// Slack incoming webhook.
pub struct SlackNotifier {
    webhook_url: String,
    client: Client,
}

impl SlackNotifier {
    pub fn new(url: String, client: Client) -> Self {
        Self {
            webhook_url: url,
            client,
        }
    }
}

#[async_trait::async_trait]
impl Notifier for SlackNotifier {
    async fn notify(&self, cancel: &CancellationToken, report: &AnalysisReport) -> Result<()> {
        let body = serde_json::json!({ "text": message(report) });

        send_with_retry(
            || self.client.post(&self.webhook_url).json(&body),
            DEFAULT_MAX_ATTEMPTS,
            cancel,
        )
        .await
        .context("slack post")?
        .error_for_status()
        .context("slack non-2xx")?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "slack"
    }
}
