// src/notify/discord.rs
use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use super::{message, Notifier};
use crate::http::{send_with_retry, DEFAULT_MAX_ATTEMPTS};
use crate::model::AnalysisReport;

// Webhook posts are small; don't let a stuck Discord hold the run.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Clone)]
pub struct DiscordNotifier {
    webhook: String,
    client: Client,
}

impl DiscordNotifier {
    pub fn new(webhook: String, client: Client) -> Self {
        Self { webhook, client }
    }
}

#[derive(Serialize)]
struct DiscordWebhookPayload {
    content: String,
}

#[async_trait::async_trait]
impl Notifier for DiscordNotifier {
    async fn notify(&self, cancel: &CancellationToken, report: &AnalysisReport) -> Result<()> {
        let payload = DiscordWebhookPayload {
            content: message(report),
        };
        let rsp = send_with_retry(
            || {
                self.client
                    .post(&self.webhook)
                    .timeout(REQUEST_TIMEOUT)
                    .json(&payload)
            },
            DEFAULT_MAX_ATTEMPTS,
            cancel,
        )
        .await
        .map_err(|e| anyhow!("Discord webhook request failed: {e:#}"))?;

        // Discord answers 204 unless `?wait=true` was requested.
        if let Some(e) = rsp.error_for_status_ref().err() {
            let body = rsp.text().await.unwrap_or_default();
            return Err(anyhow!("Discord webhook HTTP error: {e}; body: {body}"));
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "discord"
    }
}
