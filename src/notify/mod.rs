// src/notify/mod.rs
pub mod discord;
pub mod slack;

use anyhow::{anyhow, Result};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

use crate::model::AnalysisReport;

pub use discord::DiscordNotifier;
pub use slack::SlackNotifier;

/// Delivers a report to a human channel. At-most-once, best effort.
#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, cancel: &CancellationToken, report: &AnalysisReport) -> Result<()>;
    fn name(&self) -> &'static str;
}

pub const MSG_ACHIEVED: &str = "Goal achieved 🎊 Great work!";
pub const MSG_NOT_ACHIEVED: &str = "Goal not achieved 😢 Let's keep going!";

/// Headline plus, when present, the latest entry.
pub fn message(report: &AnalysisReport) -> String {
    let headline = if report.is_goal_achieved {
        MSG_ACHIEVED
    } else {
        MSG_NOT_ACHIEVED
    };
    match &report.latest_entry {
        Some(e) => format!(
            "{headline}\nLatest entry: {} ({}, {})",
            e.title,
            e.platform.kind,
            e.published_at.format("%Y-%m-%d")
        ),
        None => headline.to_string(),
    }
}

/// Sends to every channel in order; fails if any channel failed, after trying all of them.
#[derive(Clone, Default)]
pub struct NotifierMux {
    channels: Vec<Arc<dyn Notifier>>,
}

impl NotifierMux {
    pub fn new(channels: Vec<Arc<dyn Notifier>>) -> Self {
        Self { channels }
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }
}

#[async_trait::async_trait]
impl Notifier for NotifierMux {
    async fn notify(&self, cancel: &CancellationToken, report: &AnalysisReport) -> Result<()> {
        let mut failed = Vec::new();
        for ch in &self.channels {
            if let Err(e) = ch.notify(cancel, report).await {
                tracing::debug!(
                    channel = ch.name(),
                    error = %format!("{e:#}"),
                    "notify channel failed"
                );
                failed.push(format!("{}: {e:#}", ch.name()));
            }
        }
        if failed.is_empty() {
            Ok(())
        } else {
            Err(anyhow!("notify failed on {}", failed.join("; ")))
        }
    }

    fn name(&self) -> &'static str {
        "mux"
    }
}
