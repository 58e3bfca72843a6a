// src/app.rs
//! Wires adapters from configuration into an [`Analyzer`]. Every client is built
//! here once and handed down; nothing below keeps global state.

use anyhow::{Context, Result};
use chrono::{DateTime, FixedOffset, Utc};
use std::sync::Arc;
use std::time::Duration;

use crate::analyze::Analyzer;
use crate::clock::FixedClock;
use crate::config::AppConfig;
use crate::fetch::{providers, SourceAggregator};
use crate::http;
use crate::lock::http::HttpLocker;
use crate::lock::{LockCoordinator, RetryPolicy};
use crate::model::GoalEvaluator;
use crate::notify::{DiscordNotifier, Notifier, NotifierMux, SlackNotifier};
use crate::persist::FilePersister;
use crate::pipeline::ReportPipeline;
use crate::print::StdoutPrinter;

pub fn build_notifier(cfg: &AppConfig, client: &reqwest::Client) -> NotifierMux {
    let mut channels: Vec<Arc<dyn Notifier>> = Vec::new();
    if let Some(url) = &cfg.discord_webhook_url {
        channels.push(Arc::new(DiscordNotifier::new(url.clone(), client.clone())));
    }
    if let Some(url) = &cfg.slack_webhook_url {
        channels.push(Arc::new(SlackNotifier::new(url.clone(), client.clone())));
    }
    NotifierMux::new(channels)
}

pub fn build_pipeline(
    cfg: &AppConfig,
    client: &reqwest::Client,
    now: DateTime<Utc>,
) -> ReportPipeline {
    let mut pipeline = ReportPipeline::new().with_printer(Arc::new(StdoutPrinter));
    if let Some(dir) = &cfg.report_dir {
        pipeline = pipeline.with_persister(Arc::new(FilePersister::new(dir.clone(), now)));
    }
    let notifier = build_notifier(cfg, client);
    if notifier.is_empty() {
        tracing::debug!("no notification channel configured");
    } else {
        pipeline = pipeline.with_notifier(Arc::new(notifier));
    }
    pipeline
}

/// `now` is the single instant of this process's run.
pub fn build_analyzer(cfg: &AppConfig, now: DateTime<Utc>) -> Result<Analyzer> {
    let client = http::build_client(cfg.http_timeout_secs)?;

    let fetchers = providers::from_config(&cfg.feeds, &client)?;
    let locker = HttpLocker::new(
        cfg.locker.url.clone(),
        cfg.locker.api_key.clone(),
        client.clone(),
    );
    let retry = if cfg.locker.retry_attempts > 1 {
        RetryPolicy::bounded(
            cfg.locker.retry_attempts,
            Duration::from_millis(cfg.locker.retry_backoff_ms),
        )
    } else {
        RetryPolicy::single_attempt()
    };
    let reference = FixedOffset::east_opt(cfg.goal_tz_offset_hours * 3600)
        .context("goal time zone offset")?;

    Ok(Analyzer::new(
        Arc::new(FixedClock(now)),
        LockCoordinator::new(Arc::new(locker)).with_retry(retry),
        SourceAggregator::new(fetchers),
        build_pipeline(cfg, &client, now),
    )
    .with_evaluator(GoalEvaluator::new(reference)))
}
