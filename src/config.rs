// src/config.rs
//! Process configuration: environment variables over an optional TOML file.
//!
//! Lookup order for the file:
//! 1) `--config <path>`
//! 2) $ANALYZER_CONFIG_PATH
//! 3) config/analyzer.toml (if present)

use anyhow::{anyhow, Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::model::GoalType;

pub const ENV_CONFIG_PATH: &str = "ANALYZER_CONFIG_PATH";
pub const DEFAULT_CONFIG_PATH: &str = "config/analyzer.toml";

const DEFAULT_LOG_LEVEL: &str = "WARN";
const DEFAULT_TZ_OFFSET_HOURS: i32 = 9;

/// Load `.env` when `ENV=local`; no-op elsewhere.
pub fn init_for_local() -> Result<()> {
    if !is_local(std::env::var("ENV").ok().as_deref()) {
        return Ok(());
    }
    dotenvy::dotenv().context("loading .env for local run")?;
    Ok(())
}

fn is_local(env: Option<&str>) -> bool {
    env.is_some_and(|e| e.eq_ignore_ascii_case("local"))
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedUrls {
    pub hatena: Option<String>,
    pub zenn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockerConfig {
    pub url: String,
    pub api_key: String,
    /// 1 = single attempt.
    pub retry_attempts: u32,
    pub retry_backoff_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub log_level: String,
    pub feeds: FeedUrls,
    pub locker: LockerConfig,
    pub discord_webhook_url: Option<String>,
    pub slack_webhook_url: Option<String>,
    pub report_dir: Option<PathBuf>,
    pub goal: GoalType,
    /// Offset (hours east of UTC) whose midnight anchors the goal window.
    pub goal_tz_offset_hours: i32,
    pub http_timeout_secs: u64,
}

/// Mirror of `AppConfig` as it appears in the TOML file; everything optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub log_level: Option<String>,
    pub feed_url_hatena: Option<String>,
    pub feed_url_zenn: Option<String>,
    pub locker_url: Option<String>,
    pub locker_api_key: Option<String>,
    pub lock_retry_attempts: Option<u32>,
    pub lock_retry_backoff_ms: Option<u64>,
    pub discord_webhook_url: Option<String>,
    pub slack_webhook_url: Option<String>,
    pub report_dir: Option<PathBuf>,
    pub goal: Option<String>,
    pub goal_tz_offset_hours: Option<i32>,
    pub http_timeout_secs: Option<u64>,
}

impl FileConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Resolve the file per the lookup order; missing default file means "no file".
    pub fn load_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(p) = explicit {
            return Self::load_from(p);
        }
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            if !pb.exists() {
                return Err(anyhow!("{ENV_CONFIG_PATH} points to non-existent path"));
            }
            return Self::load_from(&pb);
        }
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        Ok(Self::default())
    }
}

impl AppConfig {
    /// File (if any) overlaid by process environment.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let file = FileConfig::load_default(explicit)?;
        Self::from_sources(file, |k| std::env::var(k).ok())
    }

    /// Merge `file` with values from `env`; env wins. Empty strings count as unset.
    pub fn from_sources<F>(file: FileConfig, env: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |k: &str| env(k).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let locker_url = var("LOCKER_URL_CLOUDFLARE_WORKER")
            .or(non_empty(file.locker_url))
            .ok_or_else(|| anyhow!("LOCKER_URL_CLOUDFLARE_WORKER is not set"))?;

        let retry_attempts = match var("LOCK_RETRY_ATTEMPTS") {
            Some(v) => v
                .parse::<u32>()
                .with_context(|| format!("LOCK_RETRY_ATTEMPTS must be a number, got {v}"))?,
            None => file.lock_retry_attempts.unwrap_or(1),
        }
        .max(1);

        let goal = var("ANALYZE_GOAL")
            .or(file.goal)
            .map(GoalType::from)
            .unwrap_or_default();

        let goal_tz_offset_hours = match var("GOAL_TZ_OFFSET_HOURS") {
            Some(v) => v
                .parse::<i32>()
                .with_context(|| format!("GOAL_TZ_OFFSET_HOURS must be a number, got {v}"))?,
            None => file.goal_tz_offset_hours.unwrap_or(DEFAULT_TZ_OFFSET_HOURS),
        };
        if !(-23..=23).contains(&goal_tz_offset_hours) {
            return Err(anyhow!(
                "GOAL_TZ_OFFSET_HOURS out of range: {goal_tz_offset_hours}"
            ));
        }

        Ok(Self {
            log_level: var("LOG_LEVEL")
                .or(file.log_level)
                .unwrap_or_else(|| DEFAULT_LOG_LEVEL.to_string()),
            feeds: FeedUrls {
                hatena: var("FEED_URL_HATENA").or(non_empty(file.feed_url_hatena)),
                zenn: var("FEED_URL_ZENN").or(non_empty(file.feed_url_zenn)),
            },
            locker: LockerConfig {
                url: locker_url,
                api_key: var("LOCKER_API_KEY_CLOUDFLARE_WORKER")
                    .or(file.locker_api_key)
                    .unwrap_or_default(),
                retry_attempts,
                retry_backoff_ms: file.lock_retry_backoff_ms.unwrap_or(1_000),
            },
            discord_webhook_url: var("DISCORD_WEBHOOK_URL").or(non_empty(file.discord_webhook_url)),
            slack_webhook_url: var("SLACK_WEBHOOK_URL").or(non_empty(file.slack_webhook_url)),
            report_dir: var("REPORT_DIR").map(PathBuf::from).or(file.report_dir),
            goal,
            goal_tz_offset_hours,
            http_timeout_secs: file
                .http_timeout_secs
                .unwrap_or(crate::http::DEFAULT_TIMEOUT_SECS),
        })
    }
}
