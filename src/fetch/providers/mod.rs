// src/fetch/providers/mod.rs
pub mod hatena;
pub mod zenn;

use reqwest::Client;
use std::sync::Arc;

use crate::config::FeedUrls;
use crate::fetch::types::EntryFetcher;
use crate::model::{platforms_by_priority, PlatformKind};

/// Builds one fetcher per platform with a configured feed URL, in priority order.
pub fn from_config(
    feeds: &FeedUrls,
    client: &Client,
) -> anyhow::Result<Vec<Arc<dyn EntryFetcher>>> {
    let mut out: Vec<Arc<dyn EntryFetcher>> = Vec::new();
    for platform in platforms_by_priority() {
        match platform.kind {
            PlatformKind::Hatena => {
                if let Some(url) = feeds.hatena.as_deref() {
                    out.push(Arc::new(hatena::from_url(url, client.clone())?));
                }
            }
            PlatformKind::Zenn => {
                if let Some(url) = feeds.zenn.as_deref() {
                    out.push(Arc::new(zenn::from_url(url, client.clone())));
                }
            }
        }
    }
    if out.is_empty() {
        tracing::warn!("no feed urls configured; every run will report no entry");
    }
    Ok(out)
}
