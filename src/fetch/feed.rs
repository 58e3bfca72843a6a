// src/fetch/feed.rs
//! RSS 2.0 / Atom feed fetcher. Items without a parseable publish date are skipped.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use quick_xml::de::from_str;
use reqwest::Client;
use serde::Deserialize;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;
use tokio_util::sync::CancellationToken;

use crate::fetch::types::EntryFetcher;
use crate::http::{send_with_retry, DEFAULT_MAX_ATTEMPTS};
use crate::model::{Entry, Platform};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}

#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<String>,
    description: Option<String>,
    #[serde(rename = "pubDate")]
    pub_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomFeed {
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

// Atom text constructs carry a `type` attribute, so read the text node explicitly.
#[derive(Debug, Default, Deserialize)]
struct TextNode {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    title: Option<TextNode>,
    content: Option<TextNode>,
    summary: Option<TextNode>,
    published: Option<String>,
    updated: Option<String>,
}

fn to_utc(dt: OffsetDateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(dt.unix_timestamp(), dt.nanosecond())
}

// Feeds in the wild still send obsolete zone names like "GMT".
fn parse_rfc2822(ts: &str) -> Option<DateTime<Utc>> {
    let ts = ts.trim();
    OffsetDateTime::parse(ts, &Rfc2822)
        .ok()
        .and_then(to_utc)
        .or_else(|| DateTime::parse_from_rfc2822(ts).ok().map(|d| d.with_timezone(&Utc)))
}

fn parse_rfc3339(ts: &str) -> Option<DateTime<Utc>> {
    OffsetDateTime::parse(ts.trim(), &Rfc3339).ok().and_then(to_utc)
}

/// Parse every dated entry of an RSS or Atom document, stamping `platform` on each.
pub fn parse_entries(xml: &str, platform: Platform) -> Result<Vec<Entry>> {
    if let Ok(rss) = from_str::<Rss>(xml) {
        return Ok(rss
            .channel
            .items
            .into_iter()
            .filter_map(|it| {
                let published_at = it.pub_date.as_deref().and_then(parse_rfc2822)?;
                Some(Entry {
                    title: it.title.unwrap_or_default(),
                    body: it.description.unwrap_or_default(),
                    published_at,
                    platform,
                })
            })
            .collect());
    }

    let atom: AtomFeed = from_str(xml).context("parsing feed xml as rss or atom")?;
    Ok(atom
        .entries
        .into_iter()
        .filter_map(|it| {
            let published_at = it
                .published
                .as_deref()
                .or(it.updated.as_deref())
                .and_then(parse_rfc3339)?;
            Some(Entry {
                title: it.title.unwrap_or_default().value,
                body: it.content.or(it.summary).unwrap_or_default().value,
                published_at,
                platform,
            })
        })
        .collect())
}

/// Latest dated entry of the document, if any.
pub fn latest_in_feed(xml: &str, platform: Platform) -> Result<Option<Entry>> {
    let entries = parse_entries(xml, platform)?;
    Ok(entries.into_iter().max_by_key(|e| e.published_at))
}

enum Mode {
    // Own copy so tests don't need 'static fixtures.
    Fixture(String),
    Http { url: String, client: Client },
}

pub struct FeedFetcher {
    name: String,
    platform: Platform,
    mode: Mode,
}

impl FeedFetcher {
    pub fn from_url(
        name: impl Into<String>,
        platform: Platform,
        url: impl Into<String>,
        client: Client,
    ) -> Self {
        Self {
            name: name.into(),
            platform,
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        }
    }

    pub fn from_fixture(name: impl Into<String>, platform: Platform, xml: &str) -> Self {
        Self {
            name: name.into(),
            platform,
            mode: Mode::Fixture(xml.to_string()),
        }
    }
}

#[async_trait]
impl EntryFetcher for FeedFetcher {
    async fn fetch_latest(&self, cancel: &CancellationToken) -> Result<Option<Entry>> {
        match &self.mode {
            Mode::Fixture(xml) => latest_in_feed(xml, self.platform),
            Mode::Http { url, client } => {
                let rsp =
                    send_with_retry(|| client.get(url.as_str()), DEFAULT_MAX_ATTEMPTS, cancel)
                        .await
                        .with_context(|| format!("{} feed get", self.name))?;
                let status = rsp.status();
                if !status.is_success() {
                    return Err(anyhow!("{} feed responded with status {status}", self.name));
                }
                let body = rsp
                    .text()
                    .await
                    .with_context(|| format!("{} feed .text()", self.name))?;
                latest_in_feed(&body, self.platform)
                    .with_context(|| format!("{} feed parse", self.name))
            }
        }
    }

    fn name(&self) -> &str {
        &self.name
    }
}
