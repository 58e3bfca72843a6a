// src/fetch/providers/hatena.rs
//! Hatena Blog publishes an Atom feed; `size=1` asks for just the newest entry.

use anyhow::{Context, Result};
use reqwest::{Client, Url};

use crate::fetch::feed::FeedFetcher;
use crate::model::Platform;

pub const NAME: &str = "hatena";

pub fn from_url(feed_url: &str, client: Client) -> Result<FeedFetcher> {
    let url = latest_only_url(feed_url)?;
    Ok(FeedFetcher::from_url(NAME, Platform::HATENA, url, client))
}

pub fn from_fixture(xml: &str) -> FeedFetcher {
    FeedFetcher::from_fixture(NAME, Platform::HATENA, xml)
}

/// Sets (or replaces) the `size` query parameter to 1.
fn latest_only_url(feed_url: &str) -> Result<String> {
    let mut url =
        Url::parse(feed_url).with_context(|| format!("invalid hatena feed url {feed_url}"))?;
    let kept: Vec<(String, String)> = url
        .query_pairs()
        .filter(|(k, _)| k != "size")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    url.query_pairs_mut()
        .clear()
        .extend_pairs(kept)
        .append_pair("size", "1");
    Ok(url.into())
}
