// src/fetch/providers/zenn.rs
use reqwest::Client;

use crate::fetch::feed::FeedFetcher;
use crate::model::Platform;

pub const NAME: &str = "zenn";

pub fn from_url(feed_url: &str, client: Client) -> FeedFetcher {
    FeedFetcher::from_url(NAME, Platform::ZENN, feed_url, client)
}

pub fn from_fixture(xml: &str) -> FeedFetcher {
    FeedFetcher::from_fixture(NAME, Platform::ZENN, xml)
}
