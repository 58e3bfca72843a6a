// src/fetch/types.rs
use anyhow::Result;
use tokio_util::sync::CancellationToken;

use crate::model::Entry;

/// Fetches the most recent entry of one tracked platform.
#[async_trait::async_trait]
pub trait EntryFetcher: Send + Sync {
    /// `Ok(None)` when the platform has no dated entries.
    async fn fetch_latest(&self, cancel: &CancellationToken) -> Result<Option<Entry>>;
    fn name(&self) -> &str;
}
