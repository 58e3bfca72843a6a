// src/fetch/mod.rs
pub mod feed;
pub mod providers;
pub mod types;

use anyhow::anyhow;
use metrics::counter;
use std::sync::Arc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::error::AnalyzeError;
use crate::fetch::types::EntryFetcher;
use crate::model::{latest, Entry};
use crate::telemetry::{ensure_described, FETCH_SOURCE_ERRORS_TOTAL};

type FetchResult = anyhow::Result<Option<Entry>>;

/// Fans out to every configured fetcher concurrently and keeps the latest entry.
///
/// A failing fetcher does not cancel the others. The run only fails when every
/// fetcher failed.
#[derive(Clone, Default)]
pub struct SourceAggregator {
    fetchers: Vec<Arc<dyn EntryFetcher>>,
}

impl SourceAggregator {
    pub fn new(fetchers: Vec<Arc<dyn EntryFetcher>>) -> Self {
        Self { fetchers }
    }

    pub fn len(&self) -> usize {
        self.fetchers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fetchers.is_empty()
    }

    pub async fn fetch_all(
        &self,
        cancel: &CancellationToken,
    ) -> Result<Option<Entry>, AnalyzeError> {
        ensure_described();

        if self.fetchers.is_empty() {
            return Ok(None);
        }

        // One slot per fetcher; a task that panics leaves its slot empty.
        let mut slots: Vec<Option<FetchResult>> = self.fetchers.iter().map(|_| None).collect();
        let mut set = JoinSet::new();
        for (idx, fetcher) in self.fetchers.iter().enumerate() {
            let fetcher = Arc::clone(fetcher);
            let cancel = cancel.clone();
            set.spawn(async move {
                let res = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => Err(anyhow!("fetch canceled")),
                    r = fetcher.fetch_latest(&cancel) => r,
                };
                (idx, res)
            });
        }

        while let Some(joined) = set.join_next().await {
            match joined {
                Ok((idx, res)) => slots[idx] = Some(res),
                Err(e) => tracing::warn!(error = %e, "entry fetch task failed"),
            }
        }

        let mut candidates = Vec::with_capacity(slots.len());
        let mut causes = Vec::new();
        for (fetcher, slot) in self.fetchers.iter().zip(slots) {
            let cause = match slot {
                Some(Ok(Some(entry))) => {
                    candidates.push(entry);
                    continue;
                }
                Some(Ok(None)) => continue,
                Some(Err(e)) => format!("{}: {e:#}", fetcher.name()),
                None => format!("{}: fetch task aborted", fetcher.name()),
            };
            counter!(FETCH_SOURCE_ERRORS_TOTAL, "source" => fetcher.name().to_owned()).increment(1);
            causes.push(cause);
        }

        if causes.len() == self.fetchers.len() {
            return Err(AnalyzeError::AllSourcesFailed { causes });
        }
        if !causes.is_empty() {
            tracing::warn!(
                failed = causes.len(),
                total = self.fetchers.len(),
                error = %causes.join("; "),
                "some entry fetch operations failed"
            );
        }

        Ok(latest(candidates))
    }
}
