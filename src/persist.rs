// src/persist.rs
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio_util::sync::CancellationToken;

use crate::date;
use crate::model::AnalysisReport;

/// Stores the report of a run. Failures are non-fatal to the run.
#[async_trait::async_trait]
pub trait Persister: Send + Sync {
    async fn persist(&self, cancel: &CancellationToken, report: &AnalysisReport) -> Result<()>;
}

/// Writes `<root>/analysis_report/YYYY/MM/DD/HH/MM/SS/data.json`.
///
/// The timestamp is the run's "now", fixed at construction so the path matches
/// the lock key and goal evaluation of the same run.
pub struct FilePersister {
    root: PathBuf,
    now: DateTime<Utc>,
}

impl FilePersister {
    pub fn new(root: impl Into<PathBuf>, now: DateTime<Utc>) -> Self {
        Self {
            root: root.into(),
            now,
        }
    }

    pub fn report_path(&self) -> PathBuf {
        report_path(&self.root, self.now)
    }
}

pub fn report_path(root: &Path, now: DateTime<Utc>) -> PathBuf {
    root.join("analysis_report")
        .join(date::report_path_segment(now))
        .join("data.json")
}

#[async_trait::async_trait]
impl Persister for FilePersister {
    async fn persist(&self, cancel: &CancellationToken, report: &AnalysisReport) -> Result<()> {
        if cancel.is_cancelled() {
            anyhow::bail!("persist canceled");
        }
        let path = self.report_path();
        let bytes = serde_json::to_vec(report).context("serialize analysis report")?;
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .await
                .with_context(|| format!("create {}", dir.display()))?;
        }
        fs::write(&path, bytes)
            .await
            .with_context(|| format!("write {}", path.display()))?;
        tracing::info!(path = %path.display(), "analysis report persisted");
        Ok(())
    }
}
