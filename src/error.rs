// src/error.rs
use thiserror::Error;

/// Errors that abort an analysis run. Everything else degrades to a warning.
#[derive(Debug, Error)]
pub enum AnalyzeError {
    /// The lock service call itself failed.
    #[error("lock service request failed: {0:#}")]
    LockTransport(anyhow::Error),

    /// Another run already holds today's lock.
    #[error("analysis already running: lock {lock_id} is held")]
    LockContended { lock_id: String },

    /// Every configured fetcher errored.
    #[error("all entry fetch operations failed: {}", .causes.join("; "))]
    AllSourcesFailed { causes: Vec<String> },
}

impl AnalyzeError {
    pub fn is_contention(&self) -> bool {
        matches!(self, AnalyzeError::LockContended { .. })
    }
}
