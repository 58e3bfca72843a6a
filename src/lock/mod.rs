// src/lock/mod.rs
//! Day-scoped mutual exclusion held in an external lock service.
//!
//! The service is advisory: `acquire` returning `true` is a best-effort claim,
//! not a linearizable guarantee.

pub mod http;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::FutureExt;
use metrics::counter;
use std::fmt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::date;
use crate::error::AnalyzeError;
use crate::telemetry::{ensure_described, LOCK_CONTENDED_TOTAL};

pub const LOCK_ID_PREFIX_ANALYZE: &str = "usecase:analyze";

/// `usecase:analyze:YYYY-MM-DD` for the calendar date of `now`.
pub fn lock_id(now: DateTime<Utc>) -> String {
    format!("{LOCK_ID_PREFIX_ANALYZE}:{}", date::date_key(now))
}

#[async_trait::async_trait]
pub trait Locker: Send + Sync {
    /// `Ok(false)` means someone else holds the lock; `Err` is a transport failure.
    async fn acquire(&self, cancel: &CancellationToken, lock_id: &str) -> Result<bool>;
    async fn release(&self, cancel: &CancellationToken, lock_id: &str) -> Result<()>;
}

/// How many times to try acquiring a contended lock. Transport errors are never retried here.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::single_attempt()
    }
}

impl RetryPolicy {
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 1,
            backoff: Duration::ZERO,
        }
    }

    pub fn bounded(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }
}

/// Proof of a successful acquisition. Hand it back to [`LockCoordinator::release`].
///
/// Dropping it unreleased (the run's future was dropped mid-flight) schedules a
/// release on the current runtime.
#[must_use = "an acquired lock must be released"]
pub struct HeldLock {
    lock_id: String,
    locker: Arc<dyn Locker>,
    released: bool,
}

impl HeldLock {
    pub fn lock_id(&self) -> &str {
        &self.lock_id
    }
}

impl fmt::Debug for HeldLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HeldLock")
            .field("lock_id", &self.lock_id)
            .field("released", &self.released)
            .finish()
    }
}

impl Drop for HeldLock {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        let lock_id = std::mem::take(&mut self.lock_id);
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::warn!(
                    lock_id = %lock_id,
                    "lock handle dropped mid-run, releasing in background"
                );
                let locker = Arc::clone(&self.locker);
                handle.spawn(async move {
                    if let Err(e) = locker.release(&CancellationToken::new(), &lock_id).await {
                        tracing::warn!(
                            lock_id = %lock_id,
                            error = %format!("{e:#}"),
                            "failed to release lock"
                        );
                    }
                });
            }
            Err(_) => {
                tracing::error!(
                    lock_id = %lock_id,
                    "lock handle dropped outside a runtime, lock left held"
                );
            }
        }
    }
}

#[derive(Clone)]
pub struct LockCoordinator {
    locker: Arc<dyn Locker>,
    retry: RetryPolicy,
}

impl LockCoordinator {
    pub fn new(locker: Arc<dyn Locker>) -> Self {
        Self {
            locker,
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub async fn acquire(
        &self,
        cancel: &CancellationToken,
        lock_id: &str,
    ) -> Result<HeldLock, AnalyzeError> {
        ensure_described();

        let mut attempt = 0;
        loop {
            attempt += 1;
            let acquired = self
                .locker
                .acquire(cancel, lock_id)
                .await
                .map_err(AnalyzeError::LockTransport)?;
            if acquired {
                tracing::debug!(lock_id, attempt, "lock acquired");
                return Ok(HeldLock {
                    lock_id: lock_id.to_owned(),
                    locker: Arc::clone(&self.locker),
                    released: false,
                });
            }

            counter!(LOCK_CONTENDED_TOTAL).increment(1);
            if attempt >= self.retry.max_attempts {
                return Err(AnalyzeError::LockContended {
                    lock_id: lock_id.to_owned(),
                });
            }
            tracing::debug!(lock_id, attempt, "lock contended, retrying");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    return Err(AnalyzeError::LockContended { lock_id: lock_id.to_owned() });
                }
                _ = tokio::time::sleep(self.retry.backoff) => {}
            }
        }
    }

    /// Best-effort: failures are logged, never returned.
    ///
    /// Runs on a detached token so a cancelled run still gives the lock back.
    pub async fn release(&self, mut held: HeldLock) {
        let res = self
            .locker
            .release(&CancellationToken::new(), &held.lock_id)
            .await;
        // Set after the call so dropping this future mid-call still leaves the handle to release.
        held.released = true;
        match res {
            Ok(()) => tracing::debug!(lock_id = %held.lock_id, "lock released"),
            Err(e) => tracing::warn!(
                lock_id = %held.lock_id,
                error = %format!("{e:#}"),
                "failed to release lock"
            ),
        }
    }

    /// Acquire `lock_id`, run `body`, then release on every exit path, a panic in `body` included.
    /// Dropping the returned future after acquisition releases through [`HeldLock`]'s drop.
    pub async fn with_lock<T, F, Fut>(
        &self,
        cancel: &CancellationToken,
        lock_id: &str,
        body: F,
    ) -> Result<T, AnalyzeError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AnalyzeError>>,
    {
        let held = self.acquire(cancel, lock_id).await?;
        let outcome = AssertUnwindSafe(body()).catch_unwind().await;
        self.release(held).await;
        match outcome {
            Ok(res) => res,
            Err(payload) => panic::resume_unwind(payload),
        }
    }
}
