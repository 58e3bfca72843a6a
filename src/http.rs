// src/http.rs
//! Shared HTTP client construction and the bounded-retry send loop used by
//! the feed, lock and webhook adapters.

use anyhow::{bail, Context, Result};
use reqwest::{Client, RequestBuilder, Response};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const DEFAULT_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_MAX_ATTEMPTS: u8 = 3;

/// Build the process-wide client. Constructed once in `main` and cloned into adapters.
pub fn build_client(timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .user_agent(concat!("keeput-analyzer/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building http client")
}

/// 500ms, 1s, 2s, ...
pub fn backoff(attempt: u8) -> Duration {
    Duration::from_millis(500u64 << attempt.saturating_sub(1).min(6))
}

/// Sends the request built by `make`, retrying transport errors and 5xx responses
/// up to `max_attempts` in total. Aborts promptly once `cancel` fires.
pub async fn send_with_retry<F>(
    mut make: F,
    max_attempts: u8,
    cancel: &CancellationToken,
) -> Result<Response>
where
    F: FnMut() -> RequestBuilder,
{
    let max_attempts = max_attempts.max(1);
    let mut attempt: u8 = 0;
    loop {
        attempt += 1;
        let res = tokio::select! {
            biased;
            _ = cancel.cancelled() => bail!("request canceled"),
            r = make().send() => r,
        };

        match res {
            Ok(rsp) if rsp.status().is_server_error() && attempt < max_attempts => {
                tracing::debug!(status = %rsp.status(), attempt, "retrying after server error");
            }
            Ok(rsp) => return Ok(rsp),
            Err(e) if attempt < max_attempts => {
                tracing::debug!(error = %e, attempt, "retrying after transport error");
            }
            Err(e) => return Err(e).context(format!("request failed after {attempt} attempt(s)")),
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => bail!("request canceled"),
            _ = tokio::time::sleep(backoff(attempt)) => {}
        }
    }
}
