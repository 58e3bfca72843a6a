// src/lock/http.rs
//! Client for the HTTP lock worker: `POST /acquire` and `POST /release` with
//! `{"lockId": ...}`, answered by `{"msg": "ok" | "ng"}`.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use super::Locker;
use crate::http::{send_with_retry, DEFAULT_MAX_ATTEMPTS};

pub const API_KEY_HEADER: &str = "X-LOCKER-API-KEY";

#[derive(Serialize)]
struct LockRequest<'a> {
    #[serde(rename = "lockId")]
    lock_id: &'a str,
}

#[derive(Debug, Deserialize)]
struct LockResponse {
    msg: String,
}

impl LockResponse {
    fn is_ok(&self) -> bool {
        self.msg == "ok"
    }
}

#[derive(Clone)]
pub struct HttpLocker {
    base_url: String,
    api_key: String,
    client: Client,
    max_attempts: u8,
}

impl HttpLocker {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>, client: Client) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    pub fn with_retries(mut self, attempts: u8) -> Self {
        self.max_attempts = attempts;
        self
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }

    async fn call(
        &self,
        cancel: &CancellationToken,
        path: &str,
        lock_id: &str,
    ) -> Result<LockResponse> {
        let url = self.endpoint(path);
        let body = LockRequest { lock_id };
        let rsp = send_with_retry(
            || {
                self.client
                    .post(&url)
                    .header(API_KEY_HEADER, &self.api_key)
                    .json(&body)
            },
            self.max_attempts,
            cancel,
        )
        .await
        .with_context(|| format!("POST {url}"))?;

        let status = rsp.status();
        if status != StatusCode::OK {
            let text = rsp.text().await.unwrap_or_default();
            return Err(anyhow!(
                "lock service {path}: unexpected status code {status}, body {text}"
            ));
        }
        rsp.json::<LockResponse>()
            .await
            .with_context(|| format!("decoding lock service {path} response"))
    }
}

#[async_trait]
impl Locker for HttpLocker {
    async fn acquire(&self, cancel: &CancellationToken, lock_id: &str) -> Result<bool> {
        Ok(self.call(cancel, "acquire", lock_id).await?.is_ok())
    }

    async fn release(&self, cancel: &CancellationToken, lock_id: &str) -> Result<()> {
        let rsp = self.call(cancel, "release", lock_id).await?;
        if !rsp.is_ok() {
            return Err(anyhow!("lock service refused release of {lock_id}: {}", rsp.msg));
        }
        Ok(())
    }
}
