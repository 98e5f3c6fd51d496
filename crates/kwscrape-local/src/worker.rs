//! Client for the small key-value worker that stores the user keyword set.

use crate::config::Endpoints;
use crate::retry::{fetch_with_retry, RetryPolicy};
use kwscrape_core::{Error, KeywordBackend, KeywordSet, RemoteLoad, Result};

/// Max chars of a non-JSON body kept for diagnostics.
pub const PREVIEW_CHARS: usize = 500;

/// First `max_chars` characters of `body`.
pub fn preview(body: &str, max_chars: usize) -> String {
    body.chars().take(max_chars).collect()
}

#[derive(Debug, Clone)]
pub struct WorkerClient {
    client: reqwest::Client,
    get_url: String,
    save_url: String,
    retry: RetryPolicy,
}

impl WorkerClient {
    pub fn new(client: reqwest::Client, endpoints: &Endpoints) -> Self {
        Self {
            client,
            get_url: endpoints.worker_get_url.clone(),
            save_url: endpoints.worker_save_url.clone(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

fn is_json(resp: &reqwest::Response) -> bool {
    resp.headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("application/json"))
}

#[async_trait::async_trait]
impl KeywordBackend for WorkerClient {
    async fn load(&self) -> Result<RemoteLoad> {
        let resp = fetch_with_retry(&self.retry, || self.client.get(&self.get_url)).await?;
        let status = resp.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Ok(RemoteLoad::NotFound);
        }
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                context: "Failed to load saved keywords".to_string(),
            });
        }
        if !is_json(&resp) {
            let body = resp.text().await.unwrap_or_default();
            return Err(Error::Malformed {
                preview: preview(&body, PREVIEW_CHARS),
            });
        }
        let bytes = resp.bytes().await.map_err(|e| Error::Fetch(e.to_string()))?;
        let set: KeywordSet = serde_json::from_slice(&bytes)
            .map_err(|e| Error::Fetch(format!("invalid keyword JSON: {e}")))?;
        tracing::debug!(categories = set.len(), "loaded user keywords");
        Ok(RemoteLoad::Found(set))
    }

    async fn save(&self, set: &KeywordSet) -> Result<()> {
        let resp = self
            .client
            .post(&self.save_url)
            .json(set)
            .send()
            .await
            .map_err(|e| Error::Persist(e.to_string()))?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Persist(format!(
                "Server responded with {}",
                status.as_u16()
            )));
        }
        tracing::debug!(categories = set.len(), "saved user keywords");
        Ok(())
    }
}
