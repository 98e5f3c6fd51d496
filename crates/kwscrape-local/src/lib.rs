use kwscrape_core::{Error, KeywordSet, KeywordSource, Result};
use std::time::Duration;

pub mod config;
pub mod parse;
pub mod prefs;
pub mod retry;
pub mod worker;

pub use config::Endpoints;
pub use prefs::FsPrefs;
pub use retry::{fetch_with_retry, RetryPolicy};
pub use worker::WorkerClient;

/// Default cap on the scraped page body.
pub const DEFAULT_MAX_BYTES: usize = 5_000_000;

/// Shared HTTP client with bounded timeouts.
pub fn http_client() -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent(concat!("kwscrape/", env!("CARGO_PKG_VERSION")))
        .redirect(reqwest::redirect::Policy::limited(10))
        // Avoid "hang forever" on DNS/TLS/body stalls.
        .connect_timeout(Duration::from_secs(10))
        .timeout(Duration::from_secs(30))
        .build()
        .map_err(|e| Error::Fetch(e.to_string()))
}

/// Drop an incomplete UTF-8 sequence left at the end of `bytes` by a byte cap.
fn trim_partial_char(bytes: &mut Vec<u8>) {
    let len = bytes.len();
    for back in 1..=len.min(4) {
        let b = bytes[len - back];
        if b & 0xC0 == 0x80 {
            continue;
        }
        let width = match b {
            0x00..=0x7F => 1,
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            _ => 4,
        };
        if back < width {
            bytes.truncate(len - back);
        }
        return;
    }
}

/// Fetches the keyword blog page (through the CORS proxy) and parses it.
#[derive(Debug, Clone)]
pub struct ScrapeSource {
    client: reqwest::Client,
    url: String,
    retry: RetryPolicy,
    max_bytes: usize,
}

impl ScrapeSource {
    pub fn new(client: reqwest::Client, endpoints: &Endpoints) -> Self {
        Self {
            client,
            url: endpoints.scrape_url(),
            retry: RetryPolicy::default(),
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_max_bytes(mut self, max_bytes: usize) -> Self {
        self.max_bytes = max_bytes;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Raw page HTML. Bodies larger than `max_bytes` are cut off at a character boundary.
    pub async fn fetch_html(&self) -> Result<String> {
        url::Url::parse(&self.url).map_err(|e| Error::InvalidUrl(e.to_string()))?;
        let t0 = std::time::Instant::now();
        let resp = fetch_with_retry(&self.retry, || self.client.get(&self.url)).await?;
        let status = resp.status();
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                context: "Failed to load web keywords".to_string(),
            });
        }

        let mut bytes = Vec::new();
        let mut stream = resp.bytes_stream();
        use futures_util::StreamExt;
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(|e| Error::Fetch(e.to_string()))?;
            if bytes.len().saturating_add(chunk.len()) > self.max_bytes {
                let can_take = self.max_bytes.saturating_sub(bytes.len());
                bytes.extend_from_slice(&chunk[..can_take]);
                trim_partial_char(&mut bytes);
                tracing::warn!(max_bytes = self.max_bytes, "scraped page truncated");
                break;
            }
            bytes.extend_from_slice(&chunk);
        }
        tracing::debug!(
            bytes = bytes.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "fetched keyword page"
        );
        Ok(String::from_utf8_lossy(&bytes).to_string())
    }
}

#[async_trait::async_trait]
impl KeywordSource for ScrapeSource {
    async fn fetch_keywords(&self) -> Result<KeywordSet> {
        let html = self
            .fetch_html()
            .await
            .map_err(|e| Error::Scrape(e.to_string()))?;
        Ok(parse::parse_keywords(&html))
    }
}
