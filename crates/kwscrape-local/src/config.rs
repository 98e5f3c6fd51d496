//! Endpoint configuration.
//!
//! Every value can be overridden through the environment; blank values count as unset.

use kwscrape_core::{Error, Result};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left as-is by a JavaScript `encodeURIComponent`.
const URI_COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

pub const DEFAULT_WORKER_GET_URL: &str =
    "https://rewards-keyword-worker.sumitomo0210.workers.dev/get";
pub const DEFAULT_WORKER_SAVE_URL: &str =
    "https://rewards-keyword-worker.sumitomo0210.workers.dev/save";
pub const DEFAULT_BLOG_URL: &str =
    "https://yoshizo.hatenablog.com/entry/microsoft-rewards-search-keyword-list/";
pub const DEFAULT_PROXY_URL: &str = "https://api.allorigins.win/raw?url=";

pub fn env_nonempty(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub worker_get_url: String,
    pub worker_save_url: String,
    /// Page the keyword lists are scraped from.
    pub blog_url: String,
    /// CORS proxy prefix; the percent-encoded blog URL is appended. Empty fetches directly.
    pub proxy_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            worker_get_url: DEFAULT_WORKER_GET_URL.to_string(),
            worker_save_url: DEFAULT_WORKER_SAVE_URL.to_string(),
            blog_url: DEFAULT_BLOG_URL.to_string(),
            proxy_url: DEFAULT_PROXY_URL.to_string(),
        }
    }
}

impl Endpoints {
    pub fn from_env() -> Self {
        let d = Self::default();
        Self {
            worker_get_url: env_nonempty("KWSCRAPE_WORKER_GET_URL").unwrap_or(d.worker_get_url),
            worker_save_url: env_nonempty("KWSCRAPE_WORKER_SAVE_URL")
                .unwrap_or(d.worker_save_url),
            blog_url: env_nonempty("KWSCRAPE_BLOG_URL").unwrap_or(d.blog_url),
            // An explicitly empty proxy is meaningful (direct fetch), so only unset falls back.
            proxy_url: std::env::var("KWSCRAPE_PROXY_URL")
                .map(|s| s.trim().to_string())
                .unwrap_or(d.proxy_url),
        }
    }

    /// Reject blank endpoints (possible through explicit CLI overrides). The proxy prefix
    /// may be empty.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("worker get URL", &self.worker_get_url),
            ("worker save URL", &self.worker_save_url),
            ("blog URL", &self.blog_url),
        ] {
            if value.trim().is_empty() {
                return Err(Error::NotConfigured(name.to_string()));
            }
        }
        Ok(())
    }

    /// URL actually requested for the scrape: `proxy_url` + `blog_url` encoded as a URI
    /// component.
    pub fn scrape_url(&self) -> String {
        if self.proxy_url.is_empty() {
            return self.blog_url.clone();
        }
        format!(
            "{}{}",
            self.proxy_url,
            utf8_percent_encode(&self.blog_url, URI_COMPONENT)
        )
    }
}
