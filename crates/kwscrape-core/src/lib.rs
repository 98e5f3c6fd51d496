use serde::{Deserialize, Serialize};

pub mod history;
pub mod keywords;
pub mod prefs;
pub mod search;
pub mod session;
pub mod store;

pub use history::SearchHistoryLog;
pub use keywords::KeywordSet;
pub use prefs::{MemoryPrefs, Preferences};
pub use search::SearchQuery;
pub use session::Session;
pub use store::KeywordStore;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("fetch failed: {0}")]
    Fetch(String),
    #[error("unexpected HTTP status {status}: {context}")]
    Status { status: u16, context: String },
    /// The remote store answered with something other than JSON.
    #[error("remote store returned a non-JSON response")]
    Malformed { preview: String },
    #[error("error saving keywords: {0}")]
    Persist(String),
    #[error("preferences error: {0}")]
    Prefs(String),
    #[error("Error fetching web keywords (CORS or Network): {0}")]
    Scrape(String),
    #[error("not configured: {0}")]
    NotConfigured(String),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Outcome of a remote store load that reached the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum RemoteLoad {
    Found(KeywordSet),
    /// The server has nothing stored yet (HTTP 404).
    NotFound,
}

/// Produces the remotely curated keyword set (fetch + parse).
#[async_trait::async_trait]
pub trait KeywordSource: Send + Sync {
    async fn fetch_keywords(&self) -> Result<KeywordSet>;
}

/// Small remote key-value store holding the user keyword set.
#[async_trait::async_trait]
pub trait KeywordBackend: Send + Sync {
    async fn load(&self) -> Result<RemoteLoad>;
    async fn save(&self, set: &KeywordSet) -> Result<()>;
}

/// Durable local string storage for UI preferences.
pub trait PrefsStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
}
