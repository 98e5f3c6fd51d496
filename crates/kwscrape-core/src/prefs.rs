use crate::{PrefsStore, Result, SearchHistoryLog};
use std::collections::BTreeMap;
use std::sync::Mutex;

pub const DARK_MODE_KEY: &str = "darkMode";
pub const SEARCH_HISTORY_KEY: &str = "searchHistory";

/// UI preferences persisted in local durable storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Preferences {
    pub dark_mode: bool,
    pub history: SearchHistoryLog,
}

impl Preferences {
    /// Read preferences. Missing or malformed values fall back to defaults.
    pub fn load(store: &dyn PrefsStore) -> Result<Self> {
        let dark_mode = store.get(DARK_MODE_KEY)?.as_deref() == Some("true");
        let history = SearchHistoryLog::from_json_lenient(store.get(SEARCH_HISTORY_KEY)?.as_deref());
        Ok(Self { dark_mode, history })
    }

    pub fn save_dark_mode(&self, store: &dyn PrefsStore) -> Result<()> {
        store.set(DARK_MODE_KEY, if self.dark_mode { "true" } else { "false" })
    }

    pub fn save_history(&self, store: &dyn PrefsStore) -> Result<()> {
        store.set(SEARCH_HISTORY_KEY, &self.history.to_json())
    }
}

/// In-process preference storage (tests, `--no-persist` style runs).
#[derive(Debug, Default)]
pub struct MemoryPrefs {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryPrefs {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PrefsStore for MemoryPrefs {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}
