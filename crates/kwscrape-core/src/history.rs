use serde::{Deserialize, Serialize};

pub const MAX_HISTORY: usize = 30;

/// Most-recent-first log of submitted search queries.
///
/// Entries are unique case-insensitively and the log never holds more than
/// [`MAX_HISTORY`] entries.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchHistoryLog {
    entries: Vec<String>,
}

impl SearchHistoryLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate from the persisted JSON array. Anything unparseable is an empty log.
    pub fn from_json_lenient(raw: Option<&str>) -> Self {
        let Some(raw) = raw else {
            return Self::new();
        };
        match serde_json::from_str::<Vec<String>>(raw) {
            Ok(entries) => {
                // Re-insert oldest first so a hand-edited file still honors the invariants.
                let mut log = Self::new();
                for e in entries.iter().rev() {
                    log.add(e);
                }
                log
            }
            Err(e) => {
                tracing::debug!("ignoring unparseable search history: {e}");
                Self::new()
            }
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(&self.entries).unwrap_or_else(|_| "[]".to_string())
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Record `query` as the most recent entry. Returns `true` if the log changed.
    pub fn add(&mut self, query: &str) -> bool {
        let query = query.trim();
        if query.is_empty() {
            return false;
        }
        let lc = query.to_lowercase();
        self.entries.retain(|e| e.to_lowercase() != lc);
        self.entries.insert(0, query.to_string());
        self.entries.truncate(MAX_HISTORY);
        true
    }

    /// Remove entries equal to `query` (case-sensitive). Returns `true` if any were removed.
    pub fn remove(&mut self, query: &str) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e != query);
        self.entries.len() != before
    }

    /// Entries containing `prefix` case-insensitively, in log order.
    pub fn filtered(&self, prefix: &str) -> Vec<&str> {
        let needle = prefix.to_lowercase();
        self.entries
            .iter()
            .filter(|e| needle.is_empty() || e.to_lowercase().contains(&needle))
            .map(|e| e.as_str())
            .collect()
    }
}
