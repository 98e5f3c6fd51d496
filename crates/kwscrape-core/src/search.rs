use crate::KeywordSet;
use serde::{Deserialize, Serialize};

/// Normalized free-text filter (lower-cased, trimmed). Empty means "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchQuery(String);

impl SearchQuery {
    pub fn new(raw: &str) -> Self {
        Self(raw.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    fn matches(&self, text: &str) -> bool {
        text.to_lowercase().contains(&self.0)
    }

    /// Narrow `view` by this query.
    ///
    /// A category whose name matches keeps all of its keywords; otherwise only the
    /// matching keywords are kept, and a category with none is dropped.
    pub fn apply(&self, view: &KeywordSet) -> KeywordSet {
        if self.is_empty() {
            return view.clone();
        }
        let mut out = KeywordSet::new();
        for (category, keywords) in view.iter() {
            if self.matches(category) {
                out.insert_category(category, keywords.to_vec());
                continue;
            }
            let hits: Vec<String> = keywords
                .iter()
                .filter(|k| self.matches(k))
                .cloned()
                .collect();
            if !hits.is_empty() {
                out.insert_category(category, hits);
            }
        }
        out
    }
}
