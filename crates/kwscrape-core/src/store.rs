use crate::KeywordSet;

/// Scraped keywords plus user-owned keywords.
///
/// The store performs no IO. Mutating commands report whether the user set changed so
/// the caller can persist it.
#[derive(Debug, Clone, Default)]
pub struct KeywordStore {
    remote: KeywordSet,
    user: KeywordSet,
}

impl KeywordStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn remote(&self) -> &KeywordSet {
        &self.remote
    }

    pub fn user(&self) -> &KeywordSet {
        &self.user
    }

    pub fn set_remote(&mut self, set: KeywordSet) {
        self.remote = set;
    }

    pub fn set_user(&mut self, set: KeywordSet) {
        self.user = set;
    }

    /// Add a user keyword. Returns `true` when the user set changed and must be persisted.
    ///
    /// Empty keywords and a missing category are ignored.
    pub fn add_user_keyword(&mut self, category: Option<&str>, keyword: &str) -> bool {
        let keyword = keyword.trim();
        let Some(category) = category.filter(|c| !c.is_empty()) else {
            return false;
        };
        if keyword.is_empty() {
            return false;
        }
        self.user.push_keyword(category, keyword)
    }

    /// Remove a user keyword. Returns `true` when the user set changed.
    pub fn remove_user_keyword(&mut self, category: &str, keyword: &str) -> bool {
        self.user.remove_keyword(category, keyword)
    }

    /// Whether `keyword` under `category` is user-owned (and therefore removable).
    pub fn is_user_keyword(&self, category: &str, keyword: &str) -> bool {
        self.user.contains_keyword(category, keyword)
    }

    /// Union of remote and user keywords: remote order first, then user keywords that
    /// the remote list does not already contain.
    pub fn merged(&self) -> KeywordSet {
        let mut entries: Vec<(String, Vec<String>)> = self
            .remote
            .iter()
            .map(|(c, v)| (c.to_string(), v.to_vec()))
            .collect();
        for (category, keywords) in self.user.iter() {
            match entries.iter_mut().find(|(c, _)| c == category) {
                Some((_, existing)) => {
                    for k in keywords {
                        if !existing.contains(k) {
                            existing.push(k.clone());
                        }
                    }
                }
                None => entries.push((category.to_string(), keywords.to_vec())),
            }
        }
        entries.into_iter().collect()
    }
}
