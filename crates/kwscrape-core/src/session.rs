//! Application state for one browsing session.
//!
//! A `Session` owns the keyword store, the preferences (dark mode + search history), the
//! current category selection, and the diagnostic text describing the last remote load.
//! Front ends hold the only reference and drive it through the command methods below.

use crate::prefs::Preferences;
use crate::{
    Error, KeywordBackend, KeywordSet, KeywordSource, KeywordStore, PrefsStore, RemoteLoad,
    Result, SearchQuery,
};

pub const NOT_FOUND_DIAGNOSTIC: &str = "No data found on server (404).";

fn diagnostic_for_load(load: &Result<RemoteLoad>) -> String {
    match load {
        Ok(RemoteLoad::Found(set)) => {
            serde_json::to_string_pretty(set).unwrap_or_else(|e| format!("<unprintable: {e}>"))
        }
        Ok(RemoteLoad::NotFound) => NOT_FOUND_DIAGNOSTIC.to_string(),
        Err(Error::Malformed { preview }) => {
            format!("Server returned non-JSON response:\n{preview}...")
        }
        Err(e) => format!("Error connecting to keyword server: {e}"),
    }
}

#[derive(Debug, Clone, Default)]
pub struct Session {
    store: KeywordStore,
    prefs: Preferences,
    selected: Option<String>,
    diagnostic: String,
}

impl Session {
    pub fn new(prefs: Preferences) -> Self {
        Self {
            prefs,
            ..Default::default()
        }
    }

    /// Load preferences, then fetch the scraped set and the user set concurrently.
    ///
    /// A scrape failure fails initialization. A remote-load failure leaves the user set
    /// empty and is only recorded in [`Session::diagnostic`].
    pub async fn initialize(
        source: &dyn KeywordSource,
        backend: &dyn KeywordBackend,
        prefs_store: &dyn PrefsStore,
    ) -> Result<Self> {
        let prefs = Preferences::load(prefs_store).unwrap_or_else(|e| {
            tracing::warn!("preferences unavailable, using defaults: {e}");
            Preferences::default()
        });
        let mut session = Session::new(prefs);

        let (scraped, loaded) = tokio::join!(source.fetch_keywords(), backend.load());

        session.diagnostic = diagnostic_for_load(&loaded);
        match loaded {
            Ok(RemoteLoad::Found(set)) => session.store.set_user(set),
            Ok(RemoteLoad::NotFound) => {}
            Err(e) => tracing::warn!("user keywords unavailable: {e}"),
        }

        let remote = scraped.map_err(|e| match e {
            Error::Scrape(_) => e,
            other => Error::Scrape(other.to_string()),
        })?;
        tracing::debug!(
            categories = remote.len(),
            keywords = remote.keyword_count(),
            "scraped keyword set"
        );
        session.store.set_remote(remote);
        session.reconcile_selection();
        Ok(session)
    }

    pub fn store(&self) -> &KeywordStore {
        &self.store
    }

    /// Text describing the outcome of the remote load (pretty JSON, 404 notice, or error).
    pub fn diagnostic(&self) -> &str {
        &self.diagnostic
    }

    pub fn dark_mode(&self) -> bool {
        self.prefs.dark_mode
    }

    pub fn selected_category(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn categories(&self) -> Vec<String> {
        self.store.merged().categories().map(str::to_string).collect()
    }

    /// Keep a still-valid selection, otherwise fall back to the first category.
    fn reconcile_selection(&mut self) {
        let merged = self.store.merged();
        let valid = self
            .selected
            .as_deref()
            .is_some_and(|c| merged.contains_category(c));
        if !valid {
            self.selected = merged.categories().next().map(str::to_string);
        }
    }

    /// Select a category of the merged view. Unknown names are rejected.
    pub fn select_category(&mut self, category: &str) -> bool {
        if !self.store.merged().contains_category(category) {
            return false;
        }
        self.selected = Some(category.to_string());
        true
    }

    /// Merged view narrowed by `query`.
    pub fn view(&self, query: &SearchQuery) -> KeywordSet {
        query.apply(&self.store.merged())
    }

    async fn persist(&self, backend: &dyn KeywordBackend) -> Result<()> {
        backend.save(self.store.user()).await.map_err(|e| match e {
            Error::Persist(_) => e,
            other => Error::Persist(other.to_string()),
        })
    }

    /// Add `keyword` to the selected category and persist the user set.
    ///
    /// Returns `Ok(false)` when nothing changed (empty keyword, no selection, duplicate).
    /// The local change is kept even if persisting fails.
    pub async fn add_keyword(&mut self, backend: &dyn KeywordBackend, keyword: &str) -> Result<bool> {
        if self.selected.is_none() {
            tracing::warn!("no category selected; keyword not added");
        }
        let changed = self
            .store
            .add_user_keyword(self.selected.as_deref(), keyword);
        if !changed {
            return Ok(false);
        }
        self.reconcile_selection();
        self.persist(backend).await?;
        Ok(true)
    }

    /// Remove a user keyword and persist the user set. The local change is kept even if
    /// persisting fails.
    pub async fn remove_keyword(
        &mut self,
        backend: &dyn KeywordBackend,
        category: &str,
        keyword: &str,
    ) -> Result<bool> {
        if !self.store.remove_user_keyword(category, keyword) {
            return Ok(false);
        }
        self.reconcile_selection();
        self.persist(backend).await?;
        Ok(true)
    }

    /// Explicitly push the current user set to the remote store.
    pub async fn save(&self, backend: &dyn KeywordBackend) -> Result<()> {
        self.persist(backend).await
    }

    /// Normalize `raw` into a query and record it in the history.
    pub fn submit_search(&mut self, prefs_store: &dyn PrefsStore, raw: &str) -> Result<SearchQuery> {
        if self.prefs.history.add(raw) {
            self.prefs.save_history(prefs_store)?;
        }
        Ok(SearchQuery::new(raw))
    }

    pub fn remove_history(&mut self, prefs_store: &dyn PrefsStore, query: &str) -> Result<bool> {
        if !self.prefs.history.remove(query) {
            return Ok(false);
        }
        self.prefs.save_history(prefs_store)?;
        Ok(true)
    }

    pub fn history(&self, prefix: &str) -> Vec<&str> {
        self.prefs.history.filtered(prefix)
    }

    /// Flip dark mode and persist it. Returns the new value.
    pub fn toggle_dark_mode(&mut self, prefs_store: &dyn PrefsStore) -> Result<bool> {
        self.prefs.dark_mode = !self.prefs.dark_mode;
        self.prefs.save_dark_mode(prefs_store)?;
        Ok(self.prefs.dark_mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryPrefs;
    use std::sync::Mutex;

    struct FixedSource(Option<KeywordSet>);

    #[async_trait::async_trait]
    impl KeywordSource for FixedSource {
        async fn fetch_keywords(&self) -> Result<KeywordSet> {
            self.0
                .clone()
                .ok_or_else(|| Error::Fetch("HTTP 503".to_string()))
        }
    }

    struct FakeBackend {
        load: fn() -> Result<RemoteLoad>,
        fail_save: bool,
        saved: Mutex<Vec<KeywordSet>>,
    }

    impl FakeBackend {
        fn new(load: fn() -> Result<RemoteLoad>) -> Self {
            Self {
                load,
                fail_save: false,
                saved: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait::async_trait]
    impl KeywordBackend for FakeBackend {
        async fn load(&self) -> Result<RemoteLoad> {
            (self.load)()
        }

        async fn save(&self, set: &KeywordSet) -> Result<()> {
            if self.fail_save {
                return Err(Error::Persist("Server responded with 500".to_string()));
            }
            self.saved.lock().unwrap().push(set.clone());
            Ok(())
        }
    }

    fn scraped() -> KeywordSet {
        [
            ("Food".to_string(), vec!["Sushi".to_string()]),
            ("Travel".to_string(), vec!["Kyoto".to_string()]),
        ]
        .into_iter()
        .collect()
    }

    fn user_found() -> Result<RemoteLoad> {
        let mut set = KeywordSet::new();
        set.push_keyword("Food", "Ramen");
        Ok(RemoteLoad::Found(set))
    }

    #[tokio::test]
    async fn remote_404_leaves_user_set_empty_and_still_initializes() {
        let backend = FakeBackend::new(|| Ok(RemoteLoad::NotFound));
        let s = Session::initialize(&FixedSource(Some(scraped())), &backend, &MemoryPrefs::new())
            .await
            .unwrap();
        assert!(s.store().user().is_empty());
        assert_eq!(s.diagnostic(), "No data found on server (404).");
        assert_eq!(s.selected_category(), Some("Food"));
    }

    #[tokio::test]
    async fn found_user_set_is_merged_and_pretty_printed() {
        let backend = FakeBackend::new(user_found);
        let s = Session::initialize(&FixedSource(Some(scraped())), &backend, &MemoryPrefs::new())
            .await
            .unwrap();
        assert_eq!(s.view(&SearchQuery::default()).get("Food").unwrap(), ["Sushi", "Ramen"]);
        assert_eq!(s.diagnostic(), "{\n  \"Food\": [\n    \"Ramen\"\n  ]\n}");
    }

    #[tokio::test]
    async fn remote_load_errors_degrade_gracefully() {
        let backend = FakeBackend::new(|| {
            Err(Error::Malformed {
                preview: "<html>oops".to_string(),
            })
        });
        let s = Session::initialize(&FixedSource(Some(scraped())), &backend, &MemoryPrefs::new())
            .await
            .unwrap();
        assert_eq!(
            s.diagnostic(),
            "Server returned non-JSON response:\n<html>oops..."
        );

        let backend = FakeBackend::new(|| Err(Error::Fetch("connection refused".to_string())));
        let s = Session::initialize(&FixedSource(Some(scraped())), &backend, &MemoryPrefs::new())
            .await
            .unwrap();
        assert!(s
            .diagnostic()
            .starts_with("Error connecting to keyword server: fetch failed"));
        assert!(s.store().user().is_empty());
    }

    #[tokio::test]
    async fn scrape_failure_is_fatal() {
        let backend = FakeBackend::new(user_found);
        let err = Session::initialize(&FixedSource(None), &backend, &MemoryPrefs::new())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Scrape(_)));
        assert!(err
            .to_string()
            .starts_with("Error fetching web keywords (CORS or Network):"));
    }

    #[tokio::test]
    async fn add_and_remove_persist_the_user_set() {
        let backend = FakeBackend::new(|| Ok(RemoteLoad::NotFound));
        let mut s = Session::initialize(&FixedSource(Some(scraped())), &backend, &MemoryPrefs::new())
            .await
            .unwrap();
        assert!(s.select_category("Travel"));
        assert!(!s.select_category("Nope"));

        assert!(s.add_keyword(&backend, "Nara").await.unwrap());
        assert!(!s.add_keyword(&backend, "Nara").await.unwrap());
        assert!(!s.add_keyword(&backend, "  ").await.unwrap());
        assert!(s.remove_keyword(&backend, "Travel", "Nara").await.unwrap());
        assert!(!s.remove_keyword(&backend, "Travel", "Kyoto").await.unwrap());

        let saved = backend.saved.lock().unwrap();
        assert_eq!(saved.len(), 2);
        assert_eq!(saved[0].get("Travel").unwrap(), ["Nara"]);
        assert!(saved[1].is_empty());
    }

    #[tokio::test]
    async fn failed_save_keeps_local_change() {
        let mut backend = FakeBackend::new(|| Ok(RemoteLoad::NotFound));
        backend.fail_save = true;
        let mut s = Session::initialize(&FixedSource(Some(scraped())), &backend, &MemoryPrefs::new())
            .await
            .unwrap();
        let err = s.add_keyword(&backend, "Udon").await.unwrap_err();
        assert!(matches!(err, Error::Persist(_)));
        assert!(s.store().is_user_keyword("Food", "Udon"));
    }

    #[tokio::test]
    async fn selection_moves_when_its_category_disappears() {
        let backend = FakeBackend::new(|| {
            let mut set = KeywordSet::new();
            set.push_keyword("Mine", "x");
            Ok(RemoteLoad::Found(set))
        });
        let mut s = Session::initialize(&FixedSource(Some(scraped())), &backend, &MemoryPrefs::new())
            .await
            .unwrap();
        assert!(s.select_category("Mine"));
        assert!(s.remove_keyword(&backend, "Mine", "x").await.unwrap());
        assert_eq!(s.selected_category(), Some("Food"));
        assert_eq!(s.categories(), vec!["Food", "Travel"]);
    }

    #[tokio::test]
    async fn without_categories_nothing_is_selected_or_added() {
        let backend = FakeBackend::new(|| Ok(RemoteLoad::NotFound));
        let mut s = Session::initialize(
            &FixedSource(Some(KeywordSet::new())),
            &backend,
            &MemoryPrefs::new(),
        )
        .await
        .unwrap();
        assert_eq!(s.selected_category(), None);
        assert!(!s.add_keyword(&backend, "orphan").await.unwrap());
        assert!(backend.saved.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_and_theme_are_persisted() {
        let prefs = MemoryPrefs::new();
        let backend = FakeBackend::new(|| Ok(RemoteLoad::NotFound));
        let mut s = Session::initialize(&FixedSource(Some(scraped())), &backend, &prefs)
            .await
            .unwrap();

        let q = s.submit_search(&prefs, "  Sushi ").unwrap();
        assert_eq!(q.as_str(), "sushi");
        assert_eq!(s.view(&q).get("Food").unwrap(), ["Sushi"]);
        assert!(s.toggle_dark_mode(&prefs).unwrap());

        let again = Session::initialize(&FixedSource(Some(scraped())), &backend, &prefs)
            .await
            .unwrap();
        assert!(again.dark_mode());
        assert_eq!(again.history(""), vec!["Sushi"]);

        assert!(s.remove_history(&prefs, "Sushi").unwrap());
        assert!(!s.remove_history(&prefs, "Sushi").unwrap());
        assert!(Preferences::load(&prefs).unwrap().history.is_empty());
    }
}
