use kwscrape_core::{Error, PrefsStore, Result};
use std::fs;
use std::path::PathBuf;

/// Preferences stored as one flat JSON object (`key -> string`) in `<root>/prefs.json`.
#[derive(Debug, Clone)]
pub struct FsPrefs {
    root: PathBuf,
}

impl FsPrefs {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn path(&self) -> PathBuf {
        self.root.join("prefs.json")
    }

    fn read_all(&self) -> Result<serde_json::Map<String, serde_json::Value>> {
        let p = self.path();
        if !p.exists() {
            return Ok(serde_json::Map::new());
        }
        let bytes = fs::read(&p).map_err(|e| Error::Prefs(e.to_string()))?;
        match serde_json::from_slice::<serde_json::Value>(&bytes) {
            Ok(serde_json::Value::Object(m)) => Ok(m),
            _ => {
                // A corrupt file must not block startup; it is rewritten on the next set.
                tracing::warn!(path = %p.display(), "ignoring unreadable preferences file");
                Ok(serde_json::Map::new())
            }
        }
    }
}

impl PrefsStore for FsPrefs {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let all = self.read_all()?;
        Ok(all.get(key).and_then(|v| v.as_str()).map(|s| s.to_string()))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut all = self.read_all()?;
        all.insert(key.to_string(), serde_json::Value::String(value.to_string()));
        fs::create_dir_all(&self.root).map_err(|e| Error::Prefs(e.to_string()))?;
        let bytes = serde_json::to_vec_pretty(&all).map_err(|e| Error::Prefs(e.to_string()))?;
        fs::write(self.path(), bytes).map_err(|e| Error::Prefs(e.to_string()))
    }
}
