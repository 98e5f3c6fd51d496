//! Ordered category → keyword mapping.
//!
//! Category order and keyword order are both significant (document order for scraped
//! sets, insertion order for user sets), so this is a small ordered map rather than a
//! `HashMap`/`BTreeMap`. Sets are tiny (tens of categories), linear lookups are fine.

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    entries: Vec<(String, Vec<String>)>,
}

fn dedup_keep_order(keywords: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(keywords.len());
    for k in keywords {
        if !out.contains(&k) {
            out.push(k);
        }
    }
    out
}

impl KeywordSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total number of keywords across all categories.
    pub fn keyword_count(&self) -> usize {
        self.entries.iter().map(|(_, v)| v.len()).sum()
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(c, _)| c.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.entries.iter().map(|(c, v)| (c.as_str(), v.as_slice()))
    }

    fn position(&self, category: &str) -> Option<usize> {
        self.entries.iter().position(|(c, _)| c == category)
    }

    pub fn get(&self, category: &str) -> Option<&[String]> {
        self.position(category).map(|i| self.entries[i].1.as_slice())
    }

    pub fn contains_category(&self, category: &str) -> bool {
        self.position(category).is_some()
    }

    pub fn contains_keyword(&self, category: &str, keyword: &str) -> bool {
        self.get(category)
            .is_some_and(|kws| kws.iter().any(|k| k == keyword))
    }

    /// Set the keyword list of `category`.
    ///
    /// An existing category keeps its position and has its list replaced; a new one is
    /// appended. Empty category names are ignored and duplicate keywords collapsed.
    pub fn insert_category(&mut self, category: impl Into<String>, keywords: Vec<String>) {
        let category = category.into();
        if category.is_empty() {
            return;
        }
        let keywords = dedup_keep_order(keywords);
        match self.position(&category) {
            Some(i) => self.entries[i].1 = keywords,
            None => self.entries.push((category, keywords)),
        }
    }

    /// Append `keyword` to `category`, creating the category when absent.
    ///
    /// Returns `true` if the keyword was not already present.
    pub fn push_keyword(&mut self, category: &str, keyword: &str) -> bool {
        if category.is_empty() {
            return false;
        }
        let i = match self.position(category) {
            Some(i) => i,
            None => {
                self.entries.push((category.to_string(), Vec::new()));
                self.entries.len() - 1
            }
        };
        let list = &mut self.entries[i].1;
        if list.iter().any(|k| k == keyword) {
            return false;
        }
        list.push(keyword.to_string());
        true
    }

    /// Remove `keyword` from `category`; a category left empty is removed as well.
    ///
    /// Returns `true` if the keyword was present.
    pub fn remove_keyword(&mut self, category: &str, keyword: &str) -> bool {
        let Some(i) = self.position(category) else {
            return false;
        };
        let list = &mut self.entries[i].1;
        let before = list.len();
        list.retain(|k| k != keyword);
        let removed = list.len() != before;
        if list.is_empty() {
            self.entries.remove(i);
        }
        removed
    }
}

impl FromIterator<(String, Vec<String>)> for KeywordSet {
    fn from_iter<I: IntoIterator<Item = (String, Vec<String>)>>(iter: I) -> Self {
        let mut out = KeywordSet::new();
        for (c, v) in iter {
            out.insert_category(c, v);
        }
        out
    }
}

impl Serialize for KeywordSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (c, v) in &self.entries {
            map.serialize_entry(c, v)?;
        }
        map.end()
    }
}

struct KeywordSetVisitor;

impl<'de> Visitor<'de> for KeywordSetVisitor {
    type Value = KeywordSet;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("an object mapping category names to arrays of strings")
    }

    fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
        let mut out = KeywordSet::new();
        while let Some((c, v)) = access.next_entry::<String, Vec<String>>()? {
            out.insert_category(c, v);
        }
        Ok(out)
    }
}

impl<'de> Deserialize<'de> for KeywordSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_map(KeywordSetVisitor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_keeps_category_order() {
        let js = r#"{ "Zebra": ["z"], "Apple": ["a", "b"], "Mango": [] }"#;
        let set: KeywordSet = serde_json::from_str(js).unwrap();
        assert_eq!(
            set.categories().collect::<Vec<_>>(),
            vec!["Zebra", "Apple", "Mango"]
        );
        let back = serde_json::to_string(&set).unwrap();
        assert_eq!(back, r#"{"Zebra":["z"],"Apple":["a","b"],"Mango":[]}"#);
    }

    #[test]
    fn deserialize_enforces_invariants() {
        let js = r#"{ "": ["x"], "A": ["k", "k", "K"] }"#;
        let set: KeywordSet = serde_json::from_str(js).unwrap();
        assert_eq!(set.len(), 1);
        assert_eq!(set.get("A").unwrap(), ["k", "K"]);
    }

    #[test]
    fn rejects_non_string_keywords() {
        assert!(serde_json::from_str::<KeywordSet>(r#"{ "A": [1, 2] }"#).is_err());
        assert!(serde_json::from_str::<KeywordSet>(r#"["A"]"#).is_err());
    }

    #[test]
    fn insert_existing_category_keeps_position() {
        let mut set = KeywordSet::new();
        set.insert_category("A", vec!["1".into()]);
        set.insert_category("B", vec!["2".into()]);
        set.insert_category("A", vec!["3".into()]);
        assert_eq!(set.categories().collect::<Vec<_>>(), vec!["A", "B"]);
        assert_eq!(set.get("A").unwrap(), ["3"]);
    }

    #[test]
    fn remove_last_keyword_drops_category() {
        let mut set = KeywordSet::new();
        assert!(set.push_keyword("A", "x"));
        assert!(!set.push_keyword("A", "x"));
        assert!(set.remove_keyword("A", "x"));
        assert!(!set.contains_category("A"));
        assert!(!set.remove_keyword("A", "x"));
    }
}
