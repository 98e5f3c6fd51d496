//! Terminal/JSON rendering of a filtered keyword view.

use kwscrape_core::{KeywordSet, KeywordStore, SearchQuery};
use serde::Serialize;

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RenderedKeyword {
    pub text: String,
    /// User-owned keywords are the removable ones.
    pub user: bool,
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RenderedCategory {
    pub name: String,
    pub selected: bool,
    pub keywords: Vec<RenderedKeyword>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RenderedView {
    pub schema_version: u32,
    pub kind: &'static str,
    pub query: String,
    pub selected_category: Option<String>,
    pub dark_mode: bool,
    pub categories: Vec<RenderedCategory>,
    pub diagnostic: String,
}

pub struct ViewContext<'a> {
    pub store: &'a KeywordStore,
    pub query: &'a SearchQuery,
    pub selected: Option<&'a str>,
    pub dark_mode: bool,
    pub diagnostic: &'a str,
}

pub fn build(view: &KeywordSet, ctx: &ViewContext<'_>) -> RenderedView {
    let categories = view
        .iter()
        .map(|(name, keywords)| RenderedCategory {
            name: name.to_string(),
            selected: ctx.selected == Some(name),
            keywords: keywords
                .iter()
                .map(|k| RenderedKeyword {
                    text: k.clone(),
                    user: ctx.store.is_user_keyword(name, k),
                })
                .collect(),
        })
        .collect();
    RenderedView {
        schema_version: 1,
        kind: "keyword_view",
        query: ctx.query.as_str().to_string(),
        selected_category: ctx.selected.map(str::to_string),
        dark_mode: ctx.dark_mode,
        categories,
        diagnostic: ctx.diagnostic.to_string(),
    }
}

pub fn to_text(view: &RenderedView) -> String {
    let mut out = String::new();
    if view.categories.is_empty() {
        if view.query.is_empty() {
            out.push_str("(no keywords)\n");
        } else {
            out.push_str(&format!("(no keywords match \"{}\")\n", view.query));
        }
        return out;
    }
    for c in &view.categories {
        let marker = if c.selected { "*" } else { " " };
        out.push_str(&format!("{marker} {} ({})\n", c.name, c.keywords.len()));
        for k in &c.keywords {
            if k.user {
                out.push_str(&format!("    {}  [user]\n", k.text));
            } else {
                out.push_str(&format!("    {}\n", k.text));
            }
        }
    }
    out
}
