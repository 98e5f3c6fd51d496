//! Keyword extraction from the scraped blog page.
//!
//! Every `<h3>` names a category; the first `<ul>` found among the following siblings
//! (before the next `<h3>`) holds its keywords, one `<li>` per entry. Entries are run
//! through an ordered chain of extraction strategies and the first one that applies wins.

use html_scraper::{ElementRef, Html, Selector};
use kwscrape_core::KeywordSet;

const OPEN_PARENS: [char; 2] = ['(', '（'];
const CLOSE_PARENS: [char; 2] = [')', '）'];
const QUOTE_PAIRS: [(char, char); 2] = [('「', '」'), ('『', '』')];
const COMMAS: [char; 2] = [',', '、'];

/// What the extraction chain produced for one list item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Extraction {
    /// Bracket-quoted spans, delimiters included.
    Quoted(Vec<String>),
    /// Comma-separated fragments with list markers stripped.
    Fragments(Vec<String>),
}

impl Extraction {
    pub fn into_keywords(self) -> Vec<String> {
        match self {
            Extraction::Quoted(v) | Extraction::Fragments(v) => v,
        }
    }
}

type Strategy = fn(&str) -> Option<Extraction>;

/// Tried in order; the first strategy returning `Some` decides the item.
const STRATEGIES: [Strategy; 2] = [quoted_spans, comma_fragments];

fn is_line_break(c: char) -> bool {
    matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}')
}

/// Byte range of the first `open … close` segment on a single line, delimiters included.
fn first_delimited(text: &str, opens: &[char], closes: &[char]) -> Option<(usize, usize)> {
    for (start, c) in text.char_indices() {
        if !opens.contains(&c) {
            continue;
        }
        let body = start + c.len_utf8();
        for (off, d) in text[body..].char_indices() {
            if is_line_break(d) {
                break;
            }
            if closes.contains(&d) {
                return Some((start, body + off + d.len_utf8()));
            }
        }
    }
    None
}

/// Trimmed content of the first parenthesized segment (`()` or `（）`).
fn first_paren_content(text: &str) -> Option<&str> {
    let (start, end) = first_delimited(text, &OPEN_PARENS, &CLOSE_PARENS)?;
    let open_len = text[start..].chars().next().map_or(1, char::len_utf8);
    let close_len = text[..end].chars().next_back().map_or(1, char::len_utf8);
    Some(text[start + open_len..end - close_len].trim())
}

fn quoted_spans(text: &str) -> Option<Extraction> {
    let mut spans = Vec::new();
    let mut rest = text;
    loop {
        let next = QUOTE_PAIRS
            .iter()
            .filter_map(|(o, c)| first_delimited(rest, &[*o], &[*c]))
            .min_by_key(|(start, _)| *start);
        let Some((start, end)) = next else { break };
        spans.push(rest[start..end].to_string());
        rest = &rest[end..];
    }
    (!spans.is_empty()).then_some(Extraction::Quoted(spans))
}

fn strip_number_prefix(s: &str) -> &str {
    let digits = s.len() - s.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    if digits == 0 {
        return s;
    }
    match s[digits..].strip_prefix('.') {
        Some(rest) => rest.trim_start(),
        None => s,
    }
}

fn strip_dash_prefix(s: &str) -> &str {
    let rest = s.trim_start_matches('-');
    if rest.len() == s.len() {
        return s;
    }
    rest.trim_start()
}

fn comma_fragments(text: &str) -> Option<Extraction> {
    let text = first_paren_content(text).unwrap_or(text);
    let parts = text
        .split(|c: char| COMMAS.contains(&c))
        .filter_map(|frag| {
            let frag = strip_number_prefix(frag.trim());
            let frag = strip_dash_prefix(frag).trim();
            (!frag.is_empty()).then(|| frag.to_string())
        })
        .collect();
    Some(Extraction::Fragments(parts))
}

/// Run the extraction chain over one list item's text.
pub fn extract_item(text: &str) -> Extraction {
    let text = text.trim();
    STRATEGIES
        .iter()
        .find_map(|strategy| strategy(text))
        .unwrap_or(Extraction::Fragments(Vec::new()))
}

/// Category name for a heading: the first parenthesized segment if present, else the
/// whole heading text.
pub fn category_name(heading_text: &str) -> Option<String> {
    let text = heading_text.trim();
    let name = match first_paren_content(text) {
        Some(inner) if !inner.is_empty() => inner,
        _ => text,
    };
    (!name.is_empty()).then(|| name.to_string())
}

fn element_text(el: &ElementRef) -> String {
    el.text().collect::<String>()
}

fn find_list<'a>(heading: ElementRef<'a>, ul: &Selector) -> Option<ElementRef<'a>> {
    for node in heading.next_siblings() {
        let Some(el) = ElementRef::wrap(node) else {
            continue;
        };
        match el.value().name() {
            "ul" => return Some(el),
            "h3" => return None,
            _ => {}
        }
        if let Some(nested) = el.select(ul).next() {
            return Some(nested);
        }
    }
    None
}

/// Parse a blog page into categories and keywords, in heading order.
///
/// Headings without a list, or whose list yields nothing, are skipped silently.
pub fn parse_keywords(html: &str) -> KeywordSet {
    let doc = Html::parse_document(html);
    let (Ok(h3), Ok(ul), Ok(li)) = (
        Selector::parse("h3"),
        Selector::parse("ul"),
        Selector::parse("li"),
    ) else {
        return KeywordSet::new();
    };

    let mut out = KeywordSet::new();
    for heading in doc.select(&h3) {
        let Some(category) = category_name(&element_text(&heading)) else {
            continue;
        };
        let Some(list) = find_list(heading, &ul) else {
            tracing::debug!(category = %category, "no list after heading");
            continue;
        };
        let keywords: Vec<String> = list
            .select(&li)
            .flat_map(|item| extract_item(&element_text(&item)).into_keywords())
            .collect();
        if !keywords.is_empty() {
            out.insert_category(category, keywords);
        }
    }
    out
}
