//! Markdown link shapes.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use url::Url;

/// `![](url)`
pub fn uncaptioned_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"!\[\]\((https?://[^)\s]+)\)").expect("valid regex"))
}

/// `[text](url)` or `![text](url)`. Brackets inside the text must be
/// backslash-escaped, which is how captions are written.
pub fn any_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(!?)\[((?:\\.|[^\]\\])*)\]\((https?://[^)\s]+)\)").expect("valid regex")
    })
}

/// `![text](url)` only.
pub fn image_link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"!\[((?:\\.|[^\]\\])*)\]\((https?://[^)\s]+)\)").expect("valid regex")
    })
}

/// The query string of a link, if it has one.
pub fn query(url: &str) -> Option<String> {
    Url::parse(url)
        .ok()?
        .query()
        .filter(|q| !q.is_empty())
        .map(str::to_string)
}

/// `href` with the query of `original` carried over.
pub fn with_query(href: &str, original: &str) -> String {
    match query(original) {
        Some(q) if href.contains('?') => format!("{href}&{q}"),
        Some(q) => format!("{href}?{q}"),
        None => href.to_string(),
    }
}

/// Decoded query pairs; a repeated key keeps its last value.
pub fn query_attrs(url: &str) -> Vec<(String, String)> {
    let Ok(parsed) = Url::parse(url) else {
        return Vec::new();
    };
    parsed
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect::<BTreeMap<_, _>>()
        .into_iter()
        .collect()
}
