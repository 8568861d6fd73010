//! HTML helpers over `scraper`.
//!
//! Scraped pages and Mastodon status bodies are parsed into a DOM; callers
//! query them with CSS selectors held in `OnceLock`s.

use std::sync::OnceLock;

use scraper::node::Node;
use scraper::{ElementRef, Html, Selector};

/// Parse `css` once into `cell`.
pub fn selector(cell: &'static OnceLock<Selector>, css: &str) -> &'static Selector {
    cell.get_or_init(|| Selector::parse(css).expect("valid selector"))
}

fn anchor_sel() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector(&SEL, "a[href]")
}

/// Visible text of an element, trimmed.
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Attribute value of the first element matching `sel` below `scope`.
pub fn first_attr(scope: ElementRef<'_>, sel: &Selector, name: &str) -> Option<String> {
    scope
        .select(sel)
        .find_map(|e| e.value().attr(name))
        .map(str::to_string)
}

/// Whether `element` or one of its ancestors carries `class`.
pub fn within_class(element: ElementRef<'_>, class: &str) -> bool {
    let has = |e: ElementRef<'_>| e.value().classes().any(|c| c == class);
    has(element) || element.ancestors().filter_map(ElementRef::wrap).any(has)
}

/// Text of an HTML fragment with markup dropped and entities decoded.
pub fn plain_text(fragment: &str) -> String {
    Html::parse_fragment(fragment)
        .root_element()
        .text()
        .collect()
}

/// Plain text of an HTML fragment, with paragraph and line breaks kept as
/// newlines.
pub fn summarize_html(fragment: &str) -> String {
    let doc = Html::parse_fragment(fragment);
    let mut out = String::new();
    push_text(doc.root_element(), &mut out);
    out.trim().to_string()
}

fn push_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(e) if e.name() == "br" => out.push('\n'),
            Node::Element(e) => {
                let is_paragraph = e.name() == "p";
                if let Some(inner) = ElementRef::wrap(child) {
                    push_text(inner, out);
                }
                if is_paragraph {
                    out.push('\n');
                }
            }
            _ => {}
        }
    }
}

/// `href` of every anchor in a fragment.
pub fn links(fragment: &str) -> Vec<String> {
    Html::parse_fragment(fragment)
        .select(anchor_sel())
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_decodes_named_and_numeric_entities() {
        assert_eq!(
            plain_text("a &amp; b &#39;c&#x27; caf&eacute; &hellip;"),
            "a & b 'c' café \u{2026}"
        );
    }

    #[test]
    fn summarize_keeps_paragraphs() {
        assert_eq!(
            summarize_html("<p>first &amp; foremost</p><p>second<br>line</p>"),
            "first & foremost\nsecond\nline"
        );
    }

    #[test]
    fn comments_and_bare_void_elements_are_not_text() {
        assert_eq!(
            summarize_html("<p>x<img src=a.png>y<!-- <p>hidden</p> --></p><p>z</p>"),
            "xy\nz"
        );
    }

    #[test]
    fn anchors() {
        let html = r#"<p>see <a href="https://m.example/@bob/1" rel="nofollow">this</a><!-- <a href="https://gone.example/">x</a> --></p>"#;
        assert_eq!(links(html), vec!["https://m.example/@bob/1".to_string()]);
    }

    #[test]
    fn class_ancestry() {
        static SEL: OnceLock<Selector> = OnceLock::new();
        let doc = Html::parse_document(
            r#"<div class="main-tweet"><div class="timeline-item">a</div></div><div class="timeline-item">b</div>"#,
        );
        let items: Vec<_> = doc.select(selector(&SEL, ".timeline-item")).collect();
        assert_eq!(items.len(), 2);
        assert!(within_class(items[0], "main-tweet"));
        assert!(!within_class(items[1], "main-tweet"));
        assert_eq!(element_text(items[1]), "b");
    }
}
