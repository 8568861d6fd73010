//! Tweet extraction from nitter pages and archived twitter.com snapshots.

use std::sync::OnceLock;

use perma_types::{PostRecord, PostReference};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde_json::{json, Value};
use url::Url;

use crate::html::{element_text, first_attr, selector, within_class};

fn status_path_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"([^/]+)/status/(\d+)").expect("valid regex"))
}

fn timeline_item_sel() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector(&SEL, ".timeline-item")
}

fn date_anchor_sel() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector(&SEL, ".tweet-date a")
}

fn username_sel() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector(&SEL, ".username")
}

fn fullname_sel() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector(&SEL, ".fullname")
}

fn content_sel() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector(&SEL, ".tweet-content.media-body")
}

fn main_content_sel() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector(&SEL, ".main-tweet .tweet-content.media-body")
}

fn still_image_sel() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector(&SEL, ".still-image[href]")
}

fn video_sel() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector(&SEL, "video[data-url]")
}

fn tweet_id_sel() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector(&SEL, "[data-tweet-id]")
}

fn tweet_text_sel() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector(&SEL, ".js-tweet-text")
}

fn time_ms_sel() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector(&SEL, "[data-time-ms]")
}

fn image_url_sel() -> &'static Selector {
    static SEL: OnceLock<Selector> = OnceLock::new();
    selector(&SEL, "[data-image-url]")
}

/// Entities block with every list present and empty.
pub fn empty_entities() -> Value {
    json!({
        "hashtags": [],
        "symbols": [],
        "user_mentions": [],
        "urls": [],
        "media": [],
    })
}

/// Posts found on one nitter status page.
#[derive(Debug, Default)]
pub struct NitterPage {
    pub main: Option<PostRecord>,
    /// Thread ancestors and replies shown around the main tweet.
    pub others: Vec<(PostReference, PostRecord)>,
}

/// Parse a nitter status page. Relative media links are resolved against
/// `host`.
pub fn parse_nitter(html: &str, host: &str) -> NitterPage {
    let base = Url::parse(host).ok();
    let doc = Html::parse_document(html);

    let mut page = NitterPage::default();
    let mut parent: Option<(String, String)> = None;

    for item in doc.select(timeline_item_sel()) {
        let Some(mut tweet) = nitter_tweet(item, base.as_ref()) else {
            continue;
        };

        if within_class(item, "main-tweet") {
            if page.main.is_none() {
                if let Some((user, id)) = parent.take() {
                    tweet["in_reply_to_screen_name"] = json!(user);
                    tweet["in_reply_to_status_id_str"] = json!(id);
                }
                page.main = Some(PostRecord::new(tweet));
            }
            continue;
        }

        let record = PostRecord::new(tweet);
        let (Some(user), Some(id)) = (
            record.string_at("/user/screen_name"),
            record.string_at("/id_str"),
        ) else {
            continue;
        };
        if page.main.is_none() {
            parent = Some((user.clone(), id.clone()));
        }
        page.others.push((PostReference::new(user, id), record));
    }

    page
}

fn nitter_tweet(item: ElementRef<'_>, base: Option<&Url>) -> Option<Value> {
    let anchor = item.select(date_anchor_sel()).next()?;
    let href = anchor.value().attr("href")?;
    let caps = status_path_re().captures(href)?;
    let id = caps[2].to_string();

    let screen_name = first_attr(item, username_sel(), "title")
        .map(|t| t.trim_start_matches('@').to_string())
        .unwrap_or_else(|| caps[1].trim_start_matches('/').to_string());
    let name = first_attr(item, fullname_sel(), "title");
    let full_text = item
        .select(content_sel())
        .next()
        .map(element_text)
        .unwrap_or_default();

    let absolute = |href: &str| match base.and_then(|b| b.join(href).ok()) {
        Some(u) => u.to_string(),
        None => href.to_string(),
    };

    let mut media = Vec::new();
    for still in item.select(still_image_sel()) {
        if let Some(href) = still.value().attr("href") {
            let href = absolute(href);
            media.push(json!({
                "type": "photo",
                "expanded_url": href,
                "media_url": href,
                "media_url_https": href,
            }));
        }
    }
    for video in item.select(video_sel()) {
        if let Some(src) = video.value().attr("data-url") {
            let href = absolute(src);
            media.push(json!({
                "type": "hls",
                "expanded_url": href,
                "media_url": href,
                "media_url_https": href,
            }));
        }
    }

    let mut entities = empty_entities();
    entities["media"] = Value::Array(media);

    Some(json!({
        "id": id,
        "id_str": id,
        "user": {"screen_name": screen_name, "name": name},
        "created_at": anchor.value().attr("title"),
        "full_text": full_text,
        "entities": entities,
    }))
}

/// Text of the main tweet on a nitter page, used to complete truncated
/// long-form tweets.
pub fn nitter_main_text(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let content = doc.select(main_content_sel()).next()?;
    Some(element_text(content))
}

/// Whether `element` belongs to the tweet `block` rather than to a tweet
/// nested inside it.
fn owned_by(element: ElementRef<'_>, block: ElementRef<'_>) -> bool {
    element.id() == block.id()
        || element
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|a| a.value().attr("data-tweet-id").is_some())
            .is_some_and(|a| a.id() == block.id())
}

/// Parse the tweet `reference` out of an archived twitter.com page.
pub fn parse_archive_snapshot(html: &str, reference: &PostReference) -> Option<PostRecord> {
    let id = reference.post_id();
    let doc = Html::parse_document(html);
    let block = doc
        .select(tweet_id_sel())
        .find(|e| e.value().attr("data-tweet-id") == Some(id))?;
    let attr = |name: &str| block.value().attr(name).map(str::to_string);

    let screen_name = attr("data-screen-name")?;
    let full_text = block
        .select(tweet_text_sel())
        .find(|e| owned_by(*e, block))
        .map(element_text)
        .unwrap_or_default();
    let created_at = block
        .select(time_ms_sel())
        .filter(|e| owned_by(*e, block))
        .find_map(|e| e.value().attr("data-time-ms"));

    let mut entities = empty_entities();
    entities["media"] = Value::Array(
        block
            .select(image_url_sel())
            .filter(|e| owned_by(*e, block))
            .filter_map(|e| e.value().attr("data-image-url"))
            .map(|src| json!({"type": "photo", "media_url": src, "media_url_https": src}))
            .collect(),
    );

    Some(PostRecord::new(json!({
        "id": id,
        "id_str": id,
        "user": {"screen_name": screen_name, "name": attr("data-name")},
        "entities": entities,
        "full_text": full_text,
        "created_at": created_at,
    })))
}
