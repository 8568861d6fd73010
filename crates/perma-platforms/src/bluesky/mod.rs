//! Bluesky.

pub mod xrpc;

use std::sync::{Arc, OnceLock};

use perma_chain::{CacheStrategy, RetrievalChain};
use perma_types::{MediaAsset, PostRecord, PostReference};
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::adapter::{EmbedOptions, LinkText, Platform, PlatformAdapter};
use crate::config::BlueskyConfig;
use crate::context::PlatformContext;
use crate::error::{PlatformError, PlatformResult};
use crate::render;
use xrpc::{ArchivedThread, PublicThread, SessionThread, XrpcClient};

pub const NOUN: &str = "skeet";

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https?://(?:www\.)?bsky\.app/profile/([^/\s?#)]+)/post/([A-Za-z0-9]+)")
            .expect("valid regex")
    })
}

/// Engagement listings hang off a post URL but are not posts.
fn listing_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https?://(?:www\.)?bsky\.app/profile/[^/\s]+/post/[^/\s?#)]+/(?:liked-by|reposted-by|quotes)")
            .expect("valid regex")
    })
}

/// Resolves skeets through XRPC, with a public AppView and archive fallback.
pub struct BlueskyAdapter {
    ctx: PlatformContext,
    client: Arc<XrpcClient>,
    chain: RetrievalChain,
}

impl BlueskyAdapter {
    pub fn new(ctx: PlatformContext, config: BlueskyConfig) -> Self {
        let client = Arc::new(XrpcClient::new(Arc::clone(&ctx.transport), config));
        let chain = RetrievalChain::new()
            .with(CacheStrategy::new(Arc::clone(&ctx.store), NOUN))
            .with(SessionThread::new(Arc::clone(&client)))
            .with(PublicThread::new(Arc::clone(&client)))
            .with(ArchivedThread::new(Arc::clone(&client), ctx.archive.clone()));
        Self { ctx, client, chain }
    }

    fn render_text(record: &PostRecord) -> String {
        let text = render::field(record, "/record/text");
        render::paragraphs(&htmlize(&text, record.array_at("/record/facets")))
    }

    fn render_media(&self, record: &PostRecord) -> String {
        let images = images(record);
        let count = images.len();
        images
            .iter()
            .map(|src| {
                format!(
                    "<a href=\"{}\" target=\"_blank\">{}</a>",
                    render::escape(src),
                    render::image(Some(src), Some(&format!("img count{count}")), &self.ctx.archive)
                )
            })
            .collect()
    }
}

/// Escape post text, turning link and mention facets into anchors.
///
/// Facet ranges are UTF-8 byte offsets into the raw text. Ranges that
/// overlap, run past the end or split a character are ignored.
fn htmlize(text: &str, facets: &[Value]) -> String {
    let mut spans: Vec<(usize, usize, String)> = facets
        .iter()
        .filter_map(|facet| {
            let start = facet.pointer("/index/byteStart")?.as_u64()? as usize;
            let end = facet.pointer("/index/byteEnd")?.as_u64()? as usize;
            let target = facet_target(facet.get("features")?.as_array()?)?;
            Some((start, end, target))
        })
        .collect();
    spans.sort_by_key(|(start, _, _)| *start);

    let mut out = String::with_capacity(text.len());
    let mut cursor = 0;
    for (start, end, target) in spans {
        if start < cursor || end <= start || text.get(start..end).is_none() {
            continue;
        }
        out.push_str(&render::escape(&text[cursor..start]));
        out.push_str(&format!(
            "<a href='{}'>{}</a>",
            render::escape(&target),
            render::escape(&text[start..end])
        ));
        cursor = end;
    }
    out.push_str(&render::escape(&text[cursor..]));
    out
}

fn facet_target(features: &[Value]) -> Option<String> {
    features.iter().find_map(|feature| {
        match feature.get("$type").and_then(Value::as_str)? {
            "app.bsky.richtext.facet#link" => feature.get("uri")?.as_str().map(str::to_string),
            "app.bsky.richtext.facet#mention" => feature
                .get("did")?
                .as_str()
                .map(|did| format!("https://bsky.app/profile/{did}")),
            "app.bsky.richtext.facet#tag" => feature
                .get("tag")?
                .as_str()
                .map(|tag| format!("https://bsky.app/hashtag/{tag}")),
            other => {
                debug!(facet = other, "leaving unknown facet as text");
                None
            }
        }
    })
}

/// Full-size image URLs, whether the embed is plain images or a quote
/// with images.
fn images(record: &PostRecord) -> Vec<String> {
    ["/embed/images", "/embed/media/images"]
        .into_iter()
        .flat_map(|pointer| record.array_at(pointer))
        .filter_map(|image| image.get("fullsize").and_then(Value::as_str))
        .map(str::to_string)
        .collect()
}

/// CDN names end in `@jpeg`; store them with a normal extension.
fn media_name(url: &str) -> String {
    MediaAsset::name_from_url(url).replace('@', ".")
}

fn context_link(link: &Value) -> Option<PostReference> {
    Some(PostReference::new(
        link.get("handle")?.as_str()?,
        link.get("rkey")?.as_str()?,
    ))
}

impl PlatformAdapter for BlueskyAdapter {
    fn platform(&self) -> Platform {
        Platform::Bluesky
    }

    fn match_reference(&self, url: &str) -> Option<PostReference> {
        if listing_re().is_match(url) {
            return None;
        }
        let caps = link_re().captures(url)?;
        Some(PostReference::new(&caps[1], &caps[2]))
    }

    fn chain(&self) -> &RetrievalChain {
        &self.chain
    }

    fn extract_related<'a>(
        &'a self,
        record: &'a PostRecord,
        _reference: &'a PostReference,
    ) -> Box<dyn Iterator<Item = PostReference> + 'a> {
        let parent = record.get("/thread_context/parent").and_then(context_link);
        let replies = record
            .array_at("/thread_context/replies")
            .iter()
            .filter_map(context_link);
        Box::new(parent.into_iter().chain(replies))
    }

    fn extract_media(&self, record: &PostRecord) -> Vec<MediaAsset> {
        let mut assets: Vec<MediaAsset> = images(record)
            .into_iter()
            .map(|src| MediaAsset::url(&media_name(&src), src))
            .collect();
        if let Some(avatar) = record.string_at("/author/avatar") {
            assets.push(MediaAsset::url(&media_name(&avatar), avatar).author_scoped());
        }
        assets
    }

    fn render_embed(
        &self,
        record: &PostRecord,
        reference: &PostReference,
        options: &EmbedOptions,
    ) -> PlatformResult<String> {
        let handle = render::escape(&render::require(record, "/author/handle", NOUN)?);
        let avatar = render::image(
            record.string_at("/author/avatar").as_deref(),
            None,
            &self.ctx.archive,
        );
        let media = self.render_media(record);
        let media = if media.is_empty() {
            String::new()
        } else {
            format!("<div class=\"media\" style=\"display: none;\">{media}</div>")
        };

        Ok(format!(
            "<blockquote class=\"twitter-tweet\" data-lang=\"en\" data-dnt=\"true\" data-nosnippet=\"true\"{extra}>\
<div class=\"header\"><a href=\"https://bsky.app/profile/{handle}/\">{avatar}\
<div class=\"vertical\"><span class=\"name\">{name}</span><span class=\"at\">@{handle}</span></div></a></div>\
<div>{text}</div>{media}\
<a href=\"https://bsky.app/profile/{handle}/post/{post}\" target=\"_blank\">{created}</a>\
</blockquote>",
            extra = render::data_attrs(options),
            name = render::escape(&render::field(record, "/author/displayName")),
            text = Self::render_text(record),
            post = render::escape(reference.post_id()),
            created = render::escape(&render::field(record, "/record/createdAt")),
        ))
    }

    fn render_link_text(
        &self,
        record: &PostRecord,
        reference: &PostReference,
    ) -> PlatformResult<LinkText> {
        let handle = render::require(record, "/author/handle", NOUN)?;
        let text = render::field(record, "/record/text");
        Ok(LinkText {
            caption: render::caption(&format!("{handle}: {text}")),
            href: format!("https://bsky.app/profile/{handle}/post/{}", reference.post_id()),
        })
    }

    fn login(&self) -> PlatformResult<()> {
        self.client
            .login()
            .map(|_| ())
            .map_err(|e| PlatformError::Login(e.to_string()))
    }
}
