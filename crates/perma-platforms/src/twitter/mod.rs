//! Twitter / X.

pub mod scrape;
pub mod strategies;

use std::iter;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use perma_chain::{CacheStrategy, MemoStrategy, RetrievalChain, TimeLimited};
use perma_types::{DelegatedDownload, MediaAsset, PostRecord, PostReference, DEST_PLACEHOLDER};
use regex::Regex;
use serde_json::Value;
use tracing::debug;

use crate::adapter::{EmbedOptions, LinkText, Platform, PlatformAdapter};
use crate::config::TwitterConfig;
use crate::context::PlatformContext;
use crate::error::PlatformResult;
use crate::html::plain_text;
use crate::render;
use strategies::{ApiStrategy, NitterStrategy, SnapshotStrategy};

pub const NOUN: &str = "tweet";

fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https?://(?:www\.)?(?:twitter|x)\.com/([^/\s?#)]+)/status/(\d+)")
            .expect("valid regex")
    })
}

/// Reserved paths that share the `/<x>/status/<id>` shape.
fn reserved_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https?://(?:www\.)?(?:twitter|x)\.com/(?:i|home|search|hashtag|intent)/")
            .expect("valid regex")
    })
}

/// Resolves tweets through the API, nitter and archived pages.
pub struct TwitterAdapter {
    ctx: PlatformContext,
    config: TwitterConfig,
    chain: RetrievalChain,
}

impl TwitterAdapter {
    pub fn new(ctx: PlatformContext, config: TwitterConfig) -> Self {
        let nitter = NitterStrategy::new(
            Arc::clone(&ctx.transport),
            config.nitter_host.clone(),
            Arc::clone(&ctx.memo),
        );
        let chain = RetrievalChain::new()
            .with(CacheStrategy::new(Arc::clone(&ctx.store), NOUN))
            .with(MemoStrategy::new(Arc::clone(&ctx.memo)))
            .with(ApiStrategy::new(
                Arc::clone(&ctx.transport),
                config.bearer_token.clone(),
                config.nitter_host.clone(),
            ))
            .with(TimeLimited::new(
                Arc::new(nitter),
                Duration::from_secs(config.scrape_budget_secs),
            ))
            .with(SnapshotStrategy::new(
                Arc::clone(&ctx.transport),
                ctx.archive.clone(),
            ));
        Self { ctx, config, chain }
    }

    fn media_entries<'a>(&self, record: &'a PostRecord) -> &'a [Value] {
        let extended = record.array_at("/extended_entities/media");
        if extended.is_empty() {
            record.array_at("/entities/media")
        } else {
            extended
        }
    }

    fn text(record: &PostRecord) -> String {
        let raw = record
            .string_at("/full_text")
            .or_else(|| record.string_at("/text"))
            .unwrap_or_default();
        plain_text(&raw)
    }

    fn avatar_src(&self, record: &PostRecord, reference: &PostReference) -> Option<String> {
        let url = record.string_at("/user/profile_image_url_https")?;
        let name = MediaAsset::name_from_url(&url);
        match self.ctx.store.read_media(NOUN, reference, &name, perma_types::MediaScope::Author) {
            Ok(Some(bytes)) => Some(render::data_uri(&name, &bytes)),
            _ => Some(url),
        }
    }

    fn render_media(&self, record: &PostRecord) -> String {
        let entries = self.media_entries(record);
        let count = entries.len();
        let mut out = String::new();
        for entry in entries {
            let Some(src) = media_source(entry) else {
                continue;
            };
            let src = render::escape(&src);
            match entry.get("type").and_then(Value::as_str) {
                Some("photo") => {
                    let href = entry
                        .get("expanded_url")
                        .and_then(Value::as_str)
                        .map(render::escape)
                        .unwrap_or_else(|| src.clone());
                    out.push_str(&format!(
                        "<a href=\"{href}\" target=\"_blank\">{}</a>",
                        render::image(
                            Some(&src),
                            Some(&format!("img count{count}")),
                            &self.ctx.archive
                        )
                    ));
                }
                Some("animated_gif") => out.push_str(&format!(
                    "<video src=\"{src}\" loop=\"true\" playsinline=\"true\" controls=\"true\" preload=\"auto\"></video>"
                )),
                _ => out.push_str(&format!("<video src=\"{src}\" controls=\"true\"></video>")),
            }
        }
        out
    }

    /// Escaped text with t.co links expanded and media links removed.
    fn render_text(&self, record: &PostRecord) -> String {
        let mut html = render::paragraphs(&render::escape(&Self::text(record)));
        for url in record.array_at("/entities/urls") {
            let Some(short) = url.get("url").and_then(Value::as_str) else {
                continue;
            };
            let target = url
                .get("expanded_url")
                .and_then(Value::as_str)
                .unwrap_or(short);
            let display = url
                .get("display_url")
                .and_then(Value::as_str)
                .unwrap_or(target);
            html = html.replace(
                &render::escape(short),
                &format!(
                    "<a href='{}' target='_blank'>{}</a>",
                    render::escape(target),
                    render::escape(display)
                ),
            );
        }
        for media in self.media_entries(record) {
            if let Some(short) = media.get("url").and_then(Value::as_str) {
                html = html.replace(&render::escape(short), "");
            }
        }
        html
    }
}

/// Direct source URL for a media entity.
fn media_source(entry: &Value) -> Option<String> {
    let direct = || {
        entry
            .get("media_url_https")
            .or_else(|| entry.get("media_url"))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    match entry.get("type").and_then(Value::as_str)? {
        "photo" | "hls" => direct(),
        "video" | "animated_gif" => entry
            .pointer("/video_info/variants")?
            .as_array()?
            .iter()
            .filter_map(|v| v.get("url").and_then(Value::as_str))
            .find(|u| !MediaAsset::name_from_url(u).contains(".m3u8"))
            .map(str::to_string),
        other => {
            debug!(media_type = other, "skipping unknown tweet media type");
            None
        }
    }
}

fn reply_parent(record: &PostRecord) -> Option<PostReference> {
    Some(PostReference::new(
        record.string_at("/in_reply_to_screen_name")?,
        record.string_at("/in_reply_to_status_id_str")?,
    ))
}

fn quoted(record: &PostRecord) -> Option<PostReference> {
    let id = record
        .string_at("/quoted_status/id_str")
        .or_else(|| record.string_at("/quoted_status/id"))?;
    Some(PostReference::new(
        record.string_at("/quoted_status/user/screen_name")?,
        id,
    ))
}

impl PlatformAdapter for TwitterAdapter {
    fn platform(&self) -> Platform {
        Platform::Twitter
    }

    fn match_reference(&self, url: &str) -> Option<PostReference> {
        if reserved_re().is_match(url) {
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
        Box::new(
            iter::once_with(move || reply_parent(record))
                .chain(iter::once_with(move || quoted(record)))
                .flatten(),
        )
    }

    fn extract_media(&self, record: &PostRecord) -> Vec<MediaAsset> {
        let mut assets = Vec::new();
        for entry in self.media_entries(record) {
            let Some(src) = media_source(entry) else {
                continue;
            };
            let name = MediaAsset::name_from_url(&src);
            if entry.get("type").and_then(Value::as_str) == Some("hls") {
                let name = match name.strip_suffix(".m3u8") {
                    Some(stem) => format!("{stem}.mp4"),
                    None => name,
                };
                let download = DelegatedDownload::new(
                    self.config.hls_downloader.clone(),
                    [src, "-o".to_string(), DEST_PLACEHOLDER.to_string()],
                );
                assets.push(MediaAsset::command(&name, download));
            } else {
                assets.push(MediaAsset::url(&name, src));
            }
        }
        if let Some(avatar) = record.string_at("/user/profile_image_url_https") {
            let name = MediaAsset::name_from_url(&avatar);
            assets.push(MediaAsset::url(&name, avatar).author_scoped());
        }
        assets
    }

    fn render_embed(
        &self,
        record: &PostRecord,
        reference: &PostReference,
        options: &EmbedOptions,
    ) -> PlatformResult<String> {
        let user = render::require(record, "/user/screen_name", NOUN)?;
        let user_e = render::escape(&user);
        let id = record
            .string_at("/id_str")
            .unwrap_or_else(|| reference.post_id().to_string());
        let name = render::escape(&render::field(record, "/user/name"));
        let description = render::escape(&render::single_line(&render::field(
            record,
            "/user/description",
        )));

        let reply = reply_parent(record);
        let data_reply = reply
            .as_ref()
            .map(|r| {
                format!(
                    " data-reply=\"{}/{}\"",
                    render::escape(r.user_id().unwrap_or_default()),
                    render::escape(r.post_id())
                )
            })
            .unwrap_or_default();
        let reply_to = reply
            .as_ref()
            .map(|r| {
                let who = render::escape(r.user_id().unwrap_or_default());
                format!(
                    "<span class=\"replyto\">Replying to <a class=\"prev\" href=\"https://twitter.com/{who}/status/{}\">{who}</a>:</span>",
                    render::escape(r.post_id())
                )
            })
            .unwrap_or_default();

        let avatar = render::image(
            self.avatar_src(record, reference).as_deref(),
            None,
            &self.ctx.archive,
        );

        Ok(format!(
            "<blockquote class=\"twitter-tweet\" data-tweetid=\"{id}\" data-lang=\"en\" data-dnt=\"true\" data-nosnippet=\"true\"{extra}>\
<div class=\"header\"{data_reply}><a href=\"https://twitter.com/{user_e}/\" title=\"{description}\">{avatar}\
<div class=\"vertical\"><span class=\"name\">{name}</span><span class=\"at\">@{user_e}</span></div></a></div>\
<div>{reply_to}{text}</div>\
<div class=\"media\" style=\"display: none;\">{media}</div>\
<a href=\"https://twitter.com/{user_e}/status/{post}\" target=\"_blank\">{created}</a>\
</blockquote>",
            id = render::escape(&id),
            extra = render::data_attrs(options),
            text = self.render_text(record),
            media = self.render_media(record),
            post = render::escape(reference.post_id()),
            created = render::escape(&render::field(record, "/created_at")),
        ))
    }

    fn render_link_text(
        &self,
        record: &PostRecord,
        reference: &PostReference,
    ) -> PlatformResult<LinkText> {
        let user = render::require(record, "/user/screen_name", NOUN)?;
        Ok(LinkText {
            caption: render::caption(&format!("{user}: {}", Self::text(record))),
            href: format!("https://twitter.com/{user}/status/{}", reference.post_id()),
        })
    }
}
