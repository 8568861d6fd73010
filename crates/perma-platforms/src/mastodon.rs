//! Mastodon and compatible fediverse servers.

use std::sync::{Arc, OnceLock};

use perma_chain::{
    CacheStrategy, Retrieval, RetrievalChain, RetrievalStrategy, StrategyError, StrategyResult,
};
use perma_net::{ArchiveMirror, HttpRequest, HttpTransport};
use perma_types::{MediaAsset, PostRecord, PostReference};
use regex::Regex;
use serde_json::Value;
use tracing::{debug, info};

use crate::adapter::{EmbedOptions, LinkText, Platform, PlatformAdapter};
use crate::config::MastodonConfig;
use crate::context::PlatformContext;
use crate::error::PlatformResult;
use crate::fetch::get_json;
use crate::html::{links, summarize_html};
use crate::render;

pub const NOUN: &str = "toot";

/// The status id must end the path; `/@user/some-article` and
/// `/@2x/logo.png` are not toots.
fn link_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^https?://([^/\s]+)/@([^/\s)]+)/([A-Za-z0-9]+)/?(?:[?#)\s]|$)")
            .expect("valid regex")
    })
}

/// `/@user/statuses/...` is a legacy redirect, not a status page.
fn legacy_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^https?://[^/\s]+/@[^/\s)]+/statuses/").expect("valid regex"))
}

fn status_url(reference: &PostReference) -> StrategyResult<String> {
    let instance = reference
        .instance()
        .ok_or_else(|| StrategyError::Malformed(format!("{reference} has no instance")))?;
    Ok(format!(
        "https://{instance}/api/v1/statuses/{}",
        reference.post_id()
    ))
}

/// Validate a status body and complete the reference from its account.
fn accept_status(status: Value, reference: &PostReference) -> StrategyResult<Retrieval> {
    if let Some(error) = status.get("error").and_then(Value::as_str) {
        return Err(StrategyError::NotFound(format!("{reference}: {error}")));
    }
    let record = PostRecord::new(status);
    let reference = match record.string_at("/account/username") {
        Some(username) => reference.with_user_id(username),
        None if reference.is_complete() => reference.clone(),
        None => {
            return Err(StrategyError::Malformed(format!(
                "{reference}: status has no account username"
            )))
        }
    };
    Ok(Retrieval::fresh(reference, record))
}

/// `GET /api/v1/statuses/:id` on the post's own instance.
pub struct InstanceApi {
    transport: Arc<dyn HttpTransport>,
}

impl InstanceApi {
    pub fn new(transport: Arc<dyn HttpTransport>) -> Self {
        Self { transport }
    }
}

impl RetrievalStrategy for InstanceApi {
    fn name(&self) -> &str {
        "mastodon-api"
    }

    fn retrieve(&self, reference: &PostReference) -> StrategyResult<Retrieval> {
        let url = status_url(reference)?;
        let status = get_json(self.transport.as_ref(), &HttpRequest::get(url))?;
        let retrieval = accept_status(status, reference)?;
        info!(reference = %retrieval.reference, "downloaded new toot");
        Ok(retrieval)
    }
}

/// The same API call, answered from the web archive.
pub struct ArchivedStatus {
    transport: Arc<dyn HttpTransport>,
    archive: ArchiveMirror,
}

impl ArchivedStatus {
    pub fn new(transport: Arc<dyn HttpTransport>, archive: ArchiveMirror) -> Self {
        Self { transport, archive }
    }
}

impl RetrievalStrategy for ArchivedStatus {
    fn name(&self) -> &str {
        "mastodon-archive"
    }

    fn retrieve(&self, reference: &PostReference) -> StrategyResult<Retrieval> {
        let url = self.archive.raw_url(&status_url(reference)?);
        let status = get_json(self.transport.as_ref(), &HttpRequest::get(url))?;
        let retrieval = accept_status(status, reference)?;
        info!(reference = %retrieval.reference, "recovered toot from archive");
        Ok(retrieval)
    }
}

/// Resolves toots through the instance API.
pub struct MastodonAdapter {
    ctx: PlatformContext,
    chain: RetrievalChain,
}

impl MastodonAdapter {
    pub fn new(ctx: PlatformContext, config: MastodonConfig) -> Self {
        let mut chain = RetrievalChain::new()
            .with(CacheStrategy::new(Arc::clone(&ctx.store), NOUN))
            .with(InstanceApi::new(Arc::clone(&ctx.transport)));
        if config.archive_fallback {
            chain = chain.with(ArchivedStatus::new(
                Arc::clone(&ctx.transport),
                ctx.archive.clone(),
            ));
        }
        Self { ctx, chain }
    }

    fn render_media(&self, record: &PostRecord) -> String {
        let attachments = record.array_at("/media_attachments");
        let count = attachments.len();
        let post_url = render::escape(&render::field(record, "/uri"));
        attachments
            .iter()
            .map(|media| {
                let field = |k: &str| media.get(k).and_then(Value::as_str).unwrap_or_default();
                let preview = Some(field("preview_url")).filter(|s| !s.is_empty());
                format!(
                    "<a href=\"{post_url}\" data-href-orig=\"{}\" target=\"_blank\">{}</a>",
                    render::escape(field("url")),
                    render::image(
                        preview.or(Some(field("url"))),
                        Some(&format!("img count{count}")),
                        &self.ctx.archive
                    )
                )
            })
            .collect()
    }
}

fn canonical_href(record: &PostRecord, reference: &PostReference) -> String {
    record.string_at("/url").unwrap_or_else(|| {
        format!(
            "https://{}/@{}/{}",
            reference.instance().unwrap_or_default(),
            reference.user_id().unwrap_or_default(),
            reference.post_id()
        )
    })
}

impl PlatformAdapter for MastodonAdapter {
    fn platform(&self) -> Platform {
        Platform::Mastodon
    }

    fn match_reference(&self, url: &str) -> Option<PostReference> {
        if legacy_re().is_match(url) {
            return None;
        }
        let caps = link_re().captures(url)?;
        Some(PostReference::on_instance(
            &caps[1],
            Some(caps[2].to_string()),
            &caps[3],
        ))
    }

    fn chain(&self) -> &RetrievalChain {
        &self.chain
    }

    fn extract_related<'a>(
        &'a self,
        record: &'a PostRecord,
        reference: &'a PostReference,
    ) -> Box<dyn Iterator<Item = PostReference> + 'a> {
        let parent = record.string_at("/in_reply_to_id").and_then(|id| {
            let instance = reference.instance()?;
            Some(PostReference::on_instance(instance, None, id))
        });
        let quoted = links(&render::field(record, "/content"))
            .into_iter()
            .filter_map(move |href| self.match_reference(&href));
        Box::new(parent.into_iter().chain(quoted))
    }

    fn extract_media(&self, record: &PostRecord) -> Vec<MediaAsset> {
        let mut assets = Vec::new();
        for media in record.array_at("/media_attachments") {
            match media.get("type").and_then(Value::as_str) {
                Some("image" | "video" | "gifv") => {}
                other => {
                    debug!(media_type = ?other, "skipping unsupported toot attachment");
                    continue;
                }
            }
            if let Some(url) = media.get("url").and_then(Value::as_str) {
                assets.push(MediaAsset::url(&MediaAsset::name_from_url(url), url));
            }
        }
        if let Some(avatar) = record.string_at("/account/avatar_static") {
            assets.push(MediaAsset::url(&MediaAsset::name_from_url(&avatar), avatar).author_scoped());
        }
        assets
    }

    fn render_embed(
        &self,
        record: &PostRecord,
        reference: &PostReference,
        options: &EmbedOptions,
    ) -> PlatformResult<String> {
        let username = render::escape(&render::require(record, "/account/username", NOUN)?);
        let instance = render::escape(reference.instance().unwrap_or_default());
        let note = render::field(record, "/account/note");
        let title = if note.is_empty() {
            String::new()
        } else {
            format!(
                " title=\"{}\"",
                render::escape(&render::single_line(&summarize_html(&note)))
            )
        };
        let reply = if record.string_at("/in_reply_to_id").is_some() {
            "<span class=\"replyto\">Replying:</span>"
        } else {
            ""
        };
        let avatar = render::image(
            record.string_at("/account/avatar_static").as_deref(),
            None,
            &self.ctx.archive,
        );

        Ok(format!(
            "<blockquote class=\"fediverse-toot\" data-lang=\"en\" data-dnt=\"true\" data-nosnippet=\"true\"{extra}>\
<div class=\"header\"><a href=\"{account_url}\"{title}>{avatar}\
<div class=\"vertical\"><span class=\"name\">{name}</span><span class=\"at\">@{username}@{instance}</span></div></a></div>\
<div>{reply}<p>{content}</p></div>\
<div class=\"media\" style=\"display: none;\">{media}</div>\
<a href=\"{href}\" target=\"_blank\">{created}</a>\
</blockquote>",
            extra = render::data_attrs(options),
            account_url = render::escape(&render::field(record, "/account/url")),
            name = render::escape(&render::field(record, "/account/display_name")),
            content = render::field(record, "/content"),
            media = self.render_media(record),
            href = render::escape(&canonical_href(record, reference)),
            created = render::escape(&render::field(record, "/created_at")),
        ))
    }

    fn render_link_text(
        &self,
        record: &PostRecord,
        reference: &PostReference,
    ) -> PlatformResult<LinkText> {
        let username = render::require(record, "/account/username", NOUN)?;
        let text = summarize_html(&render::field(record, "/content"));
        Ok(LinkText {
            caption: render::caption(&format!(
                "{username}@{}: {text}",
                reference.instance().unwrap_or_default()
            )),
            href: canonical_href(record, reference),
        })
    }
}
