use std::sync::Arc;

use perma_chain::{Retrieval, RetrievalStrategy, StrategyError, StrategyResult};
use perma_net::{ArchiveMirror, HttpRequest, HttpTransport};
use perma_store::RunMemo;
use perma_types::{PostRecord, PostReference};
use serde_json::json;
use tracing::{info, warn};

use super::scrape::{nitter_main_text, parse_archive_snapshot, parse_nitter};
use crate::fetch::{get_json, get_text};

pub const API_BASE: &str = "https://api.twitter.com/1.1";

fn user_of(reference: &PostReference) -> StrategyResult<&str> {
    reference
        .require_user_id()
        .map_err(|e| StrategyError::Malformed(e.to_string()))
}

fn nitter_request(host: &str, user: &str, id: &str) -> HttpRequest {
    let url = format!("{}/{user}/status/{id}", host.trim_end_matches('/'));
    HttpRequest::get(url).header("Cookie", "hlsPlayback=on")
}

// ---------------------------------------------------------------------------
// API
// ---------------------------------------------------------------------------

/// v1.1 `statuses/show` with a bearer token.
pub struct ApiStrategy {
    transport: Arc<dyn HttpTransport>,
    bearer: Option<String>,
    nitter_host: Option<String>,
}

impl ApiStrategy {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        bearer: Option<String>,
        nitter_host: Option<String>,
    ) -> Self {
        Self {
            transport,
            bearer,
            nitter_host,
        }
    }

    /// Long-form tweets come back truncated with a link to themselves; the
    /// full text is taken from nitter when one is configured.
    fn complete_note(&self, record: &mut PostRecord) {
        if !needs_note(record) {
            return;
        }
        let (Some(user), Some(id)) = (
            record.string_at("/user/screen_name"),
            record.string_at("/id_str"),
        ) else {
            return;
        };
        let Some(host) = &self.nitter_host else {
            warn!(id = %id, "tweet text is truncated and no nitter host is configured");
            return;
        };

        let note = get_text(self.transport.as_ref(), &nitter_request(host, &user, &id))
            .ok()
            .and_then(|page| nitter_main_text(&page));
        match note {
            Some(text) => {
                let orig = record.get("/full_text").cloned().unwrap_or(json!(null));
                record.set_field("full_text_orig", orig);
                record.set_field("full_text", json!(text));
            }
            None => warn!(id = %id, "could not complete truncated tweet from nitter"),
        }
    }
}

fn needs_note(record: &PostRecord) -> bool {
    if record.get("/full_text_orig").is_some() {
        return false;
    }
    let text = record
        .string_at("/full_text")
        .or_else(|| record.string_at("/text"))
        .unwrap_or_default();
    let Some(id) = record.string_at("/id_str") else {
        return false;
    };
    let self_link = format!("https://twitter.com/i/web/status/{id}");
    text.contains("\u{2026} https://t.co/")
        && record
            .array_at("/entities/urls")
            .iter()
            .any(|u| u.get("expanded_url").and_then(|v| v.as_str()) == Some(self_link.as_str()))
}

impl RetrievalStrategy for ApiStrategy {
    fn name(&self) -> &str {
        "twitter-api"
    }

    fn retrieve(&self, reference: &PostReference) -> StrategyResult<Retrieval> {
        let Some(token) = &self.bearer else {
            return Err(StrategyError::Configuration("no Twitter bearer token".into()));
        };
        let url = format!(
            "{API_BASE}/statuses/show.json?id={}&tweet_mode=extended",
            reference.post_id()
        );
        let value = get_json(self.transport.as_ref(), &HttpRequest::get(url).bearer(token))?;
        let mut record = PostRecord::new(value);
        if record.get("/errors").is_some() || record.get("/id_str").is_none() {
            return Err(StrategyError::NotFound(format!("API has no tweet {reference}")));
        }
        self.complete_note(&mut record);
        info!(reference = %reference, "downloaded new tweet");
        Ok(Retrieval::fresh(reference.clone(), record))
    }
}

// ---------------------------------------------------------------------------
// Nitter
// ---------------------------------------------------------------------------

/// Scrapes a nitter mirror. Other tweets on the same page are primed into
/// the run memo.
pub struct NitterStrategy {
    transport: Arc<dyn HttpTransport>,
    host: Option<String>,
    memo: Arc<RunMemo>,
}

impl NitterStrategy {
    pub fn new(transport: Arc<dyn HttpTransport>, host: Option<String>, memo: Arc<RunMemo>) -> Self {
        Self {
            transport,
            host,
            memo,
        }
    }
}

impl RetrievalStrategy for NitterStrategy {
    fn name(&self) -> &str {
        "nitter"
    }

    fn retrieve(&self, reference: &PostReference) -> StrategyResult<Retrieval> {
        let Some(host) = &self.host else {
            return Err(StrategyError::Configuration("no nitter host".into()));
        };
        let request = nitter_request(host, user_of(reference)?, reference.post_id());
        let html = get_text(self.transport.as_ref(), &request)?;
        let page = parse_nitter(&html, host);

        for (sibling, record) in page.others {
            if &sibling != reference {
                self.memo.prime(sibling, record);
            }
        }

        let main = page
            .main
            .ok_or_else(|| StrategyError::Malformed(format!("no main tweet at {}", request.url)))?;
        info!(reference = %reference, "scraped new tweet from nitter");
        Ok(Retrieval::fresh(reference.clone(), main))
    }
}

// ---------------------------------------------------------------------------
// Archive snapshot
// ---------------------------------------------------------------------------

/// Scrapes an archived twitter.com status page.
pub struct SnapshotStrategy {
    transport: Arc<dyn HttpTransport>,
    archive: ArchiveMirror,
}

impl SnapshotStrategy {
    pub fn new(transport: Arc<dyn HttpTransport>, archive: ArchiveMirror) -> Self {
        Self { transport, archive }
    }
}

impl RetrievalStrategy for SnapshotStrategy {
    fn name(&self) -> &str {
        "twitter-archive"
    }

    fn retrieve(&self, reference: &PostReference) -> StrategyResult<Retrieval> {
        let original = format!(
            "https://twitter.com/{}/status/{}",
            user_of(reference)?,
            reference.post_id()
        );
        let html = get_text(
            self.transport.as_ref(),
            &HttpRequest::get(self.archive.page_url(&original)),
        )?;
        let record = parse_archive_snapshot(&html, reference)
            .ok_or_else(|| StrategyError::NotFound(format!("{reference} not in snapshot")))?;
        info!(reference = %reference, "recovered tweet from archive");
        Ok(Retrieval::fresh(reference.clone(), record))
    }
}
