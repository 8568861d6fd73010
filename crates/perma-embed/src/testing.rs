//! A one-platform setup over a temporary cache, shared by the tests.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use perma_chain::{
    CacheStrategy, Retrieval, RetrievalChain, RetrievalStrategy, StrategyError, StrategyResult,
};
use perma_media::{MediaFetcher, RecordingRunner};
use perma_net::{ArchiveMirror, ScriptedTransport};
use perma_platforms::{
    render, EmbedOptions, LinkText, Platform, PlatformAdapter, PlatformResult,
};
use perma_resolver::{ResolverConfig, ThreadResolver};
use perma_store::{CacheStore, FsCacheStore};
use perma_types::{MediaAsset, PostRecord, PostReference};
use regex::Regex;
use serde_json::json;

use crate::rewriter::EmbedRewriter;

pub const HOST: &str = "https://social.example";
const NOUN: &str = "post";

#[derive(Default)]
struct Origin {
    posts: Mutex<HashMap<PostReference, PostRecord>>,
    calls: AtomicUsize,
}

struct OriginStrategy(Arc<Origin>);

impl RetrievalStrategy for OriginStrategy {
    fn name(&self) -> &str {
        "origin"
    }

    fn retrieve(&self, reference: &PostReference) -> StrategyResult<Retrieval> {
        self.0.calls.fetch_add(1, Ordering::SeqCst);
        let posts = self.0.posts.lock().unwrap();
        match posts.get(reference) {
            Some(record) => Ok(Retrieval::fresh(reference.clone(), record.clone())),
            None => Err(StrategyError::NotFound(reference.to_string())),
        }
    }
}

struct SocialAdapter {
    chain: RetrievalChain,
    link: Regex,
}

impl PlatformAdapter for SocialAdapter {
    fn platform(&self) -> Platform {
        Platform::Mastodon
    }

    fn noun(&self) -> &'static str {
        NOUN
    }

    fn match_reference(&self, url: &str) -> Option<PostReference> {
        let caps = self.link.captures(url)?;
        Some(PostReference::new(&caps[1], &caps[2]))
    }

    fn chain(&self) -> &RetrievalChain {
        &self.chain
    }

    fn extract_related<'a>(
        &'a self,
        _record: &'a PostRecord,
        _reference: &'a PostReference,
    ) -> Box<dyn Iterator<Item = PostReference> + 'a> {
        Box::new(std::iter::empty())
    }

    fn extract_media(&self, _record: &PostRecord) -> Vec<MediaAsset> {
        Vec::new()
    }

    fn render_embed(
        &self,
        record: &PostRecord,
        _reference: &PostReference,
        options: &EmbedOptions,
    ) -> PlatformResult<String> {
        Ok(format!(
            "<blockquote{}>{}</blockquote>",
            render::data_attrs(options),
            render::escape(&render::require(record, "/text", NOUN)?)
        ))
    }

    fn render_link_text(
        &self,
        record: &PostRecord,
        reference: &PostReference,
    ) -> PlatformResult<LinkText> {
        let user = render::require(record, "/user", NOUN)?;
        Ok(LinkText {
            caption: render::caption(&format!("{user}: {}", render::field(record, "/text"))),
            href: format!("{HOST}/{user}/{}", reference.post_id()),
        })
    }
}

pub struct Fixture {
    pub rewriter: EmbedRewriter,
    pub root: PathBuf,
    origin: Arc<Origin>,
    _dir: tempfile::TempDir,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        let store: Arc<dyn CacheStore> = Arc::new(FsCacheStore::new(root.join("cache")));
        let origin = Arc::new(Origin::default());

        let adapter: Arc<dyn PlatformAdapter> = Arc::new(SocialAdapter {
            chain: RetrievalChain::new()
                .with(CacheStrategy::new(Arc::clone(&store), NOUN))
                .with(OriginStrategy(Arc::clone(&origin))),
            link: Regex::new(r"^https://social\.example/([^/?#\s)]+)/([0-9]+)").unwrap(),
        });
        let media = MediaFetcher::new(
            Arc::new(ScriptedTransport::new()),
            ArchiveMirror::new("https://archive.example"),
            Arc::new(RecordingRunner::failing()),
        );
        let resolver = ThreadResolver::new(
            store,
            media,
            ResolverConfig {
                fetch_media: false,
                follow_related: false,
            },
        );

        Self {
            rewriter: EmbedRewriter::new(Arc::new(resolver), vec![adapter]),
            root,
            origin,
            _dir: dir,
        }
    }

    pub fn post(self, user: &str, id: &str, text: &str) -> Self {
        self.origin.posts.lock().unwrap().insert(
            PostReference::new(user, id),
            PostRecord::new(json!({"id": id, "user": user, "text": text})),
        );
        self
    }

    pub fn adapter(&self) -> &dyn PlatformAdapter {
        self.rewriter.adapters()[0].as_ref()
    }

    pub fn origin_calls(&self) -> usize {
        self.origin.calls.load(Ordering::SeqCst)
    }

    /// Write a document under the fixture root.
    pub fn doc(&self, relative: &str, body: &str) -> PathBuf {
        let path = self.root.join(relative);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, body).unwrap();
        path
    }

    pub fn read(&self, path: &Path) -> String {
        std::fs::read_to_string(path).unwrap()
    }
}
