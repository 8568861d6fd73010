use std::fmt;

use perma_chain::RetrievalChain;
use perma_types::{MediaAsset, PostRecord, PostReference};
use serde::{Deserialize, Serialize};

use crate::error::PlatformResult;

/// The supported platforms.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Twitter,
    Bluesky,
    Mastodon,
}

impl Platform {
    pub const ALL: [Platform; 3] = [Self::Twitter, Self::Bluesky, Self::Mastodon];

    /// Collection noun; the cache directory is `posts/<noun>s`.
    pub fn noun(self) -> &'static str {
        match self {
            Self::Twitter => "tweet",
            Self::Bluesky => "skeet",
            Self::Mastodon => "toot",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Twitter => "twitter",
            Self::Bluesky => "bluesky",
            Self::Mastodon => "mastodon",
        };
        f.write_str(name)
    }
}

/// Caption and canonical target for a rewritten markdown link.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkText {
    pub caption: String,
    pub href: String,
}

/// Per-embed rendering options.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EmbedOptions {
    /// Emitted as `data-<key>="<value>"` on the embed's root element.
    pub extra_attrs: Vec<(String, String)>,
}

/// One social platform.
///
/// Rendering never fails on missing optional fields (avatar, display name,
/// timestamps); only a missing author identity is an error.
pub trait PlatformAdapter: Send + Sync {
    fn platform(&self) -> Platform;

    fn noun(&self) -> &'static str {
        self.platform().noun()
    }

    /// Parse a post URL. Near-miss URLs on the same host are rejected.
    fn match_reference(&self, url: &str) -> Option<PostReference>;

    /// The ordered strategies used to obtain a post.
    fn chain(&self) -> &RetrievalChain;

    /// Reply parents, quoted posts and thread replies, produced on demand.
    fn extract_related<'a>(
        &'a self,
        record: &'a PostRecord,
        reference: &'a PostReference,
    ) -> Box<dyn Iterator<Item = PostReference> + 'a>;

    /// Every downloadable asset, including the author avatar.
    fn extract_media(&self, record: &PostRecord) -> Vec<MediaAsset>;

    /// HTML fragment for inline display.
    fn render_embed(
        &self,
        record: &PostRecord,
        reference: &PostReference,
        options: &EmbedOptions,
    ) -> PlatformResult<String>;

    /// Short caption used when rewriting an uncaptioned link.
    fn render_link_text(
        &self,
        record: &PostRecord,
        reference: &PostReference,
    ) -> PlatformResult<LinkText>;

    /// Establish a session ahead of time. Adapters that log in lazily or
    /// need no credentials succeed without doing anything.
    fn login(&self) -> PlatformResult<()> {
        Ok(())
    }
}
