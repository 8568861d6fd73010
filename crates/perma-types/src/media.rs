use serde::{Deserialize, Serialize};

use crate::safety::strip_query;

/// Placeholder substituted with the destination path in delegated commands.
pub const DEST_PLACEHOLDER: &str = "{dest}";

/// Where a media file is stored relative to its post.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaScope {
    /// `s<post_id>-<name>` next to the post's JSON.
    Post,
    /// `savatar-<name>` in the author's directory, shared by all their posts.
    Author,
}

/// An external program that writes a media file itself.
///
/// Used for streaming formats (HLS playlists) that a plain GET cannot
/// retrieve. `args` may contain [`DEST_PLACEHOLDER`], which is replaced by the
/// destination path when the command is built.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DelegatedDownload {
    pub program: String,
    pub args: Vec<String>,
}

impl DelegatedDownload {
    pub fn new<I, S>(program: impl Into<String>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Arguments with the destination substituted in.
    pub fn args_for(&self, dest: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.replace(DEST_PLACEHOLDER, dest))
            .collect()
    }
}

/// How a media asset is obtained.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaSource {
    /// Fetch with a direct HTTP GET.
    Url(String),
    /// Hand off to an external downloader.
    Command(DelegatedDownload),
}

/// A single downloadable asset attached to a post.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaAsset {
    /// File name suffix, with any query string removed.
    pub name: String,
    pub source: MediaSource,
    pub scope: MediaScope,
}

impl MediaAsset {
    pub fn url(name: &str, url: impl Into<String>) -> Self {
        Self {
            name: strip_query(name).to_string(),
            source: MediaSource::Url(url.into()),
            scope: MediaScope::Post,
        }
    }

    pub fn command(name: &str, download: DelegatedDownload) -> Self {
        Self {
            name: strip_query(name).to_string(),
            source: MediaSource::Command(download),
            scope: MediaScope::Post,
        }
    }

    /// Store once per author instead of once per post.
    pub fn author_scoped(mut self) -> Self {
        self.scope = MediaScope::Author;
        self
    }

    /// Last path segment of a URL with the query removed; a sensible asset name.
    pub fn name_from_url(url: &str) -> String {
        let path = strip_query(url);
        path.rsplit('/').next().unwrap_or(path).to_string()
    }
}
