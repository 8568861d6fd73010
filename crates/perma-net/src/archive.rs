//! Web-archive mirror URLs.
//!
//! The archive serves a stored capture when given a timestamp prefix; an
//! early timestamp such as `0` resolves to the oldest capture, which for
//! social posts is usually the one taken before any edit or deletion.

use crate::config::NetConfig;

/// Builds mirror URLs on a Wayback-compatible archive host.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ArchiveMirror {
    host: String,
}

impl ArchiveMirror {
    pub fn new(host: impl Into<String>) -> Self {
        let host = host.into();
        Self {
            host: host.trim_end_matches('/').to_string(),
        }
    }

    pub fn from_config(config: &NetConfig) -> Self {
        Self::new(config.archive_host.clone())
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Raw bytes of an archived media file.
    pub fn media_url(&self, url: &str) -> String {
        format!("{}/web/0im_/{url}", self.host)
    }

    /// An archived HTML page, without the archive's toolbar.
    pub fn page_url(&self, url: &str) -> String {
        format!("{}/web/1im_/{url}", self.host)
    }

    /// The original response body of an archived API call.
    pub fn raw_url(&self, url: &str) -> String {
        format!("{}/web/2id_/{url}", self.host)
    }

    /// Client-side fallback prefix used in rendered `onerror` handlers.
    pub fn client_prefix(&self) -> String {
        format!("{}/web/0/", self.host)
    }
}

impl Default for ArchiveMirror {
    fn default() -> Self {
        Self::from_config(&NetConfig::default())
    }
}
