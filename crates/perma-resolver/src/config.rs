use serde::{Deserialize, Serialize};

/// Follow-up work done for a freshly retrieved post.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Download avatars, images and video.
    pub fetch_media: bool,
    /// Resolve reply parents, quotes and thread replies.
    pub follow_related: bool,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            fetch_media: true,
            follow_related: true,
        }
    }
}
