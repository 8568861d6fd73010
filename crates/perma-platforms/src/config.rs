use serde::{Deserialize, Serialize};

/// Twitter retrieval settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TwitterConfig {
    /// v1.1 API bearer token. Without it the API strategy is skipped.
    pub bearer_token: Option<String>,
    /// Base URL of a nitter mirror, e.g. `https://nitter.net`.
    pub nitter_host: Option<String>,
    /// Wall-clock budget for one nitter scrape, in seconds.
    pub scrape_budget_secs: u64,
    /// Program used for HLS video (`<program> <url> -o <dest>`).
    pub hls_downloader: String,
}

impl Default for TwitterConfig {
    fn default() -> Self {
        Self {
            bearer_token: None,
            nitter_host: None,
            scrape_budget_secs: 10,
            hls_downloader: "yt-dlp".to_string(),
        }
    }
}

/// Bluesky retrieval settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BlueskyConfig {
    /// PDS used for authenticated calls.
    pub service: String,
    /// Public AppView used without credentials.
    pub appview: String,
    pub identifier: Option<String>,
    pub app_password: Option<String>,
}

impl Default for BlueskyConfig {
    fn default() -> Self {
        Self {
            service: "https://bsky.social".to_string(),
            appview: "https://public.api.bsky.app".to_string(),
            identifier: None,
            app_password: None,
        }
    }
}

/// Mastodon retrieval settings.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MastodonConfig {
    /// Try archived API responses when the instance cannot answer.
    pub archive_fallback: bool,
}

impl Default for MastodonConfig {
    fn default() -> Self {
        Self {
            archive_fallback: true,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformsConfig {
    pub twitter: TwitterConfig,
    pub bluesky: BlueskyConfig,
    pub mastodon: MastodonConfig,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let c = PlatformsConfig::default();
        assert_eq!(c.twitter.scrape_budget_secs, 10);
        assert_eq!(c.twitter.hls_downloader, "yt-dlp");
        assert!(c.twitter.bearer_token.is_none());
        assert_eq!(c.bluesky.service, "https://bsky.social");
        assert!(c.mastodon.archive_fallback);
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let c: PlatformsConfig =
            serde_json::from_str(r#"{"bluesky": {"identifier": "me.bsky.social"}}"#).unwrap();
        assert_eq!(c.bluesky.identifier.as_deref(), Some("me.bsky.social"));
        assert_eq!(c.bluesky.appview, "https://public.api.bsky.app");
        assert_eq!(c.twitter, TwitterConfig::default());
    }
}
