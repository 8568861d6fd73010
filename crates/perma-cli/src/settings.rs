use std::path::Path;

use anyhow::Context;
use perma_embed::EmbedConfig;
use perma_net::NetConfig;
use perma_platforms::PlatformsConfig;
use perma_resolver::ResolverConfig;
use perma_store::StoreConfig;
use serde::{Deserialize, Serialize};

pub const ENV_BSKY_IDENTIFIER: &str = "PERMA_BSKY_IDENTIFIER";
pub const ENV_BSKY_PASSWORD: &str = "PERMA_BSKY_PASSWORD";
pub const ENV_TWITTER_BEARER: &str = "PERMA_TWITTER_BEARER";

/// Everything the binary can be configured with. Missing sections and keys
/// take their defaults.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub store: StoreConfig,
    pub net: NetConfig,
    pub platforms: PlatformsConfig,
    pub resolver: ResolverConfig,
    pub embed: EmbedConfig,
}

impl Settings {
    pub fn from_toml(text: &str) -> anyhow::Result<Self> {
        toml::from_str(text).context("invalid settings")
    }

    /// Read a settings file, or use defaults when none is given.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading {}", path.display()))?;
        Self::from_toml(&text).with_context(|| format!("in {}", path.display()))
    }

    /// Credentials from the environment win over the file.
    pub fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup(ENV_BSKY_IDENTIFIER) {
            self.platforms.bluesky.identifier = Some(v);
        }
        if let Some(v) = lookup(ENV_BSKY_PASSWORD) {
            self.platforms.bluesky.app_password = Some(v);
        }
        if let Some(v) = lookup(ENV_TWITTER_BEARER) {
            self.platforms.twitter.bearer_token = Some(v);
        }
    }
}
