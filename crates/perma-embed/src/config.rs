use serde::{Deserialize, Serialize};

/// Which links the rewrite pass touches.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RewriteMode {
    /// Only `![](url)`, giving it a caption.
    UncaptionedOnly,
    /// Every `[..](url)` and `![..](url)` an adapter recognises.
    AllLinks,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbedConfig {
    pub uncaptioned_only: bool,
}

impl EmbedConfig {
    pub fn mode(&self) -> RewriteMode {
        if self.uncaptioned_only {
            RewriteMode::UncaptionedOnly
        } else {
            RewriteMode::AllLinks
        }
    }
}

impl Default for EmbedConfig {
    fn default() -> Self {
        Self {
            uncaptioned_only: true,
        }
    }
}
