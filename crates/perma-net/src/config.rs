use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default user agent. Some platforms reject the stock agents of HTTP
/// libraries but serve command-line clients.
pub const DEFAULT_USER_AGENT: &str = "curl/8.0.1";

/// Configuration for outbound HTTP.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetConfig {
    /// `User-Agent` sent with every request.
    pub user_agent: String,
    /// Per-request timeout in seconds (connect plus read).
    pub timeout_secs: u64,
    /// Base URL of the web archive used for fallbacks.
    pub archive_host: String,
    /// Bodies larger than this are rejected.
    pub max_body_bytes: u64,
}

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            user_agent: DEFAULT_USER_AGENT.to_string(),
            timeout_secs: 30,
            archive_host: "https://web.archive.org".to_string(),
            max_body_bytes: 512 * 1024 * 1024,
        }
    }
}

impl NetConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
