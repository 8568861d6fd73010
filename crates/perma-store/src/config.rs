use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Configuration for the post cache.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory under which `posts/` is created.
    pub root: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
        }
    }
}
