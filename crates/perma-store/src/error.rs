use std::path::PathBuf;

use perma_types::TypeError;

/// Errors from cache store operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The reference or media name cannot be turned into a safe path, or the
    /// reference is incomplete.
    #[error(transparent)]
    Type(#[from] TypeError),

    /// A cache file exists but does not parse.
    #[error("corrupt cache file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },

    /// Serialization failure while writing a record.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// I/O error from the underlying filesystem.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn is_path_safety(&self) -> bool {
        matches!(self, Self::Type(e) if e.is_path_safety())
    }
}

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;
