use thiserror::Error;

/// Errors produced by type operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TypeError {
    /// A value would escape the cache directory if used as a path component.
    #[error("unsafe {field} {value:?}: {reason}")]
    PathSafety {
        field: &'static str,
        value: String,
        reason: String,
    },

    /// A record lacks a field the caller requires.
    #[error("record is missing required field {0}")]
    MissingField(String),

    /// A reference is structurally unusable (e.g. no user id where one is needed).
    #[error("invalid reference: {0}")]
    InvalidReference(String),
}

impl TypeError {
    pub fn is_path_safety(&self) -> bool {
        matches!(self, Self::PathSafety { .. })
    }
}

/// Convenience alias for type operations.
pub type TypeResult<T> = Result<T, TypeError>;
