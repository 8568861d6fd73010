use std::path::PathBuf;

/// Errors from reading, writing or finding documents.
///
/// Resolution and rendering failures are not here: they are per-link and
/// end up in [`Rewrite::failed`](crate::Rewrite::failed).
#[derive(Debug, thiserror::Error)]
pub enum EmbedError {
    #[error("{path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("bad pattern {pattern}: {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: ignore::Error,
    },

    #[error("walking {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: ignore::Error,
    },
}

impl EmbedError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type EmbedResult<T> = Result<T, EmbedError>;
