use perma_net::NetError;

/// Errors raised by adapters outside the retrieval chain.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    /// A record lacks an identity field needed to render it.
    #[error("{noun} record is missing {field}")]
    MissingField { noun: &'static str, field: String },

    /// Credentials are absent or were refused.
    #[error("login failed: {0}")]
    Login(String),

    #[error("network error: {0}")]
    Network(#[from] NetError),
}

pub type PlatformResult<T> = Result<T, PlatformError>;
