use std::time::Duration;

use perma_net::NetError;
use perma_store::StoreError;
use perma_types::{PostReference, TypeError};

/// Why a single strategy could not produce a record.
///
/// These never escape the chain; they are logged and the next strategy runs.
#[derive(Debug, thiserror::Error)]
pub enum StrategyError {
    /// The source answered but has no such post.
    #[error("not found: {0}")]
    NotFound(String),

    /// The source answered with something that is not a usable post.
    #[error("malformed response: {0}")]
    Malformed(String),

    /// Timeouts, 5xx, rate limits, connection failures.
    #[error("network error: {0}")]
    Network(#[from] NetError),

    /// The strategy cannot run with the current configuration
    /// (missing credentials, no mirror host).
    #[error("not configured: {0}")]
    Configuration(String),

    /// The strategy exceeded its wall-clock budget.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Reading the local cache failed.
    #[error("cache error: {0}")]
    Store(#[from] StoreError),
}

impl StrategyError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Errors that cross the chain boundary.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    /// The reference cannot be used as a cache key.
    #[error("refusing unsafe reference: {0}")]
    PathSafety(#[from] TypeError),

    /// Every strategy failed.
    #[error("{reference} not found after {attempts} strategies: {last}")]
    Exhausted {
        reference: PostReference,
        attempts: usize,
        #[source]
        last: StrategyError,
    },

    /// The chain has no strategies.
    #[error("no retrieval strategies configured for {reference}")]
    Empty { reference: PostReference },
}

impl ChainError {
    pub fn is_path_safety(&self) -> bool {
        matches!(self, Self::PathSafety(_))
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::Exhausted { .. })
    }
}

pub type StrategyResult<T> = Result<T, StrategyError>;

pub type ChainResult<T> = Result<T, ChainError>;
